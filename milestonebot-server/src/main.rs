use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use milestonebot_core::config::{
    DEFAULT_MILESTONE_GOAL, DEFAULT_TICK_JITTER_SECS, DEFAULT_TICK_SECS, DEFAULT_VISITS_FLOOR,
    FallbackConfig, SessionConfig, UpstreamEndpoints,
};
use milestonebot_core::keepalive::start_keepalive_server;
use milestonebot_core::metrics::{HttpMetricsSource, UpstreamClient};
use milestonebot_core::platforms::PlatformIntegration;
use milestonebot_core::platforms::discord::{DiscordMessageEvent, DiscordPlatform};
use milestonebot_core::services::CommandService;
use milestonebot_core::session::MilestonePolicy;
use milestonebot_core::{DefaultHttpClient, TrackingSession};

#[derive(Parser, Debug, Clone)]
#[command(name = "milestonebot")]
#[command(author, version, about = "MilestoneBot - posts live player and visit milestones to Discord")]
struct Args {
    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    discord_token: String,

    /// Place id of the tracked game
    #[arg(long, env = "PLACE_ID")]
    place_id: u64,

    /// First milestone goal
    #[arg(long, env = "MILESTONE_GOAL", default_value_t = DEFAULT_MILESTONE_GOAL)]
    milestone_goal: u64,

    /// Visits reported when the upstream API is down and nothing higher is known
    #[arg(long, env = "VISITS_FLOOR", default_value_t = DEFAULT_VISITS_FLOOR)]
    visits_floor: u64,

    /// Goal increment rule: "fixed:100,150" or "percent:5"
    #[arg(long, env = "MILESTONE_POLICY", default_value = "fixed:100,150")]
    milestone_policy: MilestonePolicy,

    /// Seconds between periodic updates
    #[arg(long, env = "TICK_SECS", default_value_t = DEFAULT_TICK_SECS)]
    tick_secs: u64,

    /// Maximum random delay before each periodic fetch, in seconds
    #[arg(long, env = "TICK_JITTER_SECS", default_value_t = DEFAULT_TICK_JITTER_SECS)]
    tick_jitter_secs: u64,

    /// Address for the keep-alive HTTP server
    #[arg(long, env = "KEEPALIVE_ADDR", default_value = "0.0.0.0:8080")]
    keepalive_addr: SocketAddr,

    /// Override for the universe-lookup API host
    #[arg(long, env = "UPSTREAM_APIS_BASE")]
    upstream_apis_base: Option<String>,

    /// Override for the games API host
    #[arg(long, env = "UPSTREAM_GAMES_BASE")]
    upstream_games_base: Option<String>,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            target_id: self.place_id,
            initial_goal: self.milestone_goal,
            policy: self.milestone_policy.clone(),
            tick_period: Duration::from_secs(self.tick_secs.max(1)),
            tick_jitter: Duration::from_secs(self.tick_jitter_secs),
        }
    }

    fn fallback_config(&self) -> FallbackConfig {
        FallbackConfig {
            visits_floor: self.visits_floor,
            ..FallbackConfig::default()
        }
    }

    fn upstream_endpoints(&self) -> UpstreamEndpoints {
        let mut endpoints = UpstreamEndpoints::default();
        if let Some(base) = &self.upstream_apis_base {
            endpoints.apis_base = base.clone();
        }
        if let Some(base) = &self.upstream_games_base {
            endpoints.games_base = base.clone();
        }
        endpoints
    }
}

fn init_tracing() {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer already set: {e}");
    }
    let filter = EnvFilter::from_default_env()
        .add_directive("milestonebot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!(
        "MilestoneBot starting. place_id={}, goal={}, policy={}",
        args.place_id, args.milestone_goal, args.milestone_policy
    );

    if let Err(e) = run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run_server(args: Args) -> anyhow::Result<()> {
    // 1) Keep-alive endpoint for uptime pingers.
    let keepalive_shutdown = start_keepalive_server(args.keepalive_addr)
        .await
        .context("starting keep-alive server")?;

    // 2) Discord.
    let mut discord = DiscordPlatform::new(args.discord_token.clone());
    discord.connect().await.context("connecting to Discord")?;
    let discord = Arc::new(discord);

    // 3) Metrics source + tracking session.
    let endpoints = args.upstream_endpoints();
    let http = Arc::new(DefaultHttpClient::new(endpoints.request_timeout)?);
    let source = Arc::new(HttpMetricsSource::new(
        UpstreamClient::new(http, endpoints),
        args.fallback_config(),
    ));
    let session = Arc::new(TrackingSession::new(
        args.session_config(),
        source,
        discord.clone(),
    ));
    let commands = Arc::new(CommandService::new(session.clone()));

    // 4) Event loop; each command runs in its own task so a slow upstream
    //    fetch never holds up the next message.
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Ctrl-C received; shutting down.");
                break;
            }
            maybe_event = discord.next_message_event() => {
                let Some(event) = maybe_event else {
                    warn!("Discord event stream ended.");
                    break;
                };
                let commands = commands.clone();
                let discord = discord.clone();
                tokio::spawn(async move {
                    handle_message(&commands, &discord, event).await;
                });
            }
        }
    }

    if session.is_running().await {
        let _ = session.stop().await;
    }
    discord.close_shards();
    let _ = keepalive_shutdown.send(());
    Ok(())
}

async fn handle_message(
    commands: &CommandService,
    discord: &DiscordPlatform,
    event: DiscordMessageEvent,
) {
    let response = match commands.handle_chat_line(&event.channel_id, &event.text).await {
        Ok(Some(r)) => r,
        Ok(None) => return,
        Err(e) => {
            error!("Command from {} failed: {:?}", event.username, e);
            return;
        }
    };

    if let Err(e) = discord.send_message(&response.channel, &response.text).await {
        error!("Failed to reply in channel {}: {:?}", response.channel, e);
    }
}
