use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use milestonebot_common::models::MetricsSnapshot;

use crate::Error;
use crate::config::UpstreamEndpoints;
use crate::http::HttpClient;

/// JSON shape for `GET /universes/v1/places/{placeId}/universe`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniverseJson {
    universe_id: Option<u64>,
}

/// JSON shape for `GET /v1/games?universeIds=...`.
#[derive(Debug, Deserialize)]
struct GamesJson {
    #[serde(default)]
    data: Vec<GameJson>,
}

#[derive(Debug, Deserialize)]
struct GameJson {
    id: Option<u64>,
    visits: Option<i64>,
}

/// One page of `GET /v1/games/{placeId}/servers/Public`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerPageJson {
    #[serde(default)]
    data: Vec<ServerJson>,
    next_page_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerJson {
    #[serde(default)]
    playing: u64,
}

/// Runs the three upstream calls behind one fetch. Every fault is returned
/// as an `Err`; turning it into fallback data is the caller's job.
pub struct UpstreamClient {
    http: Arc<dyn HttpClient>,
    endpoints: UpstreamEndpoints,
}

impl UpstreamClient {
    pub fn new(http: Arc<dyn HttpClient>, endpoints: UpstreamEndpoints) -> Self {
        Self { http, endpoints }
    }

    /// Place id => universe id.
    pub async fn resolve_universe_id(&self, place_id: u64) -> Result<u64, Error> {
        let url = format!(
            "{}/universes/v1/places/{place_id}/universe",
            self.endpoints.apis_base.trim_end_matches('/')
        );
        let body = self.http.get_text(&url, &[]).await?;
        let parsed: UniverseJson = serde_json::from_str(&body)?;
        parsed
            .universe_id
            .ok_or_else(|| Error::FetchFailed(format!("no universeId returned for place {place_id}")))
    }

    /// Cumulative visits for a universe. Missing or negative counts are faults.
    pub async fn fetch_visits(&self, universe_id: u64) -> Result<u64, Error> {
        let url = format!("{}/v1/games", self.endpoints.games_base.trim_end_matches('/'));
        let body = self
            .http
            .get_text(&url, &[("universeIds", universe_id.to_string())])
            .await?;
        let parsed: GamesJson = serde_json::from_str(&body)?;

        let game = parsed
            .data
            .iter()
            .find(|g| g.id == Some(universe_id))
            .ok_or_else(|| Error::FetchFailed(format!("no game data for universe {universe_id}")))?;

        match game.visits {
            Some(v) if v >= 0 => Ok(v as u64),
            Some(v) => Err(Error::FetchFailed(format!("negative visit count {v} for universe {universe_id}"))),
            None => Err(Error::FetchFailed(format!("no visit count for universe {universe_id}"))),
        }
    }

    /// Walks every public server page and sums the per-server player counts.
    pub async fn count_active_players(&self, place_id: u64) -> Result<u64, Error> {
        let url = format!(
            "{}/v1/games/{place_id}/servers/Public",
            self.endpoints.games_base.trim_end_matches('/')
        );
        let mut total: u64 = 0;
        let mut cursor: Option<String> = None;
        let mut seen: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            if pages >= self.endpoints.max_pages {
                return Err(Error::FetchFailed(format!(
                    "server listing for place {place_id} exceeded {} pages",
                    self.endpoints.max_pages
                )));
            }

            let mut query = vec![("limit", self.endpoints.page_limit.to_string())];
            if let Some(c) = &cursor {
                query.push(("cursor", c.clone()));
            }

            let body = self.http.get_text(&url, &query).await?;
            let page: ServerPageJson = serde_json::from_str(&body)?;
            pages += 1;

            let page_sum: u64 = page.data.iter().map(|s| s.playing).sum();
            total = total.saturating_add(page_sum);
            debug!("place {place_id}: page {pages} => {} servers, {page_sum} players", page.data.len());

            match page.next_page_cursor.filter(|c| !c.is_empty()) {
                Some(next) => {
                    if !seen.insert(next.clone()) {
                        return Err(Error::FetchFailed(format!(
                            "server listing for place {place_id} repeated cursor '{next}'"
                        )));
                    }
                    cursor = Some(next);
                }
                None => break,
            }
        }

        Ok(total)
    }

    pub async fn fetch_snapshot(&self, place_id: u64) -> Result<MetricsSnapshot, Error> {
        let universe_id = self.resolve_universe_id(place_id).await?;
        let visits = self.fetch_visits(universe_id).await?;
        let active_players = self.count_active_players(place_id).await?;
        Ok(MetricsSnapshot::live(active_players, visits))
    }
}
