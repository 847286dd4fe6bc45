use milestonebot_common::models::StatusReport;

const RULE: &str = "--------------------------------------------------";

/// `1234567` => `"1,234,567"`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// The chat message posted on start and on every tick.
pub fn format_status_message(report: &StatusReport) -> String {
    let visits = format_thousands(report.visits);
    format!(
        "{RULE}\n\
         👤🎮 Active players: {players}\n\
         {RULE}\n\
         👥 Visits: {visits}\n\
         🎯 Next milestone: {visits}/{goal}\n\
         {RULE}",
        players = format_thousands(report.active_players),
        goal = format_thousands(report.milestone_goal),
    )
}
