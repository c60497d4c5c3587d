use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use teloxide::prelude::*;

use cbb_core::{digest::DigestOutcome, domain::Destination};

use crate::router::AppState;

const GREETING: &str = "I'm a bot, please talk to me!";
const UNKNOWN: &str = "Sorry, I didn't understand that command.";
const DIGEST_UNAVAILABLE: &str = "Could not fetch today's bond data, please try again later.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Reply(&'static str),
    Digest,
    NextRun,
}

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// Explicit commands first; anything else falls through to the apology.
fn route(cmd: &str) -> Action {
    match cmd {
        "start" => Action::Reply(GREETING),
        "today" => Action::Digest,
        "next" => Action::NextRun,
        _ => Action::Reply(UNKNOWN),
    }
}

fn describe_next_run(next: Option<DateTime<FixedOffset>>, channel: &str) -> String {
    match next {
        Some(dt) => format!(
            "Next digest for {channel}: {}",
            dt.format("%Y-%m-%d %H:%M (UTC%:z)")
        ),
        None => "No digest is scheduled.".to_string(),
    }
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let (cmd, _args) = parse_command(msg.text().unwrap_or(""));
    tracing::info!(chat = msg.chat.id.0, command = %cmd, "command received");

    match route(&cmd) {
        Action::Reply(text) => {
            bot.send_message(msg.chat.id, text).await?;
        }
        Action::NextRun => {
            let text = describe_next_run(state.scheduler.next_run(), &state.cfg.channel_id);
            bot.send_message(msg.chat.id, text).await?;
        }
        Action::Digest => {
            let dest = Destination::Chat(msg.chat.id.0);
            let today = state.scheduler.today();
            if state.job.run_for_date(&dest, today).await == DigestOutcome::FetchGaveUp {
                bot.send_message(msg.chat.id, DIGEST_UNAVAILABLE).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_command_with_bot_suffix() {
        assert_eq!(
            parse_command("/Start@cb_bot hello there"),
            ("start".to_string(), "hello there".to_string())
        );
        assert_eq!(parse_command("/today"), ("today".to_string(), String::new()));
    }

    #[test]
    fn explicit_commands_win_over_catch_all() {
        assert_eq!(route("start"), Action::Reply(GREETING));
        assert_eq!(route("today"), Action::Digest);
        assert_eq!(route("next"), Action::NextRun);
        assert_eq!(route("help"), Action::Reply(UNKNOWN));
        assert_eq!(route(""), Action::Reply(UNKNOWN));
    }

    #[test]
    fn next_run_text() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let dt = tz.with_ymd_and_hms(2024, 3, 18, 9, 0, 0).unwrap();
        assert_eq!(
            describe_next_run(Some(dt), "@cb"),
            "Next digest for @cb: 2024-03-18 09:00 (UTC+08:00)"
        );
        assert_eq!(describe_next_run(None, "@cb"), "No digest is scheduled.");
    }
}
