use std::{env, fs, path::Path, time::Duration};

use chrono::FixedOffset;

use crate::{
    domain::Destination,
    errors::Error,
    retry::RetryPolicy,
    scheduler::{parse_utc_offset, CronExpr},
    Result,
};

pub const DEFAULT_BASE_URL: &str = "https://www.jisilu.cn";
pub const DEFAULT_SCHEDULE: &str = "0 9 * * 1-5";
pub const DEFAULT_UTC_OFFSET: &str = "+08:00";

/// Typed configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    /// Always `@`-prefixed.
    pub channel_id: String,
    pub send_timeout: Duration,

    // Upstream
    pub base_url: String,
    pub page_size: u32,
    pub fetch_timeout: Duration,

    // Delivery
    pub retry: RetryPolicy,

    // Schedule
    pub schedule_cron: String,
    pub schedule_offset: FixedOffset,
}

impl Config {
    /// Load from `.env` (if present) and the process environment.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required
        let bot_token = get("BOT_TOKEN").ok_or_else(|| {
            Error::Config("BOT_TOKEN environment variable is required".to_string())
        })?;
        let channel_id = get("CHANNEL_ID").ok_or_else(|| {
            Error::Config("CHANNEL_ID environment variable is required".to_string())
        })?;
        let channel_id = crate::domain::normalize_channel_handle(&channel_id);

        let send_timeout = Duration::from_secs(parse_or(&get, "SEND_TIMEOUT_SECS", 5)?);

        let base_url = get("JISILU_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let page_size = parse_or(&get, "JISILU_PAGE_SIZE", 22)?;
        let fetch_timeout = Duration::from_secs(parse_or(&get, "FETCH_TIMEOUT_SECS", 15)?);

        let retry = RetryPolicy {
            max_retries: parse_or(&get, "RETRY_MAX", 3)?,
            delay: Duration::from_secs(parse_or(&get, "RETRY_DELAY_SECS", 10)?),
        };

        let schedule_cron = get("SCHEDULE_CRON").unwrap_or_else(|| DEFAULT_SCHEDULE.to_string());
        let schedule_offset = parse_utc_offset(
            &get("SCHEDULE_UTC_OFFSET").unwrap_or_else(|| DEFAULT_UTC_OFFSET.to_string()),
        )?;
        // Fail at startup rather than at the first trigger.
        CronExpr::parse(&schedule_cron, schedule_offset)?;

        Ok(Self {
            bot_token,
            channel_id,
            send_timeout,
            base_url,
            page_size,
            fetch_timeout,
            retry,
            schedule_cron,
            schedule_offset,
        })
    }

    pub fn channel(&self) -> Destination {
        Destination::Channel(self.channel_id.clone())
    }

    pub fn schedule(&self) -> Result<CronExpr> {
        CronExpr::parse(&self.schedule_cron, self.schedule_offset)
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}"))),
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        return &s[1..s.len() - 1];
    }
    s
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
