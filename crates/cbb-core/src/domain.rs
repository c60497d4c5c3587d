use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Where a rendered digest goes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Public channel handle, always `@`-prefixed.
    Channel(String),
    /// Numeric chat id (direct reply to whoever issued a command).
    Chat(i64),
}

impl Destination {
    /// Build a channel destination, prepending `@` when missing.
    pub fn channel(handle: &str) -> Self {
        Self::Channel(normalize_channel_handle(handle))
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(h) => f.write_str(h),
            Self::Chat(id) => write!(f, "chat {id}"),
        }
    }
}

pub fn normalize_channel_handle(handle: &str) -> String {
    let handle = handle.trim();
    if handle.starts_with('@') {
        handle.to_string()
    } else {
        format!("@{handle}")
    }
}

/// One convertible bond as published by the upstream listing for a given day.
///
/// The upstream mixes strings, numbers and nulls for the same column across
/// rows, so every field is normalized to a string (null/missing -> "").
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OfferingRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub stock_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub stock_nm: String,
    #[serde(deserialize_with = "lenient_string")]
    pub bond_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub bond_nm: String,
    #[serde(deserialize_with = "lenient_string")]
    pub price: String,
    /// Subscription lottery rate, percent without the `%` sign.
    #[serde(deserialize_with = "lenient_string")]
    pub lucky_draw_rt: String,
    #[serde(deserialize_with = "lenient_string")]
    pub rating_cd: String,
    #[serde(deserialize_with = "lenient_string")]
    pub jsl_advise_text: String,
    /// ISO-8601 date subscription opens.
    #[serde(deserialize_with = "lenient_string")]
    pub apply_date: String,
    /// ISO-8601 date trading starts.
    #[serde(deserialize_with = "lenient_string")]
    pub list_date: String,

    #[serde(deserialize_with = "lenient_string")]
    pub apply_cd: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ration_cd: String,
    /// Issue size, in 100M CNY.
    #[serde(deserialize_with = "lenient_string")]
    pub amount: String,
    #[serde(deserialize_with = "lenient_string")]
    pub single_draw: String,
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}

/// Bonds worth mentioning on one calendar day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyReport {
    pub date: NaiveDate,
    /// Open for subscription on `date`.
    pub apply: Vec<OfferingRecord>,
    /// Start trading on `date`.
    pub listed: Vec<OfferingRecord>,
}

impl DailyReport {
    /// Split `records` into apply/listed buckets for `date`.
    ///
    /// First match wins: a record subscribing on `date` is never also counted
    /// as listed, even if its list date matches too.
    pub fn partition(date: NaiveDate, records: impl IntoIterator<Item = OfferingRecord>) -> Self {
        let today = date.format("%Y-%m-%d").to_string();
        let mut apply = Vec::new();
        let mut listed = Vec::new();

        for record in records {
            if record.apply_date == today {
                apply.push(record);
            } else if record.list_date == today {
                listed.push(record);
            }
        }

        Self {
            date,
            apply,
            listed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.apply.is_empty() && self.listed.is_empty()
    }
}
