use std::fmt;

/// Closed set of categories a messaging-transport failure can fall into.
///
/// Every category is handled the same way today (log and move on). The tag is
/// kept so handlers can diverge later without re-parsing error strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// Token revoked, bot blocked or kicked.
    Unauthorized,
    /// The platform rejected the request payload.
    BadRequest,
    TimedOut,
    Network,
    /// A group was upgraded and now has a new chat id.
    ChatMigrated,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthorized => "unauthorized",
            Self::BadRequest => "bad request",
            Self::TimedOut => "timed out",
            Self::Network => "network",
            Self::ChatMigrated => "chat migrated",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the digest
/// pipeline can treat failures uniformly (retry, log, give up).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display_includes_kind() {
        let e = Error::transport(TransportErrorKind::ChatMigrated, "moved to -100123");
        assert_eq!(
            e.to_string(),
            "transport error (chat migrated): moved to -100123"
        );
    }

    #[test]
    fn fetch_and_config_errors_name_their_stage() {
        assert_eq!(
            Error::Fetch("503".into()).to_string(),
            "fetch error: 503"
        );
        assert_eq!(
            Error::Config("missing BOT_TOKEN".into()).to_string(),
            "config error: missing BOT_TOKEN"
        );
    }
}
