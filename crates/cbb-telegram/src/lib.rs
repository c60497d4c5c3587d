//! Telegram adapter (teloxide).
//!
//! This crate implements the `cbb-core` Messenger port over the Telegram Bot API
//! and routes inbound commands.

use std::time::Duration;

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ParseMode, Recipient},
    ApiError, RequestError,
};

use tokio::time::timeout;

pub mod handlers;
pub mod router;

use cbb_core::{
    domain::Destination,
    errors::{Error, TransportErrorKind},
    messaging::port::Messenger,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    send_timeout: Duration,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, send_timeout: Duration) -> Self {
        Self { bot, send_timeout }
    }

    fn recipient(dest: &Destination) -> Recipient {
        match dest {
            Destination::Channel(handle) => Recipient::ChannelUsername(handle.clone()),
            Destination::Chat(id) => Recipient::Id(teloxide::types::ChatId(*id)),
        }
    }

    fn map_err(e: RequestError) -> Error {
        Error::transport(classify_request_error(&e), format!("telegram error: {e}"))
    }
}

/// Map a teloxide failure onto the core's closed set of transport categories.
pub fn classify_request_error(e: &RequestError) -> TransportErrorKind {
    match e {
        RequestError::Api(ApiError::NotFound | ApiError::BotBlocked | ApiError::BotKicked) => {
            TransportErrorKind::Unauthorized
        }
        RequestError::Api(_) => TransportErrorKind::BadRequest,
        RequestError::MigrateToChatId(_) => TransportErrorKind::ChatMigrated,
        RequestError::Network(err) if err.is_timeout() => TransportErrorKind::TimedOut,
        RequestError::Network(_) | RequestError::Io(_) => TransportErrorKind::Network,
        _ => TransportErrorKind::Other,
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_markdown(&self, dest: &Destination, text: &str) -> Result<()> {
        let req = self
            .bot
            .send_message(Self::recipient(dest), text.to_string())
            .parse_mode(ParseMode::MarkdownV2)
            .disable_web_page_preview(true);

        match timeout(self.send_timeout, req).await {
            Ok(Ok(_msg)) => Ok(()),
            Ok(Err(e)) => Err(Self::map_err(e)),
            Err(_) => Err(Error::transport(
                TransportErrorKind::TimedOut,
                format!("telegram send to {dest} timed out after {:?}", self.send_timeout),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::AsyncReadExt,
        net::TcpListener,
        sync::oneshot,
        time::Instant,
    };

    use super::*;

    /// Accept one connection, capture the request, never answer.
    async fn silent_api() -> (reqwest::Url, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = reqwest::Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            // Read until the client goes quiet or hangs up.
            while let Ok(Ok(n)) = timeout(Duration::from_millis(200), stream.read(&mut buf)).await {
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&raw).into_owned());
            // Hold the connection open so the client waits on a reply.
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        (url, rx)
    }

    #[tokio::test]
    async fn unanswered_send_times_out_with_markdown_request() {
        let (url, captured) = silent_api().await;
        let bot = Bot::new("123456:TEST").set_api_url(url);
        let messenger = TelegramMessenger::new(bot, Duration::from_millis(500));

        let started = Instant::now();
        let res = messenger
            .send_markdown(&Destination::channel("cb"), "*日期*: 2024\\-03\\-15")
            .await;

        assert!(matches!(
            res,
            Err(Error::Transport {
                kind: TransportErrorKind::TimedOut,
                ..
            })
        ));
        assert!(started.elapsed() < Duration::from_secs(5));

        let request = tokio::time::timeout(Duration::from_secs(5), captured)
            .await
            .unwrap()
            .unwrap();
        assert!(request.contains("\"parse_mode\":\"MarkdownV2\""), "{request}");
        assert!(request.contains("\"disable_web_page_preview\":true"), "{request}");
        assert!(request.contains("\"chat_id\":\"@cb\""), "{request}");
    }

    #[test]
    fn classifies_api_errors() {
        assert_eq!(
            classify_request_error(&RequestError::Api(ApiError::NotFound)),
            TransportErrorKind::Unauthorized
        );
        assert_eq!(
            classify_request_error(&RequestError::Api(ApiError::BotBlocked)),
            TransportErrorKind::Unauthorized
        );
        assert_eq!(
            classify_request_error(&RequestError::Api(ApiError::MessageTextIsEmpty)),
            TransportErrorKind::BadRequest
        );
    }

    #[test]
    fn maps_destination_to_recipient() {
        assert_eq!(
            TelegramMessenger::recipient(&Destination::channel("cb")),
            Recipient::ChannelUsername("@cb".to_string())
        );
        assert_eq!(
            TelegramMessenger::recipient(&Destination::Chat(-100)),
            Recipient::Id(teloxide::types::ChatId(-100))
        );
    }

    #[test]
    fn mapped_error_keeps_category() {
        let e = TelegramMessenger::map_err(RequestError::Api(ApiError::BotKicked));
        assert!(matches!(
            e,
            Error::Transport {
                kind: TransportErrorKind::Unauthorized,
                ..
            }
        ));
    }
}
