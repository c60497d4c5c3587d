//! Telegram update handlers.
//!
//! Only slash commands are handled; everything else is ignored.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let is_command = msg.text().is_some_and(|t| t.starts_with('/'));
    if !is_command {
        return Ok(());
    }
    commands::handle_command(bot, msg, state).await
}
