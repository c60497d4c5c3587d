use std::{future::Future, pin::Pin, sync::Arc};

use teloxide::{
    dispatching::Dispatcher, dptree, error_handlers::ErrorHandler, prelude::*, RequestError,
};

use cbb_core::{
    config::Config,
    digest::DigestJob,
    fetch::BondSource,
    messaging::{notifier::Notifier, port::Messenger},
    scheduler::DigestScheduler,
};

use crate::{classify_request_error, handlers, TelegramMessenger};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub job: DigestJob,
    pub scheduler: DigestScheduler,
}

/// Last-resort sink for errors escaping update handlers: classify, log, swallow.
pub struct ClassifyingErrorHandler;

impl ErrorHandler<RequestError> for ClassifyingErrorHandler {
    fn handle_error(
        self: Arc<Self>,
        error: RequestError,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        let kind = classify_request_error(&error);
        tracing::error!(%kind, error = %error, "update handler failed");
        Box::pin(async {})
    }
}

pub async fn run_polling(cfg: Arc<Config>, source: Arc<dyn BondSource>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!("bot started: @{}", me.username()),
        Err(e) => tracing::warn!(kind = %classify_request_error(&e), "get_me failed: {e}"),
    }
    tracing::info!(channel = %cfg.channel_id, schedule = %cfg.schedule_cron, offset = %cfg.schedule_offset, "configuration loaded");

    let messenger: Arc<dyn Messenger> =
        Arc::new(TelegramMessenger::new(bot.clone(), cfg.send_timeout));
    let notifier = Notifier::new(messenger, cfg.retry);
    let job = DigestJob::new(source, notifier, cfg.base_url.clone());

    let scheduler = DigestScheduler::new(cfg.schedule()?, job.clone(), cfg.channel());
    scheduler.start().await;

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        job,
        scheduler: scheduler.clone(),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .error_handler(Arc::new(ClassifyingErrorHandler))
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped, shutting down scheduler");
    scheduler.stop().await;

    Ok(())
}
