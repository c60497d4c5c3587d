use std::sync::Arc;

use cbb_core::{config::Config, fetch::BondSource};
use cbb_jisilu::JisiluClient;

#[tokio::main]
async fn main() -> Result<(), cbb_core::Error> {
    cbb_core::logging::init("cbb")?;

    let cfg = Arc::new(Config::load()?);

    let source: Arc<dyn BondSource> = Arc::new(JisiluClient::new(
        cfg.base_url.clone(),
        cfg.page_size,
        cfg.fetch_timeout,
    )?);

    cbb_telegram::router::run_polling(cfg, source)
        .await
        .map_err(|e| cbb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
