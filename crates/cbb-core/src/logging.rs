use tracing_subscriber::{fmt, EnvFilter};

use crate::{Error, Result};

fn default_directives(service_name: &str) -> String {
    format!("info,cbb=info,cbb_core=info,cbb_jisilu=info,cbb_telegram=info,{service_name}=info")
}

/// Initialize the process-wide tracing subscriber.
///
/// Call once at startup; the subscriber is not reconfigured afterwards.
pub fn init(service_name: &str) -> Result<()> {
    // Default: info everywhere. Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::External(format!("logging init failed: {e}")))
}
