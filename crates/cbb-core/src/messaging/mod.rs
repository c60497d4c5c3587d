//! Outbound messaging: the transport port and the retrying notifier on top of it.

pub mod notifier;
pub mod port;
