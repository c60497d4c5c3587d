//! Core domain + application logic for the convertible-bond digest bot.
//!
//! This crate is framework-agnostic. The bond listing endpoint and Telegram
//! live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod digest;
pub mod domain;
pub mod errors;
pub mod fetch;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod retry;
pub mod scheduler;

pub use errors::{Error, Result};
