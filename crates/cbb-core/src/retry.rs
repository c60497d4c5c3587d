//! Fixed-delay bounded retry.

use std::{future::Future, time::Duration};

use tokio::time::sleep;

use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(10),
        }
    }
}

/// Result of [`retry_fixed`]. Never carries a panic or a propagated error.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    GaveUp { attempts: u32, last_error: Error },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::GaveUp { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Succeeded { value, .. } => Some(value),
            Self::GaveUp { .. } => None,
        }
    }
}

/// Run `op` until it succeeds or `policy.max_retries` retries are spent.
///
/// Every failure is logged under `label`; exhaustion is logged and returned as
/// [`RetryOutcome::GaveUp`] instead of an error.
pub async fn retry_fixed<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return RetryOutcome::Succeeded { value, attempts },
            Err(e) => {
                tracing::warn!(attempt = attempts, error = %e, "{label} failed");
                if attempts > policy.max_retries {
                    tracing::error!(attempts, "{label}: giving up after {attempts} attempts");
                    return RetryOutcome::GaveUp {
                        attempts,
                        last_error: e,
                    };
                }
                tracing::info!("{label}: retrying after {:?}", policy.delay);
                sleep(policy.delay).await;
            }
        }
    }
}
