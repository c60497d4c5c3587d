use std::sync::Arc;

use crate::{
    domain::Destination,
    messaging::port::Messenger,
    retry::{retry_fixed, RetryOutcome, RetryPolicy},
};

/// What happened to a delivery. Failures never escape as errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Delivered { attempts: u32 },
    GaveUp { attempts: u32 },
}

impl Delivery {
    pub fn attempts(self) -> u32 {
        match self {
            Self::Delivered { attempts } | Self::GaveUp { attempts } => attempts,
        }
    }
}

/// Best-effort sender: bounded fixed-delay retry, then give up quietly.
#[derive(Clone)]
pub struct Notifier {
    messenger: Arc<dyn Messenger>,
    policy: RetryPolicy,
}

impl Notifier {
    pub fn new(messenger: Arc<dyn Messenger>, policy: RetryPolicy) -> Self {
        Self { messenger, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn deliver(&self, dest: &Destination, text: &str) -> Delivery {
        let label = format!("send to {dest}");
        let outcome = retry_fixed(self.policy, &label, || {
            self.messenger.send_markdown(dest, text)
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded { attempts, .. } => {
                tracing::info!(%dest, attempts, "digest delivered");
                Delivery::Delivered { attempts }
            }
            RetryOutcome::GaveUp {
                attempts,
                last_error,
            } => {
                tracing::error!(%dest, attempts, error = %last_error, "giving up delivery");
                Delivery::GaveUp { attempts }
            }
        }
    }
}
