//! Fetch → format → notify, run once per trigger.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    domain::Destination,
    fetch::{fetch_report, BondSource},
    formatting::format_report,
    messaging::notifier::{Delivery, Notifier},
    retry::{retry_fixed, RetryOutcome},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestOutcome {
    Delivered { apply: usize, listed: usize },
    FetchGaveUp,
    DeliveryGaveUp,
}

#[derive(Clone)]
pub struct DigestJob {
    source: Arc<dyn BondSource>,
    notifier: Notifier,
    base_url: String,
}

impl DigestJob {
    pub fn new(source: Arc<dyn BondSource>, notifier: Notifier, base_url: impl Into<String>) -> Self {
        Self {
            source,
            notifier,
            base_url: base_url.into(),
        }
    }

    /// Build and send the digest of `date`.
    pub async fn run_for_date(&self, dest: &Destination, date: NaiveDate) -> DigestOutcome {
        tracing::info!(%date, %dest, "building digest");

        let fetched = retry_fixed(self.notifier.policy(), "fetch bond listing", || {
            fetch_report(self.source.as_ref(), date)
        })
        .await;
        let report = match fetched {
            RetryOutcome::Succeeded { value, .. } => value,
            RetryOutcome::GaveUp { last_error, .. } => {
                tracing::error!(%date, error = %last_error, "no digest today: fetch gave up");
                return DigestOutcome::FetchGaveUp;
            }
        };

        if report.is_empty() {
            tracing::info!(%date, "no bonds open for subscription or listing");
        }

        let text = format_report(&report, &self.base_url);
        tracing::debug!("{text}");

        match self.notifier.deliver(dest, &text).await {
            Delivery::Delivered { .. } => DigestOutcome::Delivered {
                apply: report.apply.len(),
                listed: report.listed.len(),
            },
            Delivery::GaveUp { .. } => DigestOutcome::DeliveryGaveUp,
        }
    }
}
