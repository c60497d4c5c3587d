use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    domain::{DailyReport, OfferingRecord},
    Result,
};

/// Port for the upstream bond listing.
///
/// Implementations issue exactly one request per call and never retry;
/// retrying is the caller's decision.
#[async_trait]
pub trait BondSource: Send + Sync {
    async fn fetch_records(&self) -> Result<Vec<OfferingRecord>>;
}

/// Fetch the listing once and partition it for `date`.
pub async fn fetch_report(source: &dyn BondSource, date: NaiveDate) -> Result<DailyReport> {
    let records = source.fetch_records().await?;
    tracing::debug!(rows = records.len(), %date, "fetched offering rows");
    Ok(DailyReport::partition(date, records))
}
