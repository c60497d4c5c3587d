//! jisilu.cn adapter (convertible-bond pre-listing table).
//!
//! Implements the `cbb-core` `BondSource` port with one form POST per call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;

use cbb_core::{domain::OfferingRecord, errors::Error, fetch::BondSource, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_2) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/79.0.3945.88 Safari/537.36";

#[derive(Deserialize)]
struct RowsEnvelope {
    rows: Vec<Row>,
}

#[derive(Deserialize)]
struct Row {
    cell: OfferingRecord,
}

#[derive(Clone, Debug)]
pub struct JisiluClient {
    base_url: String,
    page_size: u32,
    http: reqwest::Client,
}

impl JisiluClient {
    pub fn new(base_url: impl Into<String>, page_size: u32, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        // The endpoint rejects requests that do not look like its own XHR calls.
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(browser_headers(&base_url)?)
            .build()
            .map_err(|e| Error::External(format!("jisilu client build error: {e}")))?;

        Ok(Self {
            base_url,
            page_size,
            http,
        })
    }

    pub fn listing_url(&self) -> String {
        format!("{}/data/cbnew/pre_list/", self.base_url)
    }
}

fn browser_headers(base_url: &str) -> Result<HeaderMap> {
    let value = |v: &str| {
        HeaderValue::from_str(v).map_err(|e| Error::Config(format!("invalid header value {v}: {e}")))
    };

    let mut h = HeaderMap::new();
    h.insert(header::ORIGIN, value(base_url)?);
    h.insert(header::REFERER, value(&format!("{base_url}/data/cbnew/"))?);
    h.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
    h.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    h.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7"),
    );
    Ok(h)
}

/// Parse the listing body into offering records, in source order.
pub fn parse_rows(body: &str) -> Result<Vec<OfferingRecord>> {
    let env: RowsEnvelope = serde_json::from_str(body)
        .map_err(|e| Error::Fetch(format!("jisilu json error: {e}")))?;
    Ok(env.rows.into_iter().map(|r| r.cell).collect())
}

#[async_trait]
impl BondSource for JisiluClient {
    async fn fetch_records(&self) -> Result<Vec<OfferingRecord>> {
        let page_size = self.page_size.to_string();
        let form = [
            ("cb_type_Y", "Y"),
            ("progress", ""),
            ("rp", page_size.as_str()),
        ];

        let resp = self
            .http
            .post(self.listing_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("jisilu request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!(
                "jisilu listing failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("jisilu body error: {e}")))?;

        let records = parse_rows(&body)?;
        tracing::info!(rows = records.len(), "fetched jisilu listing");
        Ok(records)
    }
}
