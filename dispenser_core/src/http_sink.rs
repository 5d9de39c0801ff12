//! HTTP delivery of interaction records.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use crate::error::{DispenserError, Result};
use crate::report::{InteractionRecord, RecordSink, SinkError};

/// Posts each record as JSON to a fixed collector URL.
pub struct HttpSink {
    client: Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| eyre::Report::new(DispenserError::Report(e.to_string())))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RecordSink for HttpSink {
    fn deliver(&mut self, record: &InteractionRecord) -> std::result::Result<(), SinkError> {
        let body = record.to_json()?;
        info!(url = %self.url, json = %body, "sending interaction record");
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;
        let status = response.status();
        let text = response.text().unwrap_or_default();
        info!(status = status.as_u16(), body = %text, "collector responded");
        if !status.is_success() {
            return Err(format!("collector returned HTTP {status}").into());
        }
        debug!("interaction record accepted");
        Ok(())
    }
}

impl std::fmt::Debug for HttpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSink").field("url", &self.url).finish()
    }
}
