//! [`SheetsExporter`], the web-app implementation of [`Exporter`].

use std::time::Duration;

use onboard_core::{
  export::{Delivered, Delivery, Exporter, Uncertain},
  record::OnboardingRecord,
};
use reqwest::{Client, StatusCode, Url};

use crate::{
  Error, Result,
  payload::{Action, Reply, form_fields},
};

/// Pushes rows to a Google Apps Script web app.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct SheetsExporter {
  client:      Client,
  web_app_url: String,
}

impl SheetsExporter {
  pub fn new(web_app_url: impl Into<String>, timeout: Duration) -> Result<Self> {
    let web_app_url = web_app_url.into();
    let parsed = Url::parse(&web_app_url).map_err(|_| Error::InvalidUrl(web_app_url.clone()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
      return Err(Error::InvalidUrl(web_app_url));
    }
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, web_app_url })
  }

  pub fn web_app_url(&self) -> &str { &self.web_app_url }

  /// Ask the web app to answer without writing anything.
  pub async fn test_connection(&self) -> Result<Delivery> {
    self.send(Action::Test, &[]).await
  }

  async fn send(&self, action: Action, records: &[OnboardingRecord]) -> Result<Delivery> {
    let fields = form_fields(action, records)?;
    let rows = match action {
      Action::Test => 0,
      _ => records.len(),
    };

    tracing::debug!(action = action.as_str(), rows, "posting to sheet web app");
    let resp = self
      .client
      .post(&self.web_app_url)
      .form(&fields)
      .send()
      .await?;

    let status = resp.status();
    let body = resp.text().await?;
    interpret(status, &body, rows)
  }
}

/// Classify a web app response.
fn interpret(status: StatusCode, body: &str, rows: usize) -> Result<Delivery> {
  if !status.is_success() {
    return Err(Error::Status {
      status: status.as_u16(),
      body:   body.chars().take(200).collect(),
    });
  }

  match serde_json::from_str::<Reply>(body) {
    Ok(reply) if reply.success => {
      let rows = reply.synced_count.unwrap_or(rows);
      tracing::debug!(rows, message = ?reply.message, "sheet web app confirmed");
      Ok(Ok(Delivered { rows }))
    }
    Ok(reply) => Err(Error::Rejected(
      reply
        .error
        .or(reply.message)
        .unwrap_or_else(|| "no reason given".to_owned()),
    )),
    Err(_) => {
      let reason = if body.trim().is_empty() {
        "empty response".to_owned()
      } else {
        format!("unrecognised {status} response")
      };
      Ok(Err(Uncertain { rows, reason }))
    }
  }
}

impl Exporter for SheetsExporter {
  type Error = Error;

  async fn push_all(&self, records: &[OnboardingRecord]) -> Result<Delivery> {
    self.send(Action::SyncAll, records).await
  }

  async fn push_one(&self, record: &OnboardingRecord) -> Result<Delivery> {
    self.send(Action::Append, std::slice::from_ref(record)).await
  }
}
