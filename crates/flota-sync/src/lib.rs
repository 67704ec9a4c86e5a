// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Client for the spreadsheet-backed sync endpoint. One URL serves three request shapes:
//! a GET returning the whole document, a form POST carrying the whole document in
//! `db_data`, and a form POST asking the endpoint to relay an email.

mod queue;

pub use queue::{PushQueue, SyncEvent};

use anyhow::{Context, Result};
use flota_app::Document;
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use serde_json::{Map, Value};
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    NotConfigured,
    /// The endpoint answered with an HTML page, typically a sign-in or permission screen.
    PermissionPage,
    EmptyCloud,
    Connection { detail: String },
    InvalidStructure { detail: String },
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => f.write_str(
                "sync URL is not configured -- link this device with `flota link <url>`",
            ),
            Self::PermissionPage => f.write_str(
                "sync endpoint returned a web page instead of data -- redeploy the script with \
                 access set to \"Anyone\" and link the new URL",
            ),
            Self::EmptyCloud => f.write_str(
                "sync endpoint has no data yet -- run `flota sync push` on the device that holds the fleet",
            ),
            Self::Connection { detail } => write!(
                f,
                "cannot reach sync endpoint ({detail}) -- check the network and the URL, then retry"
            ),
            Self::InvalidStructure { detail } => write!(
                f,
                "sync endpoint returned data that is not a fleet document ({detail}) -- check \
                 that the URL points at this fleet's script"
            ),
        }
    }
}

impl std::error::Error for SyncError {}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct Client {
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { timeout, http })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET the remote document and check that it looks like one of ours.
    pub fn fetch_document(&self, url: &str) -> SyncResult<Map<String, Value>> {
        let target = cache_busting_url(url, OffsetDateTime::now_utc())?;
        log::debug!("pulling document from {url}");
        let response = self
            .http
            .get(target)
            .send()
            .map_err(connection_error)?;

        if is_html(&response) {
            return Err(SyncError::PermissionPage);
        }
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = response.text().map_err(connection_error)?;
        if body.trim().is_empty() {
            return Err(SyncError::EmptyCloud);
        }
        let value = serde_json::from_str::<Value>(&body).map_err(|error| SyncError::Connection {
            detail: format!("response is not JSON: {error}"),
        })?;
        classify_payload(value)
    }

    /// POST the full document as the `db_data` form field.
    pub fn post_document(&self, url: &str, document: &Document) -> SyncResult<()> {
        let url = configured(url)?;
        let payload = serde_json::to_string(document).map_err(|error| SyncError::Connection {
            detail: format!("encode document: {error}"),
        })?;
        let response = self
            .http
            .post(url)
            .form(&[("db_data", payload.as_str())])
            .send()
            .map_err(connection_error)?;
        check_status(response)
    }

    /// Ask the endpoint to relay one HTML email.
    pub fn send_email(&self, url: &str, email: &EmailMessage) -> SyncResult<()> {
        let url = configured(url)?;
        let response = self
            .http
            .post(url)
            .form(&[
                ("to_email", email.to_email.as_str()),
                ("to_name", email.to_name.as_str()),
                ("subject", email.subject.as_str()),
                ("message", email.html.as_str()),
                ("is_html", "true"),
            ])
            .send()
            .map_err(connection_error)?;
        check_status(response)
    }
}

/// Sort a decoded pull body into the empty, foreign, and usable cases.
pub fn classify_payload(value: Value) -> SyncResult<Map<String, Value>> {
    match value {
        Value::Object(map) if map.is_empty() => Err(SyncError::EmptyCloud),
        Value::Object(map) => {
            if !map.contains_key("users") && !map.contains_key("vehicles") {
                return Err(SyncError::InvalidStructure {
                    detail: "neither users nor vehicles present".to_owned(),
                });
            }
            Ok(map)
        }
        Value::Array(items) if !items.is_empty() => Err(SyncError::InvalidStructure {
            detail: "top level is a list".to_owned(),
        }),
        _ => Err(SyncError::EmptyCloud),
    }
}

/// Append `t=<epoch millis>` so intermediaries never serve a cached document.
pub fn cache_busting_url(url: &str, now: OffsetDateTime) -> SyncResult<String> {
    let url = configured(url)?;
    let mut parsed = url::Url::parse(url).map_err(|error| SyncError::Connection {
        detail: format!("invalid URL {url:?}: {error}"),
    })?;
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    parsed
        .query_pairs_mut()
        .append_pair("t", &millis.to_string());
    Ok(parsed.into())
}

fn configured(url: &str) -> SyncResult<&str> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(SyncError::NotConfigured);
    }
    Ok(trimmed)
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("text/html"))
}

fn check_status(response: Response) -> SyncResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().unwrap_or_default();
    Err(status_error(status, &body))
}

fn connection_error(error: reqwest::Error) -> SyncError {
    SyncError::Connection {
        detail: error.to_string(),
    }
}

fn status_error(status: StatusCode, body: &str) -> SyncError {
    let trimmed = body.trim();
    let detail = if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        format!("server error ({}): {trimmed}", status.as_u16())
    } else {
        format!("server returned {}", status.as_u16())
    };
    SyncError::Connection { detail }
}

#[cfg(test)]
mod tests {
    use super::{SyncError, cache_busting_url, classify_payload};
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn empty_payloads_read_as_empty_cloud() {
        for value in [json!(null), json!({}), json!([]), json!("sin datos"), json!(0)] {
            assert_eq!(classify_payload(value), Err(SyncError::EmptyCloud));
        }
    }

    #[test]
    fn foreign_payloads_are_invalid_structure() {
        assert!(matches!(
            classify_payload(json!({"rows": []})),
            Err(SyncError::InvalidStructure { .. })
        ));
        assert!(matches!(
            classify_payload(json!([1, 2])),
            Err(SyncError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn either_users_or_vehicles_is_enough() {
        assert!(classify_payload(json!({"users": []})).is_ok());
        assert!(classify_payload(json!({"vehicles": []})).is_ok());
    }

    #[test]
    fn cache_buster_keeps_existing_query() {
        let now = datetime!(2026-03-02 09:00 UTC);
        let url = cache_busting_url("https://script.example.com/exec?id=abc", now)
            .expect("valid url");
        assert_eq!(url, "https://script.example.com/exec?id=abc&t=1772442000000");
        assert_eq!(
            cache_busting_url("  ", now),
            Err(SyncError::NotConfigured)
        );
    }
}
