//! HTTP client for the account usage endpoints.
//!
//! A reading takes two GETs: the organizations list (the first entry is the
//! account's organization) and that organization's usage document.

use super::session::SessionCredentials;
use super::types::{FetchError, UsageReport};
use crate::usage_reset::{UsageWindow, UsageWindowSpan};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://claude.ai";

const API_TIMEOUT: Duration = Duration::from_secs(15);
const FORBIDDEN_SNIPPET_LEN: usize = 500;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Anything that can turn a session into a usage report.
///
/// Implementations block; callers on the async runtime go through
/// `spawn_blocking`.
pub trait UsageFetcher: Send + Sync {
    fn fetch(&self, credentials: &SessionCredentials) -> Result<UsageReport, FetchError>;
}

pub struct ApiClient {
    base_url: String,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(API_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the current usage for the session's first organization.
    pub fn fetch_usage(&self, credentials: &SessionCredentials) -> Result<UsageReport, FetchError> {
        tracing::debug!(
            "Fetching organizations from {} with {:?}",
            self.base_url(),
            credentials
        );
        let orgs = self.get_json("/api/organizations", credentials)?;
        let org_id = first_organization_id(&orgs)?;
        tracing::debug!("Using organization {}", org_id);

        let path = format!("/api/organizations/{}/usage", org_id);
        let body = self.get_body(&path, credentials)?;
        let report = parse_usage_body(&body, &org_id)?;
        tracing::info!(
            "Fetched usage: {:.1}% (org {})",
            report.session_window.utilization,
            org_id
        );
        Ok(report)
    }

    fn get_json(
        &self,
        path: &str,
        credentials: &SessionCredentials,
    ) -> Result<serde_json::Value, FetchError> {
        let body = self.get_body(path, credentials)?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    /// Issues a GET and maps the status code; returns the body on success.
    fn get_body(&self, path: &str, credentials: &SessionCredentials) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let mut response = self
            .agent
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", &format!("{}/chats", self.base_url))
            .header("Cookie", &credentials.cookie_header())
            .call()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        tracing::debug!("GET {} -> {}", path, status);

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        match status {
            200..=299 => Ok(body),
            401 => {
                tracing::warn!("Session rejected by {} (401)", path);
                Err(FetchError::SessionExpired)
            }
            403 => {
                let snippet: String = body.chars().take(FORBIDDEN_SNIPPET_LEN).collect();
                tracing::warn!("Forbidden (403) from {}: {}", path, snippet);
                Err(FetchError::Forbidden { snippet })
            }
            status => Err(FetchError::Http { status }),
        }
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl UsageFetcher for ApiClient {
    fn fetch(&self, credentials: &SessionCredentials) -> Result<UsageReport, FetchError> {
        self.fetch_usage(credentials)
    }
}

fn first_organization_id(orgs: &serde_json::Value) -> Result<String, FetchError> {
    let list = orgs
        .as_array()
        .ok_or_else(|| FetchError::Malformed("organizations is not a list".to_string()))?;
    list.first()
        .and_then(|org| org["uuid"].as_str())
        .filter(|id| !id.is_empty())
        .map(String::from)
        .ok_or(FetchError::NoOrganization)
}

/// Parses a usage document of the form
/// `{"five_hour": {"utilization": 12.0, "resets_at": "..."}, "seven_day": {...}}`.
///
/// A missing or null `five_hour` yields an empty window rather than an error:
/// the server omits it when nothing has been used in the current period.
pub fn parse_usage_body(body: &str, organization_id: &str) -> Result<UsageReport, FetchError> {
    let usage: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    if !usage.is_object() {
        return Err(FetchError::Malformed(
            "usage response is not an object".to_string(),
        ));
    }

    let session_window = parse_window(&usage["five_hour"], UsageWindowSpan::Hours(5))
        .unwrap_or_else(|| UsageWindow::default().with_span(UsageWindowSpan::Hours(5)));
    let weekly_window = parse_window(&usage["seven_day"], UsageWindowSpan::Days(7));

    Ok(UsageReport {
        organization_id: organization_id.to_string(),
        session_window,
        weekly_window,
        fetched_at: chrono::Utc::now(),
    })
}

fn parse_window(value: &serde_json::Value, span: UsageWindowSpan) -> Option<UsageWindow> {
    if !value.is_object() {
        return None;
    }
    let utilization = value["utilization"].as_f64().unwrap_or(0.0);
    Some(UsageWindow::from_reported(
        utilization,
        value["resets_at"].as_str(),
        span,
    ))
}

#[cfg(test)]
#[path = "tests/api_client_tests.rs"]
mod tests;
