//! Data types for remote usage fetching.

use crate::usage_reset::UsageWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One successful reading of the account's usage endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub organization_id: String,
    /// The five-hour rolling window the meter displays
    pub session_window: UsageWindow,
    /// The seven-day window, when the server reports one
    pub weekly_window: Option<UsageWindow>,
    pub fetched_at: DateTime<Utc>,
}

/// Why a fetch did not produce a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// HTTP 401: the session key is no longer accepted
    SessionExpired,
    /// HTTP 403, with the start of the response body for diagnosis
    Forbidden { snippet: String },
    /// Any other non-success status
    Http { status: u16 },
    /// The organizations list was empty or had no id
    NoOrganization,
    /// Transport failure (DNS, connect, timeout, TLS)
    Network(String),
    /// A response body that was not the expected JSON shape
    Malformed(String),
}

impl FetchError {
    /// True when the user has to log in again before fetching can succeed.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, FetchError::SessionExpired)
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::SessionExpired => write!(f, "Session expired (401)"),
            FetchError::Forbidden { .. } => write!(f, "Forbidden (403)"),
            FetchError::Http { status } => write!(f, "Unexpected HTTP status {}", status),
            FetchError::NoOrganization => write!(f, "No organization found for this session"),
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Malformed(msg) => write!(f, "Malformed response: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}
