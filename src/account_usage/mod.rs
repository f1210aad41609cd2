//! Remote account usage.
//!
//! A session credential authorizes two GETs against the account's usage
//! endpoints; the poller repeats that on an interval and feeds the UI.

pub mod api_client;
pub mod poller;
pub mod session;
pub mod types;

pub use api_client::{ApiClient, UsageFetcher};
pub use poller::UsagePoller;
pub use session::SessionCredentials;
pub use types::{FetchError, UsageReport};
