//! Session credentials used to authorize usage requests.

use crate::config::MeterConfig;
use crate::logging::mask_secret;

/// Name of the authentication cookie.
pub const SESSION_COOKIE: &str = "sessionKey";

#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub session_key: String,
    /// Every cookie captured with the key, as `name=value; name=value`
    pub cookie_string: Option<String>,
}

impl SessionCredentials {
    pub fn new(session_key: impl Into<String>, cookie_string: Option<String>) -> Self {
        Self {
            session_key: session_key.into(),
            cookie_string,
        }
    }

    /// Returns None when the config holds no usable session key.
    pub fn from_config(config: &MeterConfig) -> Option<Self> {
        if !config.has_session() {
            return None;
        }
        let key = config.session_key.as_deref()?.trim().to_string();
        let cookies = config
            .cookie_string
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);
        Some(Self::new(key, cookies))
    }

    /// Value for the `Cookie` request header. The full captured cookie
    /// string wins over the bare session key.
    pub fn cookie_header(&self) -> String {
        match self.cookie_string.as_deref() {
            Some(cookies) if !cookies.is_empty() => cookies.to_string(),
            _ => format!("{}={}", SESSION_COOKIE, self.session_key),
        }
    }

    /// Splits the cookie header into `(name, value)` pairs. Values may
    /// themselves contain `=`; fragments without one are skipped.
    pub fn cookie_pairs(&self) -> Vec<(String, String)> {
        self.cookie_header()
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    None
                } else {
                    Some((name.to_string(), value.trim().to_string()))
                }
            })
            .collect()
    }

    pub fn masked_key(&self) -> String {
        mask_secret(&self.session_key)
    }
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("session_key", &self.masked_key())
            .field("cookie_count", &self.cookie_pairs().len())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
