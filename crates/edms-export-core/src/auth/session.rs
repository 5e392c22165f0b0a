use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the cookie the survey site issues on login.
pub const SESSION_COOKIE_NAME: &str = ".SharedCookie";

/// A session cookie in `Cookie` header form (`name=value`).
///
/// The server decides when the cookie stops working; the only signal the
/// client ever gets is a 403 from the export endpoint. `obtained_at` is kept
/// for diagnostics and is never used to guess at expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    cookie: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    obtained_at: Option<DateTime<Utc>>,
}

impl SessionToken {
    /// Build a token from a cookie name and value, stamped with the current time
    pub fn from_cookie(name: &str, value: &str) -> Self {
        Self {
            cookie: format!("{}={}", name, value),
            obtained_at: Some(Utc::now()),
        }
    }

    /// Wrap a stored `name=value` string as-is
    pub fn from_header_value(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            obtained_at: None,
        }
    }

    /// Value to send in the `Cookie` request header
    pub fn header_value(&self) -> &str {
        &self.cookie
    }

    pub fn obtained_at(&self) -> Option<DateTime<Utc>> {
        self.obtained_at
    }

    /// Minutes since the token was issued, if known (for log output)
    pub fn age_minutes(&self) -> Option<i64> {
        self.obtained_at
            .map(|t| (Utc::now() - t).num_minutes().max(0))
    }
}

// Cookie values are credentials; keep them out of debug logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.cookie.split('=').next().unwrap_or_default();
        f.debug_struct("SessionToken")
            .field("cookie", &format_args!("{}=<redacted>", name))
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cookie_formats_header_value() {
        let token = SessionToken::from_cookie(SESSION_COOKIE_NAME, "xyz");
        assert_eq!(token.header_value(), ".SharedCookie=xyz");
        assert!(token.obtained_at().is_some());
        assert_eq!(token.age_minutes(), Some(0));
    }

    #[test]
    fn test_from_header_value_keeps_string() {
        let token = SessionToken::from_header_value(".SharedCookie=abc");
        assert_eq!(token.header_value(), ".SharedCookie=abc");
        assert!(token.obtained_at().is_none());
        assert!(token.age_minutes().is_none());
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = SessionToken::from_cookie(SESSION_COOKIE_NAME, "secret-value");
        let debug = format!("{:?}", token);
        assert!(debug.contains(".SharedCookie=<redacted>"));
        assert!(!debug.contains("secret-value"));
    }

    #[test]
    fn test_serde_round_trip_without_timestamp() {
        let json = r#"{"cookie": ".SharedCookie=abc"}"#;
        let token: SessionToken = serde_json::from_str(json).expect("parse token");
        assert_eq!(token, SessionToken::from_header_value(".SharedCookie=abc"));

        let out = serde_json::to_string(&token).expect("serialize token");
        assert_eq!(out, r#"{"cookie":".SharedCookie=abc"}"#);
    }
}
