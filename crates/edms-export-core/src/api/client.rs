//! API client for the ASEE survey login and EDMS report export endpoints.
//!
//! Login happens on the survey host, which hands back a `.SharedCookie`
//! session cookie. The report host accepts that cookie on export requests.

use std::path::Path;
use std::time::Duration;

use reqwest::{header, Client, Url};
use tracing::{debug, info, warn};

use crate::auth::{Credentials, SessionToken, SESSION_COOKIE_NAME};
use crate::export::{ExportSummary, ExportTable, QuerySpec};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint on the survey host
pub const DEFAULT_AUTH_URL: &str = "https://survey.asee.org/api/token";

/// Base URL of the report host serving query exports
pub const DEFAULT_EXPORT_BASE_URL: &str = "https://newedms.asee.org";

/// HTTP request timeout in seconds.
/// Large report exports can take a while to render server-side.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where the client sends login and export requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    pub export_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            export_base_url: DEFAULT_EXPORT_BASE_URL.to_string(),
        }
    }
}

/// API client for the survey and report hosts.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoints: Endpoints,
}

impl ApiClient {
    /// Create a client for the production endpoints
    pub fn new() -> Result<Self, ApiError> {
        Self::with_endpoints(Endpoints::default(), Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_endpoints(endpoints: Endpoints, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    /// Log in and return the session cookie.
    ///
    /// The server does not reliably signal bad credentials through the status
    /// code, so the presence of the session cookie is the only success check.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<SessionToken, ApiError> {
        debug!(username = %credentials.username, url = %self.endpoints.auth_url, "Requesting session cookie");

        let response = self
            .client
            .post(&self.endpoints.auth_url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let cookie_value = response
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE_NAME)
            .map(|c| c.value().to_string());

        match cookie_value {
            Some(value) if !value.is_empty() => {
                info!(%status, "Obtained new session cookie");
                Ok(SessionToken::from_cookie(SESSION_COOKIE_NAME, &value))
            }
            _ => {
                warn!(%status, username = %credentials.username, "Login response did not set the session cookie");
                Err(ApiError::AuthenticationFailure(format!(
                    "login response (status {}) did not set {}; check the username and password",
                    status, SESSION_COOKIE_NAME
                )))
            }
        }
    }

    /// Build `{base}/api/reports/models/{model}/queries/{query}/export/csv`.
    /// Ids are percent-encoded as single path segments.
    fn export_url(&self, query: &QuerySpec) -> Result<Url, ApiError> {
        let base = &self.endpoints.export_base_url;
        let mut url = Url::parse(base)
            .map_err(|e| ApiError::InvalidResponse(format!("bad export base URL {}: {}", base, e)))?;

        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ApiError::InvalidResponse(format!("export base URL {} cannot take a path", base))
            })?;
            segments.pop_if_empty().extend([
                "api",
                "reports",
                "models",
                query.model_id(),
                "queries",
                query.query_id(),
                "export",
                "csv",
            ]);
        }

        Ok(url)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(
        response: reqwest::Response,
        query: &QuerySpec,
    ) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body, query))
        }
    }

    /// Request the CSV export of a query and return the raw payload.
    pub async fn fetch_export_csv(
        &self,
        query: &QuerySpec,
        token: &SessionToken,
    ) -> Result<String, ApiError> {
        let url = self.export_url(query)?;

        // A cookie that cannot go in a header can never be accepted, so treat
        // it like one the server rejected.
        let cookie = header::HeaderValue::from_str(token.header_value()).map_err(|_| {
            ApiError::AuthenticationFailure(
                "stored session cookie is not a valid header value".to_string(),
            )
        })?;

        debug!(
            model_id = query.model_id(),
            query_id = query.query_id(),
            token_age_minutes = ?token.age_minutes(),
            "Requesting CSV export"
        );

        let response = self
            .client
            .post(url)
            .header(header::COOKIE, cookie)
            .send()
            .await?;

        let response = Self::check_response(response, query).await?;
        Ok(response.text().await?)
    }

    /// Export a query result to `destination`, replacing any existing file.
    ///
    /// Fails with `AuthenticationFailure` on a 403 and `QueryFailure` on any
    /// other non-2xx status. Nothing is retried here.
    pub async fn export(
        &self,
        query: &QuerySpec,
        token: &SessionToken,
        destination: &Path,
    ) -> Result<ExportSummary, ApiError> {
        let payload = self.fetch_export_csv(query, token).await?;
        let table = ExportTable::from_csv(&payload)?;
        table.write_to(destination)?;

        info!(
            model_id = query.model_id(),
            query_id = query.query_id(),
            rows = table.row_count(),
            columns = table.column_count(),
            destination = %destination.display(),
            "Export written"
        );

        Ok(ExportSummary {
            destination: destination.to_path_buf(),
            columns: table.column_count(),
            rows: table.row_count(),
        })
    }
}
