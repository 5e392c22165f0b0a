//! Core library for edms-export.
//!
//! Logs in to the ASEE survey site, exports stored EDMS report queries as
//! CSV, and refreshes the session cookie once when the server rejects it.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use edms_export_core::{run_export, ApiClient, ConfigFile, Credentials, ExportRequest, QuerySpec};
//!
//! let mut config = ConfigFile::open_default()?;
//! let credentials = Credentials::new("user@example.org", "secret");
//! let request = ExportRequest {
//!     query: QuerySpec::new("model-id", "query-id")?,
//!     destination: "report.csv".into(),
//! };
//! let cached = config.config.session.clone();
//! let client = ApiClient::with_endpoints(config.config.endpoints(), config.config.request_timeout())?;
//! let outcome = run_export(&client, &credentials, cached.as_ref(), &request, &mut config).await?;
//! println!("{} rows written", outcome.summary.rows);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod export;

pub use api::{ApiClient, ApiError, Endpoints};
pub use auth::{CredentialStore, Credentials, SessionToken, SESSION_COOKIE_NAME};
pub use config::{Config, ConfigFile};
pub use export::{
    run_export, ExportOutcome, ExportRequest, ExportSummary, ExportTable, QuerySpec, TokenStore,
};
