//! Export with a single re-authentication.
//!
//! The cached cookie is tried first. If the export endpoint rejects it, the
//! flow logs in once, hands the new cookie to the caller's `TokenStore`, and
//! retries the export once. Any further rejection is returned to the caller.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{Credentials, SessionToken};

use super::{ExportSummary, QuerySpec};

/// Somewhere to persist a refreshed session cookie for the next run.
pub trait TokenStore {
    fn store_token(&mut self, token: &SessionToken) -> anyhow::Result<()>;
}

/// One query to export and where to write it.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub query: QuerySpec,
    pub destination: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub summary: ExportSummary,
    /// Set when the flow had to log in; this is the cookie that succeeded.
    pub refreshed_token: Option<SessionToken>,
    /// Whether the `TokenStore` accepted `refreshed_token`. Always false when
    /// no login happened.
    pub persisted: bool,
}

/// Run an export, re-authenticating at most once.
///
/// With no cached token the flow logs in up front, which uses up the one
/// re-authentication. `QueryFailure` and transport errors are never retried.
pub async fn run_export<S>(
    client: &ApiClient,
    credentials: &Credentials,
    cached_token: Option<&SessionToken>,
    request: &ExportRequest,
    store: &mut S,
) -> Result<ExportOutcome, ApiError>
where
    S: TokenStore + ?Sized,
{
    let query = &request.query;

    if let Some(token) = cached_token {
        info!(
            model_id = query.model_id(),
            query_id = query.query_id(),
            "Exporting with cached session cookie"
        );
        match client.export(query, token, &request.destination).await {
            Ok(summary) => {
                return Ok(ExportOutcome {
                    summary,
                    refreshed_token: None,
                    persisted: false,
                })
            }
            Err(ApiError::AuthenticationFailure(reason)) => {
                warn!(%reason, "Cached session cookie rejected, re-authenticating");
            }
            Err(e) => return Err(e),
        }
    } else {
        info!("No cached session cookie, authenticating first");
    }

    let (token, persisted) = reauthenticate(client, credentials, store).await?;
    let summary = client.export(query, &token, &request.destination).await?;

    Ok(ExportOutcome {
        summary,
        refreshed_token: Some(token),
        persisted,
    })
}

/// Log in and hand the new cookie to the store. The flag says whether it was saved.
async fn reauthenticate<S>(
    client: &ApiClient,
    credentials: &Credentials,
    store: &mut S,
) -> Result<(SessionToken, bool), ApiError>
where
    S: TokenStore + ?Sized,
{
    let token = client.authenticate(credentials).await?;

    // The fresh cookie is still usable for this run even if it cannot be saved.
    let persisted = match store.store_token(&token) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Failed to persist refreshed session cookie");
            false
        }
    };

    Ok((token, persisted))
}
