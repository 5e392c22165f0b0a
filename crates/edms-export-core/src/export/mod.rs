//! Report export: query identifiers, the CSV table pass-through, and the
//! export-with-reauthentication flow.

pub mod flow;
pub mod table;

use std::path::PathBuf;

pub use flow::{run_export, ExportOutcome, ExportRequest, TokenStore};
pub use table::ExportTable;

use crate::api::ApiError;

/// Identifies a stored report query by its model and query ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    model_id: String,
    query_id: String,
}

impl QuerySpec {
    /// Ids are opaque; the only check is that neither is blank.
    pub fn new(model_id: impl Into<String>, query_id: impl Into<String>) -> Result<Self, ApiError> {
        let model_id = model_id.into().trim().to_string();
        let query_id = query_id.into().trim().to_string();

        if model_id.is_empty() {
            return Err(ApiError::InvalidQuery("model_id must not be empty".to_string()));
        }
        if query_id.is_empty() {
            return Err(ApiError::InvalidQuery("query_id must not be empty".to_string()));
        }

        Ok(Self { model_id, query_id })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }
}

/// What an export wrote to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub destination: PathBuf,
    pub columns: usize,
    pub rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_spec_trims_ids() {
        let query = QuerySpec::new("  m1 ", "q1\n").expect("valid query");
        assert_eq!(query.model_id(), "m1");
        assert_eq!(query.query_id(), "q1");
    }

    #[test]
    fn test_query_spec_rejects_blank_ids() {
        assert!(matches!(
            QuerySpec::new("", "q1"),
            Err(ApiError::InvalidQuery(_))
        ));
        assert!(matches!(
            QuerySpec::new("m1", "   "),
            Err(ApiError::InvalidQuery(_))
        ));
    }
}
