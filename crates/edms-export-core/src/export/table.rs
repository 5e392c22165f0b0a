use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use tempfile::NamedTempFile;

use crate::api::ApiError;

/// A query result as delivered by the export endpoint: one header row and
/// the data rows in server order. Cells are kept as raw strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl ExportTable {
    /// Parse a CSV payload. The first record is the header row and every data
    /// row must have the same number of fields.
    pub fn from_csv(payload: &str) -> Result<Self, ApiError> {
        if payload.trim().is_empty() {
            return Err(ApiError::InvalidResponse(
                "export returned an empty payload".to_string(),
            ));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(payload.as_bytes());

        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self { headers, rows })
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Write the table to `path`, replacing any existing file.
    /// Only the server's columns are written; no row index is added.
    ///
    /// Rows go to a temp file next to `path` which is renamed over it once
    /// complete, so a failed write leaves any previous export intact.
    pub fn write_to(&self, path: &Path) -> Result<(), ApiError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ApiError::io(path, e))?;

        {
            let mut writer = WriterBuilder::new()
                .terminator(Terminator::Any(b'\n'))
                .from_writer(tmp.as_file_mut());

            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush().map_err(|e| ApiError::io(path, e))?;
        }

        tmp.persist(path).map_err(|e| ApiError::io(path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_payload() {
        let table = ExportTable::from_csv("a,b\n1,2\n").expect("parse");
        assert_eq!(table.headers.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows[0].iter().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn test_header_only_payload_has_no_rows() {
        let table = ExportTable::from_csv("id,name\n").expect("parse");
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        let err = ExportTable::from_csv("  \n").unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = ExportTable::from_csv("a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, ApiError::Csv(_)));
    }

    #[test]
    fn test_write_preserves_order_and_quoting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.csv");

        let payload = "name,note,score\n\"Smith, J\",\"said \"\"hi\"\"\",10\nLee,,7\n";
        let table = ExportTable::from_csv(payload).expect("parse");
        table.write_to(&path).expect("write");

        let written = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(written, payload);
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old,content\nthat,is,longer\n").expect("seed file");

        let table = ExportTable::from_csv("a,b\n1,2\n").expect("parse");
        table.write_to(&path).expect("write");

        assert_eq!(std::fs::read_to_string(&path).expect("read back"), "a,b\n1,2\n");
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.csv");

        let table = ExportTable::from_csv("a,b\n1,2\n").expect("parse");
        table.write_to(&path).expect("write");

        assert_eq!(entries(dir.path()), vec!["out.csv"]);
    }

    #[test]
    fn test_failed_replace_keeps_existing_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A non-empty directory at the destination cannot be replaced by a file
        let path = dir.path().join("out.csv");
        std::fs::create_dir(&path).expect("create dir");
        std::fs::write(path.join("keep.txt"), "previous").expect("seed file");

        let table = ExportTable::from_csv("a,b\n1,2\n").expect("parse");
        match table.write_to(&path) {
            Err(ApiError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Io error, got {:?}", other),
        }

        assert_eq!(entries(dir.path()), vec!["out.csv"]);
        assert_eq!(
            std::fs::read_to_string(path.join("keep.txt")).expect("read back"),
            "previous"
        );
    }

    #[test]
    fn test_write_to_missing_directory_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("out.csv");

        let table = ExportTable::from_csv("a\n1\n").expect("parse");
        match table.write_to(&path) {
            Err(ApiError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Io error, got {:?}", other),
        }
    }
}
