//! CSV loading into typed `Table`s.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::pipeline::errors::PipelineError;
use crate::table::{Scalar, Table};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {table} CSV: {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("{table} CSV has no header row")]
    MissingHeader { table: String },

    #[error("Failed to open {table} CSV at {path}: {source}")]
    Io {
        table: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Shape(#[from] PipelineError),
}

/// Parses CSV bytes into a table named `table`.
///
/// Columns with an empty header (an exported dataframe index) are dropped.
/// Rows with a different number of fields than the header are rejected.
pub fn read_csv(table: &str, bytes: &[u8]) -> Result<Table, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let csv_err = |source| LoadError::Csv {
        table: table.to_string(),
        source,
    };

    let headers = reader.headers().map_err(csv_err)?.clone();
    if headers.is_empty() {
        return Err(LoadError::MissingHeader {
            table: table.to_string(),
        });
    }

    let kept: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (i, h.trim_start_matches('\u{feff}').to_string()))
        .filter(|(_, h)| !h.trim().is_empty())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(
            kept.iter()
                .map(|(i, _)| Scalar::infer(record.get(*i).unwrap_or("")))
                .collect(),
        );
    }

    let columns = kept.into_iter().map(|(_, h)| h).collect();
    debug!("Loaded {} rows from {} CSV", rows.len(), table);

    Ok(Table::new(table, columns, rows)?)
}

/// Reads and parses a CSV file from disk.
pub fn read_csv_file(table: &str, path: &Path) -> Result<Table, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        table: table.to_string(),
        path: path.display().to_string(),
        source,
    })?;
    read_csv(table, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_csv_infers_types() {
        let csv = "ARTICLECODE,TITLE,PRICE,STOCK\n101,Smart TV,4999.90,12\n";
        let table = read_csv("products", csv.as_bytes()).unwrap();

        assert_eq!(table.columns(), &["ARTICLECODE", "TITLE", "PRICE", "STOCK"]);
        let row = table.row(0).unwrap();
        assert_eq!(row.get("ARTICLECODE"), Some(&Scalar::Integer(101)));
        assert_eq!(row.get("TITLE"), Some(&Scalar::Text("Smart TV".into())));
        assert_eq!(row.get("PRICE"), Some(&Scalar::Decimal("4999.90".into())));
    }

    #[test]
    fn test_read_csv_drops_unnamed_index_column() {
        let csv = ",ARTICLECODE,GROUPNAME\n0,A1,TV\n1,A2,TV\n";
        let table = read_csv("example products", csv.as_bytes()).unwrap();

        assert_eq!(table.columns(), &["ARTICLECODE", "GROUPNAME"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_read_csv_empty_cells_are_null() {
        let csv = "ARTICLECODE,ATTRIBUTENAME,VALUE\nA1,COLOR,\n";
        let table = read_csv("attributes", csv.as_bytes()).unwrap();
        assert_eq!(table.row(0).unwrap().get("VALUE"), Some(&Scalar::Null));
    }

    #[test]
    fn test_read_csv_quoted_fields_keep_commas() {
        let csv = "ARTICLECODE,KEY_SELLING_POINTS\nA1,\"Bright, vivid, fast\"\n";
        let table = read_csv("products", csv.as_bytes()).unwrap();
        assert_eq!(
            table.row(0).unwrap().get("KEY_SELLING_POINTS"),
            Some(&Scalar::Text("Bright, vivid, fast".into()))
        );
    }

    #[test]
    fn test_read_csv_rejects_ragged_rows() {
        let csv = "ARTICLECODE,TITLE\nA1,Smart TV,extra\n";
        let err = read_csv("products", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
        assert!(err.to_string().contains("products"));
    }

    #[test]
    fn test_read_csv_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ARTICLECODE,ATTRIBUTENAME,VALUE").unwrap();
        writeln!(file, "A1,RESOLUTION,4K").unwrap();

        let table = read_csv_file("attributes", file.path()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_read_csv_file_missing_path() {
        let err = read_csv_file("attributes", Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
