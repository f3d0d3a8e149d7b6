//! Reading and writing transaction records on disk.
//!
//! `fetch` writes normalized records as pretty JSON; `analyze` reads them
//! back. Raw exports are accepted too: a JSON array of API rows or a CSV
//! file with a header row, normalized through a [`FieldMapping`].

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use estate_map_transaction_models::TransactionRecord;
use serde_json::Value;

use crate::SourceError;
use crate::source_def::{FieldMapping, normalize_records};

/// Supported on-disk formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.json`: an array of record objects.
    Json,
    /// `.csv`: one record per row, header row required.
    Csv,
}

impl FileFormat {
    /// Picks the format from the path's extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(SourceError::Config {
                message: format!(
                    "Unsupported file type: {} (expected .json or .csv)",
                    path.display()
                ),
            }),
        }
    }
}

/// Loads raw record objects from a JSON or CSV file without normalizing
/// them.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or parsed, or if a
/// JSON file does not hold an array.
pub fn load_raw_records(path: &Path) -> Result<Vec<Value>, SourceError> {
    match FileFormat::from_path(path)? {
        FileFormat::Json => {
            let reader = BufReader::new(File::open(path)?);
            match serde_json::from_reader(reader)? {
                Value::Array(items) => Ok(items),
                _ => Err(SourceError::Normalization {
                    message: format!("{} does not contain a JSON array", path.display()),
                }),
            }
        }
        FileFormat::Csv => read_csv_rows(path),
    }
}

fn read_csv_rows(path: &Path) -> Result<Vec<Value>, SourceError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let map: serde_json::Map<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = record.get(i).unwrap_or("").trim().to_owned();
                (header.clone(), Value::String(cell))
            })
            .collect();
        rows.push(Value::Object(map));
    }

    Ok(rows)
}

/// Loads and normalizes transaction records from a JSON or CSV file.
/// Rows that cannot be normalized are dropped.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or parsed.
pub fn load_records(
    path: &Path,
    fields: &FieldMapping,
) -> Result<Vec<TransactionRecord>, SourceError> {
    let raw = load_raw_records(path)?;
    let records = normalize_records(&raw, fields);
    log::info!(
        "Loaded {} of {} records from {}",
        records.len(),
        raw.len(),
        path.display()
    );
    Ok(records)
}

/// Writes normalized records to a JSON or CSV file, replacing it.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be created or written.
pub fn save_records(path: &Path, records: &[TransactionRecord]) -> Result<(), SourceError> {
    match FileFormat::from_path(path)? {
        FileFormat::Json => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, records)?;
        }
        FileFormat::Csv => {
            let mut writer = csv::Writer::from_path(path)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
    }

    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("estate_map_{}_{name}", std::process::id()))
    }

    fn sample() -> Vec<TransactionRecord> {
        vec![
            TransactionRecord {
                building_name: "Eunma".to_string(),
                sub_area_name: "Daechi-dong".to_string(),
                deal_year: 2024,
                deal_month: 3,
                price: 215_000.0,
                exclusive_area: 76.79,
            },
            TransactionRecord {
                building_name: "Raemian, Blesstige".to_string(),
                sub_area_name: "Gaepo-dong".to_string(),
                deal_year: 2023,
                deal_month: 12,
                price: 310_000.0,
                exclusive_area: 84.9,
            },
        ]
    }

    #[test]
    fn picks_format_from_extension() {
        assert_eq!(
            FileFormat::from_path(Path::new("a/deals.JSON")).unwrap(),
            FileFormat::Json
        );
        assert_eq!(
            FileFormat::from_path(Path::new("deals.csv")).unwrap(),
            FileFormat::Csv
        );
        assert!(FileFormat::from_path(Path::new("deals.xlsx")).is_err());
        assert!(FileFormat::from_path(Path::new("deals")).is_err());
    }

    #[test]
    fn json_file_reloads_with_canonical_mapping() {
        let path = temp_path("reload.json");
        save_records(&path, &sample()).unwrap();
        let loaded = load_records(&path, &FieldMapping::canonical()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn csv_file_reloads_with_canonical_mapping() {
        let path = temp_path("reload.csv");
        save_records(&path, &sample()).unwrap();
        let loaded = load_records(&path, &FieldMapping::canonical()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn raw_csv_export_is_normalized_through_source_fields() {
        let path = temp_path("raw.csv");
        std::fs::write(
            &path,
            "aptNm,umdNm,dealYear,dealMonth,dealAmount,excluUseAr\n\
             Eunma,Daechi-dong,2024,3,\"215,000\",76.79\n\
             ,Daechi-dong,2024,3,\"99,000\",59.9\n",
        )
        .unwrap();
        let fields = crate::registry::find_source("molit_apt_trade")
            .unwrap()
            .fields;
        let loaded = load_records(&path, &fields).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], sample()[0]);
    }

    #[test]
    fn json_object_is_rejected() {
        let path = temp_path("object.json");
        std::fs::write(&path, r#"{"buildingName": "A"}"#).unwrap();
        let result = load_raw_records(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(SourceError::Normalization { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_raw_records(&temp_path("does_not_exist.json"));
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
