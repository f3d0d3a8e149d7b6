//! Config-driven transaction source definition.
//!
//! [`SourceDefinition`] captures everything unique about a transaction API
//! in a TOML file: how to page through it and which raw fields map onto
//! [`TransactionRecord`]. Normalization also lives here, because it is the
//! boundary where malformed rows are dropped.

use std::collections::BTreeMap;

use estate_map_transaction_models::{TransactionRecord, YearMonth};
use serde::Deserialize;
use serde_json::Value;

use crate::SourceError;
use crate::parsing::{parse_integer, parse_number, parse_text};

// ── Top-level source definition ──────────────────────────────────────────

/// A complete, config-driven transaction source definition.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"molit_apt_trade"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// How to fetch raw records from the API.
    pub fetcher: FetcherConfig,
    /// Raw field names for normalization.
    pub fields: FieldMapping,
}

/// Parses a source definition from TOML text.
///
/// # Errors
///
/// Returns [`SourceError::Toml`] if the text is not a valid definition.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, SourceError> {
    Ok(toml::from_str(toml_str)?)
}

// ── Fetcher config ───────────────────────────────────────────────────────

/// Paginated, month-keyed API description.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Endpoint URL.
    pub api_url: String,
    /// Query parameter carrying the parent area code.
    pub area_param: String,
    /// Query parameter carrying the deal month (`YYYYMM`).
    pub month_param: String,
    /// Query parameter carrying the 1-based page number.
    pub page_param: String,
    /// Query parameter carrying the page size.
    pub size_param: String,
    /// Records per page.
    pub page_size: u64,
    /// Maximum number of deal months fetched concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Environment variable holding the API service key.
    pub service_key_env: String,
    /// Query parameter carrying the service key.
    pub service_key_param: String,
    /// Dot-path to the records in the response body.
    pub records_path: String,
    /// Dot-path to the total record count for the month.
    pub total_count_path: String,
    /// Dot-path to the API result code, if the API reports one.
    pub result_code_path: Option<String>,
    /// Dot-path to the API result message.
    pub result_message_path: Option<String>,
    /// Result codes that mean success.
    #[serde(default)]
    pub success_codes: Vec<String>,
    /// Fixed query parameters added to every request.
    #[serde(default)]
    pub extra_params: BTreeMap<String, String>,
}

const fn default_concurrency() -> usize {
    4
}

// ── Field mapping ────────────────────────────────────────────────────────

/// Maps raw record field names to [`TransactionRecord`] fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldMapping {
    /// Building or complex name field.
    pub building_name: String,
    /// Sub-area (neighborhood) name field.
    pub sub_area_name: String,
    /// Deal year field.
    pub deal_year: String,
    /// Deal month field.
    pub deal_month: String,
    /// Price field.
    pub price: String,
    /// Exclusive area field.
    pub exclusive_area: String,
}

impl FieldMapping {
    /// Mapping for records already in the normalized camelCase layout,
    /// e.g. files written by `fetch`.
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            building_name: "buildingName".to_string(),
            sub_area_name: "subAreaName".to_string(),
            deal_year: "dealYear".to_string(),
            deal_month: "dealMonth".to_string(),
            price: "price".to_string(),
            exclusive_area: "exclusiveArea".to_string(),
        }
    }
}

// ── Normalization ────────────────────────────────────────────────────────

/// Normalizes one raw record, or returns the reason it was rejected.
///
/// # Errors
///
/// Returns a short description of the first missing or malformed field.
pub fn try_normalize_record(
    record: &Value,
    fields: &FieldMapping,
) -> Result<TransactionRecord, String> {
    let field = |name: &str| record.get(name).unwrap_or(&Value::Null);

    let building_name = parse_text(field(&fields.building_name))
        .ok_or_else(|| format!("missing building name '{}'", fields.building_name))?;
    let sub_area_name = parse_text(field(&fields.sub_area_name))
        .ok_or_else(|| format!("missing sub-area name '{}'", fields.sub_area_name))?;

    let deal_year = parse_integer(field(&fields.deal_year))
        .and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| format!("invalid deal year '{}'", fields.deal_year))?;
    let deal_month = parse_integer(field(&fields.deal_month))
        .and_then(|m| u32::try_from(m).ok())
        .ok_or_else(|| format!("invalid deal month '{}'", fields.deal_month))?;
    YearMonth::new(deal_year, deal_month).map_err(|e| e.to_string())?;

    let price = parse_number(field(&fields.price))
        .ok_or_else(|| format!("invalid price '{}'", fields.price))?;
    let exclusive_area = parse_number(field(&fields.exclusive_area))
        .ok_or_else(|| format!("invalid exclusive area '{}'", fields.exclusive_area))?;

    Ok(TransactionRecord {
        building_name,
        sub_area_name,
        deal_year,
        deal_month,
        price,
        exclusive_area,
    })
}

/// Normalizes one raw record. Returns `None` if any required field is
/// missing or malformed.
#[must_use]
pub fn normalize_record(record: &Value, fields: &FieldMapping) -> Option<TransactionRecord> {
    match try_normalize_record(record, fields) {
        Ok(normalized) => Some(normalized),
        Err(reason) => {
            log::debug!("Dropping record: {reason}");
            None
        }
    }
}

/// Normalizes a batch of raw records, dropping (and counting) the ones
/// that cannot be normalized.
#[must_use]
pub fn normalize_records(records: &[Value], fields: &FieldMapping) -> Vec<TransactionRecord> {
    let normalized: Vec<TransactionRecord> = records
        .iter()
        .filter_map(|record| normalize_record(record, fields))
        .collect();

    let dropped = records.len() - normalized.len();
    if dropped > 0 {
        log::warn!(
            "Dropped {dropped} of {} records with missing or malformed fields",
            records.len()
        );
    }

    normalized
}
