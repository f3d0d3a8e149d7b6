#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Transaction data sources: definitions, fetching, and normalization.
//!
//! Each government transaction API is described by a TOML
//! [`SourceDefinition`](source_def::SourceDefinition). A single generic
//! fetcher walks every deal month of the lookback window, pages through
//! the API, and normalizes raw rows into
//! [`TransactionRecord`](estate_map_transaction_models::TransactionRecord)
//! values. Rows that cannot be normalized are dropped here, so the
//! aggregation engine only ever sees well-formed records.

pub mod fetch;
pub mod file;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod source_def;

use estate_map_transaction_models::YearMonth;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing failed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source definition could not be parsed.
    #[error("Invalid source definition: {0}")]
    Toml(#[from] toml::de::Error),

    /// Missing or invalid configuration (unknown source, missing API key).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// The API answered with a non-success result code.
    #[error("API error {code}: {message}")]
    Api {
        /// Result code reported by the API.
        code: String,
        /// Result message reported by the API.
        message: String,
    },

    /// Response could not be interpreted.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },
}

/// What to fetch from a source.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Parent area code sent to the API (e.g. a 5-digit district code).
    pub area_code: String,
    /// Newest deal month to fetch.
    pub reference: YearMonth,
    /// Number of deal months to fetch, counting back from `reference`.
    pub months: usize,
}
