//! Source registry: every source definition, loaded from embedded TOML.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`].

use crate::SourceError;
use crate::source_def::{SourceDefinition, parse_source_toml};

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    (
        "molit_apt_trade",
        include_str!("../sources/molit_apt_trade.toml"),
    ),
    (
        "molit_rh_trade",
        include_str!("../sources/molit_rh_trade.toml"),
    ),
];

/// Identifier of the source used when none is given.
pub const DEFAULT_SOURCE_ID: &str = "molit_apt_trade";

/// Returns all configured source definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any embedded TOML config is malformed.
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up an embedded source definition by id.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if no source has that id.
pub fn find_source(id: &str) -> Result<SourceDefinition, SourceError> {
    all_sources()
        .into_iter()
        .find(|source| source.id == id)
        .ok_or_else(|| SourceError::Config {
            message: format!("Unknown source: {id}"),
        })
}
