#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trend aggregation engine for real-estate transaction records.
//!
//! Takes the full batch of deals for a parent area (e.g. a district) and a
//! target sub-area (e.g. a neighborhood inside it) and produces the
//! bucketed series that drive the comparison charts:
//!
//! * twelve trimester buckets covering the last 36 months,
//! * per-building, per-size-category totals with bucketed history,
//! * sub-area and parent-area trend series per size category,
//! * weighted sub-area averages per size category.
//!
//! The engine is a pure function of its input and a reference month. It
//! never fails: empty buckets resolve to a zero average.

pub mod aggregate;
pub mod periods;

pub use aggregate::{analyze, analyze_at};
pub use periods::{bucket_index, build_periods, period_label};
