#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types produced by the transaction trend engine.
//!
//! These are plain values consumed directly by the chart layer. All of them
//! serialize to camelCase JSON, and per-category maps use the size-category
//! labels (e.g. `"80-85㎡"`) as keys.

use std::collections::BTreeMap;

use estate_map_transaction_models::{SizeCategory, YearMonth};
use serde::{Deserialize, Serialize};

/// Number of time buckets in every trend series.
pub const BUCKET_COUNT: usize = 12;

/// Number of calendar months covered by each bucket.
pub const MONTHS_PER_BUCKET: i32 = 3;

/// A trend series per size category, one [`BucketStat`] per time bucket.
pub type TrendSeries = BTreeMap<SizeCategory, Vec<BucketStat>>;

/// A three-month aggregation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    /// First month of the window (inclusive).
    pub start: YearMonth,
    /// Last month of the window (inclusive).
    pub end: YearMonth,
    /// Display label, e.g. `"2024.01 ~ 03"`.
    pub label: String,
}

impl TimeBucket {
    /// Returns `true` if `month` lies within `[start, end]`.
    #[must_use]
    pub const fn contains(&self, month: YearMonth) -> bool {
        let abs = month.absolute();
        abs >= self.start.absolute() && abs <= self.end.absolute()
    }
}

/// Aggregate price statistics over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStat {
    /// Sum of prices.
    pub total_amount: f64,
    /// Number of transactions.
    pub count: u64,
    /// Rounded mean price, `0` when `count` is zero.
    pub avg: f64,
}

impl BucketStat {
    /// Builds a stat from accumulated totals, deriving the rounded average.
    #[must_use]
    pub fn from_totals(total_amount: f64, count: u64) -> Self {
        Self {
            total_amount,
            count,
            avg: rounded_average(total_amount, count),
        }
    }

    /// Returns `true` if no transaction contributed to this stat.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Returns `round(total / count)`, or `0` when `count` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rounded_average(total: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        (total / count as f64).round()
    }
}

/// One building's aggregate for a single size category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    /// Sum of all prices, including deals outside the bucket window.
    pub total_amount: f64,
    /// Number of deals, including deals outside the bucket window.
    pub count: u64,
    /// Rounded mean price.
    pub avg: f64,
    /// Per-bucket statistics, oldest first.
    pub history: Vec<BucketStat>,
}

/// Per-category summaries for one building in the target sub-area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingSummary {
    /// Building or complex name.
    pub name: String,
    /// Only categories with at least one deal are present.
    pub categories: BTreeMap<SizeCategory, CategorySummary>,
}

/// How the input records were distributed over the analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    /// Records handed to the engine.
    pub input_records: u64,
    /// Records dropped because their area has no size category.
    pub undersized: u64,
    /// Categorized records skipped because their price is not a finite number.
    pub invalid_price: u64,
    /// Categorized records whose deal month falls in no bucket.
    pub out_of_window: u64,
    /// Categorized records located in the target sub-area.
    pub sub_area_records: u64,
}

/// Complete output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Sub-area the analysis focused on.
    pub sub_area: String,
    /// Bucket labels, oldest first.
    pub periods: Vec<String>,
    /// Buildings in the target sub-area, ordered by name.
    pub buildings: Vec<BuildingSummary>,
    /// Trend over target sub-area deals only.
    pub sub_area_trend: TrendSeries,
    /// Trend over every input deal.
    pub parent_area_trend: TrendSeries,
    /// Weighted average price per category across the sub-area's buildings.
    pub sub_area_category_averages: BTreeMap<SizeCategory, f64>,
    /// Record accounting.
    pub coverage: Coverage,
}

impl AnalysisResult {
    /// Returns the buildings that have deals in `category`, highest average
    /// price first (ties broken by name).
    #[must_use]
    pub fn buildings_in_category(&self, category: SizeCategory) -> Vec<(&str, &CategorySummary)> {
        let mut ranked: Vec<(&str, &CategorySummary)> = self
            .buildings
            .iter()
            .filter_map(|b| b.categories.get(&category).map(|s| (b.name.as_str(), s)))
            .collect();

        ranked.sort_by(|(a_name, a), (b_name, b)| {
            b.avg.total_cmp(&a.avg).then_with(|| a_name.cmp(b_name))
        });

        ranked
    }

    /// Percentage by which the sub-area's windowed average price exceeds
    /// the parent area's for `category`.
    ///
    /// Both averages are weighted over all buckets. Returns `None` when
    /// either side has no deals in the window.
    #[must_use]
    pub fn sub_area_premium(&self, category: SizeCategory) -> Option<f64> {
        let sub = windowed_average(self.sub_area_trend.get(&category)?)?;
        let parent = windowed_average(self.parent_area_trend.get(&category)?)?;
        if parent == 0.0 {
            return None;
        }
        Some((sub - parent) / parent * 100.0)
    }
}

fn windowed_average(series: &[BucketStat]) -> Option<f64> {
    let (total, count) = series
        .iter()
        .fold((0.0, 0_u64), |(total, count), s| (total + s.total_amount, count + s.count));
    (count > 0).then(|| rounded_average(total, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn empty_series() -> Vec<BucketStat> {
        vec![BucketStat::default(); BUCKET_COUNT]
    }

    fn result_with(buildings: Vec<BuildingSummary>) -> AnalysisResult {
        let trend: TrendSeries = SizeCategory::all()
            .iter()
            .map(|&cat| (cat, empty_series()))
            .collect();
        AnalysisResult {
            sub_area: "X".to_string(),
            periods: vec![String::new(); BUCKET_COUNT],
            buildings,
            sub_area_trend: trend.clone(),
            parent_area_trend: trend,
            sub_area_category_averages: BTreeMap::new(),
            coverage: Coverage::default(),
        }
    }

    fn building(name: &str, avg: f64) -> BuildingSummary {
        BuildingSummary {
            name: name.to_string(),
            categories: BTreeMap::from([(
                SizeCategory::From80To85,
                CategorySummary {
                    total_amount: avg,
                    count: 1,
                    avg,
                    history: empty_series(),
                },
            )]),
        }
    }

    #[test]
    fn zero_count_average_is_zero() {
        let stat = BucketStat::from_totals(0.0, 0);
        assert!(stat.is_empty());
        assert!(stat.avg.abs() < f64::EPSILON);
        assert!(!stat.avg.is_nan());
    }

    #[test]
    fn average_is_rounded() {
        assert!((rounded_average(100.0, 3) - 33.0).abs() < f64::EPSILON);
        assert!((rounded_average(200.0, 3) - 67.0).abs() < f64::EPSILON);
        assert!((BucketStat::from_totals(110_000.0, 2).avg - 55_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bucket_contains_is_inclusive_across_year_end() {
        let bucket = TimeBucket {
            start: ym(2023, 12),
            end: ym(2024, 2),
            label: "2023.12 ~ 02".to_string(),
        };
        assert!(bucket.contains(ym(2023, 12)));
        assert!(bucket.contains(ym(2024, 1)));
        assert!(bucket.contains(ym(2024, 2)));
        assert!(!bucket.contains(ym(2023, 11)));
        assert!(!bucket.contains(ym(2024, 3)));
    }

    #[test]
    fn ranks_buildings_by_average_then_name() {
        let result = result_with(vec![
            building("Acro", 100.0),
            building("Byuksan", 300.0),
            building("Centum", 300.0),
        ]);
        let names: Vec<&str> = result
            .buildings_in_category(SizeCategory::From80To85)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["Byuksan", "Centum", "Acro"]);
        assert!(result.buildings_in_category(SizeCategory::From130).is_empty());
    }

    #[test]
    fn premium_compares_windowed_averages() {
        let mut result = result_with(Vec::new());
        let cat = SizeCategory::From85To110;
        result.sub_area_trend.get_mut(&cat).unwrap()[0] = BucketStat::from_totals(240.0, 2);
        result.parent_area_trend.get_mut(&cat).unwrap()[0] = BucketStat::from_totals(300.0, 3);

        let premium = result.sub_area_premium(cat).unwrap();
        assert!((premium - 20.0).abs() < 1e-9);
        assert!(result.sub_area_premium(SizeCategory::From50To80).is_none());
    }

    #[test]
    fn serializes_category_keys_as_labels() {
        let result = result_with(Vec::new());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["subAreaTrend"]["80-85㎡"].is_array());
        assert_eq!(json["parentAreaTrend"]["130㎡+"].as_array().unwrap().len(), 12);
        assert_eq!(json["coverage"]["outOfWindow"], 0);
    }
}
