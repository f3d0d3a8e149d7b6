//! Single-pass aggregation of transaction records into trend series.
//!
//! Records are folded into an [`Accumulator`] owned by one call, which is
//! then frozen into an [`AnalysisResult`]. Each categorized record can feed
//! three outputs at once: the parent-area trend, the sub-area trend, and
//! its building's per-category totals and history.

use std::collections::BTreeMap;

use estate_map_analytics_models::{
    AnalysisResult, BUCKET_COUNT, BucketStat, BuildingSummary, CategorySummary, Coverage,
    TimeBucket, TrendSeries, rounded_average,
};
use estate_map_transaction_models::{SizeCategory, TransactionRecord, YearMonth};

use crate::periods::{bucket_index, build_periods};

/// Running sum and count for one cell of the output.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    total: f64,
    count: u64,
}

impl Tally {
    fn add(&mut self, price: f64) {
        self.total += price;
        self.count += 1;
    }

    fn merge(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            count: self.count + other.count,
        }
    }

    fn into_stat(self) -> BucketStat {
        BucketStat::from_totals(self.total, self.count)
    }
}

type BucketTallies = [Tally; BUCKET_COUNT];

/// A building's tallies for one size category.
#[derive(Debug, Default)]
struct BuildingTally {
    overall: Tally,
    history: BucketTallies,
}

struct Accumulator<'a> {
    buckets: &'a [TimeBucket],
    sub_area: &'a str,
    parent_area: BTreeMap<SizeCategory, BucketTallies>,
    sub_area_trend: BTreeMap<SizeCategory, BucketTallies>,
    buildings: BTreeMap<&'a str, BTreeMap<SizeCategory, BuildingTally>>,
    coverage: Coverage,
}

impl<'a> Accumulator<'a> {
    fn new(buckets: &'a [TimeBucket], sub_area: &'a str) -> Self {
        let empty = || {
            SizeCategory::all()
                .iter()
                .map(|&cat| (cat, BucketTallies::default()))
                .collect::<BTreeMap<_, _>>()
        };

        Self {
            buckets,
            sub_area,
            parent_area: empty(),
            sub_area_trend: empty(),
            buildings: BTreeMap::new(),
            coverage: Coverage::default(),
        }
    }

    fn absorb(mut self, record: &'a TransactionRecord) -> Self {
        self.coverage.input_records += 1;

        let Some(category) = record.size_category() else {
            self.coverage.undersized += 1;
            return self;
        };

        if !record.price.is_finite() {
            log::debug!(
                "Skipping '{}' deal with non-numeric price {}",
                record.building_name,
                record.price
            );
            self.coverage.invalid_price += 1;
            return self;
        }

        let bucket = record
            .deal_date()
            .and_then(|month| bucket_index(self.buckets, month));

        if bucket.is_none() {
            self.coverage.out_of_window += 1;
        }

        if let Some(idx) = bucket {
            self.parent_area.entry(category).or_default()[idx].add(record.price);
        }

        if record.sub_area_name != self.sub_area {
            return self;
        }

        self.coverage.sub_area_records += 1;

        if let Some(idx) = bucket {
            self.sub_area_trend.entry(category).or_default()[idx].add(record.price);
        }

        let building = self
            .buildings
            .entry(record.building_name.as_str())
            .or_default()
            .entry(category)
            .or_default();
        building.overall.add(record.price);
        if let Some(idx) = bucket {
            building.history[idx].add(record.price);
        }

        self
    }

    fn finish(self) -> AnalysisResult {
        let series = |tallies: BTreeMap<SizeCategory, BucketTallies>| -> TrendSeries {
            tallies
                .into_iter()
                .map(|(cat, cells)| (cat, cells.into_iter().map(Tally::into_stat).collect()))
                .collect()
        };

        // Weighted over raw building totals, never over per-building averages.
        let sub_area_category_averages = SizeCategory::all()
            .iter()
            .map(|&cat| {
                let sum = self
                    .buildings
                    .values()
                    .filter_map(|categories| categories.get(&cat))
                    .fold(Tally::default(), |acc, b| acc.merge(b.overall));
                (cat, rounded_average(sum.total, sum.count))
            })
            .collect();

        let buildings = self
            .buildings
            .into_iter()
            .map(|(name, categories)| BuildingSummary {
                name: name.to_string(),
                categories: categories
                    .into_iter()
                    .map(|(cat, tally)| {
                        let overall = tally.overall.into_stat();
                        (
                            cat,
                            CategorySummary {
                                total_amount: overall.total_amount,
                                count: overall.count,
                                avg: overall.avg,
                                history: tally.history.into_iter().map(Tally::into_stat).collect(),
                            },
                        )
                    })
                    .collect(),
            })
            .collect();

        AnalysisResult {
            sub_area: self.sub_area.to_string(),
            periods: self.buckets.iter().map(|b| b.label.clone()).collect(),
            buildings,
            sub_area_trend: series(self.sub_area_trend),
            parent_area_trend: series(self.parent_area),
            sub_area_category_averages,
            coverage: self.coverage,
        }
    }
}

/// Aggregates `records` for `sub_area`, bucketing against the current
/// local month.
#[must_use]
pub fn analyze(records: &[TransactionRecord], sub_area: &str) -> AnalysisResult {
    analyze_at(records, sub_area, YearMonth::current())
}

/// Aggregates `records` for `sub_area` with the bucket window ending at
/// `reference`.
///
/// Records in other sub-areas only feed the parent-area trend. Records
/// whose area has no size category are ignored entirely. Deals outside the
/// bucket window still count toward building totals and the sub-area
/// category averages.
#[must_use]
pub fn analyze_at(
    records: &[TransactionRecord],
    sub_area: &str,
    reference: YearMonth,
) -> AnalysisResult {
    let buckets = build_periods(reference);

    let result = records
        .iter()
        .fold(Accumulator::new(&buckets, sub_area), Accumulator::absorb)
        .finish();

    let coverage = &result.coverage;
    log::debug!(
        "Analyzed {} records for '{sub_area}' (window ending {reference}): \
         {} buildings, {} in sub-area, {} undersized, {} invalid price, {} outside window",
        coverage.input_records,
        result.buildings.len(),
        coverage.sub_area_records,
        coverage.undersized,
        coverage.invalid_price,
        coverage.out_of_window,
    );

    result
}
