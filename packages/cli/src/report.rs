//! Plain-text rendering of an [`AnalysisResult`].

use std::io::{self, Write};

use estate_map_analytics_models::{AnalysisResult, BucketStat};
use estate_map_transaction_models::SizeCategory;

/// Writes the per-category trend tables and building ranking.
///
/// Categories with no deals anywhere in the parent area are skipped.
pub fn write_table<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    let coverage = &result.coverage;
    writeln!(out, "Sub-area: {}", result.sub_area)?;
    writeln!(
        out,
        "Records: {} input, {} in sub-area, {} under {}㎡, {} invalid price, {} outside window",
        coverage.input_records,
        coverage.sub_area_records,
        coverage.undersized,
        SizeCategory::MIN_AREA,
        coverage.invalid_price,
        coverage.out_of_window,
    )?;

    for &category in SizeCategory::all() {
        let parent = result.parent_area_trend.get(&category);
        if parent.is_none_or(|series| series.iter().all(BucketStat::is_empty)) {
            continue;
        }
        write_category(out, result, category)?;
    }

    Ok(())
}

fn write_category<W: Write>(
    out: &mut W,
    result: &AnalysisResult,
    category: SizeCategory,
) -> io::Result<()> {
    writeln!(out)?;
    match result.sub_area_premium(category) {
        Some(premium) => writeln!(out, "== {category} == (sub-area premium {premium:+.1}%)")?,
        None => writeln!(out, "== {category} ==")?,
    }

    writeln!(
        out,
        "{:<16} {:>14} {:>6} {:>14} {:>6}",
        "PERIOD", "SUB-AREA AVG", "N", "PARENT AVG", "N"
    )?;

    let empty = Vec::new();
    let sub = result.sub_area_trend.get(&category).unwrap_or(&empty);
    let parent = result.parent_area_trend.get(&category).unwrap_or(&empty);

    for (i, label) in result.periods.iter().enumerate() {
        let sub_stat = sub.get(i).copied().unwrap_or_default();
        let parent_stat = parent.get(i).copied().unwrap_or_default();
        writeln!(
            out,
            "{label:<16} {:>14} {:>6} {:>14} {:>6}",
            format_avg(&sub_stat),
            sub_stat.count,
            format_avg(&parent_stat),
            parent_stat.count
        )?;
    }

    let average = result
        .sub_area_category_averages
        .get(&category)
        .copied()
        .unwrap_or_default();
    writeln!(out, "Sub-area average: {average:.0}")?;

    let ranking = result.buildings_in_category(category);
    if !ranking.is_empty() {
        writeln!(out, "Buildings:")?;
        for (rank, (name, summary)) in ranking.iter().enumerate() {
            writeln!(
                out,
                "  {:>3}. {name:<30} {:>14.0} ({} deals)",
                rank + 1,
                summary.avg,
                summary.count
            )?;
        }
    }

    Ok(())
}

fn format_avg(stat: &BucketStat) -> String {
    if stat.is_empty() {
        "-".to_string()
    } else {
        format!("{:.0}", stat.avg)
    }
}
