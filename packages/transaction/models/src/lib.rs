#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Real-estate transaction records and the fixed size-category taxonomy.
//!
//! Every data source normalizes its raw rows into [`TransactionRecord`]
//! values. Comparable units are grouped by exclusive floor area into the
//! five [`SizeCategory`] bands, and deal dates are handled at calendar
//! month granularity through [`YearMonth`].

use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Exclusive floor-area band used to group comparable transactions.
///
/// Bands are half-open `[low, high)` except the top band, which is
/// unbounded. Areas below [`SizeCategory::MIN_AREA`] belong to no band.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum SizeCategory {
    /// `[50, 80)` m²
    #[serde(rename = "50-80㎡")]
    #[strum(serialize = "50-80㎡")]
    From50To80,
    /// `[80, 85)` m²
    #[serde(rename = "80-85㎡")]
    #[strum(serialize = "80-85㎡")]
    From80To85,
    /// `[85, 110)` m²
    #[serde(rename = "85-110㎡")]
    #[strum(serialize = "85-110㎡")]
    From85To110,
    /// `[110, 130)` m²
    #[serde(rename = "110-130㎡")]
    #[strum(serialize = "110-130㎡")]
    From110To130,
    /// 130 m² and above
    #[serde(rename = "130㎡+")]
    #[strum(serialize = "130㎡+")]
    From130,
}

impl SizeCategory {
    /// Smallest exclusive area that belongs to any category.
    pub const MIN_AREA: f64 = 50.0;

    /// Maps an exclusive area to its category.
    ///
    /// Returns `None` for areas below [`Self::MIN_AREA`] and for
    /// non-finite values.
    #[must_use]
    pub fn from_area(area: f64) -> Option<Self> {
        if !area.is_finite() || area < Self::MIN_AREA {
            return None;
        }

        Some(if area < 80.0 {
            Self::From50To80
        } else if area < 85.0 {
            Self::From80To85
        } else if area < 110.0 {
            Self::From85To110
        } else if area < 130.0 {
            Self::From110To130
        } else {
            Self::From130
        })
    }

    /// Returns the inclusive lower and exclusive upper bound of the band.
    /// The upper bound is `None` for the top band.
    #[must_use]
    pub const fn bounds(self) -> (f64, Option<f64>) {
        match self {
            Self::From50To80 => (50.0, Some(80.0)),
            Self::From80To85 => (80.0, Some(85.0)),
            Self::From85To110 => (85.0, Some(110.0)),
            Self::From110To130 => (110.0, Some(130.0)),
            Self::From130 => (130.0, None),
        }
    }

    /// Returns `true` if `area` falls inside this band.
    #[must_use]
    pub fn contains(self, area: f64) -> bool {
        let (low, high) = self.bounds();
        area.is_finite() && area >= low && high.is_none_or(|high| area < high)
    }

    /// Returns all variants in ascending area order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::From50To80,
            Self::From80To85,
            Self::From85To110,
            Self::From110To130,
            Self::From130,
        ]
    }
}

/// A calendar month, the finest date granularity of deal records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawYearMonth")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct RawYearMonth {
    year: i32,
    month: u32,
}

impl TryFrom<RawYearMonth> for YearMonth {
    type Error = YearMonthError;

    fn try_from(raw: RawYearMonth) -> Result<Self, Self::Error> {
        Self::new(raw.year, raw.month)
    }
}

impl YearMonth {
    /// Earliest representable year.
    pub const MIN_YEAR: i32 = 1;
    /// Latest representable year.
    pub const MAX_YEAR: i32 = 9999;

    /// Earliest representable month.
    pub const MIN: Self = Self {
        year: Self::MIN_YEAR,
        month: 1,
    };
    /// Latest representable month.
    pub const MAX: Self = Self {
        year: Self::MAX_YEAR,
        month: 12,
    };

    /// Creates a year-month.
    ///
    /// # Errors
    ///
    /// Returns [`YearMonthError::Year`] if `year` is outside
    /// [`MIN_YEAR`](Self::MIN_YEAR)`..=`[`MAX_YEAR`](Self::MAX_YEAR), or
    /// [`YearMonthError::Month`] if `month` is not in `1..=12`.
    pub const fn new(year: i32, month: u32) -> Result<Self, YearMonthError> {
        if year < Self::MIN_YEAR || year > Self::MAX_YEAR {
            return Err(YearMonthError::Year { year });
        }
        if month < 1 || month > 12 {
            return Err(YearMonthError::Month { month });
        }
        Ok(Self { year, month })
    }

    /// Returns the month containing `date`, clamped to
    /// [`MIN`](Self::MIN)`..=`[`MAX`](Self::MAX).
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn from_date<D: Datelike>(date: &D) -> Self {
        Self::from_absolute(
            date.year()
                .saturating_mul(12)
                .saturating_add(date.month() as i32),
        )
    }

    /// Returns the current month on the local clock.
    #[must_use]
    pub fn current() -> Self {
        Self::from_date(&chrono::Local::now().date_naive())
    }

    /// Rebuilds a year-month from an [`absolute`](Self::absolute) month
    /// count. Counts outside the representable range saturate at
    /// [`MIN`](Self::MIN) or [`MAX`](Self::MAX).
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn from_absolute(absolute: i32) -> Self {
        if absolute <= Self::MIN.absolute() {
            return Self::MIN;
        }
        if absolute >= Self::MAX.absolute() {
            return Self::MAX;
        }
        let zero_based = absolute - 1;
        Self {
            year: zero_based.div_euclid(12),
            month: zero_based.rem_euclid(12) as u32 + 1,
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Month of the year, `1..=12`.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// Absolute month count, `year * 12 + month`. Consecutive months
    /// differ by exactly one. Bounded years keep this well inside `i32`.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn absolute(self) -> i32 {
        self.year * 12 + self.month as i32
    }

    /// Shifts by `delta` months (negative moves into the past), saturating
    /// at [`MIN`](Self::MIN) and [`MAX`](Self::MAX).
    #[must_use]
    pub const fn add_months(self, delta: i32) -> Self {
        Self::from_absolute(self.absolute().saturating_add(delta))
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = YearMonthError;

    /// Parses `YYYY-MM`, `YYYY.MM`, `YYYY/MM` or `YYYYMM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let format_err = || YearMonthError::Format {
            input: s.to_string(),
        };

        let (year, month) = match s.find(['-', '.', '/']) {
            Some(idx) => (&s[..idx], &s[idx + 1..]),
            None if s.len() == 6 && s.is_char_boundary(4) => s.split_at(4),
            None => return Err(format_err()),
        };

        let year = year.parse::<i32>().map_err(|_| format_err())?;
        let month = month.parse::<u32>().map_err(|_| format_err())?;

        Self::new(year, month)
    }
}

/// Error returned when a [`YearMonth`] cannot be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearMonthError {
    /// Year outside `YearMonth::MIN_YEAR..=YearMonth::MAX_YEAR`.
    Year {
        /// The invalid year value that was provided.
        year: i32,
    },
    /// Month outside `1..=12`.
    Month {
        /// The invalid month value that was provided.
        month: u32,
    },
    /// Text that is not a recognizable year-month.
    Format {
        /// The rejected input.
        input: String,
    },
}

impl std::fmt::Display for YearMonthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Year { year } => write!(
                f,
                "invalid year {year}: expected {}-{}",
                YearMonth::MIN_YEAR,
                YearMonth::MAX_YEAR
            ),
            Self::Month { month } => write!(f, "invalid month {month}: expected 1-12"),
            Self::Format { input } => {
                write!(f, "invalid year-month '{input}': expected YYYY-MM or YYYYMM")
            }
        }
    }
}

impl std::error::Error for YearMonthError {}

/// One real-estate sale, as delivered by the fetch layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Building or complex name.
    pub building_name: String,
    /// Neighborhood / sub-district the building is in.
    pub sub_area_name: String,
    /// Deal year.
    pub deal_year: i32,
    /// Deal month (1-12).
    pub deal_month: u32,
    /// Sale price in the source's currency unit, carried unmodified.
    pub price: f64,
    /// Exclusive floor area in m².
    pub exclusive_area: f64,
}

impl TransactionRecord {
    /// Returns the size category of this record, or `None` if the unit is
    /// too small (or its area is not a number).
    #[must_use]
    pub fn size_category(&self) -> Option<SizeCategory> {
        SizeCategory::from_area(self.exclusive_area)
    }

    /// Returns the deal month, or `None` if the year or month is out of
    /// range.
    #[must_use]
    pub fn deal_date(&self) -> Option<YearMonth> {
        YearMonth::new(self.deal_year, self.deal_month).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_eligible_area_has_exactly_one_category() {
        // 45.0 .. 200.0 in 0.25 steps, plus the exact band edges
        let mut areas: Vec<f64> = (180..800).map(|i| f64::from(i) * 0.25).collect();
        areas.extend([49.999, 50.0, 79.999, 80.0, 84.99, 85.0, 109.99, 110.0, 129.99, 130.0]);

        for area in areas {
            let matching = SizeCategory::all()
                .iter()
                .filter(|cat| cat.contains(area))
                .count();
            if area < SizeCategory::MIN_AREA {
                assert_eq!(matching, 0, "{area} should have no category");
                assert!(SizeCategory::from_area(area).is_none());
            } else {
                assert_eq!(matching, 1, "{area} matched {matching} categories");
                let cat = SizeCategory::from_area(area).unwrap();
                assert!(cat.contains(area), "{area} mapped to {cat:?}");
            }
        }
    }

    #[test]
    fn band_edges_are_half_open() {
        assert_eq!(SizeCategory::from_area(50.0), Some(SizeCategory::From50To80));
        assert_eq!(SizeCategory::from_area(80.0), Some(SizeCategory::From80To85));
        assert_eq!(SizeCategory::from_area(84.99), Some(SizeCategory::From80To85));
        assert_eq!(SizeCategory::from_area(85.0), Some(SizeCategory::From85To110));
        assert_eq!(SizeCategory::from_area(130.0), Some(SizeCategory::From130));
        assert_eq!(SizeCategory::from_area(400.0), Some(SizeCategory::From130));
    }

    #[test]
    fn rejects_small_and_non_finite_areas() {
        assert!(SizeCategory::from_area(49.99).is_none());
        assert!(SizeCategory::from_area(0.0).is_none());
        assert!(SizeCategory::from_area(f64::NAN).is_none());
        assert!(SizeCategory::from_area(f64::INFINITY).is_none());
    }

    #[test]
    fn category_labels() {
        let labels: Vec<String> = SizeCategory::all().iter().map(ToString::to_string).collect();
        assert_eq!(
            labels,
            ["50-80㎡", "80-85㎡", "85-110㎡", "110-130㎡", "130㎡+"]
        );
        assert_eq!(
            "85-110㎡".parse::<SizeCategory>().unwrap(),
            SizeCategory::From85To110
        );
        assert_eq!(
            serde_json::to_string(&SizeCategory::From80To85).unwrap(),
            "\"80-85㎡\""
        );
    }

    #[test]
    fn year_month_arithmetic_crosses_years() {
        let ym = YearMonth::new(2024, 2).unwrap();
        assert_eq!(ym.add_months(-2), YearMonth::new(2023, 12).unwrap());
        assert_eq!(ym.add_months(-35), YearMonth::new(2021, 3).unwrap());
        assert_eq!(ym.add_months(11), YearMonth::new(2025, 1).unwrap());
        assert_eq!(YearMonth::from_absolute(ym.absolute()), ym);
        assert_eq!(
            YearMonth::new(2024, 1).unwrap().absolute() - YearMonth::new(2023, 12).unwrap().absolute(),
            1
        );
    }

    #[test]
    fn rejects_invalid_month() {
        assert_eq!(
            YearMonth::new(2024, 13),
            Err(YearMonthError::Month { month: 13 })
        );
        assert!(YearMonth::new(2024, 0).is_err());
    }

    #[test]
    fn rejects_out_of_range_years() {
        assert_eq!(
            YearMonth::new(200_000_000, 1),
            Err(YearMonthError::Year { year: 200_000_000 })
        );
        assert!(YearMonth::new(0, 1).is_err());
        assert!(YearMonth::new(i32::MIN, 6).is_err());
        assert_eq!(
            "999999999-01".parse::<YearMonth>(),
            Err(YearMonthError::Year { year: 999_999_999 })
        );
        assert!(YearMonth::new(9999, 12).is_ok());
    }

    #[test]
    fn month_arithmetic_saturates_at_range_ends() {
        assert_eq!(YearMonth::MAX.add_months(1), YearMonth::MAX);
        assert_eq!(YearMonth::MAX.add_months(i32::MAX), YearMonth::MAX);
        assert_eq!(YearMonth::MIN.add_months(-35), YearMonth::MIN);
        assert_eq!(YearMonth::MIN.add_months(i32::MIN), YearMonth::MIN);
        assert_eq!(YearMonth::from_absolute(i32::MAX), YearMonth::MAX);
        assert_eq!(
            YearMonth::new(9999, 11).unwrap().add_months(1),
            YearMonth::MAX
        );
    }

    #[test]
    fn extreme_deal_year_has_no_deal_date() {
        let record = TransactionRecord {
            building_name: "A".to_string(),
            sub_area_name: "X".to_string(),
            deal_year: 200_000_000,
            deal_month: 1,
            price: 1.0,
            exclusive_area: 60.0,
        };
        assert_eq!(record.deal_date(), None);
    }

    #[test]
    fn parses_year_month_formats() {
        let expected = YearMonth::new(2024, 6).unwrap();
        assert_eq!("2024-06".parse::<YearMonth>().unwrap(), expected);
        assert_eq!("2024.6".parse::<YearMonth>().unwrap(), expected);
        assert_eq!("202406".parse::<YearMonth>().unwrap(), expected);
        assert!("2024".parse::<YearMonth>().is_err());
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("june".parse::<YearMonth>().is_err());
        assert_eq!(expected.to_string(), "2024-06");
    }

    #[test]
    fn deserializing_year_month_validates() {
        let ok: YearMonth = serde_json::from_str(r#"{"year":2023,"month":12}"#).unwrap();
        assert_eq!(ok, YearMonth::new(2023, 12).unwrap());
        assert!(serde_json::from_str::<YearMonth>(r#"{"year":2023,"month":14}"#).is_err());
    }

    #[test]
    fn record_uses_camel_case_fields() {
        let record: TransactionRecord = serde_json::from_value(serde_json::json!({
            "buildingName": "Raemian",
            "subAreaName": "Daechi-dong",
            "dealYear": 2024,
            "dealMonth": 3,
            "price": 250_000.0,
            "exclusiveArea": 84.97
        }))
        .unwrap();
        assert_eq!(record.size_category(), Some(SizeCategory::From80To85));
        assert_eq!(record.deal_date(), Some(YearMonth::new(2024, 3).unwrap()));
    }
}
