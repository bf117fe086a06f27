//! Overlap calculation between two aggregated tenures.
//!
//! Window = `[max(start_a, start_b), min(end_a, end_b)]`, ongoing ends resolved to `today`.
//! Months are counted as `year_delta * 12 + month_delta`, ignoring day-of-month.

use crate::domain::entities::Tenure;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when two tenures never coincide (window start after window end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvertedWindowPolicy {
    /// Store the (zero or negative) month difference as-is.
    Keep,
    /// Store 0 and keep the edge.
    #[default]
    Clamp,
    /// Produce no edge for the pair.
    Suppress,
}

impl FromStr for InvertedWindowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "clamp" => Ok(Self::Clamp),
            "suppress" => Ok(Self::Suppress),
            other => Err(format!(
                "unknown inverted-window policy '{}' (expected keep, clamp or suppress)",
                other
            )),
        }
    }
}

impl fmt::Display for InvertedWindowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Keep => "keep",
            Self::Clamp => "clamp",
            Self::Suppress => "suppress",
        };
        f.write_str(s)
    }
}

/// Result of comparing two tenures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    Months(i32),
    /// At least one start date is unknown. The edge still exists, without a duration.
    Unknown,
    /// No temporal overlap and the policy drops the pair.
    Suppressed,
}

impl Overlap {
    /// Value to persist, or `None` when no edge should be written.
    pub fn into_edge_value(self) -> Option<Option<i32>> {
        match self {
            Overlap::Months(m) => Some(Some(m)),
            Overlap::Unknown => Some(None),
            Overlap::Suppressed => None,
        }
    }
}

/// Whole-month difference from `from` to `to`. Negative when `to` is in an earlier month.
pub fn month_diff(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

#[derive(Debug, Clone, Copy)]
pub struct OverlapCalculator {
    today: NaiveDate,
    policy: InvertedWindowPolicy,
}

impl OverlapCalculator {
    pub fn new(today: NaiveDate, policy: InvertedWindowPolicy) -> Self {
        Self { today, policy }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn policy(&self) -> InvertedWindowPolicy {
        self.policy
    }

    pub fn overlap(&self, a: &Tenure, b: &Tenure) -> Overlap {
        let (Some(start_a), Some(start_b)) = (a.start, b.start) else {
            return Overlap::Unknown;
        };
        let window_start = start_a.max(start_b);
        let window_end = a.end_or(self.today).min(b.end_or(self.today));

        if window_start <= window_end {
            return Overlap::Months(month_diff(window_start, window_end));
        }
        match self.policy {
            InvertedWindowPolicy::Keep => Overlap::Months(month_diff(window_start, window_end)),
            InvertedWindowPolicy::Clamp => Overlap::Months(0),
            InvertedWindowPolicy::Suppress => Overlap::Suppressed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::TenureEnd;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tenure(person_id: i64, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Tenure {
        Tenure {
            person_id,
            start,
            end: end.map(TenureEnd::Ended).unwrap_or(TenureEnd::Ongoing),
        }
    }

    fn calc(policy: InvertedWindowPolicy) -> OverlapCalculator {
        OverlapCalculator::new(date(2024, 6, 15), policy)
    }

    #[test]
    fn test_month_diff_ignores_day_of_month() {
        assert_eq!(month_diff(date(2020, 1, 1), date(2022, 1, 1)), 24);
        assert_eq!(month_diff(date(2020, 1, 31), date(2020, 2, 1)), 1);
        assert_eq!(month_diff(date(2020, 3, 1), date(2020, 3, 31)), 0);
        assert_eq!(month_diff(date(2021, 11, 1), date(2022, 2, 1)), 3);
        assert_eq!(month_diff(date(2022, 5, 1), date(2021, 5, 1)), -12);
    }

    #[test]
    fn test_identical_tenures() {
        let a = tenure(1, Some(date(2020, 1, 1)), Some(date(2022, 1, 1)));
        let b = tenure(2, Some(date(2020, 1, 1)), Some(date(2022, 1, 1)));
        assert_eq!(calc(InvertedWindowPolicy::Clamp).overlap(&a, &b), Overlap::Months(24));
    }

    #[test]
    fn test_ongoing_resolves_to_today() {
        let a = tenure(1, Some(date(2023, 1, 1)), None);
        let b = tenure(2, Some(date(2022, 1, 1)), Some(date(2023, 7, 1)));
        assert_eq!(calc(InvertedWindowPolicy::Clamp).overlap(&a, &b), Overlap::Months(6));

        let c = tenure(3, Some(date(2023, 6, 1)), None);
        // both ongoing: window ends today (2024-06-15)
        assert_eq!(calc(InvertedWindowPolicy::Clamp).overlap(&a, &c), Overlap::Months(12));
    }

    #[test]
    fn test_unknown_start_gives_null_duration() {
        let a = tenure(1, None, Some(date(2022, 1, 1)));
        let b = tenure(2, Some(date(2020, 1, 1)), None);
        let overlap = calc(InvertedWindowPolicy::Suppress).overlap(&a, &b);
        assert_eq!(overlap, Overlap::Unknown);
        assert_eq!(overlap.into_edge_value(), Some(None));
    }

    #[test]
    fn test_sequential_tenures_follow_policy() {
        let a = tenure(1, Some(date(2018, 1, 1)), Some(date(2019, 1, 1)));
        let b = tenure(2, Some(date(2020, 3, 1)), Some(date(2021, 1, 1)));

        assert_eq!(
            calc(InvertedWindowPolicy::Keep).overlap(&a, &b),
            Overlap::Months(-14)
        );
        assert_eq!(
            calc(InvertedWindowPolicy::Clamp).overlap(&a, &b),
            Overlap::Months(0)
        );
        let suppressed = calc(InvertedWindowPolicy::Suppress).overlap(&a, &b);
        assert_eq!(suppressed, Overlap::Suppressed);
        assert_eq!(suppressed.into_edge_value(), None);
    }

    #[test]
    fn test_same_day_handover_is_not_inverted() {
        let a = tenure(1, Some(date(2019, 1, 1)), Some(date(2020, 3, 1)));
        let b = tenure(2, Some(date(2020, 3, 1)), None);
        assert_eq!(
            calc(InvertedWindowPolicy::Suppress).overlap(&a, &b),
            Overlap::Months(0)
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("KEEP".parse::<InvertedWindowPolicy>(), Ok(InvertedWindowPolicy::Keep));
        assert_eq!(
            " suppress ".parse::<InvertedWindowPolicy>(),
            Ok(InvertedWindowPolicy::Suppress)
        );
        assert!("drop".parse::<InvertedWindowPolicy>().is_err());
        assert_eq!(InvertedWindowPolicy::default().to_string(), "clamp");
    }
}
