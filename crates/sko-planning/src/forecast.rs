//! Footfall forecasting boundary.
//!
//! The real time-series model lives outside this repo; what this module
//! owns is the contract and the deterministic fallback used when the
//! sales log is too thin to model: a fixed default prediction plus the
//! holiday flag from a calendar.

use chrono::{Datelike, NaiveDate};

use crate::PlannerError;

/// Minimum sales-log samples before any averaging is attempted; below
/// this the default prediction is returned unchanged.
pub const MIN_SAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootfallForecast {
    pub predicted: i64,
    pub is_holiday: bool,
    pub holiday_name: Option<String>,
}

/// Calendar lookup for named holidays.
pub trait HolidayCalendar: Send + Sync {
    fn holiday_name(&self, date: NaiveDate) -> Option<String>;
}

/// Fixed (month, day) → name table; recurring holidays only.
pub struct StaticHolidayCalendar {
    entries: Vec<(u32, u32, String)>,
}

impl StaticHolidayCalendar {
    pub fn new(entries: impl IntoIterator<Item = (u32, u32, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// A small default set used when no calendar is configured.
    pub fn with_defaults() -> Self {
        Self::new([
            (1, 1, "New Year's Day".to_string()),
            (1, 26, "Republic Day".to_string()),
            (8, 15, "Independence Day".to_string()),
            (10, 2, "Gandhi Jayanti".to_string()),
            (12, 25, "Christmas".to_string()),
        ])
    }
}

impl HolidayCalendar for StaticHolidayCalendar {
    fn holiday_name(&self, date: NaiveDate) -> Option<String> {
        self.entries
            .iter()
            .find(|(m, d, _)| *m == date.month() && *d == date.day())
            .map(|(_, _, name)| name.clone())
    }
}

/// Upstream footfall predictor contract. `samples` is the sales history
/// as (date, customer_count) pairs; implementations decide how much of
/// it they use.
pub trait FootfallSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn predict(
        &self,
        date: NaiveDate,
        samples: &[(NaiveDate, i64)],
    ) -> Result<FootfallForecast, PlannerError>;
}

/// Deterministic fallback predictor: fixed default below [`MIN_SAMPLES`],
/// plain mean of the history otherwise. Holiday status comes from the
/// calendar either way.
pub struct NaiveFootfallSource {
    default_footfall: i64,
    calendar: Box<dyn HolidayCalendar>,
}

impl NaiveFootfallSource {
    pub fn new(default_footfall: i64, calendar: Box<dyn HolidayCalendar>) -> Self {
        Self {
            default_footfall,
            calendar,
        }
    }
}

impl FootfallSource for NaiveFootfallSource {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn predict(
        &self,
        date: NaiveDate,
        samples: &[(NaiveDate, i64)],
    ) -> Result<FootfallForecast, PlannerError> {
        let holiday_name = self.calendar.holiday_name(date);

        let predicted = if samples.len() < MIN_SAMPLES {
            self.default_footfall
        } else {
            let total: i64 = samples.iter().map(|(_, n)| *n).sum();
            total / samples.len() as i64
        };

        Ok(FootfallForecast {
            predicted,
            is_holiday: holiday_name.is_some(),
            holiday_name,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn source(default: i64) -> NaiveFootfallSource {
        NaiveFootfallSource::new(default, Box::new(StaticHolidayCalendar::with_defaults()))
    }

    #[test]
    fn thin_history_returns_the_default() {
        let samples = vec![(date(2026, 8, 1), 30), (date(2026, 8, 2), 40)];
        let f = source(15).predict(date(2026, 8, 7), &samples).unwrap();
        assert_eq!(f.predicted, 15);
        assert!(!f.is_holiday);
    }

    #[test]
    fn exactly_min_samples_switches_to_the_mean() {
        let samples: Vec<_> = (1..=5).map(|d| (date(2026, 8, d), 20)).collect();
        let f = source(15).predict(date(2026, 8, 7), &samples).unwrap();
        assert_eq!(f.predicted, 20);
    }

    #[test]
    fn holiday_is_flagged_with_its_name() {
        let f = source(15).predict(date(2026, 12, 25), &[]).unwrap();
        assert!(f.is_holiday);
        assert_eq!(f.holiday_name.as_deref(), Some("Christmas"));
        // Thin history: prediction still the default.
        assert_eq!(f.predicted, 15);
    }

    #[test]
    fn static_calendar_matches_by_month_and_day() {
        let cal = StaticHolidayCalendar::with_defaults();
        assert!(cal.holiday_name(date(2027, 1, 26)).is_some());
        assert!(cal.holiday_name(date(2027, 3, 3)).is_none());
    }
}
