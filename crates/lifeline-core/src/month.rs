//! Calendar-month arithmetic for the donation tracker.
//!
//! Trackers are keyed by the first day of a calendar month; everything that
//! reasons about "the current month", "the previous month", or operator
//! input like `2025-09` goes through here.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::error::{CoreError, CoreResult};

/// ## Summary
/// Normalizes a timestamp to the first day of its calendar month.
#[must_use]
pub fn month_start(at: DateTime<Utc>) -> NaiveDate {
    let date = at.date_naive();
    date.with_day(1).unwrap_or(date)
}

/// ## Summary
/// Returns the first day of the month before `month`.
#[must_use]
pub fn previous_month(month: NaiveDate) -> NaiveDate {
    let (year, prev) = if month.month() == 1 {
        (month.year() - 1, 12)
    } else {
        (month.year(), month.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, prev, 1).unwrap_or(month)
}

/// ## Summary
/// Human-readable month label, e.g. "March 2025".
#[must_use]
pub fn month_label(month: NaiveDate) -> String {
    month.format("%B %Y").to_string()
}

/// ## Summary
/// Parses operator input in `YYYY-MM` form into a month start date.
///
/// ## Errors
/// Returns a validation error if the input is not a valid `YYYY-MM` month.
pub fn parse_month(input: &str) -> CoreResult<NaiveDate> {
    let (year, month) = input
        .split_once('-')
        .ok_or_else(|| CoreError::ValidationError(format!("invalid month '{input}', expected YYYY-MM")))?;
    let year: i32 = year
        .parse()
        .map_err(|_| CoreError::ValidationError(format!("invalid year in month '{input}'")))?;
    let month: u32 = month
        .parse()
        .map_err(|_| CoreError::ValidationError(format!("invalid month in '{input}'")))?;
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| CoreError::ValidationError(format!("month '{input}' out of range")))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn normalizes_to_first_day() {
        let at = Utc.with_ymd_and_hms(2025, 2, 15, 10, 30, 0).unwrap();
        assert_eq!(
            month_start(at),
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
        );
    }

    #[test]
    fn first_day_maps_to_itself() {
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        assert_eq!(
            month_start(at),
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
        );
    }

    #[test]
    fn previous_month_within_year() {
        let feb = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert_eq!(
            previous_month(feb),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
    }

    #[test]
    fn previous_month_crosses_year_boundary() {
        let jan = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            previous_month(jan),
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
        );
    }

    #[test]
    fn labels_use_full_month_name() {
        let mar = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(month_label(mar), "March 2025");
    }

    #[test]
    fn parses_operator_month_input() {
        assert_eq!(
            parse_month("2025-09").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
        );
        assert!(parse_month("2025-13").is_err());
        assert!(parse_month("September 2025").is_err());
        assert!(parse_month("2025").is_err());
    }
}
