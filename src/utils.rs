use chrono::{Datelike as _, NaiveDate};

/// Number of days in `month` (1-12) of `year`, 0 for an invalid month
pub fn days_in_month(month: u32, year: i32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };

    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    next.map(|next| (next - first).num_days() as u32).unwrap_or(31)
}

/// First and last calendar day of a month
pub fn month_range(month: u32, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = NaiveDate::from_ymd_opt(year, month, days_in_month(month, year))?;

    Some((start, end))
}

/// Months since year 0, so periods compare as plain integers
pub fn month_index(month: u32, year: i32) -> i64 {
    year as i64 * 12 + month as i64 - 1
}

/// Index of the month containing `date`
pub fn month_index_of(date: NaiveDate) -> i64 {
    month_index(date.month(), date.year())
}

/// Rounds a currency amount to 2 decimal places
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `part / whole` as a percentage, `None` when `whole` is zero
pub fn percentage(part: f64, whole: f64) -> Option<f64> {
    (whole != 0.0).then(|| part / whole * 100.0)
}
