use chrono::{DateTime, NaiveDate};

use crate::{
    dto::properties::DayAvailability,
    error::{AppError, AppResult},
    models::{Booking, Property},
    services::pricing,
};

const INVALID_DATE: &str = "Invalid date format. Use ISO format (YYYY-MM-DD)";

/// Accepts `YYYY-MM-DD` or an RFC 3339 datetime, which is truncated to its date.
pub fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Ok(datetime.date_naive());
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.date());
    }
    Err(AppError::validation(INVALID_DATE))
}

/// Parse a `[start, end)` range and require `end > start`.
pub fn parse_range(start: &str, end: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    if end <= start {
        return Err(AppError::validation("Check-out date must be after check-in date"));
    }
    Ok((start, end))
}

/// Half-open overlap of `[a_start, a_end)` and `[b_start, b_end)`.
pub fn overlaps(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    !(a_end <= b_start || a_start >= b_end)
}

/// True when no pending or confirmed booking of `property_id` overlaps the range.
pub fn is_available(
    bookings: &[Booking],
    property_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> bool {
    !bookings.iter().any(|b| {
        b.property_id == property_id
            && b.status.is_active()
            && overlaps(check_in, check_out, b.check_in, b.check_out)
    })
}

fn night_is_booked(bookings: &[Booking], property_id: i64, date: NaiveDate) -> bool {
    bookings.iter().any(|b| {
        b.property_id == property_id && b.status.is_active() && b.check_in <= date && date < b.check_out
    })
}

/// Day-by-day availability for `start..=end` with the nightly price.
pub fn calendar(
    property: &Property,
    bookings: &[Booking],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DayAvailability> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| DayAvailability {
            date,
            available: property.is_active && !night_is_booked(bookings, property.id, date),
            price: pricing::nightly_price(property, date),
        })
        .collect()
}
