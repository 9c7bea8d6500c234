use chrono::{Datelike, NaiveDate, Weekday};

use crate::{
    dto::{bookings::BookingPrice, properties::PriceQuote},
    models::Property,
};

pub const SERVICE_FEE_RATE: f64 = 0.10;
pub const TAX_RATE: f64 = 0.05;
pub const WEEKEND_PREMIUM_RATE: f64 = 0.20;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Nights in `[check_in, check_out)`.
pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// Booking total: nightly base plus 10% service fee and 5% tax.
pub fn booking_price(property: &Property, check_in: NaiveDate, check_out: NaiveDate) -> BookingPrice {
    let nights = nights(check_in, check_out).max(0);
    let base = nights as f64 * property.price_per_night;
    let service_fee = base * SERVICE_FEE_RATE;
    let tax = base * TAX_RATE;

    BookingPrice {
        nights,
        base_price: round2(base),
        service_fee: round2(service_fee),
        tax: round2(tax),
        total_price: round2(base + service_fee + tax),
    }
}

/// Price charged for the night starting on `date`.
pub fn nightly_price(property: &Property, date: NaiveDate) -> f64 {
    if is_weekend(date) {
        round2(property.price_per_night * (1.0 + WEEKEND_PREMIUM_RATE))
    } else {
        property.price_per_night
    }
}

/// Calendar quote: base + cleaning + service + 20% of the base rate for every
/// Saturday or Sunday night.
pub fn quote(property: &Property, start: NaiveDate, end: NaiveDate) -> PriceQuote {
    let nights = nights(start, end).max(0);
    let base = nights as f64 * property.price_per_night;
    let weekend_nights = start
        .iter_days()
        .take(nights as usize)
        .filter(|d| is_weekend(*d))
        .count();
    let weekend_premium = weekend_nights as f64 * property.price_per_night * WEEKEND_PREMIUM_RATE;

    PriceQuote {
        nights,
        base_price: round2(base),
        cleaning_fee: round2(property.cleaning_fee),
        service_fee: round2(property.service_fee),
        weekend_premium: round2(weekend_premium),
        total: round2(base + property.cleaning_fee + property.service_fee + weekend_premium),
    }
}
