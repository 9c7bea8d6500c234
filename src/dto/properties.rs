use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Location, Property, StayRules};

use super::reviews::ReviewWithGuest;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreatePropertyRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[validate(length(min = 1))]
    pub property_type: String,
    pub room_type: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub country: String,
    pub location: Option<Location>,
    #[validate(range(exclusive_min = 0.0, message = "Price per night must be greater than 0"))]
    pub price_per_night: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub cleaning_fee: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub service_fee: f64,
    #[validate(range(min = 1, message = "Max guests must be at least 1"))]
    pub max_guests: u32,
    #[serde(default)]
    pub bedrooms: u32,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub bathrooms: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub availability: Option<StayRules>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdatePropertyRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub property_type: Option<String>,
    pub room_type: Option<String>,
    #[validate(length(min = 1))]
    pub city: Option<String>,
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub country: Option<String>,
    pub location: Option<Location>,
    #[validate(range(exclusive_min = 0.0, message = "Price per night must be greater than 0"))]
    pub price_per_night: Option<f64>,
    #[validate(range(min = 0.0))]
    pub cleaning_fee: Option<f64>,
    #[validate(range(min = 0.0))]
    pub service_fee: Option<f64>,
    #[validate(range(min = 1, message = "Max guests must be at least 1"))]
    pub max_guests: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub availability: Option<StayRules>,
    pub is_active: Option<bool>,
}

impl UpdatePropertyRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.property_type.is_none()
            && self.room_type.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && self.location.is_none()
            && self.price_per_night.is_none()
            && self.cleaning_fee.is_none()
            && self.service_fee.is_none()
            && self.max_guests.is_none()
            && self.bedrooms.is_none()
            && self.bathrooms.is_none()
            && self.amenities.is_none()
            && self.images.is_none()
            && self.availability.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DateOption {
    Dates,
    Flexible,
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StayDuration {
    Weekend,
    Week,
    Month,
}

impl StayDuration {
    pub fn nights(self) -> i64 {
        match self {
            StayDuration::Weekend => 2,
            StayDuration::Week => 7,
            StayDuration::Month => 30,
        }
    }
}

/// Query string of `GET /api/properties`. Every filter is optional.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PropertySearchQuery {
    pub location: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub property_type: Option<String>,
    pub room_type: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub guests: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    /// Comma separated; every listed amenity is required.
    pub amenities: Option<String>,
    pub ne_lat: Option<f64>,
    pub ne_lng: Option<f64>,
    pub sw_lat: Option<f64>,
    pub sw_lng: Option<f64>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub instant_bookable: Option<bool>,
    pub date_option: Option<DateOption>,
    pub stay_duration: Option<StayDuration>,
    pub month_duration: Option<u32>,
    pub date_flexibility: Option<u32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PropertySearchQuery {
    pub fn amenity_list(&self) -> Vec<String> {
        self.amenities
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DateRangeQuery {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReviewStatsSummary {
    pub total_reviews: usize,
    pub average_rating: f64,
    /// Average per rating category.
    pub rating_breakdown: std::collections::BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub available: bool,
    pub price: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PropertyDetails {
    #[serde(flatten)]
    pub property: Property,
    pub review_stats: ReviewStatsSummary,
    pub recent_reviews: Vec<ReviewWithGuest>,
    pub availability_preview: Vec<DayAvailability>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub property_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nights: i64,
    pub available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalendarResponse {
    pub property_id: i64,
    pub days: Vec<DayAvailability>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PriceQuote {
    pub nights: i64,
    pub base_price: f64,
    pub cleaning_fee: f64,
    pub service_fee: f64,
    pub weekend_premium: f64,
    pub total: f64,
}
