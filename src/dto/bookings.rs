use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Booking, BookingStatus, PropertySummary, UserSummary};

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateBookingRequest {
    pub property_id: i64,
    /// `YYYY-MM-DD`; a full datetime is truncated to its date.
    #[validate(length(min = 1))]
    pub check_in: String,
    #[validate(length(min = 1))]
    pub check_out: String,
    #[validate(range(min = 1, message = "Number of guests must be at least 1"))]
    pub number_of_guests: u32,
    /// Computed from the property rate when absent or zero.
    pub total_price: Option<f64>,
    #[validate(length(max = 1000))]
    pub special_requests: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct CancelBookingRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BookingStatusQuery {
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PriceQuoteQuery {
    pub property_id: i64,
    pub check_in: String,
    pub check_out: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookingPrice {
    pub nights: i64,
    pub base_price: f64,
    pub service_fee: f64,
    pub tax: f64,
    pub total_price: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingWithProperty {
    #[serde(flatten)]
    pub booking: Booking,
    pub property: Option<PropertySummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingWithGuest {
    #[serde(flatten)]
    pub booking: Booking,
    pub guest: Option<UserSummary>,
}
