use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{PropertySummary, Review, UserSummary};

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateReviewRequest {
    pub property_id: i64,
    pub booking_id: i64,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub overall_rating: u8,
    #[validate(range(min = 1, max = 5))]
    pub cleanliness_rating: Option<u8>,
    #[validate(range(min = 1, max = 5))]
    pub accuracy_rating: Option<u8>,
    #[validate(range(min = 1, max = 5))]
    pub communication_rating: Option<u8>,
    #[validate(range(min = 1, max = 5))]
    pub location_rating: Option<u8>,
    #[validate(range(min = 1, max = 5))]
    pub check_in_rating: Option<u8>,
    #[validate(range(min = 1, max = 5))]
    pub value_rating: Option<u8>,
    #[validate(length(
        min = 10,
        max = 1000,
        message = "Comment must be between 10 and 1000 characters"
    ))]
    pub comment: String,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct HostResponseRequest {
    #[validate(length(
        min = 10,
        max = 1000,
        message = "Response must be between 10 and 1000 characters"
    ))]
    pub response: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct FlagReviewRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub public_only: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RatingTrend {
    InsufficientData,
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RatingStatistics {
    pub total_reviews: usize,
    pub average_rating: f64,
    /// Keys `"1"` through `"5"`, always present.
    pub rating_distribution: BTreeMap<String, usize>,
    pub category_averages: BTreeMap<String, f64>,
    pub trend: RatingTrend,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReviewWithGuest {
    #[serde(flatten)]
    pub review: Review,
    pub guest: Option<UserSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewWithProperty {
    #[serde(flatten)]
    pub review: Review,
    pub property: Option<PropertySummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewsSummary {
    pub statistics: RatingStatistics,
    pub recent_reviews: Vec<ReviewWithGuest>,
    /// Percentage of public reviews that carry a host response.
    pub response_rate: f64,
}
