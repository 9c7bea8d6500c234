use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{PropertySummary, Wishlist};

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateWishlistRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WishlistQuery {
    pub user_id: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WishlistDetailQuery {
    pub include_properties: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistDetails {
    #[serde(flatten)]
    pub wishlist: Wishlist,
    pub property_details: Option<Vec<PropertySummary>>,
}
