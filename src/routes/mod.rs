use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod bookings;
pub mod calendar;
pub mod conversations;
pub mod doc;
pub mod health;
pub mod notifications;
pub mod params;
pub mod payments;
pub mod properties;
pub mod reviews;
pub mod users;
pub mod wishlists;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/properties", properties::router())
        .nest("/calendar", calendar::router())
        .nest("/bookings", bookings::router())
        .nest("/reviews", reviews::router())
        .nest("/payments", payments::router())
        .nest("/conversations", conversations::router())
        .nest("/notifications", notifications::router())
        .nest("/wishlists", wishlists::router())
}
