pub mod auth;
pub mod bookings;
pub mod messages;
pub mod notifications;
pub mod payments;
pub mod properties;
pub mod reviews;
pub mod users;
pub mod wishlists;
