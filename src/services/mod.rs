pub mod auth_service;
pub mod availability;
pub mod base;
pub mod booking_service;
pub mod communication_service;
pub mod notification_service;
pub mod password;
pub mod payment_service;
pub mod pricing;
pub mod property_service;
pub mod review_service;
pub mod user_service;
pub mod wishlist_service;
