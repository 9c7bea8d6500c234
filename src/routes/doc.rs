use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, RegisterRequest, TokenResponse},
        bookings::{BookingPrice, BookingWithGuest, BookingWithProperty, CancelBookingRequest, CreateBookingRequest},
        messages::{ConversationOverview, CreateConversationRequest, MarkedRead, MessageWithSender, SendMessageRequest},
        notifications::UnreadCount,
        payments::{CreatePaymentRequest, PaymentAnalytics, PaymentWithBooking, RefundRequest},
        properties::{
            AvailabilityResponse, CalendarResponse, CreatePropertyRequest, DayAvailability, PriceQuote,
            PropertyDetails, ReviewStatsSummary, UpdatePropertyRequest,
        },
        reviews::{
            CreateReviewRequest, FlagReviewRequest, HostResponseRequest, RatingStatistics, RatingTrend,
            ReviewWithGuest, ReviewWithProperty, ReviewsSummary,
        },
        users::{ChangePasswordRequest, UpdateProfileRequest},
        wishlists::{CreateWishlistRequest, WishlistDetails},
    },
    models::{
        Booking, BookingPaymentStatus, BookingStatus, Conversation, GatewayResponse, Location, Message,
        Notification, NotificationKind, Payment, PaymentMethod, Property, PropertySummary, Review,
        StayRules, TransactionStatus, TransactionType, UserProfile, UserSummary, Wishlist,
    },
    response::{ApiResponse, Meta},
    routes::{
        auth, bookings, calendar, conversations, health, notifications, params, payments, properties,
        reviews, users, wishlists,
    },
    store::CollectionStats,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::refresh,
        auth::me,
        users::list_users,
        users::get_user,
        users::update_me,
        users::change_password,
        users::delete_me,
        users::my_bookings,
        users::my_reviews,
        users::my_payments,
        properties::search_properties,
        properties::create_property,
        properties::get_property,
        properties::update_property,
        properties::delete_property,
        properties::similar_properties,
        properties::property_reviews,
        properties::property_reviews_summary,
        properties::property_bookings,
        properties::host_properties,
        calendar::availability,
        calendar::days,
        calendar::pricing,
        bookings::create_booking,
        bookings::price_quote,
        bookings::get_booking,
        bookings::confirm_booking,
        bookings::cancel_booking,
        bookings::complete_booking,
        bookings::booking_payments,
        reviews::create_review,
        reviews::get_review,
        reviews::respond_to_review,
        reviews::flag_review,
        payments::process_payment,
        payments::get_payment,
        payments::refund_payment,
        payments::analytics,
        conversations::list_conversations,
        conversations::create_conversation,
        conversations::list_messages,
        conversations::send_message,
        conversations::mark_read,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::get_notification,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::delete_notification,
        wishlists::list_wishlists,
        wishlists::create_wishlist,
        wishlists::get_wishlist,
        wishlists::delete_wishlist,
        wishlists::add_property,
        wishlists::remove_property
    ),
    components(
        schemas(
            UserProfile,
            UserSummary,
            Location,
            StayRules,
            Property,
            PropertySummary,
            BookingStatus,
            BookingPaymentStatus,
            Booking,
            Review,
            PaymentMethod,
            TransactionStatus,
            TransactionType,
            GatewayResponse,
            Payment,
            Conversation,
            Message,
            NotificationKind,
            Notification,
            Wishlist,
            CollectionStats,
            RegisterRequest,
            LoginRequest,
            TokenResponse,
            UpdateProfileRequest,
            ChangePasswordRequest,
            CreatePropertyRequest,
            UpdatePropertyRequest,
            PropertyDetails,
            ReviewStatsSummary,
            DayAvailability,
            AvailabilityResponse,
            CalendarResponse,
            PriceQuote,
            CreateBookingRequest,
            CancelBookingRequest,
            BookingPrice,
            BookingWithProperty,
            BookingWithGuest,
            CreateReviewRequest,
            HostResponseRequest,
            FlagReviewRequest,
            RatingTrend,
            RatingStatistics,
            ReviewWithGuest,
            ReviewWithProperty,
            ReviewsSummary,
            CreatePaymentRequest,
            RefundRequest,
            PaymentWithBooking,
            PaymentAnalytics,
            CreateConversationRequest,
            SendMessageRequest,
            ConversationOverview,
            MessageWithSender,
            MarkedRead,
            UnreadCount,
            CreateWishlistRequest,
            WishlistDetails,
            params::Pagination,
            health::HealthData,
            Meta,
            ApiResponse<Property>,
            ApiResponse<Booking>,
            ApiResponse<Payment>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "User profile endpoints"),
        (name = "Properties", description = "Property listing and search endpoints"),
        (name = "Calendar", description = "Availability and pricing endpoints"),
        (name = "Bookings", description = "Booking endpoints"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "Payments", description = "Payment and refund endpoints"),
        (name = "Conversations", description = "Messaging endpoints"),
        (name = "Notifications", description = "Notification endpoints"),
        (name = "Wishlists", description = "Wishlist endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
