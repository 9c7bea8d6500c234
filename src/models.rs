use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::Record;

/// Implements [`Record`] for a struct with `id`, `created_at` and `updated_at` fields.
macro_rules! record {
    ($ty:ty, $collection:literal) => {
        impl Record for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> i64 {
                self.id
            }

            fn assign(&mut self, id: i64, now: DateTime<Utc>) {
                self.id = id;
                self.created_at = now;
                self.updated_at = now;
            }

            fn touch(&mut self, now: DateTime<Utc>) {
                self.updated_at = now;
            }
        }
    };
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------- users

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
record!(User, "users");

/// A user as returned to clients; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub is_host: bool,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            avatar: user.avatar,
            bio: user.bio,
            is_host: user.is_host,
            is_verified: user.is_verified,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

// ---------------------------------------------------------------- properties

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StayRules {
    pub minimum_stay: u32,
    pub maximum_stay: u32,
    pub instant_book: bool,
}

impl Default for StayRules {
    fn default() -> Self {
        Self {
            minimum_stay: 1,
            maximum_stay: 365,
            instant_book: false,
        }
    }
}

impl StayRules {
    pub fn allows(&self, nights: i64) -> bool {
        nights >= i64::from(self.minimum_stay) && nights <= i64::from(self.maximum_stay)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Property {
    pub id: i64,
    pub host_id: i64,
    pub title: String,
    pub description: String,
    pub property_type: String,
    #[serde(default)]
    pub room_type: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub country: String,
    #[serde(default)]
    pub location: Option<Location>,
    pub price_per_night: f64,
    #[serde(default)]
    pub cleaning_fee: f64,
    #[serde(default)]
    pub service_fee: f64,
    pub max_guests: u32,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub availability: StayRules,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
record!(Property, "rooms");

impl Property {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let location = self.location.as_ref()?;
        Some((location.lat?, location.lng?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PropertySummary {
    pub id: i64,
    pub title: String,
    pub city: String,
    pub country: String,
    pub price_per_night: f64,
    pub images: Vec<String>,
}

impl From<&Property> for PropertySummary {
    fn from(property: &Property) -> Self {
        Self {
            id: property.id,
            title: property.title.clone(),
            city: property.city.clone(),
            country: property.country.clone(),
            price_per_night: property.price_per_night,
            images: property.images.clone(),
        }
    }
}

// ---------------------------------------------------------------- bookings

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Pending and confirmed bookings hold their dates.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingPaymentStatus {
    Pending,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: i64,
    pub guest_id: i64,
    pub property_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub number_of_guests: u32,
    pub total_price: f64,
    pub status: BookingStatus,
    pub payment_status: BookingPaymentStatus,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
record!(Booking, "bookings");

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

// ---------------------------------------------------------------- reviews

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: i64,
    pub property_id: i64,
    pub guest_id: i64,
    pub booking_id: i64,
    pub overall_rating: u8,
    #[serde(default)]
    pub cleanliness_rating: Option<u8>,
    #[serde(default)]
    pub accuracy_rating: Option<u8>,
    #[serde(default)]
    pub communication_rating: Option<u8>,
    #[serde(default)]
    pub location_rating: Option<u8>,
    #[serde(default)]
    pub check_in_rating: Option<u8>,
    #[serde(default)]
    pub value_rating: Option<u8>,
    pub comment: String,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub host_response: Option<String>,
    #[serde(default)]
    pub host_response_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub flag_reason: Option<String>,
    #[serde(default)]
    pub flagged_by: Option<i64>,
    #[serde(default)]
    pub flagged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
record!(Review, "property_reviews");

impl Review {
    /// Category ratings in a fixed order, keyed by field name.
    pub fn categories(&self) -> [(&'static str, Option<u8>); 6] {
        [
            ("cleanliness_rating", self.cleanliness_rating),
            ("accuracy_rating", self.accuracy_rating),
            ("communication_rating", self.communication_rating),
            ("location_rating", self.location_rating),
            ("check_in_rating", self.check_in_rating),
            ("value_rating", self.value_rating),
        ]
    }
}

// ---------------------------------------------------------------- payments

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    BankTransfer,
    ApplePay,
    GooglePay,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::ApplePay => "apple_pay",
            PaymentMethod::GooglePay => "google_pay",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payment,
    Refund,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayResponse {
    pub success: bool,
    pub gateway_transaction_id: Option<String>,
    pub authorization_code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    /// Positive for charges, negative for refunds.
    pub amount: f64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub transaction_type: TransactionType,
    pub transaction_id: String,
    #[serde(default)]
    pub original_payment_id: Option<i64>,
    #[serde(default)]
    pub refund_reason: Option<String>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub gateway_response: Option<GatewayResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
record!(Payment, "payments");

// ---------------------------------------------------------------- messaging

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    pub id: i64,
    pub participants: Vec<i64>,
    #[serde(default)]
    pub property_id: Option<i64>,
    pub status: String,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
record!(Conversation, "conversations");

impl Conversation {
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participants.contains(&user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub message_type: String,
    pub status: String,
    #[serde(default)]
    pub read_by: Vec<i64>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
record!(Message, "messages");

// ---------------------------------------------------------------- notifications

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Booking,
    Payment,
    Refund,
    Message,
    Review,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub related_id: Option<i64>,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
record!(Notification, "notifications");

// ---------------------------------------------------------------- wishlists

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Wishlist {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<i64>,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
record!(Wishlist, "wishlists");

