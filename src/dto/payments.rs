use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Booking, Payment, PaymentMethod};

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreatePaymentRequest {
    pub booking_id: i64,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
    pub payment_method: PaymentMethod,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RefundRequest {
    /// Defaults to the remaining refundable amount.
    pub amount: Option<f64>,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AnalyticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentWithBooking {
    #[serde(flatten)]
    pub payment: Payment,
    pub booking_details: Option<Booking>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct PaymentAnalytics {
    pub total_payments: usize,
    pub total_refunds: usize,
    pub total_revenue: f64,
    pub total_refunded: f64,
    pub net_revenue: f64,
    /// Percentage of charges that completed.
    pub success_rate: f64,
    /// Charge count per payment method.
    pub payment_method_breakdown: BTreeMap<String, usize>,
}
