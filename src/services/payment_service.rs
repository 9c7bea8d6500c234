use std::{collections::HashMap, sync::Arc};

use chrono::{NaiveDate, Utc};
use rand::Rng;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    dto::payments::{CreatePaymentRequest, PaymentAnalytics, PaymentWithBooking, RefundRequest},
    error::{AppError, AppResult},
    models::{
        Booking, BookingPaymentStatus, BookingStatus, GatewayResponse, NotificationKind, Payment,
        TransactionStatus, TransactionType,
    },
    response::Page,
    routes::params::Pagination,
    services::{
        availability, base::BaseService, booking_service::BookingService,
        notification_service::NotificationService, pricing,
    },
    store::DataStore,
};

const MAX_CHARGE: f64 = 10_000.0;
const DEFAULT_CURRENCY: &str = "USD";
/// Amounts closer than this are treated as equal.
const CENT: f64 = 0.005;

/// Card processor seam. Calls are synchronous and never fail outright; a
/// declined operation is reported through [`GatewayResponse::success`].
pub trait PaymentGateway: Send + Sync {
    fn charge(&self, amount: f64) -> GatewayResponse;
    fn refund(&self, amount: f64) -> GatewayResponse;
}

/// Stand-in processor that approves at a configurable rate.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    payment_success_rate: f64,
    refund_success_rate: f64,
}

impl SimulatedGateway {
    pub fn new(payment_success_rate: f64, refund_success_rate: f64) -> Self {
        Self {
            payment_success_rate: payment_success_rate.clamp(0.0, 1.0),
            refund_success_rate: refund_success_rate.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.payment_success_rate, config.refund_success_rate)
    }

    fn rejected(error: &str) -> GatewayResponse {
        GatewayResponse {
            success: false,
            gateway_transaction_id: None,
            authorization_code: None,
            error: Some(error.to_string()),
        }
    }

    fn short_id() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_uppercase()
    }
}

impl PaymentGateway for SimulatedGateway {
    fn charge(&self, amount: f64) -> GatewayResponse {
        if amount <= 0.0 {
            return Self::rejected("Invalid amount");
        }
        if amount > MAX_CHARGE {
            return Self::rejected("Amount exceeds limit");
        }
        if !rand::thread_rng().gen_bool(self.payment_success_rate) {
            return Self::rejected("Payment declined");
        }
        GatewayResponse {
            success: true,
            gateway_transaction_id: Some(format!("GTW_{}", Self::short_id())),
            authorization_code: Some(Self::short_id()[..6].to_string()),
            error: None,
        }
    }

    fn refund(&self, amount: f64) -> GatewayResponse {
        if amount <= 0.0 {
            return Self::rejected("Invalid amount");
        }
        if !rand::thread_rng().gen_bool(self.refund_success_rate) {
            return Self::rejected("Refund declined");
        }
        GatewayResponse {
            success: true,
            gateway_transaction_id: Some(format!("RFD_{}", Self::short_id())),
            authorization_code: None,
            error: None,
        }
    }
}

/// `TXN_<YYYYMMDD>_<8 uppercase hex>`.
pub fn transaction_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("TXN_{}_{}", Utc::now().format("%Y%m%d"), suffix)
}

/// Sum of refunds against `original_id` that are settled or in flight.
fn refunded_so_far(payments: &[Payment], original_id: i64) -> f64 {
    payments
        .iter()
        .filter(|p| {
            p.transaction_type == TransactionType::Refund
                && p.original_payment_id == Some(original_id)
                && p.status != TransactionStatus::Failed
        })
        .map(|p| p.amount.abs())
        .sum()
}

#[derive(Clone)]
pub struct PaymentService {
    base: BaseService<Payment>,
    booking_records: BaseService<Booking>,
    bookings: BookingService,
    notifications: NotificationService,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(
        store: &DataStore,
        bookings: BookingService,
        notifications: NotificationService,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            base: BaseService::new(store, "payment"),
            booking_records: BaseService::new(store, "booking"),
            bookings,
            notifications,
            gateway,
        }
    }

    pub async fn process_payment(
        &self,
        user_id: i64,
        req: CreatePaymentRequest,
    ) -> AppResult<Payment> {
        req.validate()?;
        let booking = self.bookings.get(req.booking_id).await?;
        if booking.guest_id != user_id {
            return Err(AppError::Forbidden);
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::validation("Cannot pay for a cancelled booking"));
        }
        if booking.payment_status == BookingPaymentStatus::Paid {
            return Err(AppError::validation("Booking is already paid"));
        }

        let amount = pricing::round2(req.amount);
        let currency = req
            .currency
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let pending = self
            .base
            .create_with(move |existing| {
                let open_charge = existing.iter().find(|p| {
                    p.booking_id == booking.id
                        && p.transaction_type == TransactionType::Payment
                        && p.status != TransactionStatus::Failed
                });
                match open_charge.map(|p| p.status) {
                    Some(TransactionStatus::Pending) => {
                        return Err(AppError::conflict(
                            "A payment for this booking is already being processed",
                        ));
                    }
                    Some(_) => return Err(AppError::validation("Booking is already paid")),
                    None => {}
                }
                Ok(Payment {
                    id: 0,
                    booking_id: booking.id,
                    amount,
                    currency,
                    payment_method: req.payment_method,
                    status: TransactionStatus::Pending,
                    transaction_type: TransactionType::Payment,
                    transaction_id: transaction_id(),
                    original_payment_id: None,
                    refund_reason: None,
                    processed_at: None,
                    error_message: None,
                    gateway_response: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
            .await?;

        let response = self.gateway.charge(amount);
        let success = response.success;
        let payment = self.settle(pending.id, response).await?;

        if success {
            self.bookings.mark_paid(booking.id).await?;
            self.notifications
                .notify(
                    user_id,
                    NotificationKind::Payment,
                    "Payment successful",
                    format!(
                        "Your payment of {:.2} {} for booking #{} was processed",
                        payment.amount, payment.currency, booking.id
                    ),
                    Some(payment.id),
                )
                .await;
            tracing::info!(
                payment_id = payment.id,
                booking_id = booking.id,
                amount,
                method = payment.payment_method.as_str(),
                "payment completed"
            );
        } else {
            tracing::warn!(
                payment_id = payment.id,
                booking_id = booking.id,
                error = ?payment.error_message,
                "payment failed"
            );
        }
        Ok(payment)
    }

    async fn settle(&self, id: i64, response: GatewayResponse) -> AppResult<Payment> {
        self.base
            .update(id, move |p| {
                if response.success {
                    p.status = TransactionStatus::Completed;
                    p.processed_at = Some(Utc::now());
                } else {
                    p.status = TransactionStatus::Failed;
                    p.error_message = response.error.clone();
                }
                p.gateway_response = Some(response);
                Ok(())
            })
            .await
    }

    /// Refunds part or all of a completed charge. `user_id` of `None` skips
    /// the access check.
    pub async fn initiate_refund(
        &self,
        user_id: Option<i64>,
        payment_id: i64,
        req: RefundRequest,
    ) -> AppResult<Payment> {
        req.validate()?;
        let original = self.base.get_by_id(payment_id).await?;
        if original.transaction_type != TransactionType::Payment
            || original.status != TransactionStatus::Completed
        {
            return Err(AppError::validation("Can only refund completed payments"));
        }
        if let Some(user_id) = user_id {
            self.bookings.get_for_user(user_id, original.booking_id).await?;
        }

        let ceiling = original.amount;
        let requested = req.amount;
        let reason = req.reason;
        let source = original.clone();
        let pending = self
            .base
            .create_with(move |existing| {
                let remaining = ceiling - refunded_so_far(existing, source.id);
                let amount = pricing::round2(requested.unwrap_or(remaining));
                if amount <= 0.0 {
                    return Err(AppError::validation("Invalid refund amount"));
                }
                if amount > remaining + CENT {
                    return Err(AppError::validation("Refund amount exceeds original payment"));
                }
                Ok(Payment {
                    id: 0,
                    booking_id: source.booking_id,
                    amount: -amount,
                    currency: source.currency,
                    payment_method: source.payment_method,
                    status: TransactionStatus::Pending,
                    transaction_type: TransactionType::Refund,
                    transaction_id: transaction_id(),
                    original_payment_id: Some(source.id),
                    refund_reason: Some(reason),
                    processed_at: None,
                    error_message: None,
                    gateway_response: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
            .await?;

        let response = self.gateway.refund(pending.amount.abs());
        let success = response.success;
        let refund = self.settle(pending.id, response).await?;
        if !success {
            tracing::warn!(refund_id = refund.id, payment_id, "refund failed");
            return Ok(refund);
        }

        let settled: f64 = self
            .base
            .find_by(|p| {
                p.original_payment_id == Some(payment_id)
                    && p.status == TransactionStatus::Completed
            })
            .await?
            .iter()
            .map(|p| p.amount.abs())
            .sum();
        if settled >= original.amount - CENT {
            self.bookings.mark_refunded(original.booking_id).await?;
        }

        if let Some(booking) = self.booking_records.find(original.booking_id).await? {
            self.notifications
                .notify(
                    booking.guest_id,
                    NotificationKind::Refund,
                    "Refund processed",
                    format!(
                        "A refund of {:.2} {} for booking #{} was processed",
                        refund.amount.abs(),
                        refund.currency,
                        booking.id
                    ),
                    Some(refund.id),
                )
                .await;
        }
        tracing::info!(refund_id = refund.id, payment_id, amount = refund.amount, "refund completed");
        Ok(refund)
    }

    pub async fn get_payment(&self, user_id: i64, id: i64) -> AppResult<Payment> {
        let payment = self.base.get_by_id(id).await?;
        self.bookings.get_for_user(user_id, payment.booking_id).await?;
        Ok(payment)
    }

    pub async fn get_booking_payments(&self, user_id: i64, booking_id: i64) -> AppResult<Vec<Payment>> {
        self.bookings.get_for_user(user_id, booking_id).await?;
        let mut payments = self.base.find_by(|p| p.booking_id == booking_id).await?;
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(payments)
    }

    /// Payments on the user's bookings, newest first.
    pub async fn get_user_payments(
        &self,
        user_id: i64,
        pagination: Pagination,
    ) -> AppResult<Page<PaymentWithBooking>> {
        let bookings: HashMap<i64, Booking> = self
            .booking_records
            .find_by(|b| b.guest_id == user_id)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();
        let mut payments = self
            .base
            .find_by(|p| bookings.contains_key(&p.booking_id))
            .await?;
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let enriched = payments
            .into_iter()
            .map(|payment| PaymentWithBooking {
                booking_details: bookings.get(&payment.booking_id).cloned(),
                payment,
            })
            .collect();
        let (skip, limit) = pagination.window();
        Ok(Page::slice(enriched, skip, limit))
    }

    /// Totals over records created within `start..=end` (either bound optional).
    pub async fn get_payment_analytics(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> AppResult<PaymentAnalytics> {
        let start = start.map(availability::parse_date).transpose()?;
        let end = end.map(availability::parse_date).transpose()?;
        let payments = self
            .base
            .find_by(|p| in_window(p.created_at.date_naive(), start, end))
            .await?;
        Ok(analytics(&payments))
    }
}

fn in_window(day: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.is_none_or(|s| day >= s) && end.is_none_or(|e| day <= e)
}

pub fn analytics(payments: &[Payment]) -> PaymentAnalytics {
    let mut report = PaymentAnalytics::default();
    let mut completed_charges = 0usize;

    for payment in payments {
        match payment.transaction_type {
            TransactionType::Payment => {
                report.total_payments += 1;
                *report
                    .payment_method_breakdown
                    .entry(payment.payment_method.as_str().to_string())
                    .or_default() += 1;
                if payment.status == TransactionStatus::Completed {
                    completed_charges += 1;
                    report.total_revenue += payment.amount;
                }
            }
            TransactionType::Refund => {
                report.total_refunds += 1;
                if payment.status == TransactionStatus::Completed {
                    report.total_refunded += payment.amount.abs();
                }
            }
        }
    }

    report.total_revenue = pricing::round2(report.total_revenue);
    report.total_refunded = pricing::round2(report.total_refunded);
    report.net_revenue = pricing::round2(report.total_revenue - report.total_refunded);
    if report.total_payments > 0 {
        report.success_rate =
            pricing::round2(completed_charges as f64 / report.total_payments as f64 * 100.0);
    }
    report
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        dto::bookings::CreateBookingRequest,
        models::{PaymentMethod, Property, User},
        services::pricing::tests::property,
    };

    struct Fixture {
        payments: PaymentService,
        bookings: BookingService,
        store: DataStore,
        dir: std::path::PathBuf,
    }

    fn user(email: &str) -> User {
        User {
            id: 0,
            email: email.into(),
            password_hash: String::new(),
            first_name: "Test".into(),
            last_name: "User".into(),
            phone: None,
            avatar: None,
            bio: None,
            is_host: false,
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn fixture(gateway: SimulatedGateway) -> anyhow::Result<Fixture> {
        let dir = std::env::temp_dir().join(format!("stayhub_payments_{}", uuid::Uuid::new_v4()));
        let store = DataStore::open(&dir).await?;
        store.collection::<User>().create(user("host@example.com")).await?;
        store.collection::<User>().create(user("guest@example.com")).await?;
        store.collection::<Property>().create(property(100.0)).await?;

        let bookings = BookingService::new(&store);
        let payments = PaymentService::new(
            &store,
            bookings.clone(),
            NotificationService::new(&store),
            Arc::new(gateway),
        );
        Ok(Fixture { payments, bookings, store, dir })
    }

    async fn book(f: &Fixture) -> anyhow::Result<Booking> {
        let check_in = Utc::now().date_naive() + Duration::days(7);
        Ok(f.bookings
            .create_booking(
                2,
                CreateBookingRequest {
                    property_id: 1,
                    check_in: check_in.to_string(),
                    check_out: (check_in + Duration::days(2)).to_string(),
                    number_of_guests: 2,
                    total_price: None,
                    special_requests: None,
                },
            )
            .await?)
    }

    fn charge(booking_id: i64, amount: f64) -> CreatePaymentRequest {
        CreatePaymentRequest {
            booking_id,
            amount,
            payment_method: PaymentMethod::CreditCard,
            currency: None,
        }
    }

    fn refund(amount: Option<f64>) -> RefundRequest {
        RefundRequest {
            amount,
            reason: "Change of plans".into(),
        }
    }

    #[test]
    fn transaction_id_format() {
        let id = transaction_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TXN");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn simulated_gateway_limits() {
        let gateway = SimulatedGateway::new(1.0, 1.0);
        assert_eq!(gateway.charge(0.0).error.as_deref(), Some("Invalid amount"));
        assert_eq!(gateway.charge(10_000.01).error.as_deref(), Some("Amount exceeds limit"));
        let ok = gateway.charge(250.0);
        assert!(ok.success);
        assert!(ok.gateway_transaction_id.is_some_and(|id| id.starts_with("GTW_")));
        assert!(gateway.refund(10.0).gateway_transaction_id.is_some_and(|id| id.starts_with("RFD_")));

        let never = SimulatedGateway::new(0.0, 0.0);
        assert!(!never.charge(10.0).success);
        assert!(!never.refund(10.0).success);
    }

    #[tokio::test]
    async fn successful_charge_confirms_booking() -> anyhow::Result<()> {
        let f = fixture(SimulatedGateway::new(1.0, 1.0)).await?;
        let booking = book(&f).await?;

        assert!(matches!(
            f.payments.process_payment(1, charge(booking.id, 230.0)).await,
            Err(AppError::Forbidden)
        ));

        let payment = f.payments.process_payment(2, charge(booking.id, 230.0)).await?;
        assert_eq!(payment.status, TransactionStatus::Completed);
        assert_eq!(payment.currency, "USD");
        assert!(payment.transaction_id.starts_with("TXN_"));

        let booking = f.bookings.get(booking.id).await?;
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, BookingPaymentStatus::Paid);

        let notes = f
            .store
            .collection::<crate::models::Notification>()
            .find_by(|n| n.user_id == 2)
            .await?;
        assert_eq!(notes.len(), 1);

        let _ = tokio::fs::remove_dir_all(&f.dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn declined_charge_is_recorded() -> anyhow::Result<()> {
        let f = fixture(SimulatedGateway::new(0.0, 0.0)).await?;
        let booking = book(&f).await?;

        let payment = f.payments.process_payment(2, charge(booking.id, 230.0)).await?;
        assert_eq!(payment.status, TransactionStatus::Failed);
        assert!(payment.error_message.is_some());
        assert_eq!(
            f.bookings.get(booking.id).await?.payment_status,
            BookingPaymentStatus::Pending
        );

        assert!(matches!(
            f.payments.initiate_refund(None, payment.id, refund(None)).await,
            Err(AppError::Validation(msg)) if msg == "Can only refund completed payments"
        ));

        let _ = tokio::fs::remove_dir_all(&f.dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn refunds_never_exceed_the_charge() -> anyhow::Result<()> {
        let f = fixture(SimulatedGateway::new(1.0, 1.0)).await?;
        let booking = book(&f).await?;
        let payment = f.payments.process_payment(2, charge(booking.id, 200.0)).await?;

        let first = f.payments.initiate_refund(Some(2), payment.id, refund(Some(150.0))).await?;
        assert_eq!(first.amount, -150.0);
        assert_eq!(first.original_payment_id, Some(payment.id));

        assert!(matches!(
            f.payments.initiate_refund(Some(2), payment.id, refund(Some(100.0))).await,
            Err(AppError::Validation(msg)) if msg == "Refund amount exceeds original payment"
        ));
        assert!(matches!(
            f.payments.initiate_refund(Some(2), payment.id, refund(Some(-5.0))).await,
            Err(AppError::Validation(msg)) if msg == "Invalid refund amount"
        ));
        assert_eq!(
            f.bookings.get(booking.id).await?.payment_status,
            BookingPaymentStatus::Paid
        );

        let last = f.payments.initiate_refund(Some(2), payment.id, refund(None)).await?;
        assert_eq!(last.amount, -50.0);
        assert_eq!(
            f.bookings.get(booking.id).await?.payment_status,
            BookingPaymentStatus::Refunded
        );

        assert!(matches!(
            f.payments.initiate_refund(Some(2), payment.id, refund(None)).await,
            Err(AppError::Validation(msg)) if msg == "Invalid refund amount"
        ));

        let report = f.payments.get_payment_analytics(None, None).await?;
        assert_eq!(report.total_payments, 1);
        assert_eq!(report.total_refunds, 2);
        assert_eq!(report.total_revenue, 200.0);
        assert_eq!(report.total_refunded, 200.0);
        assert_eq!(report.net_revenue, 0.0);
        assert_eq!(report.success_rate, 100.0);
        assert_eq!(report.payment_method_breakdown.get("credit_card"), Some(&1));

        let mine = f.payments.get_user_payments(2, Pagination::default()).await?;
        assert_eq!(mine.total, 3);
        assert!(mine.items.iter().all(|p| p.booking_details.is_some()));

        let _ = tokio::fs::remove_dir_all(&f.dir).await;
        Ok(())
    }
}
