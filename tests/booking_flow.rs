use std::sync::Arc;

use chrono::{Duration, Utc};
use stayhub_api::{
    config::AppConfig,
    dto::{
        auth::{LoginRequest, RegisterRequest},
        bookings::CreateBookingRequest,
        payments::{CreatePaymentRequest, RefundRequest},
        properties::CreatePropertyRequest,
        reviews::CreateReviewRequest,
    },
    error::AppError,
    models::{BookingPaymentStatus, BookingStatus, PaymentMethod, TransactionStatus},
    routes::params::Pagination,
    services::payment_service::SimulatedGateway,
    state::AppState,
    store::DataStore,
};

async fn setup() -> anyhow::Result<(AppState, std::path::PathBuf)> {
    let dir = std::env::temp_dir().join(format!("stayhub_flow_{}", uuid::Uuid::new_v4()));
    let config = AppConfig::for_data_dir(&dir, "flow-secret");
    let store = DataStore::open(&dir).await?;
    let state = AppState::with_gateway(config, store, Arc::new(SimulatedGateway::new(1.0, 1.0)));
    Ok((state, dir))
}

fn register(email: &str, is_host: bool) -> RegisterRequest {
    RegisterRequest {
        email: email.into(),
        password: "password123".into(),
        first_name: "Test".into(),
        last_name: "User".into(),
        phone: None,
        is_host,
    }
}

fn listing() -> CreatePropertyRequest {
    CreatePropertyRequest {
        title: "Harbour flat".into(),
        description: "Two rooms by the harbour".into(),
        property_type: "apartment".into(),
        room_type: None,
        city: "Porto".into(),
        state: None,
        country: "Portugal".into(),
        location: None,
        price_per_night: 100.0,
        cleaning_fee: 0.0,
        service_fee: 0.0,
        max_guests: 3,
        bedrooms: 2,
        bathrooms: 1.0,
        amenities: vec!["WiFi".into()],
        images: vec![],
        availability: None,
    }
}

fn review(property_id: i64, booking_id: i64, rating: u8) -> CreateReviewRequest {
    CreateReviewRequest {
        property_id,
        booking_id,
        overall_rating: rating,
        cleanliness_rating: Some(rating),
        accuracy_rating: None,
        communication_rating: None,
        location_rating: None,
        check_in_rating: None,
        value_rating: None,
        comment: "Lovely stay, would come back.".into(),
        is_public: None,
    }
}

// Guest books -> pays -> host completes -> guest reviews -> partial refunds.
#[tokio::test]
async fn book_pay_review_and_refund_flow() -> anyhow::Result<()> {
    let (state, dir) = setup().await?;

    let host = state.auth.register_user(register("host@example.com", true)).await?;
    let guest = state.auth.register_user(register("Guest@Example.com ", false)).await?;
    assert_eq!(guest.email, "guest@example.com");
    assert!(matches!(
        state.auth.register_user(register("GUEST@example.com", false)).await,
        Err(AppError::Conflict(_))
    ));

    let token = state
        .auth
        .login_user(LoginRequest {
            email: "guest@example.com".into(),
            password: "password123".into(),
        })
        .await?;
    let current = state.auth.get_current_user_from_token(&token.access_token).await?;
    assert_eq!(current.id, guest.id);

    let property = state.properties.create_property(host.id, listing()).await?;

    let check_in = Utc::now().date_naive() + Duration::days(14);
    let check_out = check_in + Duration::days(3);
    let booking = state
        .bookings
        .create_booking(
            guest.id,
            CreateBookingRequest {
                property_id: property.id,
                check_in: check_in.to_string(),
                check_out: check_out.to_string(),
                number_of_guests: 2,
                total_price: None,
                special_requests: None,
            },
        )
        .await?;
    assert_eq!(booking.total_price, 345.0);
    assert_eq!(booking.status, BookingStatus::Pending);

    // Back-to-back stay starting on the check-out day is allowed.
    assert!(state.bookings.is_available(property.id, check_out, check_out + Duration::days(2)).await?);
    assert!(!state.bookings.is_available(property.id, check_in + Duration::days(1), check_out).await?);

    let payment = state
        .payments
        .process_payment(
            guest.id,
            CreatePaymentRequest {
                booking_id: booking.id,
                amount: booking.total_price,
                payment_method: PaymentMethod::Paypal,
                currency: Some("eur".into()),
            },
        )
        .await?;
    assert_eq!(payment.status, TransactionStatus::Completed);
    assert_eq!(payment.currency, "EUR");
    let paid = state.bookings.get(booking.id).await?;
    assert_eq!(paid.status, BookingStatus::Confirmed);
    assert_eq!(paid.payment_status, BookingPaymentStatus::Paid);

    assert!(matches!(
        state.reviews.create_review(guest.id, review(property.id, booking.id, 5)).await,
        Err(AppError::Validation(_))
    ));
    state.bookings.complete_booking(host.id, booking.id).await?;
    let created = state
        .reviews
        .create_review(guest.id, review(property.id, booking.id, 4))
        .await?;
    assert_eq!(created.guest.as_ref().map(|g| g.id), Some(guest.id));
    assert!(matches!(
        state.reviews.create_review(guest.id, review(property.id, booking.id, 5)).await,
        Err(AppError::Validation(msg)) if msg == "Review already exists for this booking"
    ));

    let details = state.properties.get_property_details(property.id).await?;
    assert_eq!(details.review_stats.total_reviews, 1);
    assert_eq!(details.review_stats.average_rating, 4.0);
    assert_eq!(details.recent_reviews.len(), 1);

    let host_inbox = state.notifications.list(host.id, Some(false), Pagination::default()).await?;
    assert_eq!(host_inbox.total, 1);

    let refund = state
        .payments
        .initiate_refund(
            Some(guest.id),
            payment.id,
            RefundRequest {
                amount: Some(100.0),
                reason: "Left a day early".into(),
            },
        )
        .await?;
    assert_eq!(refund.amount, -100.0);
    assert!(matches!(
        state
            .payments
            .initiate_refund(
                Some(guest.id),
                payment.id,
                RefundRequest {
                    amount: Some(300.0),
                    reason: "Too much".into(),
                },
            )
            .await,
        Err(AppError::Validation(_))
    ));

    let history = state.payments.get_booking_payments(host.id, booking.id).await?;
    assert_eq!(history.len(), 2);
    let guest_inbox = state.notifications.unread_count(guest.id).await?;
    assert_eq!(guest_inbox, 2);

    let _ = tokio::fs::remove_dir_all(dir).await;
    Ok(())
}

#[tokio::test]
async fn concurrent_bookings_for_same_dates_admit_one() -> anyhow::Result<()> {
    let (state, dir) = setup().await?;
    let host = state.auth.register_user(register("host@example.com", true)).await?;
    let property = state.properties.create_property(host.id, listing()).await?;

    let mut guests = Vec::new();
    for i in 0..5 {
        let guest = state
            .auth
            .register_user(register(&format!("guest{i}@example.com"), false))
            .await?;
        guests.push(guest.id);
    }

    let check_in = Utc::now().date_naive() + Duration::days(30);
    let mut handles = Vec::new();
    for guest_id in guests {
        let bookings = state.bookings.clone();
        let request = CreateBookingRequest {
            property_id: property.id,
            check_in: check_in.to_string(),
            check_out: (check_in + Duration::days(2)).to_string(),
            number_of_guests: 1,
            total_price: None,
            special_requests: None,
        };
        handles.push(tokio::spawn(async move {
            bookings.create_booking(guest_id, request).await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => return Err(other.into()),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 4);

    let _ = tokio::fs::remove_dir_all(dir).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_for_one_booking_charge_once() -> anyhow::Result<()> {
    let (state, dir) = setup().await?;
    let host = state.auth.register_user(register("host@example.com", true)).await?;
    let guest = state.auth.register_user(register("guest@example.com", false)).await?;
    let property = state.properties.create_property(host.id, listing()).await?;

    let check_in = Utc::now().date_naive() + Duration::days(20);
    let booking = state
        .bookings
        .create_booking(
            guest.id,
            CreateBookingRequest {
                property_id: property.id,
                check_in: check_in.to_string(),
                check_out: (check_in + Duration::days(2)).to_string(),
                number_of_guests: 1,
                total_price: None,
                special_requests: None,
            },
        )
        .await?;

    let guest_id = guest.id;
    let mut handles = Vec::new();
    for _ in 0..4 {
        let payments = state.payments.clone();
        let request = CreatePaymentRequest {
            booking_id: booking.id,
            amount: booking.total_price,
            payment_method: PaymentMethod::CreditCard,
            currency: None,
        };
        handles.push(tokio::spawn(async move {
            payments.process_payment(guest_id, request).await
        }));
    }

    let mut charged = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await? {
            Ok(payment) if payment.status == TransactionStatus::Completed => charged += 1,
            Err(AppError::Conflict(_) | AppError::Validation(_)) => rejected += 1,
            other => return Err(anyhow::anyhow!("unexpected outcome: {other:?}")),
        }
    }
    assert_eq!(charged, 1);
    assert_eq!(rejected, 3);

    let recorded = state.payments.get_booking_payments(guest_id, booking.id).await?;
    assert_eq!(recorded.len(), 1);

    let _ = tokio::fs::remove_dir_all(dir).await;
    Ok(())
}
