use std::collections::HashMap;

use chrono::Utc;
use validator::Validate;

use crate::{
    dto::bookings::{BookingPrice, BookingWithGuest, BookingWithProperty, CreateBookingRequest},
    error::{AppError, AppResult},
    models::{
        Booking, BookingPaymentStatus, BookingStatus, Property, PropertySummary, User, UserSummary,
    },
    services::{availability, base::BaseService, pricing},
    store::{CollectionStats, DataStore},
};

#[derive(Clone)]
pub struct BookingService {
    base: BaseService<Booking>,
    properties: BaseService<Property>,
    users: BaseService<User>,
}

impl BookingService {
    pub fn new(store: &DataStore) -> Self {
        Self {
            base: BaseService::new(store, "booking"),
            properties: BaseService::new(store, "property"),
            users: BaseService::new(store, "user"),
        }
    }

    pub async fn create_booking(
        &self,
        guest_id: i64,
        req: CreateBookingRequest,
    ) -> AppResult<Booking> {
        req.validate()?;

        let property = self
            .properties
            .find(req.property_id)
            .await?
            .ok_or_else(|| {
                AppError::validation(format!("Property with ID {} not found", req.property_id))
            })?;
        if self.users.find(guest_id).await?.is_none() {
            return Err(AppError::validation(format!("User with ID {guest_id} not found")));
        }

        let (check_in, check_out) = availability::parse_range(&req.check_in, &req.check_out)?;
        if check_in < Utc::now().date_naive() {
            return Err(AppError::validation("Check-in date cannot be in the past"));
        }
        if req.number_of_guests < 1 {
            return Err(AppError::validation("Number of guests must be at least 1"));
        }
        if req.number_of_guests > property.max_guests {
            return Err(AppError::validation(format!(
                "Property can accommodate maximum {} guests",
                property.max_guests
            )));
        }
        if !property.is_active {
            return Err(AppError::validation("Property is not accepting bookings"));
        }

        let total_price = match req.total_price {
            Some(price) if price > 0.0 => pricing::round2(price),
            _ => pricing::booking_price(&property, check_in, check_out).total_price,
        };

        let booking = self
            .base
            .create_with(move |existing| {
                if !availability::is_available(existing, property.id, check_in, check_out) {
                    return Err(AppError::conflict("Property is not available for selected dates"));
                }
                Ok(Booking {
                    id: 0,
                    guest_id,
                    property_id: property.id,
                    check_in,
                    check_out,
                    number_of_guests: req.number_of_guests,
                    total_price,
                    status: BookingStatus::Pending,
                    payment_status: BookingPaymentStatus::Pending,
                    special_requests: req.special_requests,
                    cancellation_reason: None,
                    cancelled_at: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
            .await?;

        tracing::info!(
            booking_id = booking.id,
            property_id = booking.property_id,
            guest_id,
            total_price = booking.total_price,
            "booking created"
        );
        Ok(booking)
    }

    pub async fn get(&self, id: i64) -> AppResult<Booking> {
        self.base.get_by_id(id).await
    }

    /// Readable by its guest and by the host of the booked property.
    pub async fn get_for_user(&self, user_id: i64, id: i64) -> AppResult<Booking> {
        let booking = self.base.get_by_id(id).await?;
        if booking.guest_id == user_id || self.is_host_of(user_id, &booking).await? {
            return Ok(booking);
        }
        Err(AppError::Forbidden)
    }

    async fn is_host_of(&self, user_id: i64, booking: &Booking) -> AppResult<bool> {
        Ok(self
            .properties
            .find(booking.property_id)
            .await?
            .is_some_and(|p| p.host_id == user_id))
    }

    async fn ensure_host(&self, user_id: i64, booking: &Booking) -> AppResult<()> {
        if self.is_host_of(user_id, booking).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub async fn is_available(
        &self,
        property_id: i64,
        check_in: chrono::NaiveDate,
        check_out: chrono::NaiveDate,
    ) -> AppResult<bool> {
        let bookings = self.base.find_by(|b| b.property_id == property_id).await?;
        Ok(availability::is_available(&bookings, property_id, check_in, check_out))
    }

    pub async fn calculate_total_price(
        &self,
        property_id: i64,
        check_in: &str,
        check_out: &str,
    ) -> AppResult<BookingPrice> {
        let property = self
            .properties
            .find(property_id)
            .await?
            .ok_or_else(|| AppError::validation("Property not found"))?;
        let (check_in, check_out) = availability::parse_range(check_in, check_out)?;
        Ok(pricing::booking_price(&property, check_in, check_out))
    }

    pub async fn get_user_bookings(
        &self,
        user_id: i64,
        status: Option<BookingStatus>,
    ) -> AppResult<Vec<BookingWithProperty>> {
        let mut bookings = self
            .base
            .find_by(|b| b.guest_id == user_id && status.is_none_or(|s| b.status == s))
            .await?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let properties: HashMap<i64, Property> = self
            .properties
            .all()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(bookings
            .into_iter()
            .map(|booking| BookingWithProperty {
                property: properties.get(&booking.property_id).map(PropertySummary::from),
                booking,
            })
            .collect())
    }

    /// Bookings of a property with guest details; host only.
    pub async fn get_property_bookings(
        &self,
        host_id: i64,
        property_id: i64,
        status: Option<BookingStatus>,
    ) -> AppResult<Vec<BookingWithGuest>> {
        let property = self.properties.get_by_id(property_id).await?;
        if property.host_id != host_id {
            return Err(AppError::Forbidden);
        }

        let mut bookings = self
            .base
            .find_by(|b| b.property_id == property_id && status.is_none_or(|s| b.status == s))
            .await?;
        bookings.sort_by_key(|b| b.check_in);

        let users: HashMap<i64, User> = self
            .users
            .all()
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(bookings
            .into_iter()
            .map(|booking| BookingWithGuest {
                guest: users.get(&booking.guest_id).map(UserSummary::from),
                booking,
            })
            .collect())
    }

    pub async fn confirm_booking(&self, host_id: i64, id: i64) -> AppResult<Booking> {
        let booking = self.base.get_by_id(id).await?;
        self.ensure_host(host_id, &booking).await?;
        let booking = self.transition(id, BookingStatus::Pending, BookingStatus::Confirmed).await?;
        tracing::info!(booking_id = id, "booking confirmed");
        Ok(booking)
    }

    pub async fn complete_booking(&self, host_id: i64, id: i64) -> AppResult<Booking> {
        let booking = self.base.get_by_id(id).await?;
        self.ensure_host(host_id, &booking).await?;
        let booking = self.transition(id, BookingStatus::Confirmed, BookingStatus::Completed).await?;
        tracing::info!(booking_id = id, "booking completed");
        Ok(booking)
    }

    async fn transition(&self, id: i64, from: BookingStatus, to: BookingStatus) -> AppResult<Booking> {
        self.base
            .update(id, move |b| {
                if b.status != from {
                    return Err(AppError::validation(match from {
                        BookingStatus::Pending => "Only pending bookings can be confirmed",
                        _ => "Only confirmed bookings can be completed",
                    }));
                }
                b.status = to;
                Ok(())
            })
            .await
    }

    pub async fn cancel_booking(
        &self,
        user_id: i64,
        id: i64,
        reason: Option<String>,
    ) -> AppResult<Booking> {
        self.get_for_user(user_id, id).await?;
        let booking = self
            .base
            .update(id, move |b| {
                if matches!(b.status, BookingStatus::Cancelled | BookingStatus::Completed) {
                    return Err(AppError::validation("Booking cannot be cancelled"));
                }
                b.status = BookingStatus::Cancelled;
                if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
                    b.cancellation_reason = Some(reason);
                }
                b.cancelled_at = Some(Utc::now());
                Ok(())
            })
            .await?;
        tracing::info!(booking_id = id, cancelled_by = user_id, "booking cancelled");
        Ok(booking)
    }

    /// A settled charge confirms a pending booking.
    pub async fn mark_paid(&self, id: i64) -> AppResult<Booking> {
        let booking = self
            .base
            .update(id, |b| {
                if b.status == BookingStatus::Pending {
                    b.status = BookingStatus::Confirmed;
                }
                b.payment_status = BookingPaymentStatus::Paid;
                Ok(())
            })
            .await?;
        tracing::info!(booking_id = id, "booking paid");
        Ok(booking)
    }

    pub async fn mark_refunded(&self, id: i64) -> AppResult<Booking> {
        self.base
            .update(id, |b| {
                b.payment_status = BookingPaymentStatus::Refunded;
                Ok(())
            })
            .await
    }

    pub async fn stats(&self) -> AppResult<CollectionStats> {
        self.base.stats().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::services::pricing::tests::property;

    struct Fixture {
        service: BookingService,
        dir: std::path::PathBuf,
        host: i64,
        guest: i64,
        property: i64,
    }

    async fn fixture() -> anyhow::Result<Fixture> {
        let dir = std::env::temp_dir().join(format!("stayhub_booking_{}", uuid::Uuid::new_v4()));
        let store = DataStore::open(&dir).await?;
        let users = store.collection::<User>();
        let mut ids = Vec::new();
        for email in ["host@example.com", "guest@example.com"] {
            let user = users
                .create(User {
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
                })
                .await?;
            ids.push(user.id);
        }
        let mut listing = property(100.0);
        listing.host_id = ids[0];
        let listing = store.collection::<Property>().create(listing).await?;

        Ok(Fixture {
            service: BookingService::new(&store),
            dir,
            host: ids[0],
            guest: ids[1],
            property: listing.id,
        })
    }

    fn request(property_id: i64, from_today: i64, nights: i64) -> CreateBookingRequest {
        let check_in = Utc::now().date_naive() + Duration::days(from_today);
        CreateBookingRequest {
            property_id,
            check_in: check_in.to_string(),
            check_out: (check_in + Duration::days(nights)).to_string(),
            number_of_guests: 2,
            total_price: None,
            special_requests: None,
        }
    }

    #[tokio::test]
    async fn create_computes_price_and_blocks_overlaps() -> anyhow::Result<()> {
        let f = fixture().await?;

        let booking = f.service.create_booking(f.guest, request(f.property, 10, 3)).await?;
        assert_eq!(booking.total_price, 345.0);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, BookingPaymentStatus::Pending);

        let overlap = f.service.create_booking(f.guest, request(f.property, 12, 2)).await;
        assert!(matches!(overlap, Err(AppError::Conflict(_))));

        // Starts on the previous checkout day.
        let back_to_back = f.service.create_booking(f.guest, request(f.property, 13, 2)).await?;
        assert_eq!(back_to_back.id, 2);

        let _ = tokio::fs::remove_dir_all(f.dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn create_rejects_invalid_requests() -> anyhow::Result<()> {
        let f = fixture().await?;

        let past = f.service.create_booking(f.guest, request(f.property, -1, 2)).await;
        assert!(matches!(past, Err(AppError::Validation(m)) if m == "Check-in date cannot be in the past"));

        let mut crowded = request(f.property, 5, 2);
        crowded.number_of_guests = 9;
        assert!(matches!(
            f.service.create_booking(f.guest, crowded).await,
            Err(AppError::Validation(_))
        ));

        let mut reversed = request(f.property, 5, 2);
        std::mem::swap(&mut reversed.check_in, &mut reversed.check_out);
        assert!(f.service.create_booking(f.guest, reversed).await.is_err());

        let mut bad_date = request(f.property, 5, 2);
        bad_date.check_in = "next tuesday".into();
        assert!(matches!(
            f.service.create_booking(f.guest, bad_date).await,
            Err(AppError::Validation(m)) if m.starts_with("Invalid date format")
        ));

        let missing = f.service.create_booking(f.guest, request(999, 5, 2)).await;
        assert!(matches!(missing, Err(AppError::Validation(m)) if m == "Property with ID 999 not found"));

        let _ = tokio::fs::remove_dir_all(f.dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn lifecycle_respects_roles_and_states() -> anyhow::Result<()> {
        let f = fixture().await?;
        let booking = f.service.create_booking(f.guest, request(f.property, 3, 2)).await?;

        assert!(matches!(
            f.service.confirm_booking(f.guest, booking.id).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            f.service.complete_booking(f.host, booking.id).await,
            Err(AppError::Validation(_))
        ));

        let confirmed = f.service.confirm_booking(f.host, booking.id).await?;
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        let completed = f.service.complete_booking(f.host, booking.id).await?;
        assert_eq!(completed.status, BookingStatus::Completed);

        let cancel = f.service.cancel_booking(f.guest, booking.id, None).await;
        assert!(matches!(cancel, Err(AppError::Validation(m)) if m == "Booking cannot be cancelled"));

        let other = f.service.create_booking(f.guest, request(f.property, 20, 2)).await?;
        let cancelled = f
            .service
            .cancel_booking(f.guest, other.id, Some("Change of plans".into()))
            .await?;
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Change of plans"));
        assert!(cancelled.cancelled_at.is_some());

        // Cancelled dates can be booked again.
        f.service.create_booking(f.guest, request(f.property, 20, 2)).await?;

        let mine = f.service.get_user_bookings(f.guest, None).await?;
        assert_eq!(mine.len(), 3);
        assert!(mine.iter().all(|b| b.property.is_some()));

        let by_host = f
            .service
            .get_property_bookings(f.host, f.property, Some(BookingStatus::Pending))
            .await?;
        assert_eq!(by_host.len(), 1);
        assert_eq!(by_host[0].guest.as_ref().map(|g| g.id), Some(f.guest));

        let _ = tokio::fs::remove_dir_all(f.dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn payment_only_promotes_pending_bookings() -> anyhow::Result<()> {
        let f = fixture().await?;

        let pending = f.service.create_booking(f.guest, request(f.property, 4, 2)).await?;
        let paid = f.service.mark_paid(pending.id).await?;
        assert_eq!(paid.status, BookingStatus::Confirmed);
        assert_eq!(paid.payment_status, BookingPaymentStatus::Paid);

        let stay = f.service.create_booking(f.guest, request(f.property, 10, 2)).await?;
        f.service.confirm_booking(f.host, stay.id).await?;
        f.service.complete_booking(f.host, stay.id).await?;
        let settled = f.service.mark_paid(stay.id).await?;
        assert_eq!(settled.status, BookingStatus::Completed);
        assert_eq!(settled.payment_status, BookingPaymentStatus::Paid);

        let _ = tokio::fs::remove_dir_all(f.dir).await;
        Ok(())
    }
}
