use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use validator::Validate;

use crate::{
    dto::reviews::{
        CreateReviewRequest, RatingStatistics, RatingTrend, ReviewWithGuest, ReviewWithProperty,
        ReviewsSummary,
    },
    error::{AppError, AppResult},
    models::{
        Booking, BookingStatus, NotificationKind, Property, PropertySummary, Review, User,
        UserSummary,
    },
    response::Page,
    routes::params::Pagination,
    services::{base::BaseService, notification_service::NotificationService, pricing::round2},
    store::DataStore,
};

const TREND_WINDOW: usize = 10;
const TREND_THRESHOLD: f64 = 0.3;

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Average per category over the reviews that rated it.
pub fn category_averages(reviews: &[&Review]) -> BTreeMap<String, f64> {
    let mut averages = BTreeMap::new();
    if let Some(first) = reviews.first() {
        for (index, (name, _)) in first.categories().iter().enumerate() {
            let avg = mean(
                reviews
                    .iter()
                    .filter_map(|r| r.categories()[index].1)
                    .map(f64::from),
            );
            if let Some(avg) = avg {
                averages.insert((*name).to_string(), round2(avg));
            }
        }
    }
    averages
}

/// Recent ten vs the ten before them, newest first by `created_at`.
pub fn rating_trend(reviews: &[&Review]) -> RatingTrend {
    if reviews.len() < TREND_WINDOW {
        return RatingTrend::InsufficientData;
    }
    let mut sorted = reviews.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let recent = &sorted[..TREND_WINDOW];
    let previous = &sorted[TREND_WINDOW..sorted.len().min(TREND_WINDOW * 2)];
    let overall = |rs: &[&Review]| mean(rs.iter().map(|r| f64::from(r.overall_rating)));

    match (overall(recent), overall(previous)) {
        (Some(recent), Some(previous)) => {
            let diff = recent - previous;
            if diff > TREND_THRESHOLD {
                RatingTrend::Improving
            } else if diff < -TREND_THRESHOLD {
                RatingTrend::Declining
            } else {
                RatingTrend::Stable
            }
        }
        _ => RatingTrend::Stable,
    }
}

/// Statistics over the public reviews in `reviews`.
pub fn rating_statistics(reviews: &[Review]) -> RatingStatistics {
    let public: Vec<&Review> = reviews.iter().filter(|r| r.is_public).collect();

    let mut distribution: BTreeMap<String, usize> =
        (1..=5).map(|star: u8| (star.to_string(), 0)).collect();
    for review in &public {
        if let Some(count) = distribution.get_mut(&review.overall_rating.to_string()) {
            *count += 1;
        }
    }

    let average = mean(public.iter().map(|r| f64::from(r.overall_rating))).unwrap_or(0.0);

    RatingStatistics {
        total_reviews: public.len(),
        average_rating: round2(average),
        rating_distribution: distribution,
        category_averages: category_averages(&public),
        trend: rating_trend(&public),
    }
}

#[derive(Clone)]
pub struct ReviewService {
    base: BaseService<Review>,
    bookings: BaseService<Booking>,
    properties: BaseService<Property>,
    users: BaseService<User>,
    notifications: NotificationService,
}

impl ReviewService {
    pub fn new(store: &DataStore, notifications: NotificationService) -> Self {
        Self {
            base: BaseService::new(store, "review"),
            bookings: BaseService::new(store, "booking"),
            properties: BaseService::new(store, "property"),
            users: BaseService::new(store, "user"),
            notifications,
        }
    }

    pub async fn create_review(
        &self,
        guest_id: i64,
        req: CreateReviewRequest,
    ) -> AppResult<ReviewWithGuest> {
        req.validate()?;
        let comment = req.comment.trim().to_string();
        if comment.chars().count() < 10 {
            return Err(AppError::validation("Comment must be at least 10 characters long"));
        }

        let property = self.properties.find(req.property_id).await?.ok_or_else(|| {
            AppError::validation(format!("Property with ID {} not found", req.property_id))
        })?;
        let guest = self
            .users
            .find(guest_id)
            .await?
            .ok_or_else(|| AppError::validation(format!("User with ID {guest_id} not found")))?;
        let booking = self.bookings.find(req.booking_id).await?.ok_or_else(|| {
            AppError::validation(format!("Booking with ID {} not found", req.booking_id))
        })?;

        if booking.guest_id != guest_id {
            return Err(AppError::validation("You can only review your own bookings"));
        }
        if booking.property_id != property.id {
            return Err(AppError::validation("Booking does not match the property"));
        }
        if booking.status != BookingStatus::Completed {
            return Err(AppError::validation("You can only review completed bookings"));
        }

        let booking_id = booking.id;
        let host_id = property.host_id;
        let review = self
            .base
            .create_with(move |existing| {
                if existing.iter().any(|r| r.booking_id == booking_id) {
                    return Err(AppError::validation("Review already exists for this booking"));
                }
                Ok(Review {
                    id: 0,
                    property_id: property.id,
                    guest_id,
                    booking_id,
                    overall_rating: req.overall_rating,
                    cleanliness_rating: req.cleanliness_rating,
                    accuracy_rating: req.accuracy_rating,
                    communication_rating: req.communication_rating,
                    location_rating: req.location_rating,
                    check_in_rating: req.check_in_rating,
                    value_rating: req.value_rating,
                    comment,
                    is_public: req.is_public.unwrap_or(true),
                    host_response: None,
                    host_response_date: None,
                    flagged: false,
                    flag_reason: None,
                    flagged_by: None,
                    flagged_at: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
            .await?;

        tracing::info!(review_id = review.id, property_id = review.property_id, "review created");
        self.notifications
            .notify(
                host_id,
                NotificationKind::Review,
                "New review",
                format!("Your property received a {}-star review", review.overall_rating),
                Some(review.id),
            )
            .await;

        Ok(ReviewWithGuest {
            review,
            guest: Some(UserSummary::from(&guest)),
        })
    }

    pub async fn get_review(&self, id: i64) -> AppResult<Review> {
        self.base.get_by_id(id).await
    }

    async fn guests(&self) -> AppResult<HashMap<i64, User>> {
        Ok(self
            .users
            .all()
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }

    fn newest_first(reviews: &mut [Review]) {
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    }

    pub async fn get_property_reviews(
        &self,
        property_id: i64,
        pagination: Pagination,
        public_only: bool,
    ) -> AppResult<Page<ReviewWithGuest>> {
        let mut reviews = self
            .base
            .find_by(|r| r.property_id == property_id && (!public_only || r.is_public))
            .await?;
        Self::newest_first(&mut reviews);

        let (skip, limit) = pagination.window();
        let page = Page::slice(reviews, skip, limit);
        let guests = self.guests().await?;
        let items = page
            .items
            .into_iter()
            .map(|review| ReviewWithGuest {
                guest: guests.get(&review.guest_id).map(UserSummary::from),
                review,
            })
            .collect();
        Ok(Page::new(items, page.total))
    }

    pub async fn get_user_reviews(
        &self,
        user_id: i64,
        pagination: Pagination,
    ) -> AppResult<Page<ReviewWithProperty>> {
        let mut reviews = self.base.find_by(|r| r.guest_id == user_id).await?;
        Self::newest_first(&mut reviews);

        let (skip, limit) = pagination.window();
        let page = Page::slice(reviews, skip, limit);
        let properties: HashMap<i64, Property> = self
            .properties
            .all()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let items = page
            .items
            .into_iter()
            .map(|review| ReviewWithProperty {
                property: properties.get(&review.property_id).map(PropertySummary::from),
                review,
            })
            .collect();
        Ok(Page::new(items, page.total))
    }

    pub async fn get_review_statistics(&self, property_id: i64) -> AppResult<RatingStatistics> {
        let reviews = self.base.find_by(|r| r.property_id == property_id).await?;
        Ok(rating_statistics(&reviews))
    }

    pub async fn get_property_reviews_summary(&self, property_id: i64) -> AppResult<ReviewsSummary> {
        self.properties.get_by_id(property_id).await?;
        let reviews = self.base.find_by(|r| r.property_id == property_id).await?;
        let statistics = rating_statistics(&reviews);

        let public = reviews.iter().filter(|r| r.is_public).count();
        let responded = reviews
            .iter()
            .filter(|r| r.is_public && r.host_response.is_some())
            .count();
        let response_rate = if public == 0 {
            0.0
        } else {
            round2(responded as f64 / public as f64 * 100.0)
        };

        let recent = self
            .get_property_reviews(property_id, Pagination::new(Some(1), Some(5)), true)
            .await?
            .items;

        Ok(ReviewsSummary {
            statistics,
            recent_reviews: recent,
            response_rate,
        })
    }

    /// One response per review, only from the host of the reviewed property.
    pub async fn add_host_response(
        &self,
        review_id: i64,
        host_id: i64,
        response: &str,
    ) -> AppResult<Review> {
        let review = self.base.get_by_id(review_id).await?;
        let property = self.properties.get_by_id(review.property_id).await?;
        if property.host_id != host_id {
            return Err(AppError::Forbidden);
        }

        let response = response.trim().to_string();
        if response.chars().count() < 10 {
            return Err(AppError::validation("Host response must be at least 10 characters"));
        }

        let review = self
            .base
            .update(review_id, move |r| {
                if r.host_response.is_some() {
                    return Err(AppError::validation("Host response already exists"));
                }
                r.host_response = Some(response);
                r.host_response_date = Some(Utc::now());
                Ok(())
            })
            .await?;
        tracing::info!(review_id, host_id, "host responded to review");
        Ok(review)
    }

    pub async fn flag_review(&self, review_id: i64, reporter_id: i64, reason: &str) -> AppResult<Review> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(AppError::validation("Flag reason is required"));
        }
        let review = self
            .base
            .update(review_id, move |r| {
                r.flagged = true;
                r.flag_reason = Some(reason);
                r.flagged_by = Some(reporter_id);
                r.flagged_at = Some(Utc::now());
                Ok(())
            })
            .await?;
        tracing::warn!(review_id, reporter_id, "review flagged for moderation");
        Ok(review)
    }
}
