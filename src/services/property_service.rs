use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Utc};
use validator::Validate;

use crate::{
    dto::{
        properties::{
            AvailabilityResponse, CalendarResponse, CreatePropertyRequest, DateOption,
            PriceQuote, PropertyDetails, PropertySearchQuery, ReviewStatsSummary,
            UpdatePropertyRequest,
        },
        reviews::ReviewWithGuest,
    },
    error::{AppError, AppResult},
    models::{Booking, Property, Review, User, UserSummary},
    response::Page,
    routes::params::Pagination,
    services::{availability, base::BaseService, pricing, review_service},
    store::{CollectionStats, DataStore},
};

const PREVIEW_DAYS: i64 = 30;
const MAX_CALENDAR_DAYS: i64 = 366;
const DAYS_PER_MONTH: i64 = 30;

fn required(value: String, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("Field '{field}' is required")));
    }
    Ok(trimmed.to_string())
}

/// Nightly rates are stored to the cent and must stay positive after rounding.
fn nightly_rate(price: f64) -> AppResult<f64> {
    let rounded = pricing::round2(price);
    if rounded <= 0.0 {
        return Err(AppError::validation("Price per night must be greater than 0"));
    }
    Ok(rounded)
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Parsed form of the date part of a search.
struct StayWindow {
    dates: Option<(NaiveDate, NaiveDate)>,
}

#[derive(Clone)]
pub struct PropertyService {
    base: BaseService<Property>,
    users: BaseService<User>,
    bookings: BaseService<Booking>,
    reviews: BaseService<Review>,
}

impl PropertyService {
    pub fn new(store: &DataStore) -> Self {
        Self {
            base: BaseService::new(store, "property"),
            users: BaseService::new(store, "user"),
            bookings: BaseService::new(store, "booking"),
            reviews: BaseService::new(store, "review"),
        }
    }

    pub async fn create_property(
        &self,
        host_id: i64,
        req: CreatePropertyRequest,
    ) -> AppResult<Property> {
        req.validate()?;
        if self.users.find(host_id).await?.is_none() {
            return Err(AppError::validation(format!("User with ID {host_id} not found")));
        }
        let rules = req.availability.unwrap_or_default();
        if rules.minimum_stay == 0 || rules.maximum_stay < rules.minimum_stay {
            return Err(AppError::validation("Invalid minimum/maximum stay"));
        }

        let title = required(req.title, "title")?;
        let description = required(req.description, "description")?;
        let property_type = required(req.property_type, "property_type")?;
        let city = required(req.city, "city")?;
        let country = required(req.country, "country")?;
        let price_per_night = nightly_rate(req.price_per_night)?;

        let property = self
            .base
            .create_with(move |_| {
                Ok(Property {
                    id: 0,
                    host_id,
                    title,
                    description,
                    property_type,
                    room_type: req.room_type,
                    city,
                    state: req.state,
                    country,
                    location: req.location,
                    price_per_night,
                    cleaning_fee: req.cleaning_fee,
                    service_fee: req.service_fee,
                    max_guests: req.max_guests,
                    bedrooms: req.bedrooms,
                    bathrooms: req.bathrooms,
                    amenities: req.amenities,
                    images: req.images,
                    availability: rules,
                    is_active: true,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
            .await?;

        self.users
            .update(host_id, |u| {
                u.is_host = true;
                Ok(())
            })
            .await?;

        tracing::info!(property_id = property.id, host_id, "property created");
        Ok(property)
    }

    pub async fn get_property(&self, id: i64) -> AppResult<Property> {
        self.base.get_by_id(id).await
    }

    async fn owned(&self, host_id: i64, id: i64) -> AppResult<Property> {
        let property = self.base.get_by_id(id).await?;
        if property.host_id != host_id {
            return Err(AppError::Forbidden);
        }
        Ok(property)
    }

    pub async fn update_property(
        &self,
        host_id: i64,
        id: i64,
        req: UpdatePropertyRequest,
    ) -> AppResult<Property> {
        if req.is_empty() {
            return Err(AppError::validation("Data cannot be empty"));
        }
        req.validate()?;
        self.owned(host_id, id).await?;
        if let Some(rules) = &req.availability {
            if rules.minimum_stay == 0 || rules.maximum_stay < rules.minimum_stay {
                return Err(AppError::validation("Invalid minimum/maximum stay"));
            }
        }
        let title = req.title.map(|v| required(v, "title")).transpose()?;
        let description = req.description.map(|v| required(v, "description")).transpose()?;
        let property_type = req.property_type.map(|v| required(v, "property_type")).transpose()?;
        let city = req.city.map(|v| required(v, "city")).transpose()?;
        let country = req.country.map(|v| required(v, "country")).transpose()?;
        let price_per_night = req.price_per_night.map(nightly_rate).transpose()?;

        let property = self
            .base
            .update(id, move |p| {
                if let Some(v) = title {
                    p.title = v;
                }
                if let Some(v) = description {
                    p.description = v;
                }
                if let Some(v) = property_type {
                    p.property_type = v;
                }
                if let Some(v) = city {
                    p.city = v;
                }
                if let Some(v) = country {
                    p.country = v;
                }
                if req.room_type.is_some() {
                    p.room_type = req.room_type;
                }
                if req.state.is_some() {
                    p.state = req.state;
                }
                if req.location.is_some() {
                    p.location = req.location;
                }
                if let Some(v) = price_per_night {
                    p.price_per_night = v;
                }
                if let Some(v) = req.cleaning_fee {
                    p.cleaning_fee = v;
                }
                if let Some(v) = req.service_fee {
                    p.service_fee = v;
                }
                if let Some(v) = req.max_guests {
                    p.max_guests = v;
                }
                if let Some(v) = req.bedrooms {
                    p.bedrooms = v;
                }
                if let Some(v) = req.bathrooms {
                    p.bathrooms = v;
                }
                if let Some(v) = req.amenities {
                    p.amenities = v;
                }
                if let Some(v) = req.images {
                    p.images = v;
                }
                if let Some(v) = req.availability {
                    p.availability = v;
                }
                if let Some(v) = req.is_active {
                    p.is_active = v;
                }
                Ok(())
            })
            .await?;

        tracing::info!(property_id = id, host_id, "property updated");
        Ok(property)
    }

    pub async fn delete_property(&self, host_id: i64, id: i64) -> AppResult<()> {
        self.owned(host_id, id).await?;
        self.base.delete(id).await?;
        tracing::info!(property_id = id, host_id, "property deleted");
        Ok(())
    }

    pub async fn get_property_details(&self, id: i64) -> AppResult<PropertyDetails> {
        let property = self.base.get_by_id(id).await?;
        let reviews = self.reviews.find_by(|r| r.property_id == id).await?;
        let stats = review_service::rating_statistics(&reviews);

        let mut public: Vec<Review> = reviews.into_iter().filter(|r| r.is_public).collect();
        public.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        public.truncate(5);

        let guests: HashMap<i64, User> = self
            .users
            .all()
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let recent_reviews = public
            .into_iter()
            .map(|review| ReviewWithGuest {
                guest: guests.get(&review.guest_id).map(UserSummary::from),
                review,
            })
            .collect();

        let bookings = self.bookings.find_by(|b| b.property_id == id).await?;
        let today = Utc::now().date_naive();
        let availability_preview = availability::calendar(
            &property,
            &bookings,
            today,
            today + Duration::days(PREVIEW_DAYS - 1),
        );

        Ok(PropertyDetails {
            property,
            review_stats: ReviewStatsSummary {
                total_reviews: stats.total_reviews,
                average_rating: stats.average_rating,
                rating_breakdown: stats.category_averages,
            },
            recent_reviews,
            availability_preview,
        })
    }

    pub async fn search_properties(&self, query: PropertySearchQuery) -> AppResult<Page<Property>> {
        let window = StayWindow {
            dates: match (&query.check_in, &query.check_out) {
                (Some(check_in), Some(check_out)) => {
                    Some(availability::parse_range(check_in, check_out)?)
                }
                _ => None,
            },
        };
        let amenities = query.amenity_list();

        let properties = self.base.find_by(|p| p.is_active).await?;
        let bookings = if window.dates.is_some() {
            self.bookings.find_by(|b| b.status.is_active()).await?
        } else {
            Vec::new()
        };

        let matches: Vec<Property> = properties
            .into_iter()
            .filter(|p| matches_search(p, &query, &amenities, &window, &bookings))
            .collect();

        let (skip, limit) = Pagination::new(query.page, query.per_page).window();
        tracing::debug!(matches = matches.len(), "property search");
        Ok(Page::slice(matches, skip, limit))
    }

    /// Same city and type, closest nightly price first.
    pub async fn get_similar_properties(&self, id: i64, limit: usize) -> AppResult<Vec<Property>> {
        let target = self.base.get_by_id(id).await?;
        let mut similar = self
            .base
            .find_by(|p| {
                p.id != id
                    && p.is_active
                    && same_text(&p.city, &target.city)
                    && same_text(&p.property_type, &target.property_type)
            })
            .await?;
        similar.sort_by(|a, b| {
            let da = (a.price_per_night - target.price_per_night).abs();
            let db = (b.price_per_night - target.price_per_night).abs();
            da.total_cmp(&db)
        });
        similar.truncate(limit);
        Ok(similar)
    }

    pub async fn get_host_properties(
        &self,
        host_id: i64,
        pagination: Pagination,
    ) -> AppResult<Page<Property>> {
        let properties = self.base.find_by(|p| p.host_id == host_id).await?;
        let (skip, limit) = pagination.window();
        Ok(Page::slice(properties, skip, limit))
    }

    pub async fn availability(
        &self,
        id: i64,
        start: &str,
        end: &str,
    ) -> AppResult<AvailabilityResponse> {
        let property = self.base.get_by_id(id).await?;
        let (start_date, end_date) = availability::parse_range(start, end)?;
        let bookings = self.bookings.find_by(|b| b.property_id == id).await?;

        Ok(AvailabilityResponse {
            property_id: id,
            start_date,
            end_date,
            nights: pricing::nights(start_date, end_date),
            available: property.is_active
                && availability::is_available(&bookings, id, start_date, end_date),
        })
    }

    /// Per-day view of `start..=end`.
    pub async fn calendar(&self, id: i64, start: &str, end: &str) -> AppResult<CalendarResponse> {
        let property = self.base.get_by_id(id).await?;
        let start = availability::parse_date(start)?;
        let end = availability::parse_date(end)?;
        if end < start {
            return Err(AppError::validation("End date must not be before start date"));
        }
        if (end - start).num_days() >= MAX_CALENDAR_DAYS {
            return Err(AppError::validation(format!(
                "Date range cannot exceed {MAX_CALENDAR_DAYS} days"
            )));
        }

        let bookings = self.bookings.find_by(|b| b.property_id == id).await?;
        Ok(CalendarResponse {
            property_id: id,
            days: availability::calendar(&property, &bookings, start, end),
        })
    }

    pub async fn pricing_quote(&self, id: i64, start: &str, end: &str) -> AppResult<PriceQuote> {
        let property = self.base.get_by_id(id).await?;
        let (start, end) = availability::parse_range(start, end)?;
        Ok(pricing::quote(&property, start, end))
    }

    pub async fn stats(&self) -> AppResult<CollectionStats> {
        self.base.stats().await
    }
}

fn matches_search(
    p: &Property,
    q: &PropertySearchQuery,
    amenities: &[String],
    window: &StayWindow,
    bookings: &[Booking],
) -> bool {
    if let Some(location) = q
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("anywhere"))
    {
        let needle = location.to_lowercase();
        let address = p.location.as_ref().and_then(|l| l.address.as_deref());
        let haystack = [
            Some(p.city.as_str()),
            p.state.as_deref(),
            Some(p.country.as_str()),
            Some(p.title.as_str()),
            address,
        ];
        if !haystack
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
        {
            return false;
        }
    }

    let text_filters = [
        (q.city.as_deref(), Some(p.city.as_str())),
        (q.country.as_deref(), Some(p.country.as_str())),
        (q.property_type.as_deref(), Some(p.property_type.as_str())),
        (q.room_type.as_deref(), p.room_type.as_deref()),
    ];
    for (wanted, actual) in text_filters {
        if let Some(wanted) = wanted.filter(|w| !w.trim().is_empty()) {
            if !actual.is_some_and(|a| same_text(a, wanted)) {
                return false;
            }
        }
    }

    if q.min_price.is_some_and(|min| p.price_per_night < min)
        || q.max_price.is_some_and(|max| p.price_per_night > max)
        || q.guests.is_some_and(|g| g > p.max_guests)
        || q.bedrooms.is_some_and(|b| p.bedrooms < b)
        || q.bathrooms.is_some_and(|b| p.bathrooms < b)
        || q.instant_bookable.is_some_and(|i| p.availability.instant_book != i)
    {
        return false;
    }

    if !amenities.is_empty() {
        let have: Vec<String> = p.amenities.iter().map(|a| a.trim().to_lowercase()).collect();
        if !amenities.iter().all(|a| have.contains(a)) {
            return false;
        }
    }

    if let (Some(ne_lat), Some(ne_lng), Some(sw_lat), Some(sw_lng)) =
        (q.ne_lat, q.ne_lng, q.sw_lat, q.sw_lng)
    {
        let Some((lat, lng)) = p.coordinates() else {
            return false;
        };
        if lat < sw_lat || lat > ne_lat || lng < sw_lng || lng > ne_lng {
            return false;
        }
    }

    if let Some((check_in, check_out)) = window.dates {
        if !p.availability.allows(pricing::nights(check_in, check_out))
            || !availability::is_available(bookings, p.id, check_in, check_out)
        {
            return false;
        }
    }

    match q.date_option {
        Some(DateOption::Flexible) => {
            if let Some(duration) = q.stay_duration {
                if !p.availability.allows(duration.nights()) {
                    return false;
                }
            }
        }
        Some(DateOption::Month) => {
            let months = i64::from(q.month_duration.unwrap_or(1).max(1));
            let flex = i64::from(q.date_flexibility.unwrap_or(0));
            let lowest = (months * DAYS_PER_MONTH - flex).max(1);
            let highest = months * DAYS_PER_MONTH + flex;
            let min_stay = i64::from(p.availability.minimum_stay);
            let max_stay = i64::from(p.availability.maximum_stay);
            if highest < min_stay || lowest > max_stay {
                return false;
            }
        }
        Some(DateOption::Dates) | None => {}
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::properties::StayDuration,
        models::{BookingPaymentStatus, BookingStatus, Location, StayRules},
    };

    fn create(title: &str, city: &str, price: f64) -> CreatePropertyRequest {
        CreatePropertyRequest {
            title: title.into(),
            description: "A place to stay".into(),
            property_type: "apartment".into(),
            room_type: Some("entire_place".into()),
            city: city.into(),
            state: None,
            country: "Portugal".into(),
            location: None,
            price_per_night: price,
            cleaning_fee: 20.0,
            service_fee: 5.0,
            max_guests: 4,
            bedrooms: 2,
            bathrooms: 1.0,
            amenities: vec!["WiFi".into(), "Kitchen".into()],
            images: vec![],
            availability: None,
        }
    }

    async fn fixture() -> anyhow::Result<(PropertyService, DataStore, i64, std::path::PathBuf)> {
        let dir = std::env::temp_dir().join(format!("stayhub_props_{}", uuid::Uuid::new_v4()));
        let store = DataStore::open(&dir).await?;
        let host = store
            .collection::<User>()
            .create(User {
                id: 0,
                email: "host@example.com".into(),
                password_hash: String::new(),
                first_name: "Host".into(),
                last_name: "One".into(),
                phone: None,
                avatar: None,
                bio: None,
                is_host: false,
                is_verified: true,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await?;
        Ok((PropertyService::new(&store), store, host.id, dir))
    }

    #[tokio::test]
    async fn create_validates_and_marks_host() -> anyhow::Result<()> {
        let (service, store, host, dir) = fixture().await?;

        let mut free = create("Free", "Lisbon", 0.0);
        free.price_per_night = 0.0;
        assert!(matches!(service.create_property(host, free).await, Err(AppError::Validation(_))));

        let mut nobody = create("Empty", "Lisbon", 90.0);
        nobody.max_guests = 0;
        assert!(matches!(service.create_property(host, nobody).await, Err(AppError::Validation(_))));

        let created = service.create_property(host, create("Loft", "Lisbon", 90.0)).await?;
        assert_eq!(created.id, 1);
        let user = store.collection::<User>().find_by_id(host).await?;
        assert!(user.is_some_and(|u| u.is_host));

        let update = UpdatePropertyRequest {
            price_per_night: Some(110.0),
            ..Default::default()
        };
        assert!(matches!(
            service.update_property(host + 1, created.id, update.clone()).await,
            Err(AppError::Forbidden)
        ));
        let updated = service.update_property(host, created.id, update).await?;
        assert_eq!(updated.price_per_night, 110.0);

        let sub_cent = service
            .create_property(host, create("Tiny", "Lisbon", 0.004))
            .await;
        assert!(matches!(
            sub_cent,
            Err(AppError::Validation(m)) if m == "Price per night must be greater than 0"
        ));
        let sub_cent = UpdatePropertyRequest {
            price_per_night: Some(0.004),
            ..Default::default()
        };
        assert!(matches!(
            service.update_property(host, created.id, sub_cent).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(service.get_property(created.id).await?.price_per_night, 110.0);
        assert!(matches!(
            service.update_property(host, created.id, UpdatePropertyRequest::default()).await,
            Err(AppError::Validation(_))
        ));

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn search_combines_filters() -> anyhow::Result<()> {
        let (service, store, host, dir) = fixture().await?;
        let mut porto = create("River view", "Porto", 150.0);
        porto.location = Some(Location {
            address: Some("Rua das Flores".into()),
            lat: Some(41.14),
            lng: Some(-8.61),
        });
        porto.availability = Some(StayRules {
            minimum_stay: 3,
            maximum_stay: 14,
            instant_book: true,
        });
        porto.amenities.push("Pool".into());
        let porto = service.create_property(host, porto).await?;
        service.create_property(host, create("Old town", "Lisbon", 80.0)).await?;

        let by_location = service
            .search_properties(PropertySearchQuery {
                location: Some("flores".into()),
                ..Default::default()
            })
            .await?;
        assert_eq!(by_location.total, 1);

        let anywhere = service
            .search_properties(PropertySearchQuery {
                location: Some("Anywhere".into()),
                ..Default::default()
            })
            .await?;
        assert_eq!(anywhere.total, 2);

        let cheap = service
            .search_properties(PropertySearchQuery {
                max_price: Some(100.0),
                amenities: Some("wifi, kitchen".into()),
                ..Default::default()
            })
            .await?;
        assert_eq!(cheap.items.iter().map(|p| p.city.as_str()).collect::<Vec<_>>(), vec!["Lisbon"]);

        let pool = service
            .search_properties(PropertySearchQuery {
                amenities: Some("pool".into()),
                instant_bookable: Some(true),
                ..Default::default()
            })
            .await?;
        assert_eq!(pool.total, 1);

        let bounded = service
            .search_properties(PropertySearchQuery {
                ne_lat: Some(42.0),
                ne_lng: Some(-8.0),
                sw_lat: Some(41.0),
                sw_lng: Some(-9.0),
                ..Default::default()
            })
            .await?;
        assert_eq!(bounded.total, 1);

        let weekend = service
            .search_properties(PropertySearchQuery {
                date_option: Some(DateOption::Flexible),
                stay_duration: Some(StayDuration::Weekend),
                ..Default::default()
            })
            .await?;
        assert_eq!(weekend.total, 1);

        let check_in = Utc::now().date_naive() + Duration::days(10);
        store
            .collection::<Booking>()
            .create(Booking {
                id: 0,
                guest_id: host,
                property_id: porto.id,
                check_in,
                check_out: check_in + Duration::days(4),
                number_of_guests: 2,
                total_price: 600.0,
                status: BookingStatus::Confirmed,
                payment_status: BookingPaymentStatus::Paid,
                special_requests: None,
                cancellation_reason: None,
                cancelled_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await?;
        let dated = service
            .search_properties(PropertySearchQuery {
                check_in: Some((check_in + Duration::days(1)).to_string()),
                check_out: Some((check_in + Duration::days(5)).to_string()),
                ..Default::default()
            })
            .await?;
        assert_eq!(dated.items.iter().map(|p| p.city.as_str()).collect::<Vec<_>>(), vec!["Lisbon"]);

        let page = service
            .search_properties(PropertySearchQuery {
                page: Some(2),
                per_page: Some(1),
                ..Default::default()
            })
            .await?;
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn similar_calendar_and_quote() -> anyhow::Result<()> {
        let (service, _store, host, dir) = fixture().await?;
        let base = service.create_property(host, create("Base", "Lisbon", 100.0)).await?;
        service.create_property(host, create("Far", "Lisbon", 300.0)).await?;
        service.create_property(host, create("Near", "lisbon", 110.0)).await?;
        service.create_property(host, create("Elsewhere", "Porto", 100.0)).await?;

        let similar = service.get_similar_properties(base.id, 5).await?;
        let titles: Vec<&str> = similar.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Near", "Far"]);

        let days = service.calendar(base.id, "2030-03-08", "2030-03-10").await?;
        assert_eq!(days.days.len(), 3);
        assert_eq!(days.days[1].price, 120.0);

        let quote = service.pricing_quote(base.id, "2030-03-08", "2030-03-11").await?;
        assert_eq!(quote.total, 100.0 * 3.0 + 20.0 + 5.0 + 40.0);

        let details = service.get_property_details(base.id).await?;
        assert_eq!(details.availability_preview.len(), 30);
        assert_eq!(details.review_stats.total_reviews, 0);

        let open = service.availability(base.id, "2030-03-08", "2030-03-11").await?;
        assert!(open.available);
        assert_eq!(open.nights, 3);

        let hosted = service.get_host_properties(host, Pagination::default()).await?;
        assert_eq!(hosted.total, 4);

        service.delete_property(host, base.id).await?;
        assert!(matches!(service.get_property(base.id).await, Err(AppError::NotFound(_))));

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }
}
