use chrono::{Duration, Utc};
use stayhub_api::{
    config::AppConfig,
    dto::{
        auth::RegisterRequest,
        bookings::CreateBookingRequest,
        properties::CreatePropertyRequest,
        reviews::CreateReviewRequest,
    },
    models::{Location, StayRules, User},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let state = AppState::init(config).await?;

    let host = ensure_user(&state, "host@example.com", "host12345", "Helena", "Host", true).await?;
    let guest = ensure_user(&state, "guest@example.com", "guest12345", "Gabriel", "Guest", false).await?;

    let existing = state
        .properties
        .get_host_properties(host.id, Default::default())
        .await?;
    if existing.total > 0 {
        println!("Seed data already present for host {}", host.id);
        return Ok(());
    }

    let loft = state
        .properties
        .create_property(
            host.id,
            listing(
                "Riverside loft",
                "Lisbon",
                "apartment",
                120.0,
                Some((38.7075, -9.1364)),
                vec!["WiFi", "Kitchen", "Washer"],
            ),
        )
        .await?;
    state
        .properties
        .create_property(
            host.id,
            listing(
                "Hillside cottage",
                "Sintra",
                "house",
                180.0,
                Some((38.8029, -9.3817)),
                vec!["WiFi", "Fireplace", "Parking"],
            ),
        )
        .await?;
    state
        .properties
        .create_property(
            host.id,
            listing("Old town studio", "Porto", "apartment", 75.0, None, vec!["WiFi"]),
        )
        .await?;

    let check_in = Utc::now().date_naive() + Duration::days(3);
    let booking = state
        .bookings
        .create_booking(
            guest.id,
            CreateBookingRequest {
                property_id: loft.id,
                check_in: check_in.to_string(),
                check_out: (check_in + Duration::days(4)).to_string(),
                number_of_guests: 2,
                total_price: None,
                special_requests: Some("Late arrival".into()),
            },
        )
        .await?;
    state.bookings.confirm_booking(host.id, booking.id).await?;
    state.bookings.complete_booking(host.id, booking.id).await?;

    state
        .reviews
        .create_review(
            guest.id,
            CreateReviewRequest {
                property_id: loft.id,
                booking_id: booking.id,
                overall_rating: 5,
                cleanliness_rating: Some(5),
                accuracy_rating: Some(4),
                communication_rating: Some(5),
                location_rating: Some(5),
                check_in_rating: Some(4),
                value_rating: Some(4),
                comment: "Bright flat with a great view of the river.".into(),
                is_public: Some(true),
            },
        )
        .await?;

    println!(
        "Seed completed. Host ID: {}, Guest ID: {}, Booking ID: {}",
        host.id, guest.id, booking.id
    );
    Ok(())
}

async fn ensure_user(
    state: &AppState,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    is_host: bool,
) -> anyhow::Result<User> {
    if let Some(user) = state.users.get_user_by_email(email).await? {
        return Ok(user);
    }
    let user = state
        .users
        .create_user(RegisterRequest {
            email: email.into(),
            password: password.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: None,
            is_host,
        })
        .await?;
    Ok(user)
}

fn listing(
    title: &str,
    city: &str,
    property_type: &str,
    price: f64,
    coordinates: Option<(f64, f64)>,
    amenities: Vec<&str>,
) -> CreatePropertyRequest {
    CreatePropertyRequest {
        title: title.into(),
        description: format!("{title} in {city}"),
        property_type: property_type.into(),
        room_type: Some("entire_place".into()),
        city: city.into(),
        state: None,
        country: "Portugal".into(),
        location: coordinates.map(|(lat, lng)| Location {
            address: None,
            lat: Some(lat),
            lng: Some(lng),
        }),
        price_per_night: price,
        cleaning_fee: 30.0,
        service_fee: 15.0,
        max_guests: 4,
        bedrooms: 2,
        bathrooms: 1.0,
        amenities: amenities.into_iter().map(String::from).collect(),
        images: vec![],
        availability: Some(StayRules {
            minimum_stay: 2,
            maximum_stay: 30,
            instant_book: true,
        }),
    }
}
