use std::sync::Arc;

use crate::{
    config::AppConfig,
    services::{
        auth_service::AuthService,
        booking_service::BookingService,
        communication_service::CommunicationService,
        notification_service::NotificationService,
        payment_service::{PaymentGateway, PaymentService, SimulatedGateway},
        property_service::PropertyService,
        review_service::ReviewService,
        user_service::UserService,
        wishlist_service::WishlistService,
    },
    store::DataStore,
};

/// Every service shares the same [`DataStore`], so one collection lock covers
/// all writers no matter which service they go through.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: DataStore,
    pub users: UserService,
    pub auth: AuthService,
    pub properties: PropertyService,
    pub bookings: BookingService,
    pub reviews: ReviewService,
    pub payments: PaymentService,
    pub conversations: CommunicationService,
    pub notifications: NotificationService,
    pub wishlists: WishlistService,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store = DataStore::open(&config.data_dir).await?;
        let gateway = Arc::new(SimulatedGateway::from_config(&config));
        Ok(Self::with_gateway(config, store, gateway))
    }

    pub fn with_gateway(
        config: AppConfig,
        store: DataStore,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let config = Arc::new(config);
        let notifications = NotificationService::new(&store);
        let bookings = BookingService::new(&store);
        let users = UserService::new(&store, bookings.clone());
        let auth = AuthService::new(users.clone(), config.clone());

        Self {
            properties: PropertyService::new(&store),
            reviews: ReviewService::new(&store, notifications.clone()),
            payments: PaymentService::new(
                &store,
                bookings.clone(),
                notifications.clone(),
                gateway,
            ),
            conversations: CommunicationService::new(&store, notifications.clone()),
            wishlists: WishlistService::new(&store),
            notifications,
            bookings,
            users,
            auth,
            config,
            store,
        }
    }
}
