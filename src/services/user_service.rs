use chrono::Utc;
use serde_json::{Map, Value};
use validator::Validate;

use crate::{
    dto::{
        auth::RegisterRequest,
        bookings::BookingWithProperty,
        users::{ChangePasswordRequest, UpdateProfileRequest},
    },
    error::{AppError, AppResult},
    models::{BookingStatus, User, UserProfile},
    response::Page,
    routes::params::Pagination,
    services::{base::BaseService, booking_service::BookingService, password},
    store::{CollectionStats, DataStore},
};

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("Field '{field}' is required")));
    }
    Ok(value.to_string())
}

#[derive(Clone)]
pub struct UserService {
    base: BaseService<User>,
    bookings: BookingService,
}

impl UserService {
    pub fn new(store: &DataStore, bookings: BookingService) -> Self {
        Self {
            base: BaseService::new(store, "user"),
            bookings,
        }
    }

    /// Create an account. The email check and the insert happen under the
    /// users lock, so two registrations of the same address cannot both win.
    pub async fn create_user(&self, mut req: RegisterRequest) -> AppResult<User> {
        req.email = normalize_email(&req.email);
        req.validate()?;
        let email = req.email.clone();
        let first_name = required(&req.first_name, "first_name")?;
        let last_name = required(&req.last_name, "last_name")?;
        let password_hash = password::hash(&req.password)?;

        let user = self
            .base
            .create_with(move |existing| {
                if existing.iter().any(|u| normalize_email(&u.email) == email) {
                    return Err(AppError::conflict("Email already registered"));
                }
                Ok(User {
                    id: 0,
                    email,
                    password_hash,
                    first_name,
                    last_name,
                    phone: req.phone.filter(|p| !p.trim().is_empty()),
                    avatar: None,
                    bio: None,
                    is_host: req.is_host,
                    is_verified: false,
                    is_active: true,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
            .await?;

        tracing::info!(user_id = user.id, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> AppResult<User> {
        self.base.get_by_id(id).await
    }

    pub async fn get_user_profile(&self, id: i64) -> AppResult<UserProfile> {
        Ok(self.base.get_by_id(id).await?.into())
    }

    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        if let Some(user) = self
            .base
            .find_by_field("email", &Value::String(email.clone()))
            .await?
            .into_iter()
            .next()
        {
            return Ok(Some(user));
        }
        // Records written by hand may keep their original casing.
        Ok(self
            .base
            .find_by(|u| normalize_email(&u.email) == email)
            .await?
            .into_iter()
            .next())
    }

    /// `is_host` narrows the listing to hosts or guests.
    pub async fn list_users(
        &self,
        pagination: Pagination,
        is_host: Option<bool>,
    ) -> AppResult<Page<UserProfile>> {
        let (skip, limit) = pagination.window();
        let mut filters = Map::new();
        if let Some(is_host) = is_host {
            filters.insert("is_host".into(), Value::Bool(is_host));
        }
        let total = self.base.get_all(0, usize::MAX, Some(&filters)).await?.len();
        let users = self.base.get_all(skip, limit, Some(&filters)).await?;
        Ok(Page::new(
            users.into_iter().map(UserProfile::from).collect(),
            total,
        ))
    }

    /// Email and password cannot be changed through this call.
    pub async fn update_profile(
        &self,
        id: i64,
        req: UpdateProfileRequest,
    ) -> AppResult<UserProfile> {
        if req.is_empty() {
            return Err(AppError::validation("Data cannot be empty"));
        }
        req.validate()?;
        let first_name = req
            .first_name
            .as_deref()
            .map(|n| required(n, "first_name"))
            .transpose()?;
        let last_name = req
            .last_name
            .as_deref()
            .map(|n| required(n, "last_name"))
            .transpose()?;

        let user = self
            .base
            .update(id, move |u| {
                if let Some(first_name) = first_name {
                    u.first_name = first_name;
                }
                if let Some(last_name) = last_name {
                    u.last_name = last_name;
                }
                if req.phone.is_some() {
                    u.phone = req.phone;
                }
                if req.avatar.is_some() {
                    u.avatar = req.avatar;
                }
                if req.bio.is_some() {
                    u.bio = req.bio;
                }
                Ok(())
            })
            .await?;
        Ok(user.into())
    }

    pub async fn change_password(&self, id: i64, req: ChangePasswordRequest) -> AppResult<()> {
        let user = self.base.get_by_id(id).await?;
        if !password::verify(&req.current_password, &user.password_hash) {
            return Err(AppError::validation("Current password is incorrect"));
        }
        if req.new_password.len() < 8 {
            return Err(AppError::validation(
                "New password must be at least 8 characters long",
            ));
        }
        let password_hash = password::hash(&req.new_password)?;

        self.base
            .update(id, move |u| {
                u.password_hash = password_hash;
                Ok(())
            })
            .await?;
        tracing::info!(user_id = id, "password changed");
        Ok(())
    }

    pub async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.base.delete(id).await?;
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }

    pub async fn get_user_bookings(
        &self,
        id: i64,
        status: Option<BookingStatus>,
    ) -> AppResult<Vec<BookingWithProperty>> {
        self.base.get_by_id(id).await?;
        self.bookings.get_user_bookings(id, status).await
    }

    pub async fn stats(&self) -> AppResult<CollectionStats> {
        self.base.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "s3cret-pass".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: None,
            is_host: false,
        }
    }

    async fn service() -> anyhow::Result<(UserService, std::path::PathBuf)> {
        let dir = std::env::temp_dir().join(format!("stayhub_users_{}", uuid::Uuid::new_v4()));
        let store = DataStore::open(&dir).await?;
        Ok((UserService::new(&store, BookingService::new(&store)), dir))
    }

    #[tokio::test]
    async fn email_is_unique_ignoring_case() -> anyhow::Result<()> {
        let (users, dir) = service().await?;

        let first = users.create_user(register("  Ada@Example.com ")).await?;
        assert_eq!(first.email, "ada@example.com");
        assert_ne!(first.password_hash, "s3cret-pass");

        let dup = users.create_user(register("ADA@example.COM")).await;
        assert!(matches!(dup, Err(AppError::Conflict(m)) if m == "Email already registered"));

        let found = users.get_user_by_email("ada@EXAMPLE.com").await?;
        assert_eq!(found.map(|u| u.id), Some(first.id));

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn registration_validates_shape() -> anyhow::Result<()> {
        let (users, dir) = service().await?;

        assert!(matches!(
            users.create_user(register("not-an-email")).await,
            Err(AppError::Validation(_))
        ));
        let mut short = register("short@example.com");
        short.password = "short".into();
        assert!(matches!(users.create_user(short).await, Err(AppError::Validation(_))));
        let mut blank = register("blank@example.com");
        blank.first_name = "   ".into();
        assert!(matches!(users.create_user(blank).await, Err(AppError::Validation(_))));

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn profile_and_password_updates() -> anyhow::Result<()> {
        let (users, dir) = service().await?;
        let user = users.create_user(register("grace@example.com")).await?;

        let empty = users.update_profile(user.id, UpdateProfileRequest::default()).await;
        assert!(matches!(empty, Err(AppError::Validation(m)) if m == "Data cannot be empty"));

        let profile = users
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    bio: Some("Loves long stays".into()),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(profile.bio.as_deref(), Some("Loves long stays"));
        assert_eq!(profile.email, "grace@example.com");

        let wrong = users
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: "nope".into(),
                    new_password: "another-pass".into(),
                },
            )
            .await;
        assert!(matches!(wrong, Err(AppError::Validation(_))));

        users
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: "s3cret-pass".into(),
                    new_password: "another-pass".into(),
                },
            )
            .await?;
        let stored = users.get_user(user.id).await?;
        assert!(password::verify("another-pass", &stored.password_hash));

        let listed = users.list_users(Pagination::default(), None).await?;
        assert_eq!(listed.total, 1);

        users.delete_user(user.id).await?;
        assert!(matches!(users.get_user(user.id).await, Err(AppError::NotFound(_))));

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn listing_filters_hosts_and_pages() -> anyhow::Result<()> {
        let (users, dir) = service().await?;

        for i in 0..3 {
            users.create_user(register(&format!("guest{i}@example.com"))).await?;
        }
        let mut host = register("host@example.com");
        host.is_host = true;
        let host = users.create_user(host).await?;

        let hosts = users.list_users(Pagination::default(), Some(true)).await?;
        assert_eq!(hosts.total, 1);
        assert_eq!(hosts.items[0].id, host.id);

        let guests = users
            .list_users(Pagination::new(Some(2), Some(2)), Some(false))
            .await?;
        assert_eq!(guests.total, 3);
        assert_eq!(guests.items.len(), 1);

        let everyone = users.list_users(Pagination::default(), None).await?;
        assert_eq!(everyone.total, 4);

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }
}
