use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use validator::Validate;

use crate::{
    config::AppConfig,
    dto::auth::{Claims, LoginRequest, RegisterRequest, TokenResponse},
    error::{AppError, AppResult},
    models::{User, UserProfile},
    services::{password, user_service::UserService},
};

#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(users: UserService, config: Arc<AppConfig>) -> Self {
        Self { users, config }
    }

    pub fn hash_password(&self, plain: &str) -> AppResult<String> {
        password::hash(plain)
    }

    pub fn verify_password(&self, plain: &str, hashed: &str) -> bool {
        password::verify(plain, hashed)
    }

    pub async fn register_user(&self, req: RegisterRequest) -> AppResult<UserProfile> {
        let user = self.users.create_user(req).await?;
        tracing::info!(user_id = user.id, "user registered");
        Ok(user.into())
    }

    /// The user when the email exists and the password matches.
    pub async fn authenticate(&self, email: &str, plain: &str) -> AppResult<Option<User>> {
        let Some(user) = self.users.get_user_by_email(email).await? else {
            return Ok(None);
        };
        if !self.verify_password(plain, &user.password_hash) {
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub async fn login_user(&self, req: LoginRequest) -> AppResult<TokenResponse> {
        req.validate()?;
        let user = self
            .authenticate(&req.email, &req.password)
            .await?
            .ok_or(AppError::Unauthorized("Incorrect email or password"))?;
        if !user.is_active {
            return Err(AppError::Unauthorized("Inactive user"));
        }

        let token = self.issue(&user)?;
        tracing::info!(user_id = user.id, "user logged in");
        Ok(token)
    }

    fn issue(&self, user: &User) -> AppResult<TokenResponse> {
        let access_token = self.create_access_token(user, None)?;
        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.config.access_token_expire_minutes * 60,
        })
    }

    /// HS256 token with `{sub: email, user_id, exp}`.
    pub fn create_access_token(&self, user: &User, expires_in: Option<Duration>) -> AppResult<String> {
        let expires_in =
            expires_in.unwrap_or_else(|| Duration::minutes(self.config.access_token_expire_minutes));
        let expiration = Utc::now()
            .checked_add_signed(expires_in)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user.email.clone(),
            user_id: user.id,
            exp: expiration.timestamp().max(0) as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    /// Any failure (signature, expiry, shape) collapses into one `Unauthorized`.
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| {
            tracing::debug!(error = %err, "token rejected");
            AppError::invalid_credentials()
        })
    }

    pub async fn get_current_user_from_token(&self, token: &str) -> AppResult<User> {
        let claims = self.verify_token(token)?;
        let user = match self.users.get_user(claims.user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => return Err(AppError::invalid_credentials()),
            Err(err) => return Err(err),
        };
        if user.email != claims.sub {
            return Err(AppError::invalid_credentials());
        }
        if !user.is_active {
            return Err(AppError::Unauthorized("Inactive user"));
        }
        Ok(user)
    }

    pub async fn refresh_token(&self, token: &str) -> AppResult<TokenResponse> {
        let user = self.get_current_user_from_token(token).await?;
        self.issue(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{services::booking_service::BookingService, store::DataStore};

    async fn service() -> anyhow::Result<(AuthService, std::path::PathBuf)> {
        let dir = std::env::temp_dir().join(format!("stayhub_auth_{}", uuid::Uuid::new_v4()));
        let store = DataStore::open(&dir).await?;
        let users = UserService::new(&store, BookingService::new(&store));
        let config = Arc::new(AppConfig::for_data_dir(&dir, "test-secret"));
        Ok((AuthService::new(users, config), dir))
    }

    fn register() -> RegisterRequest {
        RegisterRequest {
            email: "Lin@Example.com".into(),
            password: "password123".into(),
            first_name: "Lin".into(),
            last_name: "Park".into(),
            phone: None,
            is_host: true,
        }
    }

    #[tokio::test]
    async fn login_issues_token_for_current_user() -> anyhow::Result<()> {
        let (auth, dir) = service().await?;
        let profile = auth.register_user(register()).await?;
        assert!(profile.is_host);
        assert!(!profile.is_verified);

        let token = auth
            .login_user(LoginRequest {
                email: "LIN@example.com".into(),
                password: "password123".into(),
            })
            .await?;
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 30 * 60);

        let claims = auth.verify_token(&token.access_token)?;
        assert_eq!(claims.sub, "lin@example.com");
        assert_eq!(claims.user_id, profile.id);

        let current = auth.get_current_user_from_token(&token.access_token).await?;
        assert_eq!(current.id, profile.id);

        let refreshed = auth.refresh_token(&token.access_token).await?;
        assert!(auth.verify_token(&refreshed.access_token).is_ok());

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn bad_credentials_and_tokens_are_unauthorized() -> anyhow::Result<()> {
        let (auth, dir) = service().await?;
        let profile = auth.register_user(register()).await?;

        let wrong = auth
            .login_user(LoginRequest {
                email: "lin@example.com".into(),
                password: "wrong-password".into(),
            })
            .await;
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));
        assert!(auth.authenticate("nobody@example.com", "password123").await?.is_none());

        let garbage = auth.verify_token("not.a.token");
        assert!(matches!(garbage, Err(AppError::Unauthorized("Could not validate credentials"))));

        let user = auth.users.get_user(profile.id).await?;
        let expired = auth.create_access_token(&user, Some(Duration::minutes(-5)))?;
        let err = auth.verify_token(&expired).unwrap_err();
        assert_eq!(err.to_string(), "Could not validate credentials");

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }
}
