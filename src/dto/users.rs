use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(url)]
    pub avatar: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

impl UpdateProfileRequest {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.avatar.is_none()
            && self.bio.is_none()
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserListQuery {
    pub is_host: Option<bool>,
}
