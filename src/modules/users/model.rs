use campusflow_core::PaginationParams;
use campusflow_models::{Email, RoleName};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    pub email: Email,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    /// Any role except `super_admin`
    pub role: RoleName,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub role: Option<RoleName>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct UserFilterParams {
    pub role: Option<RoleName>,
    /// Matches first name, last name or email
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}
