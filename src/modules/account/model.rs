use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    /// ISO 639-1 code such as `en` or `hi`
    #[validate(length(min = 2, max = 10))]
    #[schema(example = "en")]
    pub language_preference: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordDto {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_new_password_is_rejected() {
        let dto = ChangePasswordDto {
            current_password: "password123".into(),
            new_password: "short".into(),
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("new_password"));
    }

    #[test]
    fn empty_profile_update_is_valid() {
        assert!(UpdateProfileDto::default().validate().is_ok());
    }
}
