use campusflow_core::{PaginationParams, serde::deserialize_optional_uuid};
use campusflow_models::{FeePaymentMethod, FeeStatus, FeeType, UserId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("amount_must_be_positive"))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFeeDto {
    pub student_id: UserId,
    pub section_id: Option<Uuid>,
    pub fee_type: FeeType,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub due_date: NaiveDate,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PayFeeDto {
    pub payment_method: FeePaymentMethod,
    #[validate(length(min = 1, max = 100))]
    pub transaction_id: Option<String>,
    /// Defaults to today
    pub payment_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FeeFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    pub status: Option<FeeStatus>,
    pub fee_type: Option<FeeType>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OverdueMarked {
    pub marked: u64,
}

/// Only pending or overdue fees can still be paid or cancelled.
pub fn check_open(status: FeeStatus) -> Result<(), &'static str> {
    match status {
        FeeStatus::Pending | FeeStatus::Overdue => Ok(()),
        FeeStatus::Paid => Err("Fee is already paid"),
        FeeStatus::Cancelled => Err("Fee is cancelled"),
    }
}
