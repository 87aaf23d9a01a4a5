use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::enums::{FeePaymentMethod, FeeStatus, FeeType};
use crate::ids::{TenantId, UserId};

pub const RECEIPT_PREFIX: &str = "RCPT-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FeePayment {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub student_id: UserId,
    pub section_id: Option<Uuid>,
    pub fee_type: FeeType,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: Option<FeePaymentMethod>,
    pub transaction_id: Option<String>,
    pub receipt_number: String,
    pub status: FeeStatus,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeePayment {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == FeeStatus::Pending && self.due_date < today
    }
}
