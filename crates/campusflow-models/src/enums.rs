//! Closed vocabularies stored as `TEXT` columns.
//!
//! Every enum here serializes to the same lowercase string it is stored as,
//! parses back with [`FromStr`], and binds directly in sqlx queries.

use serde::{Deserialize, Serialize};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgHasArrayType, PgTypeInfo},
};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::value_types::ValueTypeError;

/// Generates a text-backed enum with serde, sqlx and utoipa support.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValueTypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ValueTypeError::InvalidVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl Type<sqlx::Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<$name>()?)
            }
        }

        impl PgHasArrayType for $name {
            fn array_type_info() -> PgTypeInfo {
                <String as PgHasArrayType>::array_type_info()
            }
        }
    };
}

string_enum! {
    /// The six system roles. Each one owns a portal under `/api`.
    RoleName ("role") {
        SuperAdmin => "super_admin",
        TenantAdmin => "tenant_admin",
        DepartmentAdmin => "department_admin",
        Teacher => "teacher",
        Student => "student",
        Parent => "parent",
    }
}

string_enum! {
    /// Shared by `tenants.subscription_status` and `tenant_subscriptions.status`.
    SubscriptionStatus ("subscription status") {
        Trial => "trial",
        Active => "active",
        PastDue => "past_due",
        Cancelled => "cancelled",
        Expired => "expired",
        Suspended => "suspended",
    }
}

string_enum! {
    SubjectType ("subject type") {
        Theory => "theory",
        Practical => "practical",
        Project => "project",
        Elective => "elective",
    }
}

string_enum! {
    EnrollmentStatus ("enrollment status") {
        Active => "active",
        Inactive => "inactive",
        Graduated => "graduated",
        Dropped => "dropped",
    }
}

string_enum! {
    Relationship ("relationship") {
        Father => "father",
        Mother => "mother",
        Guardian => "guardian",
        Other => "other",
    }
}

string_enum! {
    DayOfWeek ("day of week") {
        Monday => "monday",
        Tuesday => "tuesday",
        Wednesday => "wednesday",
        Thursday => "thursday",
        Friday => "friday",
        Saturday => "saturday",
        Sunday => "sunday",
    }
}

string_enum! {
    AnnouncementAudience ("audience") {
        All => "all",
        Students => "students",
        Teachers => "teachers",
        Parents => "parents",
    }
}

string_enum! {
    /// Used by announcements and support tickets alike.
    Priority ("priority") {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

string_enum! {
    FeeType ("fee type") {
        Tuition => "tuition",
        Exam => "exam",
        Library => "library",
        Laboratory => "laboratory",
        Sports => "sports",
        Transport => "transport",
        Hostel => "hostel",
        Miscellaneous => "miscellaneous",
    }
}

string_enum! {
    FeePaymentMethod ("fee payment method") {
        Cash => "cash",
        Cheque => "cheque",
        Online => "online",
        Card => "card",
        Upi => "upi",
    }
}

string_enum! {
    FeeStatus ("fee status") {
        Pending => "pending",
        Paid => "paid",
        Overdue => "overdue",
        Cancelled => "cancelled",
    }
}

string_enum! {
    AttendanceStatus ("attendance status") {
        Present => "present",
        Absent => "absent",
        Late => "late",
        Excused => "excused",
    }
}

string_enum! {
    AssignmentStatus ("assignment status") {
        Draft => "draft",
        Published => "published",
        Closed => "closed",
    }
}

string_enum! {
    SubmissionStatus ("submission status") {
        Submitted => "submitted",
        Graded => "graded",
        /// Sent back by the teacher; the student may submit again.
        Resubmit => "resubmit",
    }
}

string_enum! {
    AssessmentType ("assessment type") {
        Quiz => "quiz",
        Test => "test",
        Midterm => "midterm",
        Final => "final",
        Practical => "practical",
    }
}

string_enum! {
    PlanType ("plan type") {
        Free => "free",
        Basic => "basic",
        Standard => "standard",
        Premium => "premium",
        Enterprise => "enterprise",
    }
}

string_enum! {
    BillingPeriod ("billing period") {
        Monthly => "monthly",
        Quarterly => "quarterly",
        Annually => "annually",
    }
}

string_enum! {
    PaymentStatus ("payment status") {
        Pending => "pending",
        Processing => "processing",
        Succeeded => "succeeded",
        Failed => "failed",
        Refunded => "refunded",
        PartiallyRefunded => "partially_refunded",
    }
}

string_enum! {
    PaymentMethod ("payment method") {
        Card => "card",
        BankTransfer => "bank_transfer",
        Upi => "upi",
        Wallet => "wallet",
        Other => "other",
    }
}

string_enum! {
    InvoiceStatus ("invoice status") {
        Draft => "draft",
        Pending => "pending",
        Paid => "paid",
        Overdue => "overdue",
        Cancelled => "cancelled",
    }
}

string_enum! {
    DiscountType ("discount type") {
        Percentage => "percentage",
        Fixed => "fixed",
    }
}

string_enum! {
    TicketCategory ("ticket category") {
        Technical => "technical",
        Billing => "billing",
        FeatureRequest => "feature_request",
        BugReport => "bug_report",
        General => "general",
    }
}

string_enum! {
    TicketStatus ("ticket status") {
        Open => "open",
        InProgress => "in_progress",
        WaitingCustomer => "waiting_customer",
        Resolved => "resolved",
        Closed => "closed",
    }
}

string_enum! {
    SettingDataType ("setting data type") {
        Text => "string",
        Integer => "integer",
        Boolean => "boolean",
        Json => "json",
    }
}

string_enum! {
    GlobalAnnouncementType ("announcement type") {
        Info => "info",
        Warning => "warning",
        Maintenance => "maintenance",
        Feature => "feature",
        Promotion => "promotion",
    }
}

string_enum! {
    AuditStatus ("audit status") {
        Success => "success",
        Failure => "failure",
    }
}

impl SubscriptionStatus {
    /// Statuses that keep a tenant's portals open.
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Trial | Self::Active)
    }
}

impl BillingPeriod {
    pub const fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Annually => 12,
        }
    }
}

impl TicketStatus {
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open | Self::InProgress | Self::WaitingCustomer)
    }
}
