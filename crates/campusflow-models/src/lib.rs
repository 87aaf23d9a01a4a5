//! # CampusFlow Models
//!
//! Domain entities shared by the API server and the CLI.
//!
//! # Modules
//!
//! - [`ids`]: strongly typed identifiers for tenants, users, roles, plans and subscriptions
//! - [`value_types`]: validated primitives such as [`Email`]
//! - [`enums`]: every closed vocabulary stored as text
//! - [`roles`]: the six system roles, their permissions and portals
//! - [`tenants`]: colleges, custom domains and usage limits
//! - [`users`]: accounts of every role
//! - [`academics`], [`timetable`], [`announcements`], [`fees`], [`classroom`]: college data
//! - [`billing`]: plans, subscriptions, payments, invoices and coupons
//! - [`platform`]: support tickets, system settings and global announcements
//! - [`audit`]: audit trail rows
//!
//! # Example
//!
//! ```ignore
//! use campusflow_models::{RoleName, roles::system_roles};
//!
//! assert!(RoleName::Teacher.can_access("/api/teacher/classes"));
//! assert_eq!(system_roles::id_for(RoleName::Teacher), system_roles::TEACHER);
//! ```

pub mod academics;
pub mod announcements;
pub mod audit;
pub mod auth;
pub mod billing;
pub mod classroom;
pub mod enums;
pub mod fees;
pub mod ids;
pub mod platform;
pub mod roles;
pub mod tenants;
pub mod timetable;
pub mod users;
pub mod value_types;

pub use academics::{
    AcademicYear, Department, DepartmentWithCounts, Enrollment, EnrollmentDetail,
    ParentStudentLink, Section, Subject, TeacherAssignment, TeachingClass,
};
pub use announcements::Announcement;
pub use audit::{AuditLog, NewAuditLog};
pub use auth::{
    AuthUserSummary, Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    RefreshTokenClaims, RefreshTokenRequest, ResetPasswordRequest, SignupRequest,
};
pub use billing::{
    Coupon, CouponRejection, CouponUsage, Invoice, InvoiceLineItem, InvoiceTotals, Payment,
    PlanPricing, SubscriptionDetail, SubscriptionPlan, TenantSubscription,
};
pub use classroom::{
    Assessment, Assignment, AttendanceRecord, AttendanceSummary, Grade, GradeReport, Submission,
    apply_late_penalty,
};
pub use enums::*;
pub use fees::FeePayment;
pub use ids::{PlanId, RoleId, SubscriptionId, TenantId, UserId};
pub use platform::{
    GlobalAnnouncement, SettingView, SupportTicket, SystemSetting, TicketComment,
    TicketWithComments,
};
pub use roles::{Role, RoleInfo, system_roles};
pub use tenants::{LimitExceeded, LimitKind, Tenant, TenantDomain, TenantSummary};
pub use timetable::{TimetableEntry, TimetableSlot};
pub use users::{User, UserCredentials, UserRef, UserWithRole};
pub use value_types::{Email, ValueTypeError};
