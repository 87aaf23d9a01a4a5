use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use campusflow_core::{PaginationMeta, PaginationParams};

/// OpenAPI document for every route. Response and request schemas are
/// collected from the handler annotations.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::academics::controller::create_department,
        crate::modules::academics::controller::list_departments,
        crate::modules::academics::controller::get_department,
        crate::modules::academics::controller::update_department,
        crate::modules::academics::controller::delete_department,
        crate::modules::academics::controller::create_subject,
        crate::modules::academics::controller::list_subjects,
        crate::modules::academics::controller::get_subject,
        crate::modules::academics::controller::update_subject,
        crate::modules::academics::controller::delete_subject,
        crate::modules::academics::controller::create_academic_year,
        crate::modules::academics::controller::list_academic_years,
        crate::modules::academics::controller::current_academic_year,
        crate::modules::academics::controller::get_academic_year,
        crate::modules::academics::controller::update_academic_year,
        crate::modules::academics::controller::delete_academic_year,
        crate::modules::academics::controller::set_current_academic_year,
        crate::modules::academics::controller::create_section,
        crate::modules::academics::controller::list_sections,
        crate::modules::academics::controller::get_section,
        crate::modules::academics::controller::update_section,
        crate::modules::academics::controller::delete_section,
        crate::modules::academics::controller::create_enrollment,
        crate::modules::academics::controller::list_enrollments,
        crate::modules::academics::controller::get_enrollment,
        crate::modules::academics::controller::update_enrollment,
        crate::modules::academics::controller::delete_enrollment,
        crate::modules::academics::controller::create_teacher_assignment,
        crate::modules::academics::controller::list_teacher_assignments,
        crate::modules::academics::controller::delete_teacher_assignment,
        crate::modules::academics::controller::create_parent_link,
        crate::modules::academics::controller::list_parent_links,
        crate::modules::academics::controller::update_parent_link,
        crate::modules::academics::controller::delete_parent_link,
        crate::modules::account::controller::get_profile,
        crate::modules::account::controller::update_profile,
        crate::modules::account::controller::change_password,
        crate::modules::account::controller::my_announcements,
        crate::modules::account::controller::platform_announcements,
        crate::modules::account::controller::public_settings,
        crate::modules::announcements::controller::create_announcement,
        crate::modules::announcements::controller::list_announcements,
        crate::modules::announcements::controller::get_announcement,
        crate::modules::announcements::controller::update_announcement,
        crate::modules::announcements::controller::delete_announcement,
        crate::modules::audit::controller::list_college_audit_logs,
        crate::modules::audit::controller::list_company_audit_logs,
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh_token,
        crate::modules::auth::controller::signup,
        crate::modules::auth::controller::forgot_password,
        crate::modules::auth::controller::reset_password,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::me,
        crate::modules::billing::controller::list_pricing,
        crate::modules::billing::controller::get_pricing,
        crate::modules::billing::controller::get_subscription,
        crate::modules::billing::controller::checkout,
        crate::modules::billing::controller::change_plan,
        crate::modules::billing::controller::cancel_subscription,
        crate::modules::billing::controller::list_payments,
        crate::modules::billing::controller::list_invoices,
        crate::modules::billing::controller::get_invoice,
        crate::modules::billing::controller::validate_coupon,
        crate::modules::billing::controller::list_plans,
        crate::modules::billing::controller::create_plan,
        crate::modules::billing::controller::get_plan,
        crate::modules::billing::controller::update_plan,
        crate::modules::billing::controller::delete_plan,
        crate::modules::billing::controller::list_coupons,
        crate::modules::billing::controller::create_coupon,
        crate::modules::billing::controller::get_coupon,
        crate::modules::billing::controller::update_coupon,
        crate::modules::billing::controller::delete_coupon,
        crate::modules::billing::controller::list_subscriptions,
        crate::modules::billing::controller::set_subscription_status,
        crate::modules::billing::controller::refund_payment,
        crate::modules::billing::controller::list_all_invoices,
        crate::modules::department_portal::controller::overview,
        crate::modules::department_portal::controller::subjects,
        crate::modules::department_portal::controller::sections,
        crate::modules::department_portal::controller::teachers,
        crate::modules::department_portal::controller::create_announcement,
        crate::modules::department_portal::controller::list_announcements,
        crate::modules::department_portal::controller::update_announcement,
        crate::modules::department_portal::controller::delete_announcement,
        crate::modules::fees::controller::create_fee,
        crate::modules::fees::controller::list_fees,
        crate::modules::fees::controller::get_fee,
        crate::modules::fees::controller::pay_fee,
        crate::modules::fees::controller::cancel_fee,
        crate::modules::fees::controller::mark_overdue,
        crate::modules::health::controller::health,
        crate::modules::health::controller::readiness,
        crate::modules::health::controller::liveness,
        crate::modules::health::controller::index,
        crate::modules::parent_portal::controller::children,
        crate::modules::parent_portal::controller::child_attendance,
        crate::modules::parent_portal::controller::child_grades,
        crate::modules::parent_portal::controller::child_fees,
        crate::modules::platform::controller::open_ticket,
        crate::modules::platform::controller::list_college_tickets,
        crate::modules::platform::controller::get_college_ticket,
        crate::modules::platform::controller::comment_college_ticket,
        crate::modules::platform::controller::list_all_tickets,
        crate::modules::platform::controller::get_any_ticket,
        crate::modules::platform::controller::update_ticket,
        crate::modules::platform::controller::comment_any_ticket,
        crate::modules::platform::controller::list_settings,
        crate::modules::platform::controller::create_setting,
        crate::modules::platform::controller::get_setting,
        crate::modules::platform::controller::update_setting,
        crate::modules::platform::controller::delete_setting,
        crate::modules::platform::controller::list_global_announcements,
        crate::modules::platform::controller::create_global_announcement,
        crate::modules::platform::controller::get_global_announcement,
        crate::modules::platform::controller::update_global_announcement,
        crate::modules::platform::controller::delete_global_announcement,
        crate::modules::student_portal::controller::dashboard,
        crate::modules::student_portal::controller::attendance,
        crate::modules::student_portal::controller::assignments,
        crate::modules::student_portal::controller::submit_assignment,
        crate::modules::student_portal::controller::grades,
        crate::modules::student_portal::controller::timetable,
        crate::modules::student_portal::controller::fees,
        crate::modules::teaching::controller::classes,
        crate::modules::teaching::controller::timetable,
        crate::modules::teaching::controller::mark_attendance,
        crate::modules::teaching::controller::list_attendance,
        crate::modules::teaching::controller::create_assignment,
        crate::modules::teaching::controller::list_assignments,
        crate::modules::teaching::controller::get_assignment,
        crate::modules::teaching::controller::update_assignment,
        crate::modules::teaching::controller::publish_assignment,
        crate::modules::teaching::controller::close_assignment,
        crate::modules::teaching::controller::list_submissions,
        crate::modules::teaching::controller::grade_submission,
        crate::modules::teaching::controller::create_assessment,
        crate::modules::teaching::controller::list_assessments,
        crate::modules::teaching::controller::save_grades,
        crate::modules::teaching::controller::list_grades,
        crate::modules::teaching::controller::publish_grades,
        crate::modules::tenants::controller::create_tenant,
        crate::modules::tenants::controller::list_tenants,
        crate::modules::tenants::controller::get_tenant,
        crate::modules::tenants::controller::update_tenant,
        crate::modules::tenants::controller::delete_tenant,
        crate::modules::tenants::controller::suspend_tenant,
        crate::modules::tenants::controller::activate_tenant,
        crate::modules::tenants::controller::get_tenant_usage,
        crate::modules::tenants::controller::list_domains,
        crate::modules::tenants::controller::add_domain,
        crate::modules::tenants::controller::verify_domain,
        crate::modules::tenants::controller::delete_domain,
        crate::modules::tenants::controller::company_dashboard,
        crate::modules::timetable::controller::create_entry,
        crate::modules::timetable::controller::list_entries,
        crate::modules::timetable::controller::get_entry,
        crate::modules::timetable::controller::update_entry,
        crate::modules::timetable::controller::delete_entry,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::list_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::users::controller::list_assignable_roles,
    ),
    components(schemas(PaginationMeta, PaginationParams)),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Authentication", description = "Login, signup, token refresh and password reset"),
        (name = "Account", description = "Profile and announcements for any signed-in user"),
        (name = "Pricing", description = "Public plan catalogue"),
        (name = "Subscription", description = "The college's own subscription"),
        (name = "Billing", description = "The college's payments, invoices and coupon checks"),
        (name = "Tenants", description = "Colleges, their domains and usage (super admin)"),
        (name = "Company Billing", description = "Plans, coupons, subscriptions, refunds and invoices across colleges"),
        (name = "Settings", description = "Platform settings"),
        (name = "Global Announcements", description = "Platform-wide announcements"),
        (name = "Support", description = "Support tickets"),
        (name = "Audit", description = "Audit trail"),
        (name = "Users", description = "College users"),
        (name = "Departments", description = "College departments"),
        (name = "Subjects", description = "Subjects offered by departments"),
        (name = "Academic Years", description = "Academic calendar"),
        (name = "Sections", description = "Class sections"),
        (name = "Enrollments", description = "Student enrollment in sections"),
        (name = "Teacher Assignments", description = "Who teaches what, where"),
        (name = "Parent Links", description = "Parent and student relationships"),
        (name = "Timetable", description = "Weekly timetable"),
        (name = "Announcements", description = "College announcements"),
        (name = "Fees", description = "Student fee ledger"),
        (name = "Department Portal", description = "Head of department views"),
        (name = "Teacher Portal", description = "Attendance, assignments, assessments and grades"),
        (name = "Student Portal", description = "Student dashboard, work and results"),
        (name = "Parent Portal", description = "A parent's view of linked children")
    ),
    info(
        title = "CampusFlow API",
        version = "0.1.0",
        description = "Multi-tenant college administration API with role portals, subscription billing and academic records.",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn document_covers_every_portal() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/auth/login",
            "/api/pricing",
            "/api/subscription/checkout",
            "/api/company/tenants",
            "/api/college/users",
            "/api/dept/overview",
            "/api/teacher/classes",
            "/api/student/dashboard",
            "/api/parent/children",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
