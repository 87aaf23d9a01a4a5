use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

use super::controller::*;

pub fn init_departments_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_departments).post(create_department))
        .route(
            "/{id}",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
}

pub fn init_subjects_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subjects).post(create_subject))
        .route(
            "/{id}",
            get(get_subject).put(update_subject).delete(delete_subject),
        )
}

pub fn init_academic_years_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_academic_years).post(create_academic_year))
        .route("/current", get(current_academic_year))
        .route(
            "/{id}",
            get(get_academic_year)
                .put(update_academic_year)
                .delete(delete_academic_year),
        )
        .route("/{id}/set-current", post(set_current_academic_year))
}

pub fn init_sections_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sections).post(create_section))
        .route(
            "/{id}",
            get(get_section).put(update_section).delete(delete_section),
        )
}

pub fn init_enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_enrollments).post(create_enrollment))
        .route(
            "/{id}",
            get(get_enrollment)
                .put(update_enrollment)
                .delete(delete_enrollment),
        )
}

pub fn init_teacher_assignments_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_teacher_assignments).post(create_teacher_assignment),
        )
        .route("/{id}", delete(delete_teacher_assignment))
}

pub fn init_parent_links_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_parent_links).post(create_parent_link))
        .route("/{id}", put(update_parent_link).delete(delete_parent_link))
}
