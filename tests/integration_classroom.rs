mod common;

use axum::http::{Method, StatusCode};
use campusflow::campusflow_models::system_roles;
use chrono::{Duration, Utc};
use common::{Campus, TestUser};
use serde_json::json;
use sqlx::PgPool;

struct Classroom {
    campus: Campus,
    teacher: TestUser,
    student: TestUser,
    teacher_token: String,
    student_token: String,
}

async fn classroom(pool: &PgPool) -> Classroom {
    let campus = common::create_campus(pool).await;
    let teacher = common::create_user(pool, Some(campus.tenant_id), system_roles::TEACHER).await;
    let student = common::create_user(pool, Some(campus.tenant_id), system_roles::STUDENT).await;
    common::assign_teacher(
        pool,
        campus.tenant_id,
        teacher.id,
        campus.subject_id,
        campus.section_id,
        campus.academic_year_id,
    )
    .await;
    common::enroll(
        pool,
        campus.tenant_id,
        student.id,
        campus.section_id,
        campus.academic_year_id,
    )
    .await;
    let teacher_token = common::token_for(pool, &teacher).await;
    let student_token = common::token_for(pool, &student).await;

    Classroom {
        campus,
        teacher,
        student,
        teacher_token,
        student_token,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_sees_assigned_classes(pool: PgPool) {
    let room = classroom(&pool).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::GET,
        "/api/teacher/classes",
        Some(&room.teacher_token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let classes = json.as_array().unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0]["section_id"], room.campus.section_id.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_attendance_sheet_is_upserted(pool: PgPool) {
    let room = classroom(&pool).await;
    let app = common::test_app(pool.clone());
    let sheet = |status: &str| {
        json!({
            "section_id": room.campus.section_id,
            "subject_id": room.campus.subject_id,
            "date": "2025-09-01",
            "entries": [{ "student_id": room.student.id, "status": status }]
        })
    };

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        "/api/teacher/attendance",
        Some(&room.teacher_token),
        Some(sheet("absent")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["marked"], 1);
    assert_eq!(json["absent"], 1);

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        "/api/teacher/attendance",
        Some(&room.teacher_token),
        Some(sheet("present")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["present"], 1);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE student_id = $1")
        .bind(room.student.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let (status, json) = common::send(
        app,
        Method::GET,
        "/api/student/attendance",
        Some(&room.student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["summary"][0]["present"], 1);
    assert_eq!(json["summary"][0]["absent"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unassigned_teacher_cannot_mark_attendance(pool: PgPool) {
    let room = classroom(&pool).await;
    let outsider =
        common::create_user(&pool, Some(room.campus.tenant_id), system_roles::TEACHER).await;
    let token = common::token_for(&pool, &outsider).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::POST,
        "/api/teacher/attendance",
        Some(&token),
        Some(json!({
            "section_id": room.campus.section_id,
            "subject_id": room.campus.subject_id,
            "entries": [{ "student_id": room.student.id, "status": "present" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_attendance_rejects_students_outside_the_section(pool: PgPool) {
    let room = classroom(&pool).await;
    let stranger =
        common::create_user(&pool, Some(room.campus.tenant_id), system_roles::STUDENT).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::POST,
        "/api/teacher/attendance",
        Some(&room.teacher_token),
        Some(json!({
            "section_id": room.campus.section_id,
            "subject_id": room.campus.subject_id,
            "entries": [{ "student_id": stranger.id, "status": "present" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_assignment_lifecycle(pool: PgPool) {
    let room = classroom(&pool).await;
    let app = common::test_app(pool);

    let (status, assignment) = common::send(
        app.clone(),
        Method::POST,
        "/api/teacher/assignments",
        Some(&room.teacher_token),
        Some(json!({
            "title": "Linked lists",
            "subject_id": room.campus.subject_id,
            "section_id": room.campus.section_id,
            "due_date": (Utc::now() + Duration::days(7)).to_rfc3339(),
            "total_marks": 50
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(assignment["status"], "draft");
    let id = assignment["id"].as_str().unwrap().to_string();

    // Drafts are invisible to students.
    let (status, _) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/student/assignments/{id}/submit"),
        Some(&room.student_token),
        Some(json!({ "content": "My answer" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, published) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/teacher/assignments/{id}/publish"),
        Some(&room.teacher_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["status"], "published");

    let (status, submission) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/student/assignments/{id}/submit"),
        Some(&room.student_token),
        Some(json!({ "content": "My answer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submission["is_late"], false);
    let submission_id = submission["id"].as_str().unwrap().to_string();

    let (status, _) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/teacher/submissions/{submission_id}/grade"),
        Some(&room.teacher_token),
        Some(json!({ "marks_obtained": 60 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, graded) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/teacher/submissions/{submission_id}/grade"),
        Some(&room.teacher_token),
        Some(json!({ "marks_obtained": 45, "feedback": "Good work" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graded["status"], "graded");
    assert_eq!(graded["marks_obtained"], 45);

    // Graded work is final.
    let (status, _) = common::send(
        app,
        Method::POST,
        &format!("/api/student/assignments/{id}/submit"),
        Some(&room.student_token),
        Some(json!({ "content": "Second try" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_late_work_is_refused_or_penalised(pool: PgPool) {
    let room = classroom(&pool).await;
    let app = common::test_app(pool);
    let overdue = (Utc::now() - Duration::days(1)).to_rfc3339();

    let (status, strict) = common::send(
        app.clone(),
        Method::POST,
        "/api/teacher/assignments",
        Some(&room.teacher_token),
        Some(json!({
            "title": "Recursion",
            "subject_id": room.campus.subject_id,
            "section_id": room.campus.section_id,
            "due_date": overdue,
            "total_marks": 50,
            "status": "published"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/student/assignments/{}/submit", strict["id"].as_str().unwrap()),
        Some(&room.student_token),
        Some(json!({ "content": "Sorry it's late" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Late submissions are not allowed");

    let (status, lenient) = common::send(
        app.clone(),
        Method::POST,
        "/api/teacher/assignments",
        Some(&room.teacher_token),
        Some(json!({
            "title": "Hash maps",
            "subject_id": room.campus.subject_id,
            "section_id": room.campus.section_id,
            "due_date": overdue,
            "total_marks": 50,
            "allow_late_submission": true,
            "late_submission_penalty": 10,
            "status": "published"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, submission) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/student/assignments/{}/submit", lenient["id"].as_str().unwrap()),
        Some(&room.student_token),
        Some(json!({ "content": "Better late than never" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submission["is_late"], true);

    let (status, graded) = common::send(
        app,
        Method::POST,
        &format!("/api/teacher/submissions/{}/grade", submission["id"].as_str().unwrap()),
        Some(&room.teacher_token),
        Some(json!({ "marks_obtained": 45 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graded["marks_obtained"], 40);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_grades_are_hidden_until_published(pool: PgPool) {
    let room = classroom(&pool).await;
    let app = common::test_app(pool);

    let (status, assessment) = common::send(
        app.clone(),
        Method::POST,
        "/api/teacher/assessments",
        Some(&room.teacher_token),
        Some(json!({
            "title": "Midterm",
            "assessment_type": "midterm",
            "subject_id": room.campus.subject_id,
            "section_id": room.campus.section_id,
            "scheduled_date": "2025-10-15",
            "total_marks": 100,
            "passing_marks": 40
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = assessment["id"].as_str().unwrap().to_string();

    let (status, _) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/teacher/assessments/{id}/grades"),
        Some(&room.teacher_token),
        Some(json!({ "grades": [{ "student_id": room.student.id, "marks_obtained": 120 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/teacher/assessments/{id}/grades"),
        Some(&room.teacher_token),
        Some(json!({ "grades": [{ "student_id": room.student.id, "marks_obtained": 85 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["saved"], 1);

    let (_, grades) = common::send(
        app.clone(),
        Method::GET,
        "/api/student/grades",
        Some(&room.student_token),
        None,
    )
    .await;
    assert!(grades.as_array().unwrap().is_empty());

    let (status, _) = common::send(
        app.clone(),
        Method::POST,
        &format!("/api/teacher/assessments/{id}/publish-grades"),
        Some(&room.teacher_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, grades) = common::send(
        app,
        Method::GET,
        "/api/student/grades",
        Some(&room.student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let grades = grades.as_array().unwrap();
    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0]["letter"], "A");
    assert_eq!(grades[0]["passed"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_sees_only_permitted_views(pool: PgPool) {
    let room = classroom(&pool).await;
    let parent =
        common::create_user(&pool, Some(room.campus.tenant_id), system_roles::PARENT).await;
    common::link_parent(&pool, room.campus.tenant_id, parent.id, room.student.id, false).await;
    let token = common::token_for(&pool, &parent).await;
    let app = common::test_app(pool);

    let (status, children) =
        common::send(app.clone(), Method::GET, "/api/parent/children", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(children.as_array().unwrap().len(), 1);

    let (status, _) = common::send(
        app.clone(),
        Method::GET,
        &format!("/api/parent/children/{}/attendance", room.student.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::send(
        app,
        Method::GET,
        &format!("/api/parent/children/{}/grades", room.student.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_cannot_view_unlinked_student(pool: PgPool) {
    let room = classroom(&pool).await;
    let parent =
        common::create_user(&pool, Some(room.campus.tenant_id), system_roles::PARENT).await;
    let token = common::token_for(&pool, &parent).await;
    let app = common::test_app(pool);

    let (status, _) = common::send(
        app,
        Method::GET,
        &format!("/api/parent/children/{}/fees", room.student.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_dashboard_summarises_enrollment(pool: PgPool) {
    let room = classroom(&pool).await;
    let app = common::test_app(pool);

    let (status, json) = common::send(
        app,
        Method::GET,
        "/api/student/dashboard",
        Some(&room.student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.is_object());
}
