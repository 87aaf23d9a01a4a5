//! Staff and students for seeded colleges, plus their class memberships.

use campusflow_models::system_roles;
use campusflow_models::{RoleId, TenantId};
use fake::Fake;
use fake::faker::name::en::*;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;
use uuid::Uuid;

use super::models::UserSeed;
use super::structure::TenantStructure;
use crate::CliResult;

/// Seeded accounts of one college, by role.
#[derive(Default)]
pub struct TenantUsers {
    pub admin: Option<Uuid>,
    pub hod: Option<Uuid>,
    pub teachers: Vec<Uuid>,
    pub students: Vec<Uuid>,
}

fn email_local(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

fn generate_user(tenant_id: TenantId, role_id: RoleId, tag: &str, idx: usize, hash: &str) -> UserSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    // The tenant id fragment keeps repeated seed runs from colliding.
    let tenant_tag = &tenant_id.as_uuid().simple().to_string()[..8];
    let email = format!(
        "{}.{}.{tag}{idx}@{tenant_tag}.campusflow.test",
        email_local(&first_name),
        email_local(&last_name),
    );

    UserSeed {
        tenant_id,
        role_id,
        first_name,
        last_name,
        email,
        password_hash: hash.to_string(),
    }
}

/// Admin, HOD, teachers and students for every tenant, in that order.
pub fn generate_users(
    tenant_ids: &[TenantId],
    teachers: usize,
    students: usize,
    password_hash: &str,
) -> Vec<UserSeed> {
    tenant_ids
        .par_iter()
        .flat_map(|&tenant_id| {
            let mut users = Vec::with_capacity(2 + teachers + students);
            users.push(generate_user(tenant_id, system_roles::TENANT_ADMIN, "admin", 0, password_hash));
            users.push(generate_user(tenant_id, system_roles::DEPARTMENT_ADMIN, "hod", 0, password_hash));
            for i in 0..teachers {
                users.push(generate_user(tenant_id, system_roles::TEACHER, "teacher", i, password_hash));
            }
            for i in 0..students {
                users.push(generate_user(tenant_id, system_roles::STUDENT, "student", i, password_hash));
            }
            users
        })
        .collect()
}

pub async fn seed_users(
    db: &PgPool,
    tenant_ids: &[TenantId],
    teachers: usize,
    students: usize,
    password_hash: &str,
) -> CliResult<Vec<TenantUsers>> {
    let start = Instant::now();
    println!(
        "👥 Seeding {} users ({teachers} teachers and {students} students per college)...",
        tenant_ids.len() * (2 + teachers + students)
    );

    let users = generate_users(tenant_ids, teachers, students, password_hash);
    let ids = insert_users_batch(db, &users).await?;

    let mut grouped: Vec<TenantUsers> = tenant_ids.iter().map(|_| TenantUsers::default()).collect();
    for (user, id) in users.iter().zip(ids) {
        let Some(pos) = tenant_ids.iter().position(|t| *t == user.tenant_id) else {
            continue;
        };
        let slot = &mut grouped[pos];
        match user.role_id {
            r if r == system_roles::TENANT_ADMIN => slot.admin = Some(id),
            r if r == system_roles::DEPARTMENT_ADMIN => slot.hod = Some(id),
            r if r == system_roles::TEACHER => slot.teachers.push(id),
            _ => slot.students.push(id),
        }
    }

    println!("   ✓ Inserted {} users in {:?}", users.len(), start.elapsed());
    Ok(grouped)
}

pub async fn insert_users_batch(db: &PgPool, users: &[UserSeed]) -> CliResult<Vec<Uuid>> {
    // 6 params per row keeps a chunk well under the bind limit.
    const BATCH_SIZE: usize = 1000;

    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(users.len());
    for chunk in users.chunks(BATCH_SIZE) {
        ids.extend(insert_users_chunk(&mut tx, chunk).await?);
    }
    tx.commit().await?;
    Ok(ids)
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
) -> CliResult<Vec<Uuid>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from(
        "INSERT INTO users (tenant_id, role_id, first_name, last_name, email, password) VALUES ",
    );
    for i in 0..users.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 6;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5,
            p + 6
        ));
    }
    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar::<_, Uuid>(&query);
    for user in users {
        q = q
            .bind(user.tenant_id)
            .bind(user.role_id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash);
    }
    Ok(q.fetch_all(&mut **tx).await?)
}

/// Makes the HOD head of the first department, spreads teachers over every
/// subject of every section, and enrolls students round-robin.
pub async fn seed_memberships(
    db: &PgPool,
    structures: &[TenantStructure],
    users: &[TenantUsers],
) -> CliResult<()> {
    let start = Instant::now();
    println!("🔗 Assigning teachers and enrolling students...");

    let mut tx = db.begin().await?;
    let mut enrollments = 0usize;

    for (structure, people) in structures.iter().zip(users) {
        if let (Some(hod), Some(&department_id)) = (people.hod, structure.department_ids.first()) {
            sqlx::query("UPDATE departments SET hod_id = $2 WHERE id = $1")
                .bind(department_id)
                .bind(hod)
                .execute(&mut *tx)
                .await?;
        }

        if !people.teachers.is_empty() {
            let mut next = 0usize;
            for section in &structure.sections {
                for subject in structure.subjects_of(section.department_id) {
                    let teacher = people.teachers[next % people.teachers.len()];
                    next += 1;
                    sqlx::query(
                        "INSERT INTO teacher_assignments
                            (tenant_id, teacher_id, subject_id, section_id, academic_year_id)
                         VALUES ($1, $2, $3, $4, $5)
                         ON CONFLICT DO NOTHING",
                    )
                    .bind(structure.tenant_id)
                    .bind(teacher)
                    .bind(subject.id)
                    .bind(section.id)
                    .bind(structure.academic_year_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        if structure.sections.is_empty() {
            continue;
        }
        for (i, &student) in people.students.iter().enumerate() {
            let section = &structure.sections[i % structure.sections.len()];
            sqlx::query(
                "INSERT INTO student_enrollments
                    (tenant_id, student_id, section_id, academic_year_id, roll_number)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(structure.tenant_id)
            .bind(student)
            .bind(section.id)
            .bind(structure.academic_year_id)
            .bind(format!("{:04}", i / structure.sections.len() + 1))
            .execute(&mut *tx)
            .await?;
            enrollments += 1;
        }
    }

    let tenant_ids: Vec<TenantId> = structures.iter().map(|s| s.tenant_id).collect();
    refresh_counters(&mut tx, &tenant_ids).await?;
    tx.commit().await?;

    println!("   ✓ Enrolled {enrollments} students in {:?}", start.elapsed());
    Ok(())
}

async fn refresh_counters(
    tx: &mut Transaction<'_, Postgres>,
    tenant_ids: &[TenantId],
) -> CliResult<()> {
    sqlx::query(
        "UPDATE sections s SET current_student_count = (
            SELECT COUNT(*) FROM student_enrollments e
            WHERE e.section_id = s.id AND e.status = 'active')
         WHERE s.tenant_id = ANY($1)",
    )
    .bind(tenant_ids)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "UPDATE tenants t SET
            current_students = (SELECT COUNT(*) FROM users u WHERE u.tenant_id = t.id AND u.role_id = $2),
            current_teachers = (SELECT COUNT(*) FROM users u WHERE u.tenant_id = t.id AND u.role_id = $3),
            updated_at = NOW()
         WHERE t.id = ANY($1)",
    )
    .bind(tenant_ids)
    .bind(system_roles::STUDENT)
    .bind(system_roles::TEACHER)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
