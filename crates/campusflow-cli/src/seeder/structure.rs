//! Academic year, departments, sections and subjects for seeded colleges.

use campusflow_models::TenantId;
use chrono::{Datelike, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;
use uuid::Uuid;

use crate::CliResult;

const DEPARTMENTS: [(&str, &str); 6] = [
    ("Computer Science", "CSE"),
    ("Electronics", "ECE"),
    ("Mechanical Engineering", "MECH"),
    ("Mathematics", "MATH"),
    ("Commerce", "COM"),
    ("English Literature", "ENG"),
];

const SUBJECTS_PER_DEPARTMENT: usize = 2;

pub struct SeededSection {
    pub id: Uuid,
    pub department_id: Uuid,
}

pub struct SeededSubject {
    pub id: Uuid,
    pub department_id: Uuid,
}

/// Ids created for one tenant; users and memberships hang off these.
pub struct TenantStructure {
    pub tenant_id: TenantId,
    pub academic_year_id: Uuid,
    pub department_ids: Vec<Uuid>,
    pub sections: Vec<SeededSection>,
    pub subjects: Vec<SeededSubject>,
}

impl TenantStructure {
    pub fn subjects_of(&self, department_id: Uuid) -> impl Iterator<Item = &SeededSubject> {
        self.subjects
            .iter()
            .filter(move |s| s.department_id == department_id)
    }
}

/// The June-to-May academic year containing `today`.
pub fn academic_year_bounds(today: NaiveDate) -> (String, NaiveDate, NaiveDate) {
    let first = if today.month() >= 6 {
        today.year()
    } else {
        today.year() - 1
    };
    let start = NaiveDate::from_ymd_opt(first, 6, 1).unwrap_or(today);
    let end = NaiveDate::from_ymd_opt(first + 1, 5, 31).unwrap_or(today);
    (format!("{}-{}", first, first + 1), start, end)
}

pub async fn seed_structure(
    db: &PgPool,
    tenant_ids: &[TenantId],
    departments: usize,
    sections_per_department: usize,
    section_capacity: i32,
) -> CliResult<Vec<TenantStructure>> {
    let start = Instant::now();
    let departments = departments.min(DEPARTMENTS.len());
    println!(
        "🏛️  Seeding {departments} departments with {sections_per_department} sections each per college..."
    );

    let mut tx = db.begin().await?;
    let mut structures = Vec::with_capacity(tenant_ids.len());
    for &tenant_id in tenant_ids {
        structures.push(
            seed_tenant_structure(
                &mut tx,
                tenant_id,
                departments,
                sections_per_department,
                section_capacity,
            )
            .await?,
        );
    }
    tx.commit().await?;

    let sections: usize = structures.iter().map(|s| s.sections.len()).sum();
    println!(
        "   ✓ Inserted {sections} sections across {} colleges in {:?}",
        structures.len(),
        start.elapsed()
    );
    Ok(structures)
}

async fn seed_tenant_structure(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    departments: usize,
    sections_per_department: usize,
    section_capacity: i32,
) -> CliResult<TenantStructure> {
    let (year_name, start_date, end_date) = academic_year_bounds(Utc::now().date_naive());
    let academic_year_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO academic_years (tenant_id, name, start_date, end_date, is_current)
         VALUES ($1, $2, $3, $4, TRUE)
         RETURNING id",
    )
    .bind(tenant_id)
    .bind(&year_name)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(&mut **tx)
    .await?;

    let mut structure = TenantStructure {
        tenant_id,
        academic_year_id,
        department_ids: Vec::with_capacity(departments),
        sections: Vec::new(),
        subjects: Vec::new(),
    };

    for (name, code) in DEPARTMENTS.iter().take(departments) {
        let department_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO departments (tenant_id, name, code, established_year)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(tenant_id)
        .bind(name)
        .bind(code)
        .bind(start_date.year() - 20)
        .fetch_one(&mut **tx)
        .await?;
        structure.department_ids.push(department_id);

        for n in 1..=SUBJECTS_PER_DEPARTMENT {
            let id = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO subjects (tenant_id, department_id, name, code, semester, year)
                 VALUES ($1, $2, $3, $4, 1, 1)
                 RETURNING id",
            )
            .bind(tenant_id)
            .bind(department_id)
            .bind(format!("{name} {}", 100 + n))
            .bind(format!("{code}{}", 100 + n))
            .fetch_one(&mut **tx)
            .await?;
            structure.subjects.push(SeededSubject { id, department_id });
        }

        for n in 0..sections_per_department {
            let letter = char::from(b'A' + (n % 26) as u8);
            let id = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO sections (tenant_id, department_id, academic_year_id, name, code,
                    semester, year, max_students)
                 VALUES ($1, $2, $3, $4, $5, 1, 1, $6)
                 RETURNING id",
            )
            .bind(tenant_id)
            .bind(department_id)
            .bind(academic_year_id)
            .bind(format!("{code} Year 1 {letter}"))
            .bind(format!("{code}-1{letter}{}", n / 26))
            .bind(section_capacity)
            .fetch_one(&mut **tx)
            .await?;
            structure.sections.push(SeededSection { id, department_id });
        }
    }

    sqlx::query("UPDATE tenants SET current_departments = $2, updated_at = NOW() WHERE id = $1")
        .bind(tenant_id)
        .bind(departments as i32)
        .execute(&mut **tx)
        .await?;

    Ok(structure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn academic_year_rolls_over_in_june() {
        let (name, start, end) =
            academic_year_bounds(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(name, "2024-2025");
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 5, 31).unwrap());

        let (name, _, _) = academic_year_bounds(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(name, "2025-2026");
    }
}
