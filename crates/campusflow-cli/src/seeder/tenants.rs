//! Fake colleges.

use campusflow_core::codes::{generate_unique_code, slugify};
use campusflow_models::TenantId;
use fake::Fake;
use fake::faker::address::en::{CityName, CountryName, StateName};
use fake::faker::phone_number::en::PhoneNumber;
use rayon::prelude::*;
use sqlx::PgPool;
use std::time::Instant;

use super::models::{SEED_SLUG_PREFIX, TenantSeed};
use crate::CliResult;

const KINDS: [&str; 6] = [
    "College",
    "Institute of Technology",
    "College of Engineering",
    "Arts and Science College",
    "Polytechnic",
    "College of Commerce",
];

pub fn generate_tenants(count: usize) -> Vec<TenantSeed> {
    // Keeps names unique across repeated seed runs.
    let run = generate_unique_code("", 4).to_lowercase();

    (0..count)
        .into_par_iter()
        .map(|i| {
            let city: String = CityName().fake();
            let name = format!("{city} {} {run}{i}", KINDS[i % KINDS.len()]);
            let slug = format!("{SEED_SLUG_PREFIX}{}", slugify(&name));
            TenantSeed {
                email: format!("office@{slug}.example.com"),
                phone: PhoneNumber().fake(),
                state: StateName().fake(),
                country: CountryName().fake(),
                city,
                name,
                slug,
            }
        })
        .collect()
}

/// Inserts tenants on the free trial with room for `students` students.
pub async fn seed_tenants(db: &PgPool, count: usize, students: usize) -> CliResult<Vec<TenantId>> {
    let start = Instant::now();
    println!("🏫 Seeding {count} colleges...");

    let seeds = generate_tenants(count);
    let max_students = i32::try_from(students.max(1000)).unwrap_or(i32::MAX);
    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(seeds.len());

    for seed in &seeds {
        let id = sqlx::query_scalar::<_, TenantId>(
            "INSERT INTO tenants (name, slug, subdomain, email, phone, city, state, country,
                subscription_status, subscription_plan, subscription_start_date, trial_end_date,
                max_students)
             VALUES ($1, $2, $2, $3, $4, $5, $6, $7, 'trial', 'free-trial',
                CURRENT_DATE, CURRENT_DATE + 14, $8)
             RETURNING id",
        )
        .bind(&seed.name)
        .bind(&seed.slug)
        .bind(&seed.email)
        .bind(&seed.phone)
        .bind(&seed.city)
        .bind(&seed.state)
        .bind(&seed.country)
        .bind(max_students)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO tenant_subscriptions (tenant_id, plan_id, status, trial_end_date)
             SELECT $1, id, 'trial', NOW() + INTERVAL '14 days'
             FROM subscription_plans WHERE slug = 'free-trial'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        ids.push(id);
    }

    tx.commit().await?;
    println!("   ✓ Inserted {} colleges in {:?}", ids.len(), start.elapsed());
    Ok(ids)
}

/// Deletes every seeded tenant; users and college data cascade.
pub async fn clear_tenants(db: &PgPool) -> CliResult<u64> {
    let start = Instant::now();
    let deleted = sqlx::query("DELETE FROM tenants WHERE slug LIKE $1")
        .bind(format!("{SEED_SLUG_PREFIX}%"))
        .execute(db)
        .await?
        .rows_affected();
    println!("   ✓ Deleted {deleted} seeded colleges in {:?}", start.elapsed());
    Ok(deleted)
}
