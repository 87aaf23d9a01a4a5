//! Demo data: colleges on the free trial with staff, structure and enrolled students.
//!
//! Every seeded account shares [`SEED_PASSWORD`]. Seeded colleges carry the
//! [`SEED_SLUG_PREFIX`] slug prefix so [`clear_all`] can remove them, together
//! with everything that cascades from the tenant row.

mod models;
mod structure;
mod tenants;
mod users;

pub use models::{SEED_PASSWORD, SEED_SLUG_PREFIX, SeedConfig, TenantSeed, UserSeed};
pub use structure::{TenantStructure, academic_year_bounds};
pub use tenants::generate_tenants;
pub use users::{TenantUsers, generate_users};

use sqlx::PgPool;
use std::time::Instant;

use crate::CliResult;

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> CliResult<()> {
    let start = Instant::now();
    println!("\n🌱 Seeding {} colleges\n", config.tenants);

    // One hash for every account; cost 4 keeps large runs fast.
    let password_hash = bcrypt::hash(SEED_PASSWORD, 4)?;

    let section_capacity = section_capacity(&config);
    let tenant_ids = tenants::seed_tenants(db, config.tenants, config.students_per_tenant).await?;
    let structures = structure::seed_structure(
        db,
        &tenant_ids,
        config.departments_per_tenant,
        config.sections_per_department,
        section_capacity,
    )
    .await?;
    let people = users::seed_users(
        db,
        &tenant_ids,
        config.teachers_per_tenant,
        config.students_per_tenant,
        &password_hash,
    )
    .await?;
    users::seed_memberships(db, &structures, &people).await?;

    println!("\n✅ Seeding finished in {:?}", start.elapsed());
    println!("   Every seeded account uses the password \"{SEED_PASSWORD}\"");
    Ok(())
}

/// Enough seats per section for the configured students, never below 60.
fn section_capacity(config: &SeedConfig) -> i32 {
    let sections = config.sections_per_tenant().max(1);
    let needed = config.students_per_tenant.div_ceil(sections);
    i32::try_from(needed.max(60)).unwrap_or(i32::MAX)
}

pub async fn clear_all(db: &PgPool) -> CliResult<u64> {
    println!("\n🗑️  Clearing seeded colleges...");
    let deleted = tenants::clear_tenants(db).await?;
    println!("✅ Done\n");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_capacity_fits_every_student() {
        let config = SeedConfig::new(1).with_students(1000).with_departments(2, 2);
        assert_eq!(section_capacity(&config), 250);
        assert_eq!(section_capacity(&SeedConfig::new(1).with_students(10)), 60);
    }
}
