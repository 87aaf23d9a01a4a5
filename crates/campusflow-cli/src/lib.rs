//! # CampusFlow CLI
//!
//! Library half of `campusflow-cli`:
//!
//! - [`catalog`]: upserts for the system roles and default plans, and super admin creation
//! - [`seeder`]: fake colleges with staff, structure and enrolled students
//!
//! ```ignore
//! use campusflow_cli::seeder::{seed_all, SeedConfig};
//!
//! seed_all(&pool, SeedConfig::new(3).with_students(120)).await?;
//! ```

pub mod catalog;
pub mod seeder;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;
