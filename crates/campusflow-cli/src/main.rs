use campusflow_cli::{CliResult, catalog, seeder};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "campusflow-cli")]
#[command(about = "CampusFlow CLI - platform administration and demo data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a platform super administrator (no tenant)
    CreateSuperadmin {
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        #[arg(short = 'l', long)]
        last_name: Option<String>,

        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Prompted with confirmation when omitted
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Restore the six system roles and their capability flags
    InitRoles,
    /// Restore the default subscription plans
    InitPlans,
    /// Seed fake colleges with staff, departments, sections and students
    Seed {
        #[arg(short = 't', long, default_value = "3")]
        tenants: usize,

        /// Students per college
        #[arg(short = 's', long, default_value = "60")]
        students: usize,

        /// Teachers per college
        #[arg(long, default_value = "8")]
        teachers: usize,

        #[arg(long, default_value = "3")]
        departments: usize,

        /// Sections per department
        #[arg(long, default_value = "2")]
        sections: usize,
    },
    /// Delete every seeded college and everything under it
    ClearSeed,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    let result = match connect().await {
        Ok(pool) => run(&pool, cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("\n❌ {e}");
        std::process::exit(1);
    }
}

async fn connect() -> CliResult<PgPool> {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .map_err(|e| format!("Failed to connect to database: {e}"))?;
    Ok(pool)
}

async fn run(pool: &PgPool, command: Commands) -> CliResult<()> {
    match command {
        Commands::CreateSuperadmin {
            first_name,
            last_name,
            email,
            password,
        } => handle_create_superadmin(pool, first_name, last_name, email, password).await,
        Commands::InitRoles => {
            let count = catalog::init_roles(pool).await?;
            println!("✅ {count} system roles in place");
            Ok(())
        }
        Commands::InitPlans => {
            let count = catalog::init_plans(pool).await?;
            println!("✅ {count} subscription plans in place");
            Ok(())
        }
        Commands::Seed {
            tenants,
            students,
            teachers,
            departments,
            sections,
        } => {
            let config = seeder::SeedConfig::new(tenants)
                .with_students(students)
                .with_teachers(teachers)
                .with_departments(departments, sections);
            seeder::seed_all(pool, config).await
        }
        Commands::ClearSeed => {
            let deleted = seeder::clear_all(pool).await?;
            println!("✅ Removed {deleted} seeded colleges");
            Ok(())
        }
    }
}

fn prompt(value: Option<String>, label: &str) -> CliResult<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new().with_prompt(label).interact_text()?),
    }
}

async fn handle_create_superadmin(
    pool: &PgPool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> CliResult<()> {
    let first_name = prompt(first_name, "First name")?;
    let last_name = prompt(last_name, "Last name")?;
    let email = prompt(email, "Email address")?;
    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()?,
    };

    catalog::create_super_admin(pool, &first_name, &last_name, &email, &password)
        .await
        .map_err(|e| format!("Error creating super admin: {e}"))?;

    println!("\n✅ Super admin created");
    println!("   Email: {}", email.trim().to_lowercase());
    println!("   Name: {first_name} {last_name}");
    Ok(())
}
