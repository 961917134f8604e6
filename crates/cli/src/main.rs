//! Sellor CLI - Database migrations and platform management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sellor-cli migrate
//!
//! # Insert the default product categories
//! sellor-cli seed categories
//!
//! # Create the platform subscription product and price in Stripe
//! sellor-cli stripe setup
//!
//! # Create an admin account
//! sellor-cli admin create -e admin@example.com -n "Admin Name" -p 'long-password' -r platform_owner
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `STRIPE_SECRET_KEY` - Stripe secret key (for `stripe setup`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sellor-cli")]
#[command(author, version, about = "Sellor CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Stripe account setup
    Stripe {
        #[command(subcommand)]
        action: StripeAction,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert the default product categories
    Categories,
}

#[derive(Subcommand)]
enum StripeAction {
    /// Create (or find) the platform subscription product and monthly price
    Setup,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Initial password
        #[arg(short, long)]
        password: String,

        /// Admin role (`admin`, `platform_owner`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Categories => {
                commands::seed::categories().await?;
            }
        },
        Commands::Stripe { action } => match action {
            StripeAction::Setup => commands::stripe::setup().await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
                role,
            } => {
                commands::admin::create_user(&email, &name, &password, &role).await?;
            }
        },
    }
    Ok(())
}
