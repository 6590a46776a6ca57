//! Garagem CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (application tables and the session table)
//! garagem-cli migrate
//!
//! # Create a user account
//! garagem-cli user create -e ana@garagem.app -n "Ana Souza" -p 's3nh4-f0rte'
//!
//! # Export a report without going through the API
//! garagem-cli report export --lot <uuid> --start 2024-07-01 --end 2024-07-31 -f xlsx
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create user accounts
//! - `report export` - Write a report to a file

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use garagem_core::ParkingLotId;
use garagem_server::export::ExportFormat;

mod commands;

#[derive(Parser)]
#[command(name = "garagem-cli")]
#[command(author, version, about = "Garagem CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Generate reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Full name
        #[arg(short, long)]
        name: String,

        /// Initial password (at least 6 characters)
        #[arg(short, long, env = "GARAGEM_USER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Phone number (stored masked)
        #[arg(long)]
        phone: Option<String>,

        /// CPF or CNPJ (stored masked)
        #[arg(long)]
        document: Option<String>,
    },
}

#[derive(Subcommand)]
enum ReportAction {
    /// Export a lot's movement report
    Export {
        /// Parking lot ID
        #[arg(long)]
        lot: ParkingLotId,

        /// First day (YYYY-MM-DD, local time)
        #[arg(long)]
        start: NaiveDate,

        /// Last day (YYYY-MM-DD, local time)
        #[arg(long)]
        end: NaiveDate,

        /// Output format (json, xlsx, pdf)
        #[arg(short, long, default_value = "xlsx")]
        format: ExportFormat,

        /// Name printed as "Gerado por"
        #[arg(long, default_value = "garagem-cli")]
        generated_by: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
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
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                password,
                phone,
                document,
            } => {
                commands::user::create(&email, &name, &password, phone, document).await?;
            }
        },
        Commands::Report { action } => match action {
            ReportAction::Export {
                lot,
                start,
                end,
                format,
                generated_by,
                output,
            } => {
                let request = commands::report::ExportRequest {
                    lot,
                    start,
                    end,
                    format,
                    generated_by,
                };
                commands::report::export(&request, &output).await?;
            }
        },
    }
    Ok(())
}
