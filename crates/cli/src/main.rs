//! Furnish CLI - database migrations, catalog seeding and order management.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! furnish migrate
//!
//! # Load the sample furniture catalog
//! furnish seed
//!
//! # Newest orders
//! furnish orders recent --limit 20
//!
//! # Mark an order shipped
//! furnish orders set-status --id 42 --status shipped
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use furnish_core::OrderStatus;

mod commands;

#[derive(Parser)]
#[command(name = "furnish")]
#[command(author, version, about = "Furnish CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Upsert categories and products from a YAML catalog
    Seed {
        /// Catalog file (defaults to the built-in sample catalog)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Inspect and update orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Show the newest orders
    Recent {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
    /// Change an order's status
    SetStatus {
        /// Order ID
        #[arg(long)]
        id: i32,

        /// New status (`processing`, `shipped`, `delivered`, `cancelled`, `returned`)
        #[arg(short, long)]
        status: OrderStatus,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::catalog(file.as_deref()).await?,
        Commands::Orders { action } => match action {
            OrdersAction::Recent { limit } => commands::orders::recent(limit).await?,
            OrdersAction::SetStatus { id, status } => {
                commands::orders::set_status(id, status).await?;
            }
        },
    }
    Ok(())
}
