pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::store::CredentialStore;
use crate::client::ApiClient;

#[derive(Parser)]
#[command(name = "pocketledger")]
#[command(about = "PocketLedger CLI - budgets and transactions from the terminal")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        help = "Gateway URL (defaults to $POCKETLEDGER_URL, then http://127.0.0.1:5000)"
    )]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Monthly budget management")]
    Budget {
        #[command(subcommand)]
        cmd: commands::budget::BudgetCommands,
    },

    #[command(about = "Income and expense transactions")]
    Transaction {
        #[command(subcommand)]
        cmd: commands::transaction::TransactionCommands,
    },

    #[command(about = "Aggregated dashboard summaries")]
    Dashboard {
        #[command(subcommand)]
        cmd: commands::dashboard::DashboardCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = build_client(cli.server.as_deref())?;

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &client, output_format).await,
        Commands::Budget { cmd } => commands::budget::handle(cmd, &client, output_format).await,
        Commands::Transaction { cmd } => {
            commands::transaction::handle(cmd, &client, output_format).await
        }
        Commands::Dashboard { cmd } => {
            commands::dashboard::handle(cmd, &client, output_format).await
        }
    }
}

fn build_client(server: Option<&str>) -> anyhow::Result<ApiClient> {
    let base = match server {
        Some(url) => url.to_string(),
        None => std::env::var("POCKETLEDGER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string()),
    };

    let base_url = Url::parse(&base)?;
    let store = CredentialStore::open_default()?;
    Ok(ApiClient::new(base_url, store)?)
}
