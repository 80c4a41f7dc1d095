use chrono::NaiveDate;
use clap::Subcommand;
use rust_decimal::Decimal;
use serde_json::json;

use crate::cli::utils::{output_empty_collection, output_json, output_success};
use crate::cli::OutputFormat;
use crate::client::models::{Transaction, TransactionType};
use crate::client::ApiClient;

#[derive(Subcommand)]
pub enum TransactionCommands {
    #[command(about = "List transactions, optionally narrowed to one month")]
    List {
        #[arg(long, help = "Year to list (requires --month)")]
        year: Option<i32>,
        #[arg(long, help = "Month to list, 1-12 (requires --year)")]
        month: Option<u32>,
    },

    #[command(about = "Record a new transaction")]
    Add {
        #[arg(help = "Amount")]
        amount: Decimal,
        #[arg(help = "Description")]
        description: String,
        #[arg(long, value_enum, default_value_t = TransactionType::Expense, help = "Transaction kind")]
        kind: TransactionType,
        #[arg(long, help = "Date (YYYY-MM-DD), defaults to today")]
        date: Option<NaiveDate>,
    },

    #[command(about = "Show a transaction")]
    Show {
        #[arg(help = "Transaction id")]
        id: i64,
    },

    #[command(about = "Delete a transaction")]
    Delete {
        #[arg(help = "Transaction id")]
        id: i64,
    },
}

pub async fn handle(
    cmd: TransactionCommands,
    client: &ApiClient,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        TransactionCommands::List { year, month } => {
            let path = match (year, month) {
                (Some(year), Some(month)) => {
                    format!("/api/transactions/monthly/{}/{}/", year, month)
                }
                (None, None) => "/api/transactions/".to_string(),
                _ => anyhow::bail!("--year and --month must be given together"),
            };

            let transactions: Vec<Transaction> = client.get_json(&path).await?;

            if transactions.is_empty() {
                return output_empty_collection(
                    &output_format,
                    "transactions",
                    "No transactions recorded",
                );
            }

            match output_format {
                OutputFormat::Json => output_json(&transactions),
                OutputFormat::Text => {
                    for tx in transactions {
                        println!("{}", transaction_line(&tx));
                    }
                    Ok(())
                }
            }
        }

        TransactionCommands::Add {
            amount,
            description,
            kind,
            date,
        } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let tx: Transaction = client
                .post_json(
                    "/api/transactions/",
                    &json!({
                        "date": date.to_string(),
                        "amount": amount,
                        "description": description,
                        "transaction_type": kind,
                    }),
                )
                .await?;

            output_success(
                &output_format,
                &format!("Recorded {} of {} on {}", tx.transaction_type, tx.amount, tx.date),
                Some(json!({ "transaction": tx })),
            )
        }

        TransactionCommands::Show { id } => {
            let tx: Transaction = client
                .get_json(&format!("/api/transactions/{}/", id))
                .await?;
            match output_format {
                OutputFormat::Json => output_json(&tx),
                OutputFormat::Text => {
                    println!("{}", transaction_line(&tx));
                    Ok(())
                }
            }
        }

        TransactionCommands::Delete { id } => {
            client.delete(&format!("/api/transactions/{}/", id)).await?;
            output_success(&output_format, &format!("Transaction {} deleted", id), None)
        }
    }
}

fn transaction_line(tx: &Transaction) -> String {
    format!(
        "{:>4}  {}  {:<7} {:>12}  {}",
        tx.id, tx.date, tx.transaction_type, tx.amount, tx.description
    )
}
