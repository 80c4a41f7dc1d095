use chrono::NaiveDate;
use clap::Subcommand;
use rust_decimal::Decimal;
use serde_json::json;

use crate::cli::utils::{output_empty_collection, output_json, output_success};
use crate::cli::OutputFormat;
use crate::client::models::Budget;
use crate::client::ApiClient;

#[derive(Subcommand)]
pub enum BudgetCommands {
    #[command(about = "List all budgets")]
    List,

    #[command(about = "Set the budget for a month")]
    Set {
        #[arg(help = "Month to budget for (YYYY-MM)")]
        month: String,
        #[arg(help = "Budget amount")]
        amount: Decimal,
    },

    #[command(about = "Show a budget")]
    Show {
        #[arg(help = "Budget id")]
        id: i64,
    },

    #[command(about = "Delete a budget")]
    Delete {
        #[arg(help = "Budget id")]
        id: i64,
    },
}

pub async fn handle(
    cmd: BudgetCommands,
    client: &ApiClient,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        BudgetCommands::List => {
            let budgets: Vec<Budget> = client.get_json("/api/budgets/").await?;

            if budgets.is_empty() {
                return output_empty_collection(&output_format, "budgets", "No budgets set");
            }

            match output_format {
                OutputFormat::Json => output_json(&budgets),
                OutputFormat::Text => {
                    for budget in budgets {
                        println!(
                            "{:>4}  {:<16} {:>12}",
                            budget.id, budget.month_year_display, budget.amount
                        );
                    }
                    Ok(())
                }
            }
        }

        BudgetCommands::Set { month, amount } => {
            let month_year = parse_month(&month)?;
            let budget: Budget = client
                .post_json(
                    "/api/budgets/",
                    &json!({ "month_year": month_year.to_string(), "amount": amount }),
                )
                .await?;

            output_success(
                &output_format,
                &format!("Budget for {} set to {}", budget.month_year_display, budget.amount),
                Some(json!({ "budget": budget })),
            )
        }

        BudgetCommands::Show { id } => {
            let budget: Budget = client.get_json(&format!("/api/budgets/{}/", id)).await?;
            match output_format {
                OutputFormat::Json => output_json(&budget),
                OutputFormat::Text => {
                    println!("{}: {}", budget.month_year_display, budget.amount);
                    Ok(())
                }
            }
        }

        BudgetCommands::Delete { id } => {
            client.delete(&format!("/api/budgets/{}/", id)).await?;
            output_success(&output_format, &format!("Budget {} deleted", id), None)
        }
    }
}

/// The backend stores a budget month as the first day of that month.
fn parse_month(month: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid month '{}', expected YYYY-MM", month))
}
