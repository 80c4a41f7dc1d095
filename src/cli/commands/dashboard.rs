use clap::Subcommand;

use crate::cli::utils::output_json;
use crate::cli::OutputFormat;
use crate::client::models::DashboardSummary;
use crate::client::ApiClient;

#[derive(Subcommand)]
pub enum DashboardCommands {
    #[command(about = "Show the dashboard summary for a month (defaults to the current month)")]
    Summary {
        #[arg(long, help = "Year (requires --month)")]
        year: Option<i32>,
        #[arg(long, help = "Month, 1-12 (requires --year)")]
        month: Option<u32>,
    },
}

pub async fn handle(
    cmd: DashboardCommands,
    client: &ApiClient,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        DashboardCommands::Summary { year, month } => {
            let path = match (year, month) {
                (Some(year), Some(month)) => {
                    format!("/api/dashboard/summary/?year={}&month={}", year, month)
                }
                (None, None) => "/api/dashboard/summary/".to_string(),
                _ => anyhow::bail!("--year and --month must be given together"),
            };

            let summary: DashboardSummary = client.get_json(&path).await?;

            match output_format {
                OutputFormat::Json => output_json(&summary),
                OutputFormat::Text => {
                    let current = &summary.current_month;
                    println!("{}", current.month_name);
                    println!("  Budget:    {:>12}", current.budget_amount);
                    println!("  Income:    {:>12}", current.total_income);
                    println!("  Expenses:  {:>12}", current.total_expenses);
                    println!("  Remaining: {:>12.2}", current.remaining_budget);
                    println!("  Net:       {:>12.2}", current.net);

                    if !summary.recent_transactions.is_empty() {
                        println!("\nRecent transactions:");
                        for tx in &summary.recent_transactions {
                            println!(
                                "  {}  {:<7} {:>12}  {}",
                                tx.date, tx.transaction_type, tx.amount, tx.description
                            );
                        }
                    }

                    println!("\nLast {} months:", summary.monthly_summary.len());
                    for month in &summary.monthly_summary {
                        println!(
                            "  {:<4} {}  income {:>12}  expenses {:>12}  net {:>12.2}",
                            month.month_name,
                            month.year,
                            month.total_income,
                            month.total_expenses,
                            month.net
                        );
                    }
                    Ok(())
                }
            }
        }
    }
}
