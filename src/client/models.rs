//! Wire types for the backend API.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "income"),
            TransactionType::Expense => write!(f, "expense"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub transaction_type: TransactionType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user: i64,
    /// First day of the budgeted month.
    pub month_year: NaiveDate,
    pub month_year_display: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Login exchange result: both credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Refresh exchange result: a new access token only.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedAccess {
    pub access: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub current_month: CurrentMonthSummary,
    pub recent_transactions: Vec<Transaction>,
    pub monthly_summary: Vec<MonthlySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentMonthSummary {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub budget_amount: Decimal,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub remaining_budget: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net: f64,
}
