pub mod auth;
pub mod budget;
pub mod dashboard;
pub mod transaction;
