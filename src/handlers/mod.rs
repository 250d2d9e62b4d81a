pub mod aggregate;
pub mod generate;
pub mod health;
pub mod shop_performance;
pub mod sources;
pub mod timeseries;
pub mod user_activity;
