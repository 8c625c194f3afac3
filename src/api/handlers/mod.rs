pub mod alerts;
pub mod analytics;
pub mod config;
pub mod health;
pub mod markets;
pub mod metrics;
pub mod trades;
pub mod wallets;
