//! Infrastructure layer: stores, inventory services, low-stock alerting, config.

pub mod alerts;
pub mod config;
pub mod services;
pub mod store;
