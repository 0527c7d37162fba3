pub mod alerts;
pub mod bot;
pub mod config;
pub mod error;
pub mod format;
pub mod market;
pub mod observability;
pub mod proxy;
pub mod scheduler;
pub mod summary;
pub mod telegram;
