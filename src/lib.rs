// src/lib.rs
//! Fleetdesk: шлюз админки прокат-платформы и синхронизация постраничных
//! списков (URL <-> стор <-> бэкенд).

pub mod auth;
pub mod backend;
pub mod config;
pub mod envelope;
pub mod error;
pub mod listing;
pub mod models;
pub mod monitoring;

// Обработчики
pub mod handlers;
pub mod audit_handlers;
pub mod automation_handlers;
pub mod catalog_handlers;
pub mod permission_handlers;
pub mod plan_handlers;
pub mod user_handlers;

#[cfg(test)]
mod test_support;

pub use handlers::AppState;
