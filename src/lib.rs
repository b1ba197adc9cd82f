// API module for the drafts backend
pub mod api;

// Re-export api modules at crate root (so routes can use crate::services, crate::models)
pub use api::config;
pub use api::middleware;
pub use api::models;
pub use api::routes;
pub use api::services;
pub use api::storage;

// Documentation pipeline: expands API page templates against the OpenAPI document
pub mod docs;
