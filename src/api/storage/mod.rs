//! Storage module for the API.
//!
//! Provides an in-memory backend (default) and a PostgreSQL backend.

pub mod error;
pub mod seed;
pub mod traits;

// Storage backend implementations
pub mod memory;
pub mod postgres;

pub use error::StorageError;
pub use memory::MemoryStorageBackend;
pub use seed::SeedData;
pub use traits::{BotConfig, StorageBackend};
