//! Meili Core Library
//!
//! Wire-format types shared by the Meilisearch client:
//! - Documents and index metadata
//! - Search results
//! - Update receipts, settings, stats, version and health payloads

pub mod models;

// Re-export commonly used types
pub use models::*;
