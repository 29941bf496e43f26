//! Meilisearch Client Library
//!
//! Typed HTTP client for the Meilisearch REST API: index management,
//! document CRUD, search, and lazy slice-based traversal over paged
//! results.

mod client;
mod documents;
mod endpoint;
mod index;
mod pages;
mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Client;
pub use documents::Documents;
pub use endpoint::{Connection, Endpoint, Request, Resource, Response, API_KEY_HEADER};
pub use index::{Index, Indexes};
pub use meili_core::{
    document, Document, Health, IndexChanges, IndexMeta, IndexStats, SearchResults, Settings,
    Stats, Update, Version,
};
pub use pages::{Page, Pages, DEFAULT_SLICE};
pub use search::Search;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid DSN: {0}")]
    Dsn(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Index {0} does not exist")]
    NoSuchIndex(String),

    #[error("No such field {0}")]
    NoSuchField(String),

    #[error("Slice size must be at least 1")]
    EmptySlice,
}

pub type Result<T> = std::result::Result<T, ClientError>;
