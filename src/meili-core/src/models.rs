use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Documents are schemaless JSON objects. The service interprets no field
/// beyond the primary key, so the client passes them through untyped.
pub type Document = Map<String, Value>;

/// Index settings as an opaque JSON map (rankingRules, stopWords, ...).
/// The client does not validate them.
pub type Settings = Map<String, Value>;

/// Convenience for building documents from `serde_json::json!` literals.
/// Returns `None` when the value is not a JSON object.
pub fn document(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Renders a document field value as a map key. Strings are used as-is,
/// everything else via its JSON rendering (so the number 6100 keys as
/// "6100").
pub fn map_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Index metadata as returned by `GET /indexes/{uid}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMeta {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Unset until the service has inferred or been given one
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Changes accepted by `PUT /indexes/{uid}`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

impl IndexChanges {
    /// Renames the index.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Changes the primary key.
    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = Some(primary_key.into());
        self
    }
}

/// One window of search results as returned by `POST /indexes/{uid}/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub hits: Vec<Document>,
    pub offset: usize,
    pub limit: usize,
    /// Total number of hits across all windows
    pub nb_hits: usize,
    #[serde(default)]
    pub exhaustive_nb_hits: bool,
    pub processing_time_ms: u64,
    pub query: String,
}

/// Receipt for an asynchronously applied write (add, update, remove,
/// clear, configure, reset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub update_id: u64,
}

/// Statistics for a single index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub number_of_documents: u64,
    pub is_indexing: bool,
    #[serde(default)]
    pub fields_distribution: HashMap<String, u64>,
}

/// Service-wide statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub database_size: u64,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub indexes: HashMap<String, IndexStats>,
}

/// Service version as returned by `GET /version`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    #[serde(default)]
    pub commit_sha: Option<String>,
    #[serde(default)]
    pub commit_date: Option<String>,
    pub pkg_version: String,
}

/// Service health as returned by `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}
