use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use meili_core::{Document, IndexChanges, IndexMeta, IndexStats, Settings, Update};

use crate::documents::Documents;
use crate::endpoint::{Endpoint, Resource};
use crate::search::Search;
use crate::{ClientError, Result};

/// Handle to a single index.
///
/// Metadata is fetched lazily and memoized: a handle obtained via
/// [`Client::locate`](crate::Client::locate) performs no network activity
/// until a metadata accessor is called, while handles from
/// [`Client::index`](crate::Client::index) or a listing arrive with their
/// metadata pre-populated. An index is created automatically by the
/// service when documents or settings are added under its uid.
pub struct Index {
    endpoint: Endpoint,
    uid: String,
    meta: OnceCell<Option<IndexMeta>>,
}

impl Index {
    pub(crate) fn unresolved(endpoint: Endpoint, uid: String) -> Self {
        Self {
            endpoint,
            uid,
            meta: OnceCell::new(),
        }
    }

    pub(crate) fn resolved(endpoint: Endpoint, meta: IndexMeta) -> Self {
        Self {
            endpoint,
            uid: meta.uid.clone(),
            meta: OnceCell::from(Some(meta)),
        }
    }

    /// Index uid; always available without network activity.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn resource(&self, path: &[&str]) -> Resource {
        let mut segments = vec!["indexes", self.uid.as_str()];
        segments.extend_from_slice(path);
        self.endpoint.resource(segments)
    }

    /// Fetches and memoizes metadata; absence is not an error here.
    pub async fn meta(&self) -> Result<Option<&IndexMeta>> {
        let meta = self
            .meta
            .get_or_try_init(|| async {
                self.resource(&[]).get(&[]).await?.optional::<IndexMeta>()
            })
            .await?;
        Ok(meta.as_ref())
    }

    async fn require_meta(&self) -> Result<&IndexMeta> {
        self.meta()
            .await?
            .ok_or_else(|| ClientError::NoSuchIndex(self.uid.clone()))
    }

    /// Whether this index exists on the service.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.meta().await?.is_some())
    }

    /// Index name, for existing indexes.
    pub async fn name(&self) -> Result<&str> {
        self.require_meta()
            .await?
            .name
            .as_deref()
            .ok_or_else(|| ClientError::NoSuchField("name".into()))
    }

    /// Primary key name, for existing indexes. `None` until the service
    /// has inferred or been given one.
    pub async fn primary_key(&self) -> Result<Option<&str>> {
        Ok(self.require_meta().await?.primary_key.as_deref())
    }

    /// Creation date, for existing indexes.
    pub async fn created_at(&self) -> Result<DateTime<Utc>> {
        self.require_meta()
            .await?
            .created_at
            .ok_or_else(|| ClientError::NoSuchField("createdAt".into()))
    }

    /// Last update date, for existing indexes.
    pub async fn updated_at(&self) -> Result<DateTime<Utc>> {
        self.require_meta()
            .await?
            .updated_at
            .ok_or_else(|| ClientError::NoSuchField("updatedAt".into()))
    }

    /// Updates name and/or primary key. The service answers 200 with the
    /// new metadata, which replaces the memo.
    pub async fn modify(&mut self, changes: IndexChanges) -> Result<()> {
        let meta: IndexMeta = self.resource(&[]).put(&changes).await?.value()?;
        self.meta = OnceCell::from(Some(meta));
        Ok(())
    }

    /// Deletes this index. The service answers 204 on success.
    pub async fn delete(&mut self) -> Result<()> {
        self.resource(&[])
            .delete()
            .await?
            .matching(StatusCode::NO_CONTENT)?;

        // Reset meta information
        self.meta = OnceCell::new();
        Ok(())
    }

    /// Settings for this index.
    pub async fn settings(&self) -> Result<Settings> {
        self.resource(&["settings"]).get(&[]).await?.value()
    }

    /// Updates settings. The service answers 202 and applies them
    /// asynchronously.
    pub async fn configure(&self, settings: &Settings) -> Result<Update> {
        self.resource(&["settings"])
            .post(settings)
            .await?
            .matching(StatusCode::ACCEPTED)?
            .value()
    }

    /// Resets settings to their defaults. 202 as with `configure`.
    pub async fn reset(&self) -> Result<Update> {
        self.resource(&["settings"])
            .delete()
            .await?
            .matching(StatusCode::ACCEPTED)?
            .value()
    }

    /// Statistics for this index.
    pub async fn stats(&self) -> Result<IndexStats> {
        self.resource(&["stats"]).get(&[]).await?.value()
    }

    /// Fetches a document, returning `None` if it cannot be found.
    pub async fn document(&self, id: impl fmt::Display) -> Result<Option<Document>> {
        let id = id.to_string();
        self.resource(&["documents", id.as_str()])
            .get(&[])
            .await?
            .optional()
    }

    /// Adds documents, replacing existing ones sharing a primary key.
    /// The service answers 202 and indexes asynchronously.
    pub async fn add(&self, documents: &[Document]) -> Result<Update> {
        self.resource(&["documents"])
            .post(documents)
            .await?
            .matching(StatusCode::ACCEPTED)?
            .value()
    }

    /// Adds documents, partially updating existing ones sharing a primary
    /// key. 202 as with `add`.
    pub async fn update(&self, documents: &[Document]) -> Result<Update> {
        self.resource(&["documents"])
            .put(documents)
            .await?
            .matching(StatusCode::ACCEPTED)?
            .value()
    }

    /// Removes documents by primary key. 202 as with `add`.
    pub async fn remove<T: Serialize>(&self, ids: &[T]) -> Result<Update> {
        self.resource(&["documents", "delete-batch"])
            .post(ids)
            .await?
            .matching(StatusCode::ACCEPTED)?
            .value()
    }

    /// Deletes all documents from this index. 202 as with `add`.
    pub async fn clear(&self) -> Result<Update> {
        self.resource(&["documents"])
            .delete()
            .await?
            .matching(StatusCode::ACCEPTED)?
            .value()
    }

    /// Access to this index's documents collection.
    pub fn documents(&self) -> Documents<'_> {
        Documents::new(self)
    }

    /// Prepares a search query. Nothing is fetched until the result or a
    /// traversal is consumed.
    pub fn search(&self, query: impl Into<String>) -> Search<'_> {
        self.search_with(query, Map::new())
    }

    /// Prepares a search query with additional parameters (filters,
    /// facets, ...), passed through to the service untyped.
    pub fn search_with(&self, query: impl Into<String>, parameters: Map<String, Value>) -> Search<'_> {
        Search::new(self, query.into(), parameters)
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("uid", &self.uid)
            .field("meta", &self.meta.get())
            .finish()
    }
}

/// Listing of all indexes on the service.
pub struct Indexes {
    endpoint: Endpoint,
    metas: Vec<IndexMeta>,
}

impl Indexes {
    pub(crate) fn new(endpoint: Endpoint, metas: Vec<IndexMeta>) -> Self {
        Self { endpoint, metas }
    }

    /// Whether the service has no indexes.
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    /// Iterates index handles with pre-populated metadata.
    pub fn iter(&self) -> impl Iterator<Item = Index> + '_ {
        self.metas
            .iter()
            .cloned()
            .map(|meta| Index::resolved(self.endpoint.clone(), meta))
    }

    /// Collects the listing into a uid-keyed map of index handles.
    pub fn all(self) -> HashMap<String, Index> {
        let endpoint = self.endpoint;
        self.metas
            .into_iter()
            .map(|meta| (meta.uid.clone(), Index::resolved(endpoint.clone(), meta)))
            .collect()
    }
}

impl IntoIterator for Indexes {
    type Item = Index;
    type IntoIter = Box<dyn Iterator<Item = Index>>;

    fn into_iter(self) -> Self::IntoIter {
        let endpoint = self.endpoint;
        Box::new(
            self.metas
                .into_iter()
                .map(move |meta| Index::resolved(endpoint.clone(), meta)),
        )
    }
}
