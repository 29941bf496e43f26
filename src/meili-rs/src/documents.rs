use std::collections::HashMap;

use async_trait::async_trait;
use meili_core::Document;

use crate::index::Index;
use crate::pages::{short_page_next, Page, PageSource, Pages, DEFAULT_SLICE};
use crate::{ClientError, Result};

/// View on an index's documents collection.
///
/// [`from`](Documents::from) and [`maximum`](Documents::maximum) select a
/// single window retrieved by [`fetch`](Documents::fetch); the iterator
/// and the accumulators traverse the whole collection in slices, fetching
/// lazily as items are consumed.
pub struct Documents<'a> {
    index: &'a Index,
    offset: Option<usize>,
    limit: Option<usize>,
}

/// Collection-variant page source: the listing carries no total count, so
/// a short page ends the traversal.
struct Listing<'a> {
    index: &'a Index,
}

#[async_trait]
impl PageSource for Listing<'_> {
    async fn page(&self, offset: usize, limit: usize) -> Result<Page> {
        let items: Vec<Document> = self
            .index
            .endpoint()
            .resource(["indexes", self.index.uid(), "documents"])
            .get(&[("offset", offset.to_string()), ("limit", limit.to_string())])
            .await?
            .value()?;

        let next = short_page_next(offset, limit, items.len());
        Ok(Page { items, next })
    }
}

impl<'a> Documents<'a> {
    pub(crate) fn new(index: &'a Index) -> Self {
        Self {
            index,
            offset: None,
            limit: None,
        }
    }

    /// Starts the window at a given offset.
    pub fn from(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Limits the window to a given maximum number of documents.
    pub fn maximum(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Retrieves the selected window in one fetch. Service defaults apply
    /// to offset and limit unless set.
    pub async fn fetch(&self) -> Result<Vec<Document>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }

        self.index
            .endpoint()
            .resource(["indexes", self.index.uid(), "documents"])
            .get(&query)
            .await?
            .value()
    }

    /// Returns a lazy traversal over all documents with a given slice
    /// size. Each call starts a fresh traversal at offset 0.
    pub fn iterator(&self, slice: usize) -> Result<Pages<'a>> {
        Pages::new(Box::new(Listing { index: self.index }), slice)
    }

    /// Returns a lazy traversal over all documents with the default slice
    /// size.
    pub fn pages(&self) -> Result<Pages<'a>> {
        self.iterator(DEFAULT_SLICE)
    }

    /// Collects every document into a vector in backend order.
    pub async fn to_vec(&self) -> Result<Vec<Document>> {
        self.pages()?.to_vec().await
    }

    /// Collects every document into a map keyed by the index's primary
    /// key.
    pub async fn to_map(&self) -> Result<HashMap<String, Document>> {
        let field = self
            .index
            .primary_key()
            .await?
            .ok_or_else(|| ClientError::NoSuchField("primaryKey".into()))?
            .to_string();
        self.to_map_by(&field).await
    }

    /// Collects every document into a map keyed by the given field. Later
    /// documents overwrite earlier ones sharing a value.
    pub async fn to_map_by(&self, field: &str) -> Result<HashMap<String, Document>> {
        self.pages()?.to_map(field).await
    }
}
