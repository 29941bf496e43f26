use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use meili_core::{Document, SearchResults};

use crate::index::Index;
use crate::pages::{counted_next, Page, PageSource, Pages, DEFAULT_SLICE};
use crate::{ClientError, Result};

/// A prepared search query.
///
/// The one-shot [`result`](Search::result) is fetched on first access and
/// memoized for the lifetime of this value; all metadata accessors read
/// from it. The traversal returned by [`iterator`](Search::iterator)
/// performs its own independent fetch sequence and never touches the
/// memo.
pub struct Search<'a> {
    index: &'a Index,
    parameters: Map<String, Value>,
    result: OnceCell<SearchResults>,
}

/// Search-variant page source: every page is a POST with the fixed
/// parameters plus the cursor's offset and limit. The echoed offset and
/// limit are authoritative, the reported total ends the traversal.
struct Hits<'a> {
    index: &'a Index,
    parameters: Map<String, Value>,
}

#[async_trait]
impl PageSource for Hits<'_> {
    async fn page(&self, offset: usize, limit: usize) -> Result<Page> {
        let mut parameters = self.parameters.clone();
        parameters.insert("offset".into(), offset.into());
        parameters.insert("limit".into(), limit.into());

        let results: SearchResults = self
            .index
            .endpoint()
            .resource(["indexes", self.index.uid(), "search"])
            .post(&parameters)
            .await?
            .value()?;

        let next = counted_next(results.offset, results.limit, results.nb_hits);
        Ok(Page {
            items: results.hits,
            next,
        })
    }
}

impl<'a> Search<'a> {
    pub(crate) fn new(index: &'a Index, query: String, mut parameters: Map<String, Value>) -> Self {
        parameters.insert("q".into(), Value::String(query));
        Self {
            index,
            parameters,
            result: OnceCell::new(),
        }
    }

    /// Requests the result window to start at a given offset.
    pub fn from(mut self, offset: usize) -> Self {
        self.parameters.insert("offset".into(), offset.into());
        self
    }

    /// Limits the result window to a given maximum number of hits.
    pub fn maximum(mut self, limit: usize) -> Self {
        self.parameters.insert("limit".into(), limit.into());
        self
    }

    /// Performs the search on first access and memoizes the result;
    /// subsequent calls reuse the first response without refetching.
    pub async fn result(&self) -> Result<&SearchResults> {
        self.result
            .get_or_try_init(|| async {
                self.index
                    .endpoint()
                    .resource(["indexes", self.index.uid(), "search"])
                    .post(&self.parameters)
                    .await?
                    .value()
            })
            .await
    }

    /// Echoed query string.
    pub async fn query(&self) -> Result<&str> {
        Ok(&self.result().await?.query)
    }

    /// Total number of hits across all windows.
    pub async fn hits(&self) -> Result<usize> {
        Ok(self.result().await?.nb_hits)
    }

    /// Echoed window offset.
    pub async fn offset(&self) -> Result<usize> {
        Ok(self.result().await?.offset)
    }

    /// Echoed window limit.
    pub async fn limit(&self) -> Result<usize> {
        Ok(self.result().await?.limit)
    }

    /// Server-side processing time.
    pub async fn elapsed_time(&self) -> Result<Duration> {
        Ok(Duration::from_millis(self.result().await?.processing_time_ms))
    }

    /// Offset of the previous window, `None` when the window starts at 0.
    pub async fn previous(&self) -> Result<Option<usize>> {
        let results = self.result().await?;
        Ok((results.offset != 0).then(|| results.offset.saturating_sub(results.limit)))
    }

    /// Offset of the next window, `None` once `offset + limit` reaches
    /// the total.
    pub async fn next(&self) -> Result<Option<usize>> {
        let results = self.result().await?;
        let next = results.offset + results.limit;
        Ok((next < results.nb_hits).then_some(next))
    }

    /// Returns a lazy traversal over all hits with a given slice size.
    /// Offset and limit set via [`from`](Search::from) and
    /// [`maximum`](Search::maximum) apply to the one-shot result only;
    /// the traversal always starts at offset 0.
    pub fn iterator(&self, slice: usize) -> Result<Pages<'a>> {
        Pages::new(
            Box::new(Hits {
                index: self.index,
                parameters: self.parameters.clone(),
            }),
            slice,
        )
    }

    /// Returns a lazy traversal over all hits with the default slice
    /// size.
    pub fn pages(&self) -> Result<Pages<'a>> {
        self.iterator(DEFAULT_SLICE)
    }

    /// Collects every hit into a vector in relevance order.
    pub async fn to_vec(&self) -> Result<Vec<Document>> {
        self.pages()?.to_vec().await
    }

    /// Collects every hit into a map keyed by the index's primary key.
    pub async fn to_map(&self) -> Result<HashMap<String, Document>> {
        let field = self
            .index
            .primary_key()
            .await?
            .ok_or_else(|| ClientError::NoSuchField("primaryKey".into()))?
            .to_string();
        self.to_map_by(&field).await
    }

    /// Collects every hit into a map keyed by the given field. Later hits
    /// overwrite earlier ones sharing a value.
    pub async fn to_map_by(&self, field: &str) -> Result<HashMap<String, Document>> {
        self.pages()?.to_map(field).await
    }
}
