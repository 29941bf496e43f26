use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use futures::stream::{self, Stream};
use meili_core::{map_key, Document};

use crate::{ClientError, Result};

/// Slice size used by whole-collection traversals unless one is given.
pub const DEFAULT_SLICE: usize = 20;

/// One fetched slice plus the offset to continue from, `None` once the
/// traversal is complete.
#[derive(Debug)]
pub struct Page {
    pub items: Vec<Document>,
    pub next: Option<usize>,
}

/// Fetches one slice of a paged resource. Implementations decide both how
/// `(offset, limit)` is retrieved and whether a further page follows.
#[async_trait]
pub(crate) trait PageSource: Send + Sync {
    async fn page(&self, offset: usize, limit: usize) -> Result<Page>;
}

/// Continuation rule for backends without a total count: a short page ends
/// the traversal. A full final page costs one extra empty fetch, which is
/// accepted rather than looking ahead.
pub(crate) fn short_page_next(offset: usize, limit: usize, count: usize) -> Option<usize> {
    (count == limit).then_some(offset + limit)
}

/// Continuation rule for counted responses: the echoed offset and limit
/// are authoritative (the backend may clamp them), the total decides.
pub(crate) fn counted_next(offset: usize, limit: usize, total: usize) -> Option<usize> {
    let next = offset + limit;
    (next < total).then_some(next)
}

/// Lazy forward-only traversal over a paged resource.
///
/// Items are pulled one at a time; a fetch happens only when the current
/// slice is drained, so at most one request is in flight and nothing is
/// prefetched or cached across pages. Dropping the value stops further
/// fetches. Every traversal starts at offset 0 and shares no state with
/// any other traversal over the same resource.
pub struct Pages<'a> {
    source: Box<dyn PageSource + 'a>,
    slice: usize,
    offset: Option<usize>,
    buffer: VecDeque<Document>,
}

impl<'a> Pages<'a> {
    pub(crate) fn new(source: Box<dyn PageSource + 'a>, slice: usize) -> Result<Self> {
        if slice == 0 {
            return Err(ClientError::EmptySlice);
        }

        Ok(Self {
            source,
            slice,
            offset: Some(0),
            buffer: VecDeque::new(),
        })
    }

    /// Yields the next document, fetching the next slice once the current
    /// one is drained. `None` marks the end of the traversal; a fetch
    /// error ends it as well.
    pub async fn next(&mut self) -> Result<Option<Document>> {
        loop {
            if let Some(document) = self.buffer.pop_front() {
                return Ok(Some(document));
            }

            let Some(offset) = self.offset else {
                return Ok(None);
            };

            let page = match self.source.page(offset, self.slice).await {
                Ok(page) => page,
                Err(e) => {
                    self.offset = None;
                    return Err(e);
                }
            };

            tracing::debug!("fetched {} item(s) at offset {}", page.items.len(), offset);
            self.offset = page.next;
            self.buffer.extend(page.items);
        }
    }

    /// Drains the traversal into a vector, preserving backend order.
    pub async fn to_vec(mut self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        while let Some(document) = self.next().await? {
            documents.push(document);
        }
        Ok(documents)
    }

    /// Drains the traversal into a map keyed by `field`. Later documents
    /// overwrite earlier ones sharing a key.
    pub async fn to_map(mut self, field: &str) -> Result<HashMap<String, Document>> {
        let mut documents = HashMap::new();
        while let Some(document) = self.next().await? {
            let key = document
                .get(field)
                .map(map_key)
                .ok_or_else(|| ClientError::NoSuchField(field.to_string()))?;
            documents.insert(key, document);
        }
        Ok(documents)
    }

    /// Adapts the pull iterator to a `futures` stream.
    pub fn stream(self) -> impl Stream<Item = Result<Document>> + 'a {
        stream::try_unfold(self, |mut pages| async move {
            Ok(pages.next().await?.map(|document| (document, pages)))
        })
    }
}
