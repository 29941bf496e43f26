use std::sync::Arc;

use reqwest::{StatusCode, Url};
use serde_json::json;

use meili_core::{Health, IndexMeta, Stats, Version};

use crate::endpoint::{Connection, Endpoint};
use crate::index::{Index, Indexes};
use crate::{ClientError, Result};

/// Meilisearch API client.
///
/// Constructed from a DSN in the form `https?://[{api-key}@]{host}[:{port}]`.
/// If the port is omitted, the default port for the given scheme is used.
/// The api-key userinfo component, when present, is attached to every
/// request as the `X-Meili-API-Key` header.
pub struct Client {
    endpoint: Endpoint,
}

impl Client {
    pub fn new(dsn: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(dsn.as_ref()).map_err(|e| ClientError::Dsn(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Dsn(format!(
                "unsupported scheme `{}`",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(ClientError::Dsn(
                "DSN must consist at least of scheme and host".into(),
            ));
        }

        let api_key = match url.username() {
            "" => None,
            user => Some(user.to_string()),
        };

        let mut base = url;
        let _ = base.set_username("");
        let _ = base.set_password(None);
        base.set_path("");
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self {
            endpoint: Endpoint::new(base, api_key.as_deref())?,
        })
    }

    /// The underlying endpoint, usable for raw requests against routes
    /// this client does not cover.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Replaces the transport; used by the tests to fake the service.
    pub fn connecting(&mut self, connection: Arc<dyn Connection>) {
        self.endpoint.connecting(connection);
    }

    /// Service health.
    pub async fn health(&self) -> Result<Health> {
        self.endpoint.resource(["health"]).get(&[]).await?.value()
    }

    /// Service version.
    pub async fn version(&self) -> Result<Version> {
        self.endpoint.resource(["version"]).get(&[]).await?.value()
    }

    /// Stats across all indexes.
    pub async fn stats(&self) -> Result<Stats> {
        self.endpoint.resource(["stats"]).get(&[]).await?.value()
    }

    /// Locates an index by uid without any network activity. Useful when
    /// the index is known to exist, deferring fetches until necessary;
    /// use [`Index::exists`] to check. The service creates an index
    /// automatically when documents or settings are added under its uid.
    pub fn locate(&self, uid: impl Into<String>) -> Index {
        Index::unresolved(self.endpoint.clone(), uid.into())
    }

    /// Returns an index by uid, erroring if it does not exist.
    pub async fn index(&self, uid: &str) -> Result<Index> {
        let meta: IndexMeta = self
            .endpoint
            .resource(["indexes", uid])
            .get(&[])
            .await?
            .value()?;
        Ok(Index::resolved(self.endpoint.clone(), meta))
    }

    /// Creates an index, erroring if it already exists. The service
    /// answers 201 on success.
    pub async fn create(&self, uid: &str, primary_key: Option<&str>) -> Result<Index> {
        let meta: IndexMeta = self
            .endpoint
            .resource(["indexes"])
            .post(&json!({ "uid": uid, "primaryKey": primary_key }))
            .await?
            .matching(StatusCode::CREATED)?
            .value()?;
        Ok(Index::resolved(self.endpoint.clone(), meta))
    }

    /// Lists all indexes.
    pub async fn indexes(&self) -> Result<Indexes> {
        let metas: Vec<IndexMeta> = self
            .endpoint
            .resource(["indexes"])
            .get(&[])
            .await?
            .value()?;
        Ok(Indexes::new(self.endpoint.clone(), metas))
    }
}
