use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{ClientError, Result};

/// Header carrying the static credential extracted from the DSN.
pub const API_KEY_HEADER: &str = "X-Meili-API-Key";

/// A single HTTP exchange as seen by the [`Connection`] seam.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Raw response before status branching.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(ClientError::from)
    }

    fn unexpected(self) -> ClientError {
        ClientError::Status {
            status: self.status.as_u16(),
            body: String::from_utf8_lossy(&self.body).into_owned(),
        }
    }

    /// Parses the JSON body on any 2xx status.
    pub fn value<T: DeserializeOwned>(self) -> Result<T> {
        if self.status.is_success() {
            self.json()
        } else {
            Err(self.unexpected())
        }
    }

    /// Maps 404 to `None`; parses the JSON body on 2xx.
    pub fn optional<T: DeserializeOwned>(self) -> Result<Option<T>> {
        if self.status == StatusCode::NOT_FOUND {
            Ok(None)
        } else if self.status.is_success() {
            self.json().map(Some)
        } else {
            Err(self.unexpected())
        }
    }

    /// Accepts exactly one status; anything else is unexpected. Mutating
    /// operations each have a single recognized success status.
    pub fn matching(self, status: StatusCode) -> Result<Response> {
        if self.status == status {
            Ok(self)
        } else {
            Err(self.unexpected())
        }
    }
}

/// Transport seam. Production drives reqwest; tests substitute a routing
/// table via [`crate::Client::connecting`].
#[async_trait]
pub trait Connection: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response>;
}

struct HttpConnection {
    http: reqwest::Client,
}

#[async_trait]
impl Connection for HttpConnection {
    async fn send(&self, request: Request) -> Result<Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(Response::new(status, body))
    }
}

/// Shared API endpoint: base URL, static headers and the transport they
/// travel over. Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct Endpoint {
    connection: Arc<dyn Connection>,
    base: Url,
    headers: HeaderMap,
}

impl Endpoint {
    pub(crate) fn new(base: Url, api_key: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| ClientError::Dsn("API key is not a valid header value".into()))?;
            headers.insert(API_KEY_HEADER, value);
        }

        Ok(Self {
            connection: Arc::new(HttpConnection {
                http: reqwest::Client::new(),
            }),
            base,
            headers,
        })
    }

    /// Replaces the transport.
    pub fn connecting(&mut self, connection: Arc<dyn Connection>) {
        self.connection = connection;
    }

    /// Static headers attached to every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Addresses a resource by positional path segments, encoding each.
    pub fn resource<I>(&self, segments: I) -> Resource
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base.clone();
        // Infallible: the base URL was validated as http(s) at construction
        url.path_segments_mut()
            .unwrap()
            .pop_if_empty()
            .extend(segments);
        Resource {
            endpoint: self.clone(),
            url,
        }
    }
}

/// A resource path bound to the endpoint, offering the four verbs the
/// service uses.
pub struct Resource {
    endpoint: Endpoint,
    url: Url,
}

impl Resource {
    /// GET with query parameters.
    pub async fn get(&self, query: &[(&str, String)]) -> Result<Response> {
        let mut url = self.url.clone();
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(name, value)| (*name, value.as_str())));
        }
        self.send(Method::GET, url, None).await
    }

    /// POST with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, body: &B) -> Result<Response> {
        self.send(Method::POST, self.url.clone(), Some(serde_json::to_vec(body)?))
            .await
    }

    /// PUT with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(&self, body: &B) -> Result<Response> {
        self.send(Method::PUT, self.url.clone(), Some(serde_json::to_vec(body)?))
            .await
    }

    /// DELETE, no body.
    pub async fn delete(&self) -> Result<Response> {
        self.send(Method::DELETE, self.url.clone(), None).await
    }

    async fn send(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<Response> {
        let request = Request {
            method,
            url,
            headers: self.endpoint.headers.clone(),
            body,
        };

        let response = self.endpoint.connection.send(request.clone()).await?;
        tracing::debug!(
            "{} {} -> {}",
            request.method,
            request.url.path(),
            response.status().as_u16()
        );
        Ok(response)
    }
}
