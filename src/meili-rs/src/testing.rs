//! Test doubles shared by the module tests: a routing-table connection in
//! the spirit of the faked service, plus in-memory index fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use meili_core::{map_key, Document};

use crate::endpoint::{Connection, Request, Response};
use crate::{Client, Index, Result};

/// Parameters available to a route handler: captured path segments plus
/// query parameters.
pub(crate) struct Params {
    segments: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl Params {
    pub fn segment(&self, name: &str) -> Option<&str> {
        self.segments.get(name).map(String::as_str)
    }

    pub fn usize(&self, name: &str, default: usize) -> usize {
        self.query
            .get(name)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }
}

type Handler = Box<dyn Fn(&Params, Option<&[u8]>) -> (u16, String) + Send + Sync>;

/// Routing-table connection: dispatches `METHOD /path` patterns with
/// `{name}` placeholders to handlers producing status and body.
pub(crate) struct TestConnection {
    routes: Vec<(String, Handler)>,
}

fn matches(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern: Vec<&str> = pattern.split('/').collect();
    let path: Vec<&str> = path.split('/').collect();
    if pattern.len() != path.len() {
        return None;
    }

    let mut segments = HashMap::new();
    for (expected, actual) in pattern.iter().zip(&path) {
        if let Some(name) = expected.strip_prefix('{').and_then(|e| e.strip_suffix('}')) {
            segments.insert(name.to_string(), (*actual).to_string());
        } else if expected != actual {
            return None;
        }
    }
    Some(segments)
}

impl TestConnection {
    fn dispatch(&self, request: &Request) -> (u16, String) {
        let method = request.method.as_str();
        let path = request.url.path();
        let query: HashMap<String, String> = request
            .url
            .query_pairs()
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        for (pattern, handler) in &self.routes {
            let Some((route_method, route_path)) = pattern.split_once(' ') else {
                continue;
            };
            if route_method != method {
                continue;
            }
            if let Some(segments) = matches(route_path, path) {
                let params = Params { segments, query };
                return handler(&params, request.body.as_deref());
            }
        }

        (404, format!("No such route {method} {path}"))
    }
}

#[async_trait]
impl Connection for TestConnection {
    async fn send(&self, request: Request) -> Result<Response> {
        let (status, body) = self.dispatch(&request);
        Ok(Response::new(
            StatusCode::from_u16(status).unwrap(),
            body.into_bytes(),
        ))
    }
}

/// Builder collecting routes into a [`Client`] wired to a
/// [`TestConnection`].
pub(crate) struct Routes {
    routes: Vec<(String, Handler)>,
}

impl Routes {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn on(
        mut self,
        pattern: &str,
        handler: impl Fn(&Params, Option<&[u8]>) -> (u16, String) + Send + Sync + 'static,
    ) -> Self {
        self.routes.push((pattern.to_string(), Box::new(handler)));
        self
    }

    pub fn client(self) -> Client {
        let mut client = Client::new("http://localhost:7700").unwrap();
        client.connecting(Arc::new(TestConnection {
            routes: self.routes,
        }));
        client
    }
}

pub(crate) const FIXTURE_IDS: [i64; 3] = [6100, 6101, 6102];

pub(crate) fn documents_fixture() -> Vec<Document> {
    vec![
        meili_core::document(json!({"id": 6100, "term": "test"})).unwrap(),
        meili_core::document(json!({"id": 6101, "term": "ok"})).unwrap(),
        meili_core::document(json!({"id": 6102, "term": "yes"})).unwrap(),
    ]
}

/// Fetch counters for the `mock_index` fixture.
pub(crate) struct Counter {
    documents: Arc<AtomicUsize>,
    searches: Arc<AtomicUsize>,
}

impl Counter {
    pub fn documents_fetches(&self) -> usize {
        self.documents.load(Ordering::SeqCst)
    }

    pub fn search_fetches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

fn id_of(document: &Document) -> String {
    document.get("id").map(map_key).unwrap_or_default()
}

fn upsert(documents: &mut Vec<Document>, document: Document) {
    match documents.iter().position(|d| id_of(d) == id_of(&document)) {
        Some(at) => documents[at] = document,
        None => documents.push(document),
    }
}

fn merge(documents: &mut Vec<Document>, patch: Document) {
    match documents.iter().position(|d| id_of(d) == id_of(&patch)) {
        Some(at) => {
            for (name, value) in patch {
                documents[at].insert(name, value);
            }
        }
        None => documents.push(patch),
    }
}

/// A `test` index backed by an in-memory store with functioning documents
/// and search APIs, mirroring the service's routes.
pub(crate) fn mock_index(documents: Vec<Document>) -> (Index, Counter) {
    let store = Arc::new(Mutex::new(documents));
    let document_fetches = Arc::new(AtomicUsize::new(0));
    let search_fetches = Arc::new(AtomicUsize::new(0));

    let client = Routes::new()
        .on("GET /indexes/test", |_, _| {
            (200, r#"{"uid":"test","primaryKey":"id"}"#.to_string())
        })
        .on("GET /indexes/test/documents", {
            let store = store.clone();
            let fetches = document_fetches.clone();
            move |params, _| {
                fetches.fetch_add(1, Ordering::SeqCst);
                let documents = store.lock().unwrap();
                let page: Vec<Document> = documents
                    .iter()
                    .skip(params.usize("offset", 0))
                    .take(params.usize("limit", 20))
                    .cloned()
                    .collect();
                (200, serde_json::to_string(&page).unwrap())
            }
        })
        .on("GET /indexes/test/documents/{id}", {
            let store = store.clone();
            move |params, _| {
                let id = params.segment("id").unwrap();
                let documents = store.lock().unwrap();
                match documents.iter().find(|d| id_of(d) == id) {
                    Some(document) => (200, serde_json::to_string(document).unwrap()),
                    None => (404, r#"{"message":"Document not found"}"#.to_string()),
                }
            }
        })
        .on("POST /indexes/test/documents", {
            let store = store.clone();
            move |_, body| {
                let incoming: Vec<Document> = serde_json::from_slice(body.unwrap()).unwrap();
                if incoming.iter().any(|d| !d.contains_key("id")) {
                    return (
                        400,
                        r#"{"message":"Document is missing its primary key"}"#.to_string(),
                    );
                }
                let mut documents = store.lock().unwrap();
                for document in incoming {
                    upsert(&mut documents, document);
                }
                (202, r#"{"updateId":1}"#.to_string())
            }
        })
        .on("PUT /indexes/test/documents", {
            let store = store.clone();
            move |_, body| {
                let incoming: Vec<Document> = serde_json::from_slice(body.unwrap()).unwrap();
                if incoming.iter().any(|d| !d.contains_key("id")) {
                    return (
                        400,
                        r#"{"message":"Document is missing its primary key"}"#.to_string(),
                    );
                }
                let mut documents = store.lock().unwrap();
                for patch in incoming {
                    merge(&mut documents, patch);
                }
                (202, r#"{"updateId":1}"#.to_string())
            }
        })
        .on("POST /indexes/test/documents/delete-batch", {
            let store = store.clone();
            move |_, body| {
                let ids: Vec<Value> = serde_json::from_slice(body.unwrap()).unwrap();
                let ids: Vec<String> = ids.iter().map(map_key).collect();
                store.lock().unwrap().retain(|d| !ids.contains(&id_of(d)));
                (202, r#"{"updateId":1}"#.to_string())
            }
        })
        .on("DELETE /indexes/test/documents", {
            let store = store.clone();
            move |_, _| {
                store.lock().unwrap().clear();
                (202, r#"{"updateId":1}"#.to_string())
            }
        })
        .on("POST /indexes/test/search", {
            let store = store.clone();
            let fetches = search_fetches.clone();
            move |_, body| {
                fetches.fetch_add(1, Ordering::SeqCst);
                let request: Value = serde_json::from_slice(body.unwrap()).unwrap();
                let query = request["q"].as_str().unwrap_or("").to_lowercase();
                let offset = request["offset"].as_u64().unwrap_or(0) as usize;
                let limit = request["limit"].as_u64().unwrap_or(20) as usize;

                let documents = store.lock().unwrap();
                let matched: Vec<&Document> = documents
                    .iter()
                    .filter(|d| {
                        d.values()
                            .any(|v| map_key(v).to_lowercase().contains(&query))
                    })
                    .collect();
                let hits: Vec<&Document> =
                    matched.iter().skip(offset).take(limit).copied().collect();

                let results = json!({
                    "hits": hits,
                    "offset": offset,
                    "limit": limit,
                    "nbHits": matched.len(),
                    "exhaustiveNbHits": false,
                    "processingTimeMs": 35,
                    "query": request["q"].as_str().unwrap_or("")
                });
                (200, results.to_string())
            }
        })
        .client();

    let index = client.locate("test");
    (
        index,
        Counter {
            documents: document_fetches,
            searches: search_fetches,
        },
    )
}

/// A `test` index whose documents listing serves one full page and fails
/// afterwards.
pub(crate) fn mock_index_with_failing_listing() -> Index {
    let client = Routes::new()
        .on("GET /indexes/test/documents", |params, _| {
            if params.usize("offset", 0) > 0 {
                return (500, "Internal server error".to_string());
            }
            let page: Vec<Document> = documents_fixture()
                .into_iter()
                .take(params.usize("limit", 20))
                .collect();
            (200, serde_json::to_string(&page).unwrap())
        })
        .client();
    client.locate("test")
}

const CREATED: &str = "2021-06-05T15:43:06.000000Z";

/// A service with a functioning indexes API over two preconfigured
/// indexes, `test` and `content`.
pub(crate) fn mock_service() -> Client {
    let indexes = Arc::new(Mutex::new(vec![
        json!({
            "uid": "test",
            "name": "test",
            "createdAt": "2021-06-03T14:10:44.431089500Z",
            "updatedAt": "2021-06-03T14:11:00.058201500Z",
            "primaryKey": "id"
        }),
        json!({
            "uid": "content",
            "name": "content",
            "createdAt": "2021-06-03T14:10:44.431089500Z",
            "updatedAt": "2021-06-03T14:11:00.058201500Z",
            "primaryKey": null
        }),
    ]));

    fn position(indexes: &[Value], uid: &str) -> Option<usize> {
        indexes.iter().position(|meta| meta["uid"] == uid)
    }

    Routes::new()
        .on("GET /indexes", {
            let indexes = indexes.clone();
            move |_, _| (200, Value::Array(indexes.lock().unwrap().clone()).to_string())
        })
        .on("POST /indexes", {
            let indexes = indexes.clone();
            move |_, body| {
                let config: Value = serde_json::from_slice(body.unwrap()).unwrap();
                let uid = config["uid"].as_str().unwrap_or("");
                if uid.is_empty() {
                    return (400, r#"{"message":"Impossible to create index"}"#.to_string());
                }

                let mut indexes = indexes.lock().unwrap();
                if position(&indexes, uid).is_some() {
                    return (400, r#"{"message":"Index already exists"}"#.to_string());
                }

                let created = json!({
                    "uid": uid,
                    "name": uid,
                    "createdAt": CREATED,
                    "updatedAt": CREATED,
                    "primaryKey": config["primaryKey"]
                });
                indexes.push(created.clone());
                (201, created.to_string())
            }
        })
        .on("GET /indexes/{uid}", {
            let indexes = indexes.clone();
            move |params, _| {
                let indexes = indexes.lock().unwrap();
                match position(&indexes, params.segment("uid").unwrap()) {
                    Some(at) => (200, indexes[at].to_string()),
                    None => (404, r#"{"message":"Index not found"}"#.to_string()),
                }
            }
        })
        .on("PUT /indexes/{uid}", {
            let indexes = indexes.clone();
            move |params, body| {
                let config: Value = serde_json::from_slice(body.unwrap()).unwrap();
                let mut indexes = indexes.lock().unwrap();
                match position(&indexes, params.segment("uid").unwrap()) {
                    Some(at) => {
                        if let Some(primary_key) = config.get("primaryKey") {
                            indexes[at]["primaryKey"] = primary_key.clone();
                        }
                        if let Some(name) = config.get("name") {
                            indexes[at]["name"] = name.clone();
                        }
                        (200, indexes[at].to_string())
                    }
                    None => (404, r#"{"message":"Index not found"}"#.to_string()),
                }
            }
        })
        .on("DELETE /indexes/{uid}", {
            let indexes = indexes.clone();
            move |params, _| {
                let mut indexes = indexes.lock().unwrap();
                match position(&indexes, params.segment("uid").unwrap()) {
                    Some(at) => {
                        indexes.remove(at);
                        (204, String::new())
                    }
                    None => (404, r#"{"message":"Index not found"}"#.to_string()),
                }
            }
        })
        .on("GET /indexes/{uid}/stats", {
            let indexes = indexes.clone();
            move |params, _| {
                let indexes = indexes.lock().unwrap();
                match position(&indexes, params.segment("uid").unwrap()) {
                    Some(_) => (
                        200,
                        r#"{"numberOfDocuments":19654,"isIndexing":false}"#.to_string(),
                    ),
                    None => (404, r#"{"message":"Index not found"}"#.to_string()),
                }
            }
        })
        .on("GET /indexes/{uid}/settings", {
            let indexes = indexes.clone();
            move |params, _| {
                let indexes = indexes.lock().unwrap();
                match position(&indexes, params.segment("uid").unwrap()) {
                    Some(_) => (
                        200,
                        r#"{"rankingRules":["typo","words","proximity"]}"#.to_string(),
                    ),
                    None => (404, r#"{"message":"Index not found"}"#.to_string()),
                }
            }
        })
        .on("POST /indexes/{uid}/settings", {
            let indexes = indexes.clone();
            move |params, _| {
                let indexes = indexes.lock().unwrap();
                match position(&indexes, params.segment("uid").unwrap()) {
                    Some(_) => (202, r#"{"updateId":1}"#.to_string()),
                    None => (404, r#"{"message":"Index not found"}"#.to_string()),
                }
            }
        })
        .on("DELETE /indexes/{uid}/settings", {
            let indexes = indexes.clone();
            move |params, _| {
                let indexes = indexes.lock().unwrap();
                match position(&indexes, params.segment("uid").unwrap()) {
                    Some(_) => (202, r#"{"updateId":1}"#.to_string()),
                    None => (404, r#"{"message":"Index not found"}"#.to_string()),
                }
            }
        })
        .client()
}
