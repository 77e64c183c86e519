// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! CouchDB server access.
//!
//! Defines the narrow slice of the CouchDB HTTP API the replication tool
//! depends on, behind the [`CouchServer`] trait so the pipeline can be driven
//! by a mock in tests:
//!
//! | Method | HTTP |
//! |--------|------|
//! | [`list_databases`](CouchServer::list_databases) | `GET /_all_dbs` |
//! | [`database_exists`](CouchServer::database_exists) | `HEAD /{db}` |
//! | [`replication_documents`](CouchServer::replication_documents) | `GET /_replicator/_all_docs?include_docs=true` |
//! | [`save_replication_document`](CouchServer::save_replication_document) | `POST /_replicator` |
//! | [`replicate`](CouchServer::replicate) | `POST /_replicate` |
//!
//! Every call is bounded by a per-request timeout. One-shot replication
//! returns only once the copy finishes, so it gets its own, longer timeout.

use crate::error::{ReplicationError, Result};
use crate::instance::{encode_database_name, Instance};
use crate::metrics;
use crate::record::{LogDocument, NewReplicationDocument, ReplicateRequest};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// What the replication pipeline needs from a CouchDB instance.
pub trait CouchServer: Send + Sync {
    /// The endpoint this handle talks to.
    fn instance(&self) -> &Instance;

    /// All database names, system databases included.
    fn list_databases(&self) -> BoxFuture<'_, Vec<String>>;

    /// Whether a database exists.
    fn database_exists(&self, name: &str) -> BoxFuture<'_, bool>;

    /// Every document of the replication log database, in key order.
    fn replication_documents(&self, replicator_db: &str) -> BoxFuture<'_, Vec<LogDocument>>;

    /// Store a new replication document. Returns the generated id.
    fn save_replication_document(
        &self,
        replicator_db: &str,
        document: &NewReplicationDocument,
    ) -> BoxFuture<'_, String>;

    /// Run a one-shot replication and wait for it to finish.
    fn replicate(&self, request: &ReplicateRequest) -> BoxFuture<'_, Value>;
}

/// Timeouts applied by [`HttpCouchServer`].
#[derive(Debug, Clone, Copy)]
pub struct RequestTimeouts {
    /// Applied to every request.
    pub request: Duration,
    /// Applied to `POST /_replicate` instead of `request`.
    pub replicate: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(30),
            replicate: Duration::from_secs(3600),
        }
    }
}

#[derive(Deserialize)]
struct AllDocsResponse {
    rows: Vec<LogDocument>,
}

#[derive(Deserialize)]
struct SaveResponse {
    id: String,
}

/// [`CouchServer`] over HTTP.
pub struct HttpCouchServer {
    instance: Instance,
    http: Client,
    timeouts: RequestTimeouts,
}

impl HttpCouchServer {
    pub fn new(instance: Instance, timeouts: RequestTimeouts) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeouts.request)
            .build()
            .map_err(|e| ReplicationError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            instance,
            http,
            timeouts,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.instance.api_url(path))
            .header("Accept", "application/json");
        match self.instance.username() {
            Some(user) => builder.basic_auth(user, self.instance.password()),
            None => builder,
        }
    }

    /// Send a request, recording latency and mapping transport errors.
    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = builder.send().await;
        metrics::record_request_latency(operation, start.elapsed());

        let response =
            result.map_err(|e| ReplicationError::network(operation, self.instance.host(), e))?;
        trace!(operation, status = %response.status(), host = %self.instance.host(), "CouchDB response");
        Ok(response)
    }

    /// Fail on non-success statuses, keeping a prefix of the body for context.
    async fn check(&self, operation: &'static str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ReplicationError::network_msg(
            operation,
            self.instance.host(),
            format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>()),
        ))
    }

    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        response: Response,
    ) -> Result<T> {
        let response = self.check(operation, response).await?;
        response
            .json()
            .await
            .map_err(|e| ReplicationError::Internal(format!("{} returned an unexpected body: {}", operation, e)))
    }
}

impl CouchServer for HttpCouchServer {
    fn instance(&self) -> &Instance {
        &self.instance
    }

    fn list_databases(&self) -> BoxFuture<'_, Vec<String>> {
        Box::pin(async move {
            let response = self
                .send("list_databases", self.request(Method::GET, "_all_dbs"))
                .await?;
            let names: Vec<String> = self.json("list_databases", response).await?;
            debug!(host = %self.instance.host(), count = names.len(), "Listed databases");
            Ok(names)
        })
    }

    fn database_exists(&self, name: &str) -> BoxFuture<'_, bool> {
        let path = encode_database_name(name);
        Box::pin(async move {
            let response = self
                .send("database_exists", self.request(Method::HEAD, &path))
                .await?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(false),
                status if status.is_success() => Ok(true),
                status => Err(ReplicationError::network_msg(
                    "database_exists",
                    self.instance.host(),
                    format!("HTTP {} for {}", status, path),
                )),
            }
        })
    }

    fn replication_documents(&self, replicator_db: &str) -> BoxFuture<'_, Vec<LogDocument>> {
        let path = format!("{}/_all_docs", encode_database_name(replicator_db));
        Box::pin(async move {
            let builder = self
                .request(Method::GET, &path)
                .query(&[("include_docs", "true")]);
            let response = self.send("replication_documents", builder).await?;
            let all: AllDocsResponse = self.json("replication_documents", response).await?;
            debug!(host = %self.instance.host(), count = all.rows.len(), "Read replication log");
            Ok(all.rows)
        })
    }

    fn save_replication_document(
        &self,
        replicator_db: &str,
        document: &NewReplicationDocument,
    ) -> BoxFuture<'_, String> {
        let path = encode_database_name(replicator_db);
        let body = serde_json::to_value(document);
        Box::pin(async move {
            let body = body.map_err(|e| ReplicationError::Internal(e.to_string()))?;
            let builder = self.request(Method::POST, &path).json(&body);
            let response = self.send("save_replication_document", builder).await?;
            let saved: SaveResponse = self.json("save_replication_document", response).await?;
            Ok(saved.id)
        })
    }

    fn replicate(&self, request: &ReplicateRequest) -> BoxFuture<'_, Value> {
        let body = serde_json::to_value(request);
        Box::pin(async move {
            let body = body.map_err(|e| ReplicationError::Internal(e.to_string()))?;
            let builder = self
                .request(Method::POST, "_replicate")
                .timeout(self.timeouts.replicate)
                .json(&body);
            let response = self.send("replicate", builder).await?;
            self.json("replicate", response).await
        })
    }
}
