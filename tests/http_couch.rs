// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HttpCouchServer tests against a wiremock CouchDB.
//!
//! Covers request shapes, status mapping and timeouts without Docker.
//!
//! # Test Organization
//! - `list_*` - `GET /_all_dbs`
//! - `exists_*` - `HEAD /{db}`
//! - `log_*` - `GET /_replicator/_all_docs`
//! - `save_*` - `POST /_replicator`
//! - `replicate_*` - `POST /_replicate`

use couch_replication::couch::{CouchServer, HttpCouchServer, RequestTimeouts};
use couch_replication::record::{NewReplicationDocument, ReplicateRequest};
use couch_replication::{Instance, ReplicationError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `admin:secret`
const BASIC_AUTH: &str = "Basic YWRtaW46c2VjcmV0";

fn server_for(mock: &MockServer, timeouts: RequestTimeouts) -> HttpCouchServer {
    let url = mock.uri().replace("http://", "http://admin:secret@");
    HttpCouchServer::new(Instance::parse(&url).unwrap(), timeouts).unwrap()
}

fn default_server(mock: &MockServer) -> HttpCouchServer {
    server_for(
        mock,
        RequestTimeouts {
            request: Duration::from_secs(5),
            replicate: Duration::from_secs(5),
        },
    )
}

// =============================================================================
// _all_dbs
// =============================================================================

#[tokio::test]
async fn list_sends_basic_auth() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["_users", "alpha"])))
        .expect(1)
        .mount(&mock)
        .await;

    let names = default_server(&mock).list_databases().await.unwrap();

    assert_eq!(names, vec!["_users", "alpha"]);
}

#[tokio::test]
async fn list_non_array_body_is_internal() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dbs": ["alpha"]})))
        .mount(&mock)
        .await;

    let err = default_server(&mock).list_databases().await.unwrap_err();

    assert!(matches!(err, ReplicationError::Internal(_)));
    assert!(err.aborts_run());
}

#[tokio::test]
async fn list_unauthorized_is_network_error() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "unauthorized"})),
        )
        .mount(&mock)
        .await;

    let err = default_server(&mock).list_databases().await.unwrap_err();

    assert!(matches!(err, ReplicationError::Network { .. }));
    let msg = err.to_string();
    assert!(msg.contains("list_databases"));
    assert!(msg.contains("401"));
    assert!(msg.contains("unauthorized"));
}

#[tokio::test]
async fn list_uses_request_timeout() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&mock)
        .await;
    let server = server_for(
        &mock,
        RequestTimeouts {
            request: Duration::from_millis(200),
            replicate: Duration::from_secs(5),
        },
    );

    let err = server.list_databases().await.unwrap_err();

    assert!(matches!(err, ReplicationError::Network { .. }));
    assert!(err.to_string().contains("timed out"));
}

// =============================================================================
// HEAD /{db}
// =============================================================================

#[tokio::test]
async fn exists_maps_status_codes() {
    let mock = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/alpha"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/zeta"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock)
        .await;
    let server = default_server(&mock);

    assert!(server.database_exists("alpha").await.unwrap());
    assert!(!server.database_exists("zeta").await.unwrap());

    let err = server.database_exists("broken").await.unwrap_err();
    assert!(matches!(err, ReplicationError::Network { .. }));
    assert!(err.to_string().contains("500"));
}

// =============================================================================
// _replicator/_all_docs
// =============================================================================

#[tokio::test]
async fn log_requests_included_documents() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_replicator/_all_docs"))
        .and(query_param("include_docs", "true"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 2,
            "offset": 0,
            "rows": [
                {"id": "_design/_replicator", "key": "_design/_replicator", "value": {"rev": "1-a"}, "doc": {}},
                {"id": "rep-1", "key": "rep-1", "value": {"rev": "1-b"}, "doc": {
                    "source": "http://couch1:5984/alpha",
                    "target": "http://couch2:5984/alpha",
                    "continuous": true
                }}
            ]
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let docs = default_server(&mock)
        .replication_documents("_replicator")
        .await
        .unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].id, "rep-1");
    assert_eq!(docs[1].doc["continuous"], true);
}

#[tokio::test]
async fn log_missing_database_is_network_error() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_replicator/_all_docs"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found",
            "reason": "Database does not exist."
        })))
        .mount(&mock)
        .await;

    let err = default_server(&mock)
        .replication_documents("_replicator")
        .await
        .unwrap_err();

    assert!(matches!(err, ReplicationError::Network { .. }));
    assert!(err.to_string().contains("replication_documents"));
}

// =============================================================================
// POST /_replicator
// =============================================================================

#[tokio::test]
async fn save_posts_structured_document() {
    let mock = MockServer::start().await;
    let server = default_server(&mock);
    let instance = server.instance().clone();
    let document = NewReplicationDocument {
        source: instance.database_endpoint("alpha"),
        target: instance.database_endpoint("alpha"),
        continuous: true,
        create_target: true,
    };
    Mock::given(method("POST"))
        .and(path("/_replicator"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_partial_json(json!({
            "source": {"url": format!("{}/alpha", mock.uri()), "headers": {"Authorization": BASIC_AUTH}},
            "continuous": true,
            "create_target": true
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"ok": true, "id": "abc123", "rev": "1-a"})),
        )
        .expect(1)
        .mount(&mock)
        .await;

    let id = server
        .save_replication_document("_replicator", &document)
        .await
        .unwrap();

    assert_eq!(id, "abc123");
}

#[tokio::test]
async fn save_conflict_is_network_error() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_replicator"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"error": "conflict"})))
        .mount(&mock)
        .await;
    let server = default_server(&mock);
    let instance = server.instance().clone();
    let document = NewReplicationDocument {
        source: instance.database_endpoint("alpha"),
        target: instance.database_endpoint("alpha"),
        continuous: true,
        create_target: true,
    };

    let err = server
        .save_replication_document("_replicator", &document)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("409"));
}

// =============================================================================
// POST /_replicate
// =============================================================================

#[tokio::test]
async fn replicate_uses_replicate_timeout() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_replicate"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_partial_json(json!({"create_target": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "history": []}))
                .set_delay(Duration::from_millis(800)),
        )
        .expect(1)
        .mount(&mock)
        .await;
    // Shorter than the response delay; only the replicate timeout may apply.
    let server = server_for(
        &mock,
        RequestTimeouts {
            request: Duration::from_millis(200),
            replicate: Duration::from_secs(5),
        },
    );
    let instance = server.instance().clone();
    let request = ReplicateRequest {
        source: instance.database_endpoint("alpha"),
        target: instance.database_endpoint("alpha"),
        create_target: true,
    };

    let response = server.replicate(&request).await.unwrap();

    assert_eq!(response["ok"], true);
}

#[tokio::test]
async fn replicate_timeout_expires() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_replicate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&mock)
        .await;
    let server = server_for(
        &mock,
        RequestTimeouts {
            request: Duration::from_secs(5),
            replicate: Duration::from_millis(200),
        },
    );
    let instance = server.instance().clone();
    let request = ReplicateRequest {
        source: instance.database_endpoint("alpha"),
        target: instance.database_endpoint("alpha"),
        create_target: true,
    };

    let err = server.replicate(&request).await.unwrap_err();

    assert!(matches!(err, ReplicationError::Network { .. }));
    assert!(err.to_string().contains("replicate"));
}
