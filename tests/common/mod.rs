//! Shared test utilities for pipeline and integration tests.
//!
//! This module provides:
//! - CouchDB testcontainer setup
//! - Mock CouchServer for recording calls
//! - Replication log document helpers

#![allow(dead_code)]

pub mod containers;
pub mod mock_couch;

#[allow(unused_imports)]
pub use containers::*;
#[allow(unused_imports)]
pub use mock_couch::*;

use couch_replication::record::LogDocument;
use serde_json::json;

/// Structured-form log document.
pub fn structured_doc(
    id: &str,
    source: &str,
    target: &str,
    continuous: bool,
    state: Option<&str>,
) -> LogDocument {
    let mut doc = json!({
        "source": {"url": source, "headers": {"Authorization": "Basic YTpi"}},
        "target": {"url": target, "headers": {"Authorization": "Basic YTpi"}},
        "continuous": continuous,
    });
    if let Some(state) = state {
        doc["_replication_state"] = json!(state);
    }
    LogDocument::new(id, doc)
}

/// Embedded-credential log document.
pub fn embedded_doc(
    id: &str,
    source: &str,
    target: &str,
    continuous: bool,
    state: Option<&str>,
) -> LogDocument {
    let mut doc = json!({
        "source": source,
        "target": target,
        "continuous": continuous,
    });
    if let Some(state) = state {
        doc["_replication_state"] = json!(state);
    }
    LogDocument::new(id, doc)
}
