// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Testcontainers setup for CouchDB.
//!
//! Provides helpers to spin up CouchDB containers for integration tests.

use testcontainers::{clients::Cli, core::WaitFor, Container, GenericImage};

pub const COUCH_USER: &str = "admin";
pub const COUCH_PASSWORD: &str = "secret";

/// Create a single-node CouchDB 3 container with an admin account.
///
/// Waits for "Apache CouchDB has started".
pub fn couch_container(docker: &Cli) -> Container<'_, GenericImage> {
    let image = GenericImage::new("couchdb", "3")
        .with_env_var("COUCHDB_USER", COUCH_USER)
        .with_env_var("COUCHDB_PASSWORD", COUCH_PASSWORD)
        .with_exposed_port(5984)
        .with_wait_for(WaitFor::message_on_stdout("Apache CouchDB has started"));
    docker.run(image)
}

/// Admin URL for a container, credentials embedded.
pub fn couch_url(container: &Container<'_, GenericImage>) -> String {
    let port = container.get_host_port_ipv4(5984);
    format!("http://{}:{}@127.0.0.1:{}", COUCH_USER, COUCH_PASSWORD, port)
}

/// A running CouchDB with its system databases created.
pub struct TestCouch<'a> {
    #[allow(dead_code)] // Kept alive for container lifetime
    container: Container<'a, GenericImage>,
    pub url: String,
    http: reqwest::Client,
}

impl<'a> TestCouch<'a> {
    pub async fn start(docker: &'a Cli) -> Self {
        let container = couch_container(docker);
        let url = couch_url(&container);
        let couch = Self {
            container,
            url,
            http: reqwest::Client::new(),
        };
        // Single-node setup does not create these on its own.
        for db in ["_users", "_replicator"] {
            couch.create_database(db).await;
        }
        couch
    }

    fn endpoint(&self, path: &str) -> String {
        let port = self.container.get_host_port_ipv4(5984);
        format!("http://127.0.0.1:{}/{}", port, path)
    }

    pub async fn create_database(&self, name: &str) {
        let response = self
            .http
            .put(self.endpoint(&urlencoding::encode(name)))
            .basic_auth(COUCH_USER, Some(COUCH_PASSWORD))
            .send()
            .await
            .expect("create database");
        assert!(
            response.status().is_success() || response.status().as_u16() == 412,
            "PUT {} returned {}",
            name,
            response.status()
        );
    }

    pub async fn put_document(&self, db: &str, id: &str, body: serde_json::Value) {
        let response = self
            .http
            .put(self.endpoint(&format!("{}/{}", urlencoding::encode(db), id)))
            .basic_auth(COUCH_USER, Some(COUCH_PASSWORD))
            .json(&body)
            .send()
            .await
            .expect("put document");
        assert!(response.status().is_success(), "PUT {}/{} returned {}", db, id, response.status());
    }
}
