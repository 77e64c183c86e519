// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Task dispatch.
//!
//! Walks the action list in order and issues at most `task_count`
//! replications against the log instance:
//!
//! - **Continuous**: save a `_replicator` document
//!   (`continuous: true, create_target: true`); CouchDB picks it up.
//! - **One-shot**: `POST /_replicate` and wait for the copy to finish.
//!
//! There is no retry. The first failure aborts dispatch; documents already
//! written stay in place.

use crate::context::RunContext;
use crate::couch::CouchServer;
use crate::error::Result;
use crate::metrics;
use crate::record::{NewReplicationDocument, ReplicateRequest};
use std::fmt;
use tracing::{error, info, instrument};

/// How replications are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Persistent replication documents.
    Continuous,
    /// Synchronous `_replicate` calls.
    OneShot,
}

impl DispatchMode {
    pub fn from_continuous(continuous: bool) -> Self {
        if continuous {
            Self::Continuous
        } else {
            Self::OneShot
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Continuous => "continuous",
            DispatchMode::OneShot => "one_shot",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of tasks a run will issue for an action list of `available` entries.
pub fn planned_tasks(task_count: usize, available: usize) -> usize {
    task_count.min(available)
}

/// What was dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Databases dispatched, in order.
    pub dispatched: Vec<String>,
    /// Ids of `_replicator` documents created (continuous mode only).
    pub document_ids: Vec<String>,
}

impl DispatchReport {
    pub fn count(&self) -> usize {
        self.dispatched.len()
    }
}

/// Issue replications for the first `task_count` entries of `actions`.
#[instrument(skip_all, fields(mode = %mode, task_count = task_count))]
pub async fn dispatch(
    log_server: &dyn CouchServer,
    ctx: &RunContext,
    actions: &[String],
    mode: DispatchMode,
    task_count: usize,
) -> Result<DispatchReport> {
    let total = planned_tasks(task_count, actions.len());
    let mut report = DispatchReport::default();

    info!(
        planned = total,
        selected = actions.len(),
        source = %ctx.source.host(),
        target = %ctx.target.host(),
        "Starting replication tasks"
    );

    for db_name in actions {
        if report.count() >= task_count {
            break;
        }

        let source = ctx.source.database_endpoint(db_name);
        let target = ctx.target.database_endpoint(db_name);

        let outcome = match mode {
            DispatchMode::Continuous => {
                let document = NewReplicationDocument {
                    source,
                    target,
                    continuous: true,
                    create_target: true,
                };
                log_server
                    .save_replication_document(&ctx.replicator_db, &document)
                    .await
                    .map(Some)
            }
            DispatchMode::OneShot => {
                let request = ReplicateRequest {
                    source,
                    target,
                    create_target: true,
                };
                log_server.replicate(&request).await.map(|_| None)
            }
        };

        match outcome {
            Ok(document_id) => {
                report.dispatched.push(db_name.clone());
                metrics::record_dispatch(mode.as_str());
                match document_id {
                    Some(id) => {
                        info!(
                            progress = %format!("{}/{}", report.count(), total),
                            database = %db_name,
                            id = %id,
                            "Replication document created"
                        );
                        report.document_ids.push(id);
                    }
                    None => info!(
                        progress = %format!("{}/{}", report.count(), total),
                        database = %db_name,
                        "Replication completed"
                    ),
                }
            }
            Err(e) => {
                error!(
                    database = %db_name,
                    dispatched = report.count(),
                    error = %e,
                    "Replication task failed, aborting"
                );
                metrics::record_error(e.kind());
                return Err(e);
            }
        }
    }

    match mode {
        DispatchMode::Continuous => {
            info!(count = report.count(), "Replication documents created successfully")
        }
        DispatchMode::OneShot => info!(count = report.count(), "Databases replicated successfully"),
    }

    Ok(report)
}
