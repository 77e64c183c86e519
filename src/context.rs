// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-run execution context.

use crate::instance::Instance;
use tracing::Span;
use uuid::Uuid;

/// Everything a pipeline stage needs to know about the run it belongs to.
///
/// Built once by the coordinator and passed by reference; there is no global
/// logger or lock state.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Correlation id, attached to every log line of the run.
    pub run_id: Uuid,
    /// Instance holding the replication log (and running one-shot copies).
    pub log_instance: Instance,
    pub source: Instance,
    pub target: Instance,
    /// Name of the replication log database.
    pub replicator_db: String,
    span: Span,
}

impl RunContext {
    pub fn new(
        log_instance: Instance,
        source: Instance,
        target: Instance,
        replicator_db: impl Into<String>,
    ) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "replication_run",
            run_id = %run_id,
            source = %source.host(),
            target = %target.host(),
        );
        Self {
            run_id,
            log_instance,
            source,
            target,
            replicator_db: replicator_db.into(),
            span,
        }
    }

    /// Span that scopes all logging of this run.
    pub fn span(&self) -> &Span {
        &self.span
    }
}
