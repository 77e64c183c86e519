// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication run coordinator.
//!
//! Ties the pipeline stages together for one source → target pair:
//! - Candidate set via [`crate::candidates::build_candidates`]
//! - Log scan via [`crate::record::normalize_log`]
//! - Coverage via [`crate::reconcile::reconcile`]
//! - Dispatch via [`crate::dispatch::dispatch`]
//!
//! # Execution
//!
//! Every stage runs to completion before the next one starts, and every
//! CouchDB call is awaited before the next is issued. Include/exclude files
//! are loaded when the run is built, so a missing file fails before any
//! network call.

mod types;

pub use types::{RunPhase, RunReport};

use crate::candidates::{build_candidates, CandidateFilters};
use crate::config::ReplicationConfig;
use crate::context::RunContext;
use crate::couch::{CouchServer, HttpCouchServer};
use crate::dispatch::{dispatch, planned_tasks, DispatchMode};
use crate::error::{ReplicationError, Result};
use crate::metrics;
use crate::reconcile::{localize_records, reconcile};
use crate::record::normalize_log;
use std::sync::Arc;
use tracing::{error, info, Instrument};

/// CouchDB handles used by a run.
///
/// `log` may point at the same instance as `source` or `target`.
#[derive(Clone)]
pub struct RunServers {
    pub log: Arc<dyn CouchServer>,
    pub source: Arc<dyn CouchServer>,
    pub target: Arc<dyn CouchServer>,
}

/// One replication run.
pub struct ReplicationRun {
    ctx: RunContext,
    servers: RunServers,
    filters: CandidateFilters,
    mode: DispatchMode,
    task_count: usize,
    phase: RunPhase,
}

impl ReplicationRun {
    /// Build a run against real CouchDB instances.
    ///
    /// Validates the config and loads include/exclude files; no network I/O.
    pub fn from_config(config: &ReplicationConfig) -> Result<Self> {
        config.validate()?;
        let filters = CandidateFilters::load(
            config.include_file.as_deref(),
            config.exclude_file.as_deref(),
            config.nonexistent_only,
        )?;

        let (log, source, target) = config.instances()?;
        let timeouts = config.timeouts();
        let servers = RunServers {
            log: Arc::new(HttpCouchServer::new(log.clone(), timeouts)?),
            source: Arc::new(HttpCouchServer::new(source.clone(), timeouts)?),
            target: Arc::new(HttpCouchServer::new(target.clone(), timeouts)?),
        };
        let ctx = RunContext::new(log, source, target, config.replicator_db.clone());

        Ok(Self::new(
            ctx,
            servers,
            filters,
            DispatchMode::from_continuous(config.continuous),
            config.task_count,
        ))
    }

    /// Build a run from parts (used with mock servers).
    pub fn new(
        ctx: RunContext,
        servers: RunServers,
        filters: CandidateFilters,
        mode: DispatchMode,
        task_count: usize,
    ) -> Self {
        Self {
            ctx,
            servers,
            filters,
            mode,
            task_count,
            phase: RunPhase::Created,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Get current phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn set_phase(&mut self, phase: RunPhase) {
        self.phase = phase;
        metrics::set_run_phase(&phase.to_string());
    }

    /// Run the whole pipeline once.
    pub async fn execute(&mut self) -> Result<RunReport> {
        if self.phase != RunPhase::Created {
            return Err(ReplicationError::InvalidState {
                expected: RunPhase::Created.to_string(),
                actual: self.phase.to_string(),
            });
        }

        let span = self.ctx.span().clone();
        let result = self.run_pipeline().instrument(span.clone()).await;

        let _entered = span.enter();
        match &result {
            Ok(report) => {
                self.set_phase(RunPhase::Completed);
                info!(
                    dispatched = report.dispatched_count(),
                    planned = report.planned,
                    mode = %report.mode,
                    "Replication run complete"
                );
            }
            Err(e) => {
                self.set_phase(RunPhase::Failed);
                metrics::record_error(e.kind());
                error!(error = %e, "Replication run failed");
            }
        }
        result
    }

    async fn run_pipeline(&mut self) -> Result<RunReport> {
        self.set_phase(RunPhase::Planning);
        info!(
            run_id = %self.ctx.run_id,
            log = %self.ctx.log_instance.host(),
            mode = %self.mode,
            task_count = self.task_count,
            "Starting replication run"
        );

        let candidates = build_candidates(
            self.servers.source.as_ref(),
            self.servers.target.as_ref(),
            &self.filters,
        )
        .await?;
        let candidate_count = candidates.len();

        info!(
            replicator_db = %self.ctx.replicator_db,
            "Checking databases that already have active replication"
        );
        let documents = self
            .servers
            .log
            .replication_documents(&self.ctx.replicator_db)
            .await?;
        let log = normalize_log(&documents);
        let records = localize_records(&log.records, &self.ctx.source, &self.ctx.target);

        let reconciliation = reconcile(
            candidates,
            &records,
            self.ctx.source.host(),
            self.ctx.target.host(),
        );

        let planned = planned_tasks(self.task_count, reconciliation.uncovered());
        info!(
            planned,
            selected = reconciliation.uncovered(),
            "Databases selected for replication"
        );

        self.set_phase(RunPhase::Dispatching);
        let dispatched = dispatch(
            self.servers.log.as_ref(),
            &self.ctx,
            &reconciliation.actions,
            self.mode,
            self.task_count,
        )
        .await?;

        Ok(RunReport {
            run_id: self.ctx.run_id,
            mode: self.mode,
            candidates: candidate_count,
            continuous_covered: reconciliation.continuous_covered,
            incomplete_covered: reconciliation.incomplete_covered,
            uncovered: reconciliation.uncovered(),
            planned,
            dispatched: dispatched.dispatched,
            document_ids: dispatched.document_ids,
            malformed_documents: log.malformed.len(),
        })
    }
}
