//! Run state types.
//!
//! Defines the state machine for a replication run and the report it returns.
//!
//! # State Transitions
//!
//! ```text
//!             execute()
//! Created ─────────────→ Planning ─────────→ Dispatching ─────→ Completed
//!                            │                    │
//!                            │ (network error)    │ (dispatch error)
//!                            ↓                    ↓
//!                          Failed ←───────────────┘
//! ```
//!
//! # State Descriptions
//!
//! - **Created**: Run built, filters loaded, nothing sent over the network.
//! - **Planning**: Enumerating databases, reading the replication log, reconciling.
//! - **Dispatching**: Writing replication documents or running one-shot copies.
//! - **Completed**: All planned tasks issued.
//! - **Failed**: A network or server error aborted the run. Tasks issued
//!   before the failure are not rolled back.

use crate::dispatch::DispatchMode;
use uuid::Uuid;

/// Phase of a replication run.
///
/// See module docs for the state transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Run created but not executed.
    Created,

    /// Building the action list.
    Planning,

    /// Issuing replication tasks.
    Dispatching,

    /// Finished successfully.
    Completed,

    /// Aborted by an error. Check logs for details.
    Failed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Created => write!(f, "Created"),
            RunPhase::Planning => write!(f, "Planning"),
            RunPhase::Dispatching => write!(f, "Dispatching"),
            RunPhase::Completed => write!(f, "Completed"),
            RunPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: DispatchMode,
    /// Size of the candidate set before reconciliation.
    pub candidates: usize,
    /// Candidates skipped because of a continuous replication.
    pub continuous_covered: usize,
    /// Candidates skipped because of an unfinished one-shot replication.
    pub incomplete_covered: usize,
    /// Candidates not covered by any record.
    pub uncovered: usize,
    /// `min(task_count, uncovered)`
    pub planned: usize,
    /// Databases dispatched, in order.
    pub dispatched: Vec<String>,
    /// Ids of documents written in continuous mode.
    pub document_ids: Vec<String>,
    /// `_replicator` documents that matched no known shape.
    pub malformed_documents: usize,
}

impl RunReport {
    pub fn dispatched_count(&self) -> usize {
        self.dispatched.len()
    }
}
