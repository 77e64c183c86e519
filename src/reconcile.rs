// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Reconciliation of candidates against the replication log.
//!
//! A candidate is *covered* when a normalized record for the same
//! `source host → target host` pair and the same database on both ends is
//! still active:
//!
//! | continuous | state | effect |
//! |------------|-------|--------|
//! | true | any | removed, counted as continuous |
//! | false | running | removed, counted as incomplete |
//! | false | completed | none, the database is offered again |
//!
//! Removal is idempotent, so the final set does not depend on record order.
//! Only the counters do: a database covered by several records is counted
//! once, by whichever active record is met first.

use crate::candidates::CandidateSet;
use crate::instance::Instance;
use crate::metrics;
use crate::record::NormalizedRecord;
use tracing::info;

/// Outcome of reconciling one candidate set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Databases still to be replicated, in candidate order.
    pub actions: Vec<String>,
    /// Databases skipped because a continuous replication exists.
    pub continuous_covered: usize,
    /// Databases skipped because a one-shot replication has not completed.
    pub incomplete_covered: usize,
}

impl Reconciliation {
    /// Number of candidates not covered by any record.
    pub fn uncovered(&self) -> usize {
        self.actions.len()
    }
}

/// Rewrite records of the requested pair so their database names are
/// relative to each instance's base path.
///
/// Instances behind a path prefix (`https://proxy/couch`) write documents
/// whose URL path is `couch/{db}`. Records of the pair that point outside the
/// prefix are dropped; records of other pairs are kept unchanged.
pub fn localize_records(
    records: &[NormalizedRecord],
    source: &Instance,
    target: &Instance,
) -> Vec<NormalizedRecord> {
    records
        .iter()
        .filter_map(|record| {
            if record.src_host != source.host() || record.tgt_host != target.host() {
                return Some(record.clone());
            }
            let src_db = source.local_database(&record.src_db)?;
            let tgt_db = target.local_database(&record.tgt_db)?;
            Some(NormalizedRecord {
                src_db: src_db.to_string(),
                tgt_db: tgt_db.to_string(),
                ..record.clone()
            })
        })
        .collect()
}

/// Remove covered databases from `candidates` and return what is left.
pub fn reconcile(
    mut candidates: CandidateSet,
    records: &[NormalizedRecord],
    source_host: &str,
    target_host: &str,
) -> Reconciliation {
    let mut result = Reconciliation::default();

    for record in records {
        if record.src_host != source_host
            || record.tgt_host != target_host
            || record.src_db != record.tgt_db
        {
            continue;
        }

        if record.continuous {
            if candidates.remove(&record.src_db) {
                result.continuous_covered += 1;
                info!(
                    database = %record.src_db,
                    id = %record.id,
                    "Database has continuous replication running, skipping"
                );
            }
        } else if record.is_active() && candidates.remove(&record.src_db) {
            result.incomplete_covered += 1;
            info!(
                database = %record.src_db,
                id = %record.id,
                state = %record.state,
                "Database has incomplete replication running, skipping"
            );
        }
    }

    result.actions = candidates.to_vec();

    info!(
        continuous = result.continuous_covered,
        incomplete = result.incomplete_covered,
        uncovered = result.uncovered(),
        "Reconciled candidates against replication log"
    );
    metrics::record_coverage("continuous", result.continuous_covered);
    metrics::record_coverage("incomplete", result.incomplete_covered);

    result
}
