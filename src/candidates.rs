// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Candidate set construction.
//!
//! Decides which databases are eligible for replication before the
//! replication log is consulted:
//!
//! ```text
//! source _all_dbs ──or── include list
//!          │
//!          ▼  drop "_*" system databases
//!          ▼  --nonexistent: drop names present on target
//!          ▼  exclude list: drop listed names
//!    CandidateSet
//! ```
//!
//! The include list is authoritative. Its names are not checked against the
//! source; names missing there are only reported.

use crate::couch::CouchServer;
use crate::error::{ReplicationError, Result};
use crate::instance::{is_system_database, DatabaseName};
use crate::metrics;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// A newline-delimited list of raw database names read from a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameList {
    pub path: PathBuf,
    pub names: Vec<String>,
}

impl NameList {
    /// Read a name list. Lines are trimmed; blank lines are dropped.
    ///
    /// A missing file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ReplicationError::Config(format!(
                "File \"{}\" not found",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReplicationError::Config(format!("Cannot read \"{}\": {}", path.display(), e))
        })?;
        Ok(Self::from_lines(path, &content))
    }

    pub fn from_lines(path: impl Into<PathBuf>, content: &str) -> Self {
        let names = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            path: path.into(),
            names,
        }
    }

    /// Names that are not system databases.
    pub fn user_names(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .map(String::as_str)
            .filter(|name| !is_system_database(name))
    }
}

/// Filters applied by [`build_candidates`].
#[derive(Debug, Clone, Default)]
pub struct CandidateFilters {
    pub include: Option<NameList>,
    pub exclude: Option<NameList>,
    /// Only keep databases absent on the target.
    pub nonexistent_only: bool,
}

impl CandidateFilters {
    /// Load include/exclude files. Both are checked before anything else so a
    /// typo never reaches the network.
    pub fn load(
        include_file: Option<&Path>,
        exclude_file: Option<&Path>,
        nonexistent_only: bool,
    ) -> Result<Self> {
        let include = include_file.map(NameList::load).transpose()?;
        let exclude = exclude_file.map(NameList::load).transpose()?;
        Ok(Self {
            include,
            exclude,
            nonexistent_only,
        })
    }
}

/// Databases eligible for replication.
///
/// Membership and removal are O(1). Insertion order is kept so reports and
/// dispatch follow the enumeration order.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    order: Vec<String>,
    members: HashSet<String>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name while building the set. System databases and duplicates
    /// are ignored. After the first removal the set only shrinks, so names
    /// removed earlier are not taken back.
    pub fn insert(&mut self, name: &str) -> bool {
        if is_system_database(name)
            || self.order.len() != self.members.len()
            || !self.members.insert(name.to_string())
        {
            return false;
        }
        self.order.push(name.to_string());
        true
    }

    /// Remove a name; returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.members.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Keep only the names for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.members.retain(|name| keep(name));
    }

    /// Remaining names in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .map(String::as_str)
            .filter(|name| self.members.contains(*name))
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    /// Remove every listed name. Idempotent.
    pub fn exclude(&mut self, list: &NameList) -> usize {
        list.user_names().filter(|name| self.remove(name)).count()
    }
}

impl<'a> FromIterator<&'a str> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

/// Build the candidate set for one source/target pair.
///
/// Read-only against both instances.
#[instrument(skip_all, fields(source = %source.instance(), target = %target.instance()))]
pub async fn build_candidates(
    source: &dyn CouchServer,
    target: &dyn CouchServer,
    filters: &CandidateFilters,
) -> Result<CandidateSet> {
    let source_dbs: Vec<String> = source
        .list_databases()
        .await?
        .into_iter()
        .filter(|name| !is_system_database(name))
        .collect();

    let mut candidates = match &filters.include {
        None => {
            info!(count = source_dbs.len(), "Using all databases of source");
            source_dbs.iter().map(String::as_str).collect::<CandidateSet>()
        }
        Some(include) => {
            info!(
                file = %include.path.display(),
                count = include.names.len(),
                "Include list is set, only listed databases are candidates"
            );
            let on_source: HashSet<&str> = source_dbs.iter().map(String::as_str).collect();
            let mut set = CandidateSet::new();
            for name in include.user_names() {
                if !on_source.contains(name) {
                    warn!(database = %name, "Included database does not exist on source");
                }
                if let Err(e) = DatabaseName::parse(name) {
                    warn!(database = %name, error = %e, "Included name is not a valid database name");
                }
                set.insert(name);
            }
            set
        }
    };

    if filters.nonexistent_only {
        let before = candidates.len();
        if filters.include.is_some() {
            // Include lists are usually short; ask per name.
            let mut missing = HashSet::new();
            for name in candidates.iter() {
                if !target.database_exists(name).await? {
                    missing.insert(name.to_string());
                }
            }
            candidates.retain(|name| missing.contains(name));
        } else {
            let on_target: HashSet<String> = target.list_databases().await?.into_iter().collect();
            candidates.retain(|name| !on_target.contains(name));
        }
        info!(
            kept = candidates.len(),
            dropped = before - candidates.len(),
            "Restricted to databases not existing on target"
        );
    }

    if let Some(exclude) = &filters.exclude {
        let removed = candidates.exclude(exclude);
        info!(
            file = %exclude.path.display(),
            listed = exclude.names.len(),
            removed,
            "Exclude list applied"
        );
        for name in exclude.user_names() {
            debug!(database = %name, "Excluded from replication");
        }
    }

    info!(count = candidates.len(), "Databases allowed for replication");
    metrics::record_candidates(candidates.len());
    Ok(candidates)
}
