// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! `couch-replication` command line.

use clap::Parser;
use couch_replication::{ReplicationConfig, ReplicationError, ReplicationRun};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

/// Replicate CouchDB databases from a source instance to a target instance.
#[derive(Parser, Debug)]
#[command(name = "couch-replication", version)]
struct Args {
    /// Instance with port holding replication tasks and documents
    #[arg(short = 'R', long = "replication-instance")]
    replication_instance: Option<String>,

    /// Source instance with port
    #[arg(short = 'S', long = "source")]
    source: Option<String>,

    /// Target instance with port
    #[arg(short = 'T', long = "target")]
    target: Option<String>,

    /// Number of replication tasks to add
    #[arg(long = "tcount", value_parser = clap::value_parser!(u32).range(1..))]
    task_count: Option<u32>,

    /// Create continuous replication documents instead of one-shot copies
    #[arg(long)]
    continuous: bool,

    /// Only replicate databases which do not exist on the target
    #[arg(long)]
    nonexistent: bool,

    /// Only replicate databases listed line by line in this file
    #[arg(long = "include-db-file")]
    include_file: Option<PathBuf>,

    /// Never replicate databases listed line by line in this file
    #[arg(long = "exclude-db-file")]
    exclude_file: Option<PathBuf>,

    /// Per-request timeout (e.g. "30s")
    #[arg(long)]
    request_timeout: Option<String>,

    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<ReplicationConfig, ReplicationError> {
        let mut config = match &self.config {
            Some(path) => ReplicationConfig::from_json_file(path)?,
            None => {
                let missing: Vec<&str> = [
                    ("-R", self.replication_instance.is_none()),
                    ("-S", self.source.is_none()),
                    ("-T", self.target.is_none()),
                ]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(flag, _)| flag)
                .collect();
                if !missing.is_empty() {
                    return Err(ReplicationError::Config(format!(
                        "missing required arguments: {}",
                        missing.join(", ")
                    )));
                }
                ReplicationConfig::default()
            }
        };

        if let Some(instance) = self.replication_instance {
            config.log_instance = instance;
        }
        if let Some(source) = self.source {
            config.source_instance = source;
        }
        if let Some(target) = self.target {
            config.target_instance = target;
        }
        if let Some(count) = self.task_count {
            config.task_count = count as usize;
        }
        config.continuous |= self.continuous;
        config.nonexistent_only |= self.nonexistent;
        if self.include_file.is_some() {
            config.include_file = self.include_file;
        }
        if self.exclude_file.is_some() {
            config.exclude_file = self.exclude_file;
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout = timeout;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let result = match args.into_config() {
        Ok(config) => match ReplicationRun::from_config(&config) {
            Ok(mut run) => run.execute().await.map(|_| ()),
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Exiting");
            ExitCode::FAILURE
        }
    }
}
