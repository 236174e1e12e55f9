//! Error taxonomy for a cleaning run.
//!
//! Only [`CleanError::Orchestration`] is soft: the orchestrator logs it and
//! carries on collecting partition outputs. Every other variant aborts the
//! cleaning of the recording it was raised for.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanError {
    /// Event stream or partition table is missing something the pipeline needs.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The worker pool / scheduler reported a failure.
    #[error("orchestration layer reported an error: {0}")]
    Orchestration(String),

    /// A partition's cleaned output is absent after dispatch returned.
    #[error("cleaned output for partition {index} not found at {}", path.display())]
    MissingPartitionOutput { index: usize, path: PathBuf },

    /// Too few non-excluded samples to compute percentiles or fit a model.
    #[error("component {component}: only {usable} usable samples, cannot compute statistics")]
    DegenerateStatistics { component: usize, usable: usize },

    #[error("decomposition failed: {0}")]
    Decomposition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("partition table error: {0}")]
    Table(#[from] csv::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CleanError>;
