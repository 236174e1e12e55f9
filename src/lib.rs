//! # lcf — partitioned ICA + Localized Component Filtering for EEG
//!
//! `lcf` removes transient artifacts (blinks, muscle bursts) from continuous
//! EEG recordings. Each recording is split at session breaks, every
//! partition gets its own independent-component decomposition, the
//! components are cleaned with Localized Component Filtering, and the
//! cleaned partitions are reassembled in order.
//!
//! ## Pipeline overview
//!
//! ```text
//! <basename>.safetensors + events.json
//!   │
//!   ├─ preprocess             EEG channels only, bad channels, optional HP / CAR
//!   ├─ breaks::detect_breaks  pre/post-session gaps, REST_REWET, BREAK_START/STOP
//!   ├─ partition              split at break offsets → <basename>_breaks.tsv
//!   │
//!   ├─ per partition (parallel, scheduler::Scheduler)
//!   │    ├─ ica::load_or_fit   FastICA model, cached as <basename>_<i>-ica.safetensors
//!   │    ├─ transform          channels → components
//!   │    ├─ lcf::lcf           detect → dilate → smooth → S × (1 − w)
//!   │    └─ reconstruct        components → channels
//!   │
//!   └─ concatenate (index order) → <basename>_clean.safetensors  [C, T] f32
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use lcf::{load_events, CleaningConfig, Orchestrator};
//! use std::path::{Path, PathBuf};
//!
//! let events = load_events(Path::new("session/events.json")).unwrap();
//! let orch = Orchestrator::new(CleaningConfig::default(), "session/ephys");
//! let report = orch.clean_session(&[PathBuf::from("session/ephys/rec0.safetensors")], &events);
//! assert!(report.is_success());
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use lcf::lcf::lcf as run_lcf;
//! use lcf::{Decomposer, FastIca, IcaParams, LcfParams};
//! use ndarray::Array2;
//!
//! let data: Array2<f64> = Array2::zeros((32, 30_000)); // [C, T]
//! let ignore = vec![false; data.ncols()];
//!
//! let model = FastIca::new(IcaParams::default()).fit(data.view(), &ignore).unwrap();
//! let sources = model.transform(data.view()).unwrap();
//! let params = LcfParams { sfreq: 500.0, iqr_thresh: 3.0, dilator_width: 0.1, transition_width: 0.1 };
//! let cleaned = run_lcf(sources.view(), sources.view(), &params, Some(&ignore)).unwrap();
//! let _restored = model.reconstruct(cleaned.view()).unwrap();
//! ```

pub mod breaks;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod ica;
pub mod io;
pub mod job;
pub mod lcf;
pub mod orchestrator;
pub mod partition;
pub mod recording;
pub mod reference;
pub mod scheduler;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config + errors
pub use config::{CleaningConfig, IcaParams, BREAK_LABEL, LEGACY_BREAK_BUFFER_SECS};
pub use error::{CleanError, Result};

// inputs
pub use events::{events_for_recording, load_events, Event, EventKind};
pub use recording::{Annotation, ChannelKind, CleanedRecording, Recording};

// breaks + partitions
pub use breaks::{detect_breaks, Breaks, ExclusionInterval};
pub use partition::{
    partition_recording, read_partition, read_partition_table, validate_partitions,
    write_partition_table, Partition,
};

// decomposition + LCF
pub use ica::{load_or_fit, Decomposer, DecompositionModel, FastIca, FsModelStore, ModelKey, ModelStore};
pub use lcf::{lcf, suppression_weights, LcfParams};

// orchestration
pub use job::{ArtifactPaths, IcaLcfRunner, JobRunner, PartitionJob};
pub use orchestrator::{CleanStatus, Orchestrator, SessionReport};
pub use scheduler::{JobOutcome, Scheduler, ThreadPoolScheduler};
