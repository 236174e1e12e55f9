//! One partition's worth of work, and the files it reads and writes.
//!
//! A [`PartitionJob`] carries only plain identifiers and numbers, so it can
//! be handed to any scheduler (thread pool, cluster queue) as a flat
//! key/value record. The worker rebuilds everything else from disk.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{CleaningConfig, IcaParams};
use crate::error::{CleanError, Result};
use crate::ica::{load_or_fit, model_path, Decomposer, FastIca, FsModelStore, ModelKey};
use crate::lcf::{self, LcfParams};
use crate::partition::read_partition;
use crate::recording::Recording;

/// File layout of one recording's artifacts under the ephys directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub basename: String,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>, basename: impl Into<String>) -> Self {
        Self { dir: dir.into(), basename: basename.into() }
    }

    /// Final cleaned recording; its existence marks the recording as done.
    pub fn cleaned(&self) -> PathBuf {
        self.dir.join(format!("{}_clean.safetensors", self.basename))
    }

    pub fn partition_table(&self) -> PathBuf {
        self.dir.join(format!("{}_breaks.tsv", self.basename))
    }

    pub fn bad_channels(&self) -> PathBuf {
        self.dir.join(format!("{}_bad_chan.txt", self.basename))
    }

    /// Temporary uncleaned partition, deleted by the worker after loading.
    pub fn split(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}_{index}_raw.safetensors", self.basename))
    }

    /// Temporary cleaned partition, deleted after concatenation.
    pub fn cleaned_split(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}_{index}_clean_raw.safetensors", self.basename))
    }

    pub fn model(&self, index: usize) -> PathBuf {
        model_path(&self.dir, &self.basename, index)
    }
}

/// Self-contained description of one partition job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionJob {
    pub index: usize,
    pub basename: String,
    pub ephys_dir: PathBuf,
    pub iqr_thresh: f64,
    pub lcf_winsize: f64,
    pub ica: IcaParams,
}

impl PartitionJob {
    pub fn new(index: usize, paths: &ArtifactPaths, cfg: &CleaningConfig) -> Self {
        Self {
            index,
            basename: paths.basename.clone(),
            ephys_dir: paths.dir.clone(),
            iqr_thresh: cfg.iqr_thresh,
            lcf_winsize: cfg.lcf_winsize,
            ica: cfg.ica.clone(),
        }
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.ephys_dir, &self.basename)
    }

    /// Flat `key → value` rendering for schedulers that only pass strings.
    pub fn to_params(&self) -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        m.insert("index".into(), self.index.to_string());
        m.insert("basename".into(), self.basename.clone());
        m.insert("ephys_dir".into(), self.ephys_dir.display().to_string());
        m.insert("iqr_thresh".into(), self.iqr_thresh.to_string());
        m.insert("lcf_winsize".into(), self.lcf_winsize.to_string());
        m.insert("ica_max_iter".into(), self.ica.max_iter.to_string());
        m.insert("ica_tol".into(), self.ica.tol.to_string());
        m.insert("ica_seed".into(), self.ica.seed.to_string());
        m
    }
}

/// Executes a job on whatever worker the scheduler picked.
pub trait JobRunner: Send + Sync {
    fn run(&self, job: &PartitionJob) -> Result<()>;
}

/// Decomposition + LCF + reconstruction for one partition.
///
/// `decomposer` builds the fitter from the job's parameters, so the job
/// itself stays plain data.
pub struct IcaLcfRunner<F> {
    decomposer: F,
}

impl IcaLcfRunner<fn(&IcaParams) -> FastIca> {
    pub fn fast_ica() -> Self {
        Self { decomposer: |p: &IcaParams| FastIca::new(p.clone()) }
    }
}

impl<F, D> IcaLcfRunner<F>
where
    F: Fn(&IcaParams) -> D + Send + Sync,
    D: Decomposer,
{
    pub fn with_decomposer(decomposer: F) -> Self {
        Self { decomposer }
    }
}

impl<F, D> JobRunner for IcaLcfRunner<F>
where
    F: Fn(&IcaParams) -> D + Send + Sync,
    D: Decomposer,
{
    fn run(&self, job: &PartitionJob) -> Result<()> {
        run_partition(job, &(self.decomposer)(&job.ica))
    }
}

/// Clean one partition end to end.
///
/// 1. load the split recording, then delete it
/// 2. rebuild the ignore mask from the partition table
/// 3. load the stored model or fit and store a new one
/// 4. forward transform → LCF → reconstruct
/// 5. save the cleaned partition
pub fn run_partition(job: &PartitionJob, decomposer: &dyn Decomposer) -> Result<()> {
    let paths = job.paths();
    let split = paths.split(job.index);
    let mut rec = Recording::load(&split)?;
    std::fs::remove_file(&split)?;

    let partition = read_partition(&paths.partition_table(), job.index)?;
    if partition.len() != rec.n_times() {
        return Err(CleanError::MalformedInput(format!(
            "partition {} spans {} samples but its split file has {}",
            job.index,
            partition.len(),
            rec.n_times()
        )));
    }
    let ignore = partition.ignore_mask();

    let store = FsModelStore::new(&paths.dir);
    let key = ModelKey { basename: job.basename.clone(), index: job.index };
    let model = load_or_fit(&store, &key, decomposer, rec.data.view(), &ignore)?;

    log::debug!("running LCF (part {}) on {}", job.index, job.basename);
    let sources = model.transform(rec.data.view())?;
    let params = LcfParams {
        sfreq: rec.sfreq,
        iqr_thresh: job.iqr_thresh,
        dilator_width: job.lcf_winsize,
        transition_width: job.lcf_winsize,
    };
    let weights = lcf::suppression_weights(sources.view(), &params, Some(&ignore))?;
    log::debug!(
        "part {}: suppressed samples per component {:?}",
        job.index,
        lcf::suppressed_counts(&weights).to_vec()
    );
    let cleaned = lcf::apply_weights(sources.view(), weights.view());
    rec.data = model.reconstruct(cleaned.view())?;

    rec.save(&paths.cleaned_split(job.index))?;
    Ok(())
}

/// Remove `path` if present; a file that is already gone is not an error.
pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
