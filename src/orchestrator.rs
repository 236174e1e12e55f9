//! Cleaning whole recordings: preprocess, split at breaks, dispatch one job
//! per partition, then stitch the cleaned partitions back together.
//!
//! Collection is two-phase. Dispatch may fail softly (the scheduler's own
//! report is only logged); collection is authoritative, and a partition
//! whose cleaned file is missing or has the wrong length aborts that
//! recording. Cleaned splits left by an earlier run are removed before
//! dispatch, and every per-partition file is removed once collection ends.
use std::path::{Path, PathBuf};

use crate::breaks::detect_breaks;
use crate::config::{CleaningConfig, BREAK_LABEL};
use crate::error::{CleanError, Result};
use crate::events::{events_for_recording, Event};
use crate::filter;
use crate::job::{remove_if_exists, ArtifactPaths, IcaLcfRunner, JobRunner, PartitionJob};
use crate::partition::{partition_recording, validate_partitions, write_partition_table, Partition};
use crate::recording::{Annotation, Recording};
use crate::reference::average_reference_inplace;
use crate::scheduler::{Scheduler, ThreadPoolScheduler};

/// What [`Orchestrator::clean_recording`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanStatus {
    /// Cleaned output written from `partitions` partitions.
    Cleaned { partitions: usize },
    /// Cleaned output already present; nothing was done.
    AlreadyClean,
}

/// Per-recording results of [`Orchestrator::clean_session`].
#[derive(Debug, Default)]
pub struct SessionReport {
    pub cleaned: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, CleanError)>,
}

impl SessionReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Orchestrator {
    cfg: CleaningConfig,
    ephys_dir: PathBuf,
    scheduler: Box<dyn Scheduler>,
    runner: Box<dyn JobRunner>,
}

impl Orchestrator {
    /// Thread-pool scheduler with `cfg.workers` threads and the FastICA runner.
    pub fn new(cfg: CleaningConfig, ephys_dir: impl Into<PathBuf>) -> Self {
        let scheduler = Box::new(ThreadPoolScheduler::new(cfg.workers));
        Self {
            cfg,
            ephys_dir: ephys_dir.into(),
            scheduler,
            runner: Box::new(IcaLcfRunner::fast_ica()),
        }
    }

    pub fn with_scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    pub fn with_runner(mut self, runner: impl JobRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.cfg
    }

    pub fn ephys_dir(&self) -> &Path {
        &self.ephys_dir
    }

    /// Clean every recording, continuing past failures.
    ///
    /// `events` is the whole session's stream; each recording gets the
    /// events whose `eegfile` names it.
    pub fn clean_session(&self, recordings: &[PathBuf], events: &[Event]) -> SessionReport {
        let mut report = SessionReport::default();
        for path in recordings {
            let evs = events_for_recording(events, path);
            match self.clean_recording(path, &evs) {
                Ok(CleanStatus::Cleaned { .. }) => report.cleaned.push(path.clone()),
                Ok(CleanStatus::AlreadyClean) => report.skipped.push(path.clone()),
                Err(e) => {
                    log::error!("cleaning {} failed: {e}", path.display());
                    report.failed.push((path.clone(), e));
                }
            }
        }
        report
    }

    /// Clean one recording whose events are already selected and sorted.
    pub fn clean_recording(&self, path: &Path, events: &[Event]) -> Result<CleanStatus> {
        let paths = ArtifactPaths::new(&self.ephys_dir, basename(path)?);
        log::debug!("cleaning data from {}", paths.basename);

        if paths.cleaned().exists() {
            log::info!("{} already cleaned, skipping", paths.basename);
            return Ok(CleanStatus::AlreadyClean);
        }

        let mut rec = Recording::load(path)?;
        self.preprocess(&mut rec, &paths)?;

        let breaks = detect_breaks(events, rec.n_times(), rec.sfreq)?;
        rec.set_annotations(
            breaks
                .intervals
                .iter()
                .map(|iv| Annotation { onset: iv.onset, offset: iv.offset, label: BREAK_LABEL.into() })
                .collect(),
        );

        let partitions = partition_recording(&breaks, rec.n_times())?;
        validate_partitions(&partitions, rec.n_times())?;
        write_partition_table(&paths.partition_table(), &partitions)?;
        log::info!(
            "{}: {} exclusion intervals, {} partitions",
            paths.basename,
            breaks.intervals.len(),
            partitions.len()
        );

        let collected = self.run_partitions(&paths, rec, &partitions);
        remove_temporaries(&paths, &partitions);
        collected?;
        Ok(CleanStatus::Cleaned { partitions: partitions.len() })
    }

    /// Write the splits, dispatch one job per partition and collect. The
    /// caller removes the per-partition files whatever the outcome.
    fn run_partitions(&self, paths: &ArtifactPaths, rec: Recording, partitions: &[Partition]) -> Result<()> {
        let n_times = rec.n_times();
        let mut jobs = Vec::with_capacity(partitions.len());
        for p in partitions {
            remove_if_exists(&paths.cleaned_split(p.index))?;
            rec.crop(p.start, p.end)?.save(&paths.split(p.index))?;
            jobs.push(PartitionJob::new(p.index, paths, &self.cfg));
        }
        drop(rec);

        match self.scheduler.dispatch(&jobs, self.runner.as_ref(), &self.cfg.queue) {
            Ok(outcomes) => {
                let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
                if failed > 0 {
                    log::warn!("{failed} partition jobs reported failure, collecting anyway");
                }
            }
            Err(e) => log::warn!(
                "scheduler returned an error ({e}); this may happen even if cleaning \
                 succeeded, so attempting to continue anyway"
            ),
        }

        self.collect(paths, partitions, n_times)
    }

    fn preprocess(&self, rec: &mut Recording, paths: &ArtifactPaths) -> Result<()> {
        rec.pick_eeg();
        rec.load_bad_channels(&paths.bad_channels())?;
        if self.cfg.exclude_bad_channels {
            let bads = std::mem::take(&mut rec.bads);
            log::debug!("excluding bad channels {bads:?}");
            rec.drop_channels(&bads);
        } else {
            rec.bads.clear();
        }
        if rec.n_channels() == 0 {
            return Err(CleanError::MalformedInput(format!(
                "{} has no EEG channels left to clean",
                paths.basename
            )));
        }

        if let Some(hp) = self.cfg.highpass_freq {
            log::debug!("highpass {hp} Hz");
            let h = filter::design_highpass(f64::from(hp), rec.sfreq);
            filter::apply_fir_zero_phase(&mut rec.data, &h);
        }
        if self.cfg.reref {
            average_reference_inplace(&mut rec.data);
        }
        Ok(())
    }

    /// Load every cleaned partition in index order, check it covers exactly
    /// its partition, concatenate and save the final output.
    fn collect(&self, paths: &ArtifactPaths, partitions: &[Partition], n_times: usize) -> Result<()> {
        let mut parts = Vec::with_capacity(partitions.len());
        for p in partitions {
            let file = paths.cleaned_split(p.index);
            if !file.exists() {
                return Err(CleanError::MissingPartitionOutput { index: p.index, path: file });
            }
            let part = Recording::load(&file)?;
            if part.n_times() != p.len() {
                return Err(CleanError::MalformedInput(format!(
                    "cleaned partition {} of {} has {} samples, expected {}",
                    p.index,
                    paths.basename,
                    part.n_times(),
                    p.len()
                )));
            }
            parts.push(part);
        }

        log::debug!("constructing cleaned data file for {}", paths.basename);
        let clean = Recording::concatenate(parts)?;
        if clean.n_times() != n_times {
            return Err(CleanError::MalformedInput(format!(
                "cleaned {} has {} samples, recording has {n_times}",
                paths.basename,
                clean.n_times()
            )));
        }
        log::debug!("saving cleaned data for {}", paths.basename);
        clean.save_cleaned(&paths.cleaned())
    }
}

/// Remove every split and cleaned split of `partitions`. Failures are only
/// logged so they never mask the collection result.
fn remove_temporaries(paths: &ArtifactPaths, partitions: &[Partition]) {
    for p in partitions {
        for file in [paths.cleaned_split(p.index), paths.split(p.index)] {
            if let Err(e) = remove_if_exists(&file) {
                log::warn!("could not remove {}: {e}", file.display());
            }
        }
    }
}

/// File stem of a recording path, used to name every derived artifact.
pub fn basename(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| CleanError::MalformedInput(format!("no file name in {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_strips_extension() {
        assert_eq!(basename(Path::new("/x/sess_0.safetensors")).unwrap(), "sess_0");
        assert!(basename(Path::new("/")).is_err());
    }

    #[test]
    fn report_success_means_no_failures() {
        let mut r = SessionReport::default();
        assert!(r.is_success());
        r.failed.push(("a".into(), CleanError::Orchestration("x".into())));
        assert!(!r.is_success());
    }
}
