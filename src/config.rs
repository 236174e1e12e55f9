//! Cleaning configuration.
//!
//! [`CleaningConfig`] holds every tunable parameter for a cleaning run. The
//! defaults reproduce the settings used for the lab's production sessions.

use serde::{Deserialize, Serialize};

/// Buffer (seconds) left before the first event that follows a legacy
/// `REST_REWET` break marker. Not configurable.
pub const LEGACY_BREAK_BUFFER_SECS: f64 = 5.0;

/// Label attached to excluded intervals on the recording.
pub const BREAK_LABEL: &str = "bad_break";

/// Settings for the independent-component fit of each partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcaParams {
    /// Maximum number of FastICA fixed-point iterations.
    ///
    /// Default: `200`.
    pub max_iter: usize,

    /// Convergence tolerance on `max |1 − |diag(W₊ Wᵀ)||`.
    ///
    /// Default: `1e-4`.
    pub tol: f64,

    /// Seed for the unmixing-matrix initialisation. Fits are deterministic
    /// for a given seed and input.
    ///
    /// Default: `42`.
    pub seed: u64,
}

impl Default for IcaParams {
    fn default() -> Self {
        Self { max_iter: 200, tol: 1e-4, seed: 42 }
    }
}

/// Configuration for cleaning one session's recordings.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use lcf::CleaningConfig;
///
/// let cfg = CleaningConfig {
///     iqr_thresh: 2.5,
///     workers:    4,
///     ..CleaningConfig::default()
/// };
/// assert_eq!(cfg.lcf_winsize, 0.1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Number of interquartile ranges above the 75th (or below the 25th)
    /// percentile a component sample must reach to be marked artifactual.
    ///
    /// Default: `3.0`.
    pub iqr_thresh: f64,

    /// Width in seconds of both the LCF dilator and the transition window.
    ///
    /// Default: `0.1` s.
    pub lcf_winsize: f64,

    /// Optional zero-phase highpass cutoff (Hz) applied before the
    /// decomposition. LCF assumes a stable baseline, so recordings that were
    /// not filtered upstream should set this (≥ 0.5 Hz recommended).
    ///
    /// Default: `None` (data is assumed to be filtered already).
    pub highpass_freq: Option<f32>,

    /// Subtract the common average reference before the decomposition.
    ///
    /// Default: `false`.
    pub reref: bool,

    /// When `true`, channels listed in `<basename>_bad_chan.txt` are left out
    /// of the decomposition and of the cleaned output. When `false` the bad
    /// flags are cleared and every EEG channel is cleaned.
    ///
    /// Default: `false`.
    pub exclude_bad_channels: bool,

    /// Decomposition settings shared by every partition.
    pub ica: IcaParams,

    /// Worker threads for partition jobs. `0` lets rayon pick.
    ///
    /// Default: `0`.
    pub workers: usize,

    /// Name of the queue / resource profile jobs are submitted under.
    ///
    /// Default: `"local"`.
    pub queue: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            iqr_thresh: 3.0,
            lcf_winsize: 0.1,
            highpass_freq: None,
            reref: false,
            exclude_bad_channels: false,
            ica: IcaParams::default(),
            workers: 0,
            queue: "local".into(),
        }
    }
}

impl CleaningConfig {
    /// Dilator length in samples: `round(lcf_winsize × sfreq)`.
    ///
    /// ```
    /// use lcf::CleaningConfig;
    /// assert_eq!(CleaningConfig::default().dilator_samples(500.0), 50);
    /// ```
    pub fn dilator_samples(&self, sfreq: f64) -> usize {
        seconds_to_samples(self.lcf_winsize, sfreq)
    }

    /// Transition window length in samples: `round(lcf_winsize × sfreq)`.
    pub fn transition_samples(&self, sfreq: f64) -> usize {
        seconds_to_samples(self.lcf_winsize, sfreq)
    }
}

/// `round(secs × sfreq)`, never negative.
pub fn seconds_to_samples(secs: f64, sfreq: f64) -> usize {
    (secs * sfreq).round().max(0.0) as usize
}
