//! Optional highpass applied before the decomposition.
//!
//! - [`design`]: Hamming-windowed sinc highpass, matching
//!   `mne.filter.create_filter(fir_window='hamming', phase='zero')`.
//! - [`apply`]: zero-phase FFT convolution with reflect-limited padding.

pub mod apply;
pub mod design;

pub use apply::{apply_fir_zero_phase, filter_1d};
pub use design::{auto_filter_length, auto_trans_bandwidth, design_highpass, firwin_lowpass, hamming};
