//! Highpass FIR design matching MNE / `scipy.signal.firwin`.
//!
//! For a highpass at `l_freq` Hz with sampling rate `sfreq`:
//!   • transition bandwidth = min(max(0.25 * l_freq, 2.0), l_freq)
//!   • filter length N      = ceil(3.3 / trans_bw * sfreq), rounded to odd
//!   • Hamming-windowed sinc lowpass at the band midpoint, spectrally inverted
use std::f64::consts::PI;

/// MNE's automatic transition bandwidth for a highpass.
pub fn auto_trans_bandwidth(l_freq: f64) -> f64 {
    (0.25 * l_freq).max(2.0).min(l_freq)
}

/// Number of taps for `trans_bw`, always odd.
pub fn auto_filter_length(trans_bw: f64, sfreq: f64) -> usize {
    let n_raw = (3.3 / trans_bw * sfreq).ceil() as usize;
    if n_raw % 2 == 0 { n_raw + 1 } else { n_raw }
}

/// Zero-phase highpass impulse response.
///
/// Matches `mne.filter.create_filter(None, sfreq, l_freq=l_freq, h_freq=None,
///   fir_window='hamming', fir_design='firwin', phase='zero')`.
pub fn design_highpass(l_freq: f64, sfreq: f64) -> Vec<f64> {
    let trans_bw = auto_trans_bandwidth(l_freq);
    let n = auto_filter_length(trans_bw, sfreq);
    let cutoff_hz = l_freq - trans_bw / 2.0;

    let mut h: Vec<f64> = firwin_lowpass(n, cutoff_hz, sfreq).iter().map(|&v| -v).collect();
    h[n / 2] += 1.0;
    h
}

/// Hamming-windowed sinc lowpass with unit DC gain. `n` must be odd.
pub fn firwin_lowpass(n: usize, cutoff_hz: f64, sfreq: f64) -> Vec<f64> {
    let alpha = (n - 1) as f64 / 2.0;
    let fc = cutoff_hz / (sfreq / 2.0);
    let win = hamming(n);

    let h: Vec<f64> = (0..n)
        .map(|i| {
            let x = i as f64 - alpha;
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * win[i]
        })
        .collect();
    let s: f64 = h.iter().sum();
    h.into_iter().map(|v| v / s).collect()
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}
