/// Shared helpers: synthetic recordings and event streams.
use lcf::{Event, EventKind, Recording};
use ndarray::{Array, Array2, Dimension};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::{Path, PathBuf};

#[allow(unused)]
pub const SFREQ: f64 = 100.0;

#[allow(unused)]
/// `n_ch` channels mixing a square wave, a sawtooth, a slow sine and noise,
/// plus independent sensor noise so the covariance has full rank.
/// Deterministic for a given `seed`.
pub fn synthetic_eeg(n_ch: usize, n_t: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mix = Array2::from_shape_fn((n_ch, 4), |_| rng.random_range(-1.0..1.0));
    let sources = Array2::from_shape_fn((4, n_t), |(k, t)| {
        let x = t as f64;
        match k {
            0 => (x * 0.07).sin().signum(),
            1 => (x * 0.031) % 2.0 - 1.0,
            2 => (x * 0.013).sin(),
            _ => rng.random_range(-0.5..0.5),
        }
    });
    let sensor = Array2::from_shape_fn((n_ch, n_t), |_| rng.random_range(-0.05..0.05));
    mix.dot(&sources) + sensor
}

#[allow(unused)]
/// Add a large bump of `len` samples at `at` to every channel.
pub fn add_spike(data: &mut Array2<f64>, at: usize, len: usize, amp: f64) {
    for mut row in data.rows_mut() {
        for t in at..(at + len).min(row.len()) {
            row[t] += amp;
        }
    }
}

#[allow(unused)]
pub fn channel_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("E{i}")).collect()
}

#[allow(unused)]
/// Save a synthetic recording as `<dir>/<name>.safetensors`.
pub fn write_recording(dir: &Path, name: &str, data: Array2<f64>) -> PathBuf {
    let names = channel_names(data.nrows());
    let rec = Recording::new(data, SFREQ, names).unwrap();
    let path = dir.join(format!("{name}.safetensors"));
    rec.save(&path).unwrap();
    path
}

#[allow(unused)]
pub fn ev(kind: EventKind, offset: usize) -> Event {
    Event::new(kind, offset)
}

#[allow(unused)]
/// Events tagged with the recording they belong to.
pub fn events_for(path: &Path, stream: &[(EventKind, usize)]) -> Vec<Event> {
    stream.iter()
        .map(|(k, o)| Event { eegfile: path.display().to_string(), ..Event::new(k.clone(), *o) })
        .collect()
}

#[allow(unused)]
pub fn max_abs_diff<D: Dimension>(a: &Array<f64, D>, b: &Array<f64, D>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0_f64, f64::max)
}
