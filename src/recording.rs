//! In-memory recording: channel-major samples plus the metadata the cleaning
//! pipeline reads and writes.
//!
//! `data`: [C, T] in original units. Annotations are in samples, inclusive on
//! both ends.
use anyhow::{anyhow, Context};
use ndarray::{concatenate, s, Array1, Array2, ArrayView2, Axis};
use std::path::Path;

use crate::error::{CleanError, Result};
use crate::io::{StReader, StWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Eeg,
    Eog,
    Misc,
}

impl ChannelKind {
    fn code(self) -> u8 {
        match self {
            ChannelKind::Eeg => b'e',
            ChannelKind::Eog => b'o',
            ChannelKind::Misc => b'm',
        }
    }

    fn from_code(c: u8) -> Self {
        match c {
            b'e' => ChannelKind::Eeg,
            b'o' => ChannelKind::Eog,
            _ => ChannelKind::Misc,
        }
    }

    /// Guess from the channel name; used when a file carries no kinds.
    pub fn from_name(name: &str) -> Self {
        if name.to_ascii_uppercase().contains("EOG") {
            ChannelKind::Eog
        } else {
            ChannelKind::Eeg
        }
    }
}

/// A labelled time interval, `[onset, offset]` in samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub onset: usize,
    pub offset: usize,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Recording {
    pub data: Array2<f64>,
    pub sfreq: f64,
    pub ch_names: Vec<String>,
    pub ch_kinds: Vec<ChannelKind>,
    pub bads: Vec<String>,
    pub annotations: Vec<Annotation>,
}

impl Recording {
    /// Build a recording with all channels typed from their names.
    pub fn new(data: Array2<f64>, sfreq: f64, ch_names: Vec<String>) -> Result<Self> {
        if ch_names.len() != data.nrows() {
            return Err(CleanError::MalformedInput(format!(
                "{} channel names for {} data rows",
                ch_names.len(),
                data.nrows()
            )));
        }
        let ch_kinds = ch_names.iter().map(|n| ChannelKind::from_name(n)).collect();
        Ok(Self { data, sfreq, ch_names, ch_kinds, bads: vec![], annotations: vec![] })
    }

    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    /// Sample times in seconds, starting at 0.
    pub fn times(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.n_times(), |i| i as f64 / self.sfreq)
    }

    /// Keep only the channels at `idx`, in that order.
    pub fn pick(&mut self, idx: &[usize]) {
        self.data = self.data.select(Axis(0), idx);
        self.ch_names = idx.iter().map(|&i| self.ch_names[i].clone()).collect();
        self.ch_kinds = idx.iter().map(|&i| self.ch_kinds[i]).collect();
        let names = &self.ch_names;
        self.bads.retain(|b| names.contains(b));
    }

    /// Drop EOG and miscellaneous channels.
    pub fn pick_eeg(&mut self) {
        let idx: Vec<usize> = (0..self.n_channels())
            .filter(|&i| self.ch_kinds[i] == ChannelKind::Eeg)
            .collect();
        self.pick(&idx);
    }

    pub fn drop_channels(&mut self, names: &[String]) {
        let idx: Vec<usize> = (0..self.n_channels())
            .filter(|&i| !names.contains(&self.ch_names[i]))
            .collect();
        self.pick(&idx);
    }

    /// Read bad channel names from a text file, one per line. A missing file
    /// leaves the bad list untouched.
    pub fn load_bad_channels(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            log::debug!("no bad channel file at {}", path.display());
            return Ok(());
        }
        let text = std::fs::read_to_string(path)?;
        for name in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if !self.ch_names.iter().any(|c| c == name) {
                log::warn!("bad channel '{name}' not present in recording, ignored");
                continue;
            }
            if !self.bads.iter().any(|b| b == name) {
                self.bads.push(name.to_string());
            }
        }
        Ok(())
    }

    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations;
    }

    /// Copy of samples `[start, stop]` (inclusive). Annotations overlapping
    /// the range are clipped to it and shifted to the new origin.
    pub fn crop(&self, start: usize, stop: usize) -> Result<Recording> {
        if start > stop || stop >= self.n_times() {
            return Err(CleanError::MalformedInput(format!(
                "crop [{start}, {stop}] outside recording of {} samples",
                self.n_times()
            )));
        }
        let annotations = self
            .annotations
            .iter()
            .filter(|a| a.offset >= start && a.onset <= stop)
            .map(|a| Annotation {
                onset: a.onset.max(start) - start,
                offset: a.offset.min(stop) - start,
                label: a.label.clone(),
            })
            .collect();
        Ok(Recording {
            data: self.data.slice(s![.., start..=stop]).to_owned(),
            sfreq: self.sfreq,
            ch_names: self.ch_names.clone(),
            ch_kinds: self.ch_kinds.clone(),
            bads: self.bads.clone(),
            annotations,
        })
    }

    /// Join recordings end-to-end. All parts must share one channel layout
    /// and sampling rate.
    pub fn concatenate(parts: Vec<Recording>) -> Result<Recording> {
        let Some(first) = parts.first() else {
            return Err(CleanError::MalformedInput("nothing to concatenate".into()));
        };
        for (i, p) in parts.iter().enumerate().skip(1) {
            if p.ch_names != first.ch_names || (p.sfreq - first.sfreq).abs() > 1e-9 {
                return Err(CleanError::MalformedInput(format!(
                    "part {i} does not match the channel layout of part 0"
                )));
            }
        }

        let mut annotations = Vec::new();
        let mut origin = 0;
        for p in &parts {
            annotations.extend(p.annotations.iter().map(|a| Annotation {
                onset: a.onset + origin,
                offset: a.offset + origin,
                label: a.label.clone(),
            }));
            origin += p.n_times();
        }

        let views: Vec<ArrayView2<f64>> = parts.iter().map(|p| p.data.view()).collect();
        let data = concatenate(Axis(1), &views).context("concatenating partition data")?;
        Ok(Recording {
            data,
            sfreq: first.sfreq,
            ch_names: first.ch_names.clone(),
            ch_kinds: first.ch_kinds.clone(),
            bads: first.bads.clone(),
            annotations,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = StWriter::new();
        w.add_f64_arr2("data", &self.data);
        w.add_f64("sfreq", &[self.sfreq], &[1]);
        w.add_lines("ch_names", &self.ch_names);
        let kinds: Vec<u8> = self.ch_kinds.iter().map(|k| k.code()).collect();
        w.add_u8("ch_kinds", &kinds);
        if !self.bads.is_empty() {
            w.add_lines("bads", &self.bads);
        }
        if !self.annotations.is_empty() {
            let bounds: Vec<f64> = self
                .annotations
                .iter()
                .flat_map(|a| [a.onset as f64, a.offset as f64])
                .collect();
            w.add_f64("annot_bounds", &bounds, &[self.annotations.len(), 2]);
            let labels: Vec<String> = self.annotations.iter().map(|a| a.label.clone()).collect();
            w.add_lines("annot_labels", &labels);
        }
        w.write(path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Recording> {
        let r = StReader::open(path)?;
        let data = r.f64_arr2("data")?;
        let sfreq = r.f64_scalar("sfreq")?;
        let ch_names = r.lines("ch_names")?;
        if ch_names.len() != data.nrows() {
            return Err(CleanError::MalformedInput(format!(
                "{}: {} channel names for {} data rows",
                path.display(),
                ch_names.len(),
                data.nrows()
            )));
        }
        let ch_kinds = if r.contains("ch_kinds") {
            r.bytes("ch_kinds")?.iter().map(|&c| ChannelKind::from_code(c)).collect()
        } else {
            ch_names.iter().map(|n| ChannelKind::from_name(n)).collect()
        };
        let bads = if r.contains("bads") { r.lines("bads")? } else { vec![] };

        let mut annotations = Vec::new();
        if r.contains("annot_bounds") {
            let (bounds, _) = r.f64_vec("annot_bounds")?;
            let labels = r.lines("annot_labels")?;
            if bounds.len() != 2 * labels.len() {
                return Err(anyhow!("annotation bounds/labels length mismatch").into());
            }
            for (b, label) in bounds.chunks_exact(2).zip(labels) {
                annotations.push(Annotation { onset: b[0] as usize, offset: b[1] as usize, label });
            }
        }

        Ok(Recording { data, sfreq, ch_names, ch_kinds, bads, annotations })
    }

    /// Persist in the cleaned-output layout: `data` as F32 [C, T], `times`,
    /// `sfreq` and `ch_names`.
    pub fn save_cleaned(&self, path: &Path) -> Result<()> {
        let mut w = StWriter::new();
        w.add_f32_arr2("data", &self.data.mapv(|v| v as f32));
        w.add_f64_arr1("times", &self.times());
        w.add_f64("sfreq", &[self.sfreq], &[1]);
        w.add_lines("ch_names", &self.ch_names);
        w.write(path)?;
        Ok(())
    }
}

/// Cleaned output as written by [`Recording::save_cleaned`].
#[derive(Debug, Clone)]
pub struct CleanedRecording {
    pub data: Array2<f32>,
    pub times: Array1<f64>,
    pub sfreq: f64,
    pub ch_names: Vec<String>,
}

impl CleanedRecording {
    pub fn load(path: &Path) -> Result<Self> {
        let r = StReader::open(path)?;
        let data = r.f32_arr2("data")?;
        let times = r.f64_arr1("times")?;
        if times.len() != data.ncols() {
            return Err(anyhow!(
                "{}: time axis has {} samples, data has {}",
                path.display(),
                times.len(),
                data.ncols()
            )
            .into());
        }
        let sfreq = r.f64_scalar("sfreq")?;
        let ch_names = r.lines("ch_names")?;
        if ch_names.len() != data.nrows() {
            return Err(anyhow!("{}: channel names do not match data rows", path.display()).into());
        }
        Ok(Self { data, times, sfreq, ch_names })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("E{i}")).collect()
    }

    fn ramp(n_ch: usize, n_t: usize) -> Recording {
        let data = Array2::from_shape_fn((n_ch, n_t), |(c, t)| (c * 1000 + t) as f64);
        Recording::new(data, 100.0, names(n_ch)).unwrap()
    }

    #[test]
    fn crop_is_inclusive_and_shifts_annotations() {
        let mut rec = ramp(2, 50);
        rec.set_annotations(vec![
            Annotation { onset: 5, offset: 12, label: "bad_break".into() },
            Annotation { onset: 30, offset: 40, label: "bad_break".into() },
        ]);
        let part = rec.crop(10, 19).unwrap();
        assert_eq!(part.n_times(), 10);
        assert_eq!(part.data[[1, 0]], 1010.0);
        assert_eq!(part.annotations, vec![Annotation { onset: 0, offset: 2, label: "bad_break".into() }]);
    }

    #[test]
    fn crop_out_of_range_rejected() {
        let rec = ramp(1, 10);
        assert!(matches!(rec.crop(3, 10), Err(CleanError::MalformedInput(_))));
    }

    #[test]
    fn concatenate_restores_timeline() {
        let rec = ramp(3, 30);
        let parts = vec![rec.crop(0, 9).unwrap(), rec.crop(10, 24).unwrap(), rec.crop(25, 29).unwrap()];
        let joined = Recording::concatenate(parts).unwrap();
        assert_eq!(joined.data, rec.data);
    }

    #[test]
    fn concatenate_rejects_layout_mismatch() {
        let a = ramp(2, 10);
        let b = ramp(3, 10);
        assert!(Recording::concatenate(vec![a, b]).is_err());
    }

    #[test]
    fn pick_eeg_drops_eog() {
        let data = Array2::zeros((3, 4));
        let mut rec = Recording::new(data, 10.0, vec!["Fz".into(), "EOG1".into(), "Cz".into()]).unwrap();
        rec.bads = vec!["EOG1".into()];
        rec.pick_eeg();
        assert_eq!(rec.ch_names, vec!["Fz", "Cz"]);
        assert!(rec.bads.is_empty());
    }

    #[test]
    fn bad_channel_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "E1\n\nE9\n").unwrap();
        let mut rec = ramp(3, 5);
        rec.load_bad_channels(&path).unwrap();
        assert_eq!(rec.bads, vec!["E1"]);
        rec.load_bad_channels(&dir.path().join("missing.txt")).unwrap();
        assert_eq!(rec.bads, vec!["E1"]);
    }

    #[test]
    fn save_load_keeps_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.safetensors");
        let mut rec = ramp(2, 8);
        rec.bads = vec!["E0".into()];
        rec.set_annotations(vec![Annotation { onset: 1, offset: 3, label: "bad_break".into() }]);
        rec.save(&path).unwrap();

        let back = Recording::load(&path).unwrap();
        assert_eq!(back.data, rec.data);
        assert_eq!(back.bads, rec.bads);
        assert_eq!(back.annotations, rec.annotations);
        assert_eq!(back.ch_kinds, rec.ch_kinds);
    }

    #[test]
    fn cleaned_layout_has_time_axis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.safetensors");
        let rec = ramp(2, 4);
        rec.save_cleaned(&path).unwrap();
        let c = CleanedRecording::load(&path).unwrap();
        assert_eq!(c.times.len(), 4);
        approx::assert_abs_diff_eq!(c.times[3], 0.03, epsilon = 1e-12);
        assert_eq!(c.data[[1, 2]], 1002.0_f32);
    }
}
