//! Partitioning a recording at session breaks, and the partition table that
//! hands those decisions to workers.
//!
//! A session with two breaks becomes three partitions:
//!
//! ```text
//! [0 ─────────── stop₁] [stop₁+1 ─────── stop₂] [stop₂+1 ────── n−1]
//!        ^ break 1             ^ break 2
//! ```
//!
//! Splits happen at break offsets, never at the end of the pre-session gap.
use std::path::Path;

use crate::breaks::{Breaks, ExclusionInterval};
use crate::error::{CleanError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub index: usize,
    /// First sample, inclusive.
    pub start: usize,
    /// Last sample, inclusive.
    pub end: usize,
    /// Exclusions whose onset lies in `[start, end]`, relative to `start`.
    pub exclusions: Vec<ExclusionInterval>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Per-sample mask, `true` inside any exclusion (bounds inclusive,
    /// clipped to the partition).
    pub fn ignore_mask(&self) -> Vec<bool> {
        let n = self.len();
        let mut mask = vec![false; n];
        for ex in &self.exclusions {
            if ex.onset >= n {
                continue;
            }
            let stop = ex.offset.min(n - 1);
            mask[ex.onset..=stop].iter_mut().for_each(|m| *m = true);
        }
        mask
    }
}

/// Cut `[0, n_times − 1]` into contiguous partitions ending at each break
/// offset, plus a final partition running to the last sample.
pub fn partition_recording(breaks: &Breaks, n_times: usize) -> Result<Vec<Partition>> {
    if n_times == 0 {
        return Err(CleanError::MalformedInput("cannot partition an empty recording".into()));
    }
    let last = n_times - 1;
    let skip = usize::from(breaks.leading_session_start && !breaks.intervals.is_empty());

    let mut splits: Vec<usize> = breaks.intervals[skip..]
        .iter()
        .map(|iv| iv.offset.min(last))
        .collect();
    splits.sort_unstable();
    splits.dedup();
    if splits.last() != Some(&last) {
        splits.push(last);
    }

    let mut partitions = Vec::with_capacity(splits.len());
    let mut start = 0;
    for (index, &end) in splits.iter().enumerate() {
        let exclusions = breaks
            .intervals
            .iter()
            .filter(|iv| start <= iv.onset && iv.onset <= end)
            .map(|iv| ExclusionInterval::new(iv.onset - start, iv.offset - start))
            .collect();
        partitions.push(Partition { index, start, end, exclusions });
        start = end + 1;
    }
    Ok(partitions)
}

/// Check that `partitions` are indexed in order and tile `[0, n_times − 1]`.
pub fn validate_partitions(partitions: &[Partition], n_times: usize) -> Result<()> {
    let mut expected_start = 0;
    for (i, p) in partitions.iter().enumerate() {
        if p.index != i || p.start != expected_start || p.end < p.start {
            return Err(CleanError::MalformedInput(format!(
                "partition {i} [{}, {}] breaks contiguity (expected start {expected_start})",
                p.start, p.end
            )));
        }
        expected_start = p.end + 1;
    }
    if expected_start != n_times {
        return Err(CleanError::MalformedInput(format!(
            "partitions cover {expected_start} of {n_times} samples"
        )));
    }
    Ok(())
}

// ── Partition table (TSV side-channel) ───────────────────────────────────────

const COL_INDEX: &str = "index";
const COL_START: &str = "start_sample";
const COL_END: &str = "end_sample";

/// Write one row per partition: `index start_sample end_sample` followed by
/// `(skip_start<j>, skip_end<j>)` pairs in absolute samples, padded with
/// empty cells to a common width.
pub fn write_partition_table(path: &Path, partitions: &[Partition]) -> Result<()> {
    let max_ex = partitions.iter().map(|p| p.exclusions.len()).max().unwrap_or(0);
    let width = 3 + 2 * max_ex;

    let mut w = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;

    let mut header: Vec<String> = vec![COL_INDEX.into(), COL_START.into(), COL_END.into()];
    for j in 0..max_ex {
        header.push(format!("skip_start{j}"));
        header.push(format!("skip_end{j}"));
    }
    w.write_record(&header)?;

    for p in partitions {
        let mut row = vec![p.index.to_string(), p.start.to_string(), p.end.to_string()];
        for ex in &p.exclusions {
            row.push((ex.onset + p.start).to_string());
            row.push((ex.offset + p.start).to_string());
        }
        row.resize(width, String::new());
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

fn parse_cell(row: &csv::StringRecord, col: usize, name: &str) -> Result<Option<usize>> {
    let cell = row.get(col).unwrap_or("").trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<usize>()
        .map(Some)
        .map_err(|_| CleanError::MalformedInput(format!("column '{name}': bad value '{cell}'")))
}

fn required(row: &csv::StringRecord, col: usize, name: &str) -> Result<usize> {
    parse_cell(row, col, name)?
        .ok_or_else(|| CleanError::MalformedInput(format!("column '{name}' is empty")))
}

/// Read every partition back, with exclusions relative to each start.
pub fn read_partition_table(path: &Path) -> Result<Vec<Partition>> {
    let mut r = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;
    let headers = r.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CleanError::MalformedInput(format!("partition table missing column '{name}'")))
    };
    let (c_index, c_start, c_end) = (column(COL_INDEX)?, column(COL_START)?, column(COL_END)?);

    let mut skip_cols = Vec::new();
    for j in 0.. {
        let (s_name, e_name) = (format!("skip_start{j}"), format!("skip_end{j}"));
        let Some(s) = headers.iter().position(|h| h == s_name) else { break };
        skip_cols.push((s, column(&e_name)?, s_name, e_name));
    }

    let mut partitions = Vec::new();
    for row in r.records() {
        let row = row?;
        let index = required(&row, c_index, COL_INDEX)?;
        let start = required(&row, c_start, COL_START)?;
        let end = required(&row, c_end, COL_END)?;

        let mut exclusions = Vec::new();
        for (s, e, s_name, e_name) in &skip_cols {
            let Some(onset) = parse_cell(&row, *s, s_name)? else { break };
            let offset = required(&row, *e, e_name)?;
            if onset < start || offset < onset {
                return Err(CleanError::MalformedInput(format!(
                    "partition {index}: exclusion [{onset}, {offset}] invalid for start {start}"
                )));
            }
            exclusions.push(ExclusionInterval::new(onset - start, offset - start));
        }
        partitions.push(Partition { index, start, end, exclusions });
    }
    Ok(partitions)
}

/// The row for partition `index`.
pub fn read_partition(path: &Path, index: usize) -> Result<Partition> {
    read_partition_table(path)?
        .into_iter()
        .find(|p| p.index == index)
        .ok_or_else(|| CleanError::MalformedInput(format!("partition table has no row {index}")))
}
