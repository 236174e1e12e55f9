//! Break detection: which sample ranges must not influence the
//! decomposition fit.
//!
//! Precedence (first match of the break rules wins):
//!
//! 1. first event `SESS_START`  → exclude `[0, start]`
//! 2. last event `SESS_END`     → exclude `[end, n − 1]`
//! 3. any `REST_REWET` (legacy) → each break runs to `next − 5 s`, or to the
//!    last sample when it is the final event
//! 4. else `BREAK_START`/`BREAK_STOP` pairs, plus a leading stop (recording
//!    opens mid-break) and a trailing start (recording closes mid-break)
use crate::config::LEGACY_BREAK_BUFFER_SECS;
use crate::error::{CleanError, Result};
use crate::events::{Event, EventKind};

/// `[onset, offset]` in samples, inclusive. Always `offset > onset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExclusionInterval {
    pub onset: usize,
    pub offset: usize,
}

impl ExclusionInterval {
    /// Clamps `offset` to `onset + 1` when it does not lie after `onset`.
    pub fn new(onset: usize, offset: usize) -> Self {
        Self { onset, offset: offset.max(onset + 1) }
    }

    /// Same clamp for offsets computed in signed arithmetic.
    fn from_signed(onset: usize, offset: i64) -> Self {
        if offset <= onset as i64 {
            Self::new(onset, onset + 1)
        } else {
            Self::new(onset, offset as usize)
        }
    }
}

/// Result of break detection for one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Breaks {
    /// Sorted by onset.
    pub intervals: Vec<ExclusionInterval>,
    /// The first interval is the pre-session gap (first event `SESS_START`).
    pub leading_session_start: bool,
}

/// Scan one recording's events (sorted by offset) for excluded intervals.
pub fn detect_breaks(events: &[Event], n_times: usize, sfreq: f64) -> Result<Breaks> {
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return Err(CleanError::MalformedInput("recording has no events".into()));
    };
    if n_times == 0 {
        return Err(CleanError::MalformedInput("recording has no samples".into()));
    }
    let last_sample = n_times - 1;
    let mut intervals = Vec::new();

    let leading_session_start = first.kind == EventKind::SessStart;
    if leading_session_start {
        intervals.push(ExclusionInterval::new(0, first.eegoffset));
    }
    if last.kind == EventKind::SessEnd {
        intervals.push(ExclusionInterval::new(last.eegoffset, last_sample));
    }

    let has_legacy = events.iter().any(|e| e.kind == EventKind::RestRewet);
    let has_modern = events
        .iter()
        .any(|e| matches!(e.kind, EventKind::BreakStart | EventKind::BreakStop));

    if has_legacy {
        for (i, ev) in events.iter().enumerate() {
            if ev.kind != EventKind::RestRewet {
                continue;
            }
            let offset = match events.get(i + 1) {
                None => last_sample as i64,
                Some(next) => (next.eegoffset as f64 - LEGACY_BREAK_BUFFER_SECS * sfreq) as i64,
            };
            intervals.push(ExclusionInterval::from_signed(ev.eegoffset, offset));
        }
    } else if has_modern {
        intervals.extend(break_pairs(events, last_sample)?);
    }

    intervals.sort();
    log::debug!(
        "{} exclusion interval(s), leading session start: {leading_session_start}",
        intervals.len()
    );
    Ok(Breaks { intervals, leading_session_start })
}

fn break_pairs(events: &[Event], last_sample: usize) -> Result<Vec<ExclusionInterval>> {
    let n = events.len();
    let mut out = Vec::new();

    // Opened mid-break: the first event is the stop of a break already running.
    if events[0].kind == EventKind::BreakStop {
        out.push(ExclusionInterval::new(0, events[0].eegoffset));
    }
    // Closed mid-break: the last event starts a break that never stops.
    if events[n - 1].kind == EventKind::BreakStart {
        out.push(ExclusionInterval::new(events[n - 1].eegoffset, last_sample));
    }

    // Interior pairs: starts that are not the last event against stops that
    // are not the first event, matched in order.
    let starts: Vec<&Event> = events[..n - 1]
        .iter()
        .filter(|e| e.kind == EventKind::BreakStart)
        .collect();
    let stops: Vec<&Event> = events[1..]
        .iter()
        .filter(|e| e.kind == EventKind::BreakStop)
        .collect();
    for (i, start) in starts.iter().enumerate() {
        let Some(stop) = stops.get(i) else {
            return Err(CleanError::MalformedInput(format!(
                "BREAK_START at sample {} has no matching BREAK_STOP",
                start.eegoffset
            )));
        };
        out.push(ExclusionInterval::new(start.eegoffset, stop.eegoffset));
    }
    Ok(out)
}
