//! Session event stream.
//!
//! Events arrive as a JSON array of `{"type", "eegoffset", "eegfile"}`
//! records covering a whole session; [`events_for_recording`] narrows them to
//! the one recording being cleaned.
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Event types the break detector cares about. Everything else is carried
/// through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    SessStart,
    SessEnd,
    /// Legacy (PyEPL) break marker: only the break start is logged.
    RestRewet,
    BreakStart,
    BreakStop,
    Other(String),
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "SESS_START" => EventKind::SessStart,
            "SESS_END" => EventKind::SessEnd,
            "REST_REWET" => EventKind::RestRewet,
            "BREAK_START" => EventKind::BreakStart,
            "BREAK_STOP" => EventKind::BreakStop,
            _ => EventKind::Other(s),
        }
    }
}

impl From<EventKind> for String {
    fn from(k: EventKind) -> Self {
        match k {
            EventKind::SessStart => "SESS_START".into(),
            EventKind::SessEnd => "SESS_END".into(),
            EventKind::RestRewet => "REST_REWET".into(),
            EventKind::BreakStart => "BREAK_START".into(),
            EventKind::BreakStop => "BREAK_STOP".into(),
            EventKind::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Sample offset into the recording named by `eegfile`.
    pub eegoffset: usize,
    #[serde(default)]
    pub eegfile: String,
}

impl Event {
    pub fn new(kind: EventKind, eegoffset: usize) -> Self {
        Self { kind, eegoffset, eegfile: String::new() }
    }
}

pub fn load_events(path: &Path) -> Result<Vec<Event>> {
    let text = std::fs::read_to_string(path)?;
    let events: Vec<Event> = serde_json::from_str(&text)
        .with_context(|| format!("parsing events from {}", path.display()))?;
    Ok(events)
}

/// Events whose `eegfile` names `recording` (full path or file name), sorted
/// by sample offset.
pub fn events_for_recording(events: &[Event], recording: &Path) -> Vec<Event> {
    let file_name = recording.file_name().and_then(|f| f.to_str()).unwrap_or_default();
    let mut out: Vec<Event> = events
        .iter()
        .filter(|e| {
            let p = Path::new(&e.eegfile);
            p == recording || (!file_name.is_empty() && p.file_name().and_then(|f| f.to_str()) == Some(file_name))
        })
        .cloned()
        .collect();
    out.sort_by_key(|e| e.eegoffset);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_json() {
        let json = r#"[
            {"type": "SESS_START", "eegoffset": 10, "eegfile": "/d/a.safetensors"},
            {"type": "WORD", "eegoffset": 20, "eegfile": "/d/a.safetensors"},
            {"type": "BREAK_STOP", "eegoffset": 30}
        ]"#;
        let evs: Vec<Event> = serde_json::from_str(json).unwrap();
        assert_eq!(evs[0].kind, EventKind::SessStart);
        assert_eq!(evs[1].kind, EventKind::Other("WORD".into()));
        assert_eq!(evs[2].kind, EventKind::BreakStop);
        assert_eq!(evs[2].eegfile, "");
    }

    #[test]
    fn kind_round_trips_through_string() {
        let s: String = EventKind::RestRewet.into();
        assert_eq!(s, "REST_REWET");
        assert_eq!(EventKind::from(s), EventKind::RestRewet);
    }

    #[test]
    fn selects_one_recording_in_order() {
        let mk = |kind: EventKind, off: usize, f: &str| Event { kind, eegoffset: off, eegfile: f.into() };
        let evs = vec![
            mk(EventKind::SessEnd, 900, "/d/a.safetensors"),
            mk(EventKind::SessStart, 5, "/d/b.safetensors"),
            mk(EventKind::SessStart, 10, "a.safetensors"),
        ];
        let sel = events_for_recording(&evs, Path::new("/d/a.safetensors"));
        assert_eq!(sel.len(), 2);
        assert_eq!(sel[0].kind, EventKind::SessStart);
        assert_eq!(sel[1].eegoffset, 900);
    }
}
