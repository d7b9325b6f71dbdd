// Symbol sequence -> timed events.
//
// Scans left to right keeping the currently open symbol and how many steps
// it has lasted. A hold extends the open event by one step; any other symbol
// closes it (duration = step_duration * run length) and opens the next.
// Whatever is still open at the end is closed with its full run, so a
// trailing run of holds still counts.
//
// Malformed input never panics:
// - holds with nothing open (leading holds, an all-hold melody) are dropped;
// - a delimiter closes the open event and opens nothing, so holds after it
//   are dropped until the next pitch or rest.

use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "pitch")]
pub enum EventKind {
    Pitch(u8),
    Rest,
}

/// A timed note or rest, durations in quarter lengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub kind: EventKind,
    pub duration: f64,
}

impl Event {
    pub fn pitch(pitch: u8, duration: f64) -> Self {
        Event { kind: EventKind::Pitch(pitch), duration }
    }

    pub fn rest(duration: f64) -> Self {
        Event { kind: EventKind::Rest, duration }
    }
}

fn opened_kind(symbol: Symbol) -> Option<EventKind> {
    match symbol {
        Symbol::Pitch(p) => Some(EventKind::Pitch(p)),
        Symbol::Rest => Some(EventKind::Rest),
        Symbol::Hold | Symbol::Delimiter => None,
    }
}

pub fn decode(melody: &[Symbol], step_duration: f64) -> Vec<Event> {
    let mut events = Vec::new();
    let mut pending: Option<EventKind> = None;
    let mut run_length: usize = 1;

    for &symbol in melody {
        if symbol.is_hold() {
            if pending.is_some() {
                run_length += 1;
            }
            continue;
        }
        if let Some(kind) = pending.take() {
            events.push(Event { kind, duration: step_duration * run_length as f64 });
        }
        run_length = 1;
        pending = opened_kind(symbol);
    }
    if let Some(kind) = pending {
        events.push(Event { kind, duration: step_duration * run_length as f64 });
    }
    events
}
