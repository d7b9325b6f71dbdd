// Writing decoded events to disk.
//
// MIDI output is a single-track Standard MIDI File (format 0): a tempo meta
// event, a program change, then note-on/note-off pairs. Rests emit nothing
// and simply push the next note's delta time later. Durations are quarter
// lengths, so one quarter = `TICKS_PER_QUARTER` ticks regardless of the
// step size the melody was encoded with.
//
// JSON output writes the event list as-is, for tooling that wants the
// decoded melody without a MIDI parser.
//
// Uses the `midly` crate for SMF encoding.

use crate::decoder::{Event, EventKind};
use crate::error::{MelodiaError, Result};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

const CHANNEL: u8 = 0;
const VELOCITY: u8 = 80;
/// Acoustic grand piano.
const PROGRAM: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Midi,
    Json,
}

impl OutputFormat {
    /// Guess from a file extension; `.json` is JSON, everything else MIDI.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Midi,
        }
    }
}

/// Serialize `events` in `format` to `path`.
///
/// `step_duration` is recorded in JSON output so the file describes the grid
/// it came from; MIDI timing depends only on the event durations.
pub fn write_events(
    events: &[Event],
    step_duration: f64,
    tempo_bpm: u16,
    format: OutputFormat,
    path: &Path,
) -> Result<()> {
    let bytes = match format {
        OutputFormat::Midi => {
            let smf = events_to_smf(events, tempo_bpm)?;
            let mut buf = Vec::new();
            smf.write_std(&mut buf)?;
            buf
        }
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "step_duration": step_duration,
                "tempo_bpm": tempo_bpm,
                "events": events,
            });
            serde_json::to_vec_pretty(&doc)?
        }
    };
    std::fs::write(path, bytes)?;
    tracing::info!("wrote {} events to {}", events.len(), path.display());
    Ok(())
}

fn quarter_lengths_to_ticks(duration: f64) -> u32 {
    (duration * TICKS_PER_QUARTER as f64).round().max(0.0) as u32
}

fn delta(ticks: u32) -> Result<u28> {
    u28::try_from(ticks).ok_or_else(|| MelodiaError::Midi(format!("delta of {ticks} ticks is too long")))
}

/// Build an in-memory single-track SMF.
pub fn events_to_smf(events: &[Event], tempo_bpm: u16) -> Result<Smf<'static>> {
    if tempo_bpm == 0 {
        return Err(MelodiaError::Midi("tempo must be positive".into()));
    }
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let channel = u4::new(CHANNEL);
    let mut track: Track<'static> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(60_000_000 / tempo_bpm as u32))),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange { program: u7::new(PROGRAM) },
        },
    });

    // Ticks of silence accumulated since the last emitted event.
    let mut pending_rest: u32 = 0;
    for event in events {
        let ticks = quarter_lengths_to_ticks(event.duration);
        match event.kind {
            EventKind::Rest => pending_rest += ticks,
            EventKind::Pitch(pitch) => {
                let key = u7::try_from(pitch)
                    .ok_or_else(|| MelodiaError::Midi(format!("pitch {pitch} out of range")))?;
                track.push(TrackEvent {
                    delta: delta(pending_rest)?,
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOn { key, vel: u7::new(VELOCITY) },
                    },
                });
                track.push(TrackEvent {
                    delta: delta(ticks)?,
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOff { key, vel: u7::new(0) },
                    },
                });
                pending_rest = 0;
            }
        }
    }

    track.push(TrackEvent {
        delta: delta(pending_rest)?,
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    Ok(smf)
}
