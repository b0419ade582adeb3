//! # Standard MIDI File writer
//!
//! Builds `MThd`/`MTrk` chunks in memory. Events carry absolute ticks and
//! are written as variable-length delta times; a track always ends with a
//! single end-of-track meta event.

use std::{fs, io::Write, path::Path};

use crate::error::{Error, Result};

/// Microseconds in one minute, for BPM conversion
const MICROS_PER_MINUTE: u32 = 60_000_000;

/// Largest value a 3-byte tempo meta event can carry
const MAX_TEMPO_MICROS: u32 = 0x00FF_FFFF;

/// Largest value a variable-length quantity can carry
const MAX_VLQ: u32 = 0x0FFF_FFFF;

/// A channel or meta event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Sequence/track name meta event (FF 03)
    TrackName(String),
    /// Set-tempo meta event (FF 51)
    Tempo { micros_per_quarter: u32 },
    /// Program change channel event (Cn)
    ProgramChange { channel: u8, program: u8 },
    /// End-of-track meta event (FF 2F)
    EndOfTrack,
}

impl EventKind {
    /// Tempo event for a whole number of beats per minute
    pub fn tempo_bpm(bpm: u32) -> Result<Self> {
        if bpm == 0 {
            return Err(Error::InvalidTempo(bpm));
        }
        let micros_per_quarter = MICROS_PER_MINUTE / bpm;
        if micros_per_quarter > MAX_TEMPO_MICROS {
            return Err(Error::InvalidTempo(bpm));
        }
        Ok(EventKind::Tempo { micros_per_quarter })
    }

    /// Program change, validating the 4-bit channel and 7-bit program
    pub fn program_change(channel: u8, program: u8) -> Result<Self> {
        if channel > 15 {
            return Err(Error::InvalidChannel(channel));
        }
        if program > 127 {
            return Err(Error::InvalidProgram(program));
        }
        Ok(EventKind::ProgramChange { channel, program })
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            EventKind::TrackName(name) => {
                out.extend_from_slice(&[0xFF, 0x03]);
                write_vlq(name.len() as u32, out);
                out.extend_from_slice(name.as_bytes());
            }
            EventKind::Tempo { micros_per_quarter } => {
                out.extend_from_slice(&[0xFF, 0x51, 0x03]);
                out.extend_from_slice(&micros_per_quarter.to_be_bytes()[1..]);
            }
            EventKind::ProgramChange { channel, program } => {
                out.push(0xC0 | (channel & 0x0F));
                out.push(program & 0x7F);
            }
            EventKind::EndOfTrack => out.extend_from_slice(&[0xFF, 0x2F, 0x00]),
        }
    }
}

/// An event at an absolute tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    pub tick: u32,
    pub kind: EventKind,
}

/// One `MTrk` chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    events: Vec<TrackEvent>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event; events sharing a tick keep insertion order
    pub fn push(&mut self, tick: u32, kind: EventKind) {
        self.events.push(TrackEvent { tick, kind });
    }

    /// Events in tick order, without the trailing end-of-track
    pub fn events(&self) -> Vec<&TrackEvent> {
        let mut events: Vec<&TrackEvent> = self
            .events
            .iter()
            .filter(|e| e.kind != EventKind::EndOfTrack)
            .collect();
        events.sort_by_key(|e| e.tick);
        events
    }

    /// Serialize as a complete `MTrk` chunk
    fn encode(&self) -> Vec<u8> {
        let mut data = Vec::new();
        let mut previous = 0u32;

        for event in self.events() {
            write_vlq((event.tick - previous).min(MAX_VLQ), &mut data);
            event.kind.encode(&mut data);
            previous = event.tick;
        }

        // Terminates the track right after its last event
        write_vlq(0, &mut data);
        EventKind::EndOfTrack.encode(&mut data);

        let mut chunk = Vec::with_capacity(8 + data.len());
        chunk.extend_from_slice(b"MTrk");
        chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
        chunk.extend_from_slice(&data);
        chunk
    }
}

/// A format 0 Standard MIDI File: one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiFile {
    ticks_per_quarter: u16,
    track: Track,
}

impl MidiFile {
    /// Wrap `track`; the division is clamped to 15 bits
    pub fn new(ticks_per_quarter: u16, track: Track) -> Self {
        Self {
            ticks_per_quarter: ticks_per_quarter.clamp(1, 0x7FFF),
            track,
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Serialize header and track chunks
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"MThd");
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes()); // format 0
        bytes.extend_from_slice(&1u16.to_be_bytes()); // one track
        bytes.extend_from_slice(&self.ticks_per_quarter.to_be_bytes());
        bytes.extend_from_slice(&self.track.encode());
        bytes
    }

    /// Write the file to `path`, replacing any existing file
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = fs::File::create(path.as_ref())?;
        file.write_all(&self.to_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Append a MIDI variable-length quantity (7 bits per byte, MSB first)
fn write_vlq(value: u32, out: &mut Vec<u8>) {
    let value = value.min(MAX_VLQ);
    let mut groups = [0u8; 4];
    let mut count = 0;
    let mut remaining = value;

    loop {
        groups[count] = (remaining & 0x7F) as u8;
        count += 1;
        remaining >>= 7;
        if remaining == 0 {
            break;
        }
    }

    for i in (0..count).rev() {
        let continuation = if i > 0 { 0x80 } else { 0x00 };
        out.push(groups[i] | continuation);
    }
}
