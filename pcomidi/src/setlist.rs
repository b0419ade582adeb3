//! Setlist to MIDI encoding
//!
//! Each song in a resolved setlist becomes one program change: song `i`
//! (zero-based, service order) is written at tick `i` with program
//! `program_offset + i`. A keyboard rig listening on the configured channel
//! can then step through patches in the order the songs are played.

use pcoservices::ResolvedSong;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::smf::{EventKind, MidiFile, Track};

/// Default sequence name
pub const DEFAULT_TRACK_NAME: &str = "Service Setlist";

/// Default tempo in beats per minute
pub const DEFAULT_TEMPO_BPM: u32 = 120;

/// Default division (ticks per quarter note)
pub const DEFAULT_TICKS_PER_QUARTER: u16 = 960;

/// Default MIDI channel (channel 1 on most devices)
pub const DEFAULT_CHANNEL: u8 = 0;

/// Default program of the first song
pub const DEFAULT_PROGRAM_OFFSET: u8 = 0;

/// Encoder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetlistEncoder {
    track_name: String,
    channel: u8,
    program_offset: u8,
    tempo_bpm: u32,
    ticks_per_quarter: u16,
}

impl Default for SetlistEncoder {
    fn default() -> Self {
        Self {
            track_name: DEFAULT_TRACK_NAME.to_string(),
            channel: DEFAULT_CHANNEL,
            program_offset: DEFAULT_PROGRAM_OFFSET,
            tempo_bpm: DEFAULT_TEMPO_BPM,
            ticks_per_quarter: DEFAULT_TICKS_PER_QUARTER,
        }
    }
}

impl SetlistEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_name(mut self, name: impl Into<String>) -> Self {
        self.track_name = name.into();
        self
    }

    /// Zero-based MIDI channel (0-15)
    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Program assigned to the first song
    pub fn program_offset(mut self, offset: u8) -> Self {
        self.program_offset = offset;
        self
    }

    pub fn tempo_bpm(mut self, bpm: u32) -> Self {
        self.tempo_bpm = bpm;
        self
    }

    pub fn ticks_per_quarter(mut self, ticks: u16) -> Self {
        self.ticks_per_quarter = ticks;
        self
    }

    /// Build a single-track MIDI file for `songs`
    ///
    /// The track opens with the name and tempo meta events at tick 0. An
    /// empty setlist yields a valid file holding only those events.
    ///
    /// # Errors
    ///
    /// Fails without producing anything if the channel is invalid, the
    /// tempo does not fit a set-tempo event, or the setlist would push a
    /// program number past 127.
    pub fn encode(&self, songs: &[ResolvedSong]) -> Result<MidiFile> {
        if self.channel > 15 {
            return Err(Error::InvalidChannel(self.channel));
        }
        let tempo = EventKind::tempo_bpm(self.tempo_bpm)?;

        let mut track = Track::new();
        track.push(0, EventKind::TrackName(self.track_name.clone()));
        track.push(0, tempo);

        for (position, song) in songs.iter().enumerate() {
            let program = u32::from(self.program_offset) + position as u32;
            let program = u8::try_from(program)
                .ok()
                .filter(|p| *p <= 127)
                .ok_or(Error::ProgramOutOfRange { position, program })?;

            debug!("🎹 {} -> program {}", song.title, program);
            track.push(
                position as u32,
                EventKind::program_change(self.channel, program)?,
            );
        }

        let file = MidiFile::new(self.ticks_per_quarter, track);

        info!(
            "✅ Encoded {} song(s) on channel {}",
            songs.len(),
            self.channel + 1
        );
        Ok(file)
    }
}
