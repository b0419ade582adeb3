//! MIDI output settings on top of pcoconfig

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use pcoconfig::Config;
use serde_yaml::Value;

use crate::setlist::{
    DEFAULT_CHANNEL, DEFAULT_PROGRAM_OFFSET, DEFAULT_TEMPO_BPM, DEFAULT_TRACK_NAME,
    SetlistEncoder,
};

/// Default output directory, relative to the configuration directory
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default output file name
pub const DEFAULT_OUTPUT_FILE: &str = "weekly_setlist_with_meta.mid";

/// Extension trait for the `midi` configuration section
pub trait MidiConfigExt {
    fn get_midi_track_name(&self) -> Result<String>;

    /// Zero-based channel
    fn get_midi_channel(&self) -> Result<u8>;

    fn set_midi_channel(&self, channel: u8) -> Result<()>;

    fn get_midi_program_offset(&self) -> Result<u8>;

    fn get_midi_tempo_bpm(&self) -> Result<u32>;

    /// Full path of the file to write; the directory is created if needed
    fn get_midi_output_path(&self) -> Result<PathBuf>;
}

fn small_integer(config: &Config, key: &str, max: u64, default: u64) -> Result<u64> {
    match config.get_value(&["midi", key]) {
        Ok(Value::Number(n)) => n
            .as_u64()
            .filter(|v| *v <= max)
            .ok_or_else(|| anyhow!("midi.{} must be an integer between 0 and {}", key, max)),
        _ => Ok(default),
    }
}

impl MidiConfigExt for Config {
    fn get_midi_track_name(&self) -> Result<String> {
        match self.get_value(&["midi", "track_name"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s),
            _ => Ok(DEFAULT_TRACK_NAME.to_string()),
        }
    }

    fn get_midi_channel(&self) -> Result<u8> {
        Ok(small_integer(self, "channel", 15, u64::from(DEFAULT_CHANNEL))? as u8)
    }

    fn set_midi_channel(&self, channel: u8) -> Result<()> {
        if channel > 15 {
            return Err(anyhow!("MIDI channel {} is out of range (0-15)", channel));
        }
        self.set_value(&["midi", "channel"], Value::Number(u64::from(channel).into()))
    }

    fn get_midi_program_offset(&self) -> Result<u8> {
        Ok(small_integer(
            self,
            "program_offset",
            127,
            u64::from(DEFAULT_PROGRAM_OFFSET),
        )? as u8)
    }

    fn get_midi_tempo_bpm(&self) -> Result<u32> {
        Ok(small_integer(self, "tempo_bpm", 1000, u64::from(DEFAULT_TEMPO_BPM))? as u32)
    }

    fn get_midi_output_path(&self) -> Result<PathBuf> {
        let dir = self.get_managed_dir(&["midi", "output_dir"], DEFAULT_OUTPUT_DIR)?;
        let file = match self.get_value(&["midi", "output_file"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => DEFAULT_OUTPUT_FILE.to_string(),
        };
        Ok(dir.join(file))
    }
}

impl SetlistEncoder {
    /// Build an encoder from the `midi` configuration section
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        Ok(SetlistEncoder::new()
            .track_name(config.get_midi_track_name()?)
            .channel(config.get_midi_channel()?)
            .program_offset(config.get_midi_program_offset()?)
            .tempo_bpm(config.get_midi_tempo_bpm()?))
    }
}
