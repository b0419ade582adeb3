//! Error types for MIDI encoding

/// Result type alias for MIDI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or writing a MIDI file
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Writing the output file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// MIDI channels are numbered 0 to 15
    #[error("Invalid MIDI channel: {0} (must be 0-15)")]
    InvalidChannel(u8),

    /// Program numbers are 7-bit
    #[error("Invalid MIDI program: {0} (must be 0-127)")]
    InvalidProgram(u8),

    /// A setlist position maps past the last program
    #[error("Song {position} would need program {program} (must be 0-127)")]
    ProgramOutOfRange { position: usize, program: u32 },

    /// Tempo must give a 24-bit microseconds-per-quarter value
    #[error("Invalid tempo: {0} BPM")]
    InvalidTempo(u32),

    /// Configuration error (from pcoconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}
