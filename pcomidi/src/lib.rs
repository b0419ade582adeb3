//! # pcomidi
//!
//! Turns a resolved service setlist into a Standard MIDI File carrying one
//! program change per song, so a keyboard or lighting rig can follow the
//! order of service.
//!
//! ```no_run
//! use pcomidi::SetlistEncoder;
//! use pcoservices::ResolvedSong;
//!
//! let songs = vec![
//!     ResolvedSong::titled("Great Are You Lord"),
//!     ResolvedSong::titled("Oceans"),
//! ];
//!
//! let file = SetlistEncoder::new().channel(0).encode(&songs)?;
//! file.write_to("setlist.mid")?;
//! # Ok::<(), pcomidi::Error>(())
//! ```

pub mod error;
pub mod setlist;
pub mod smf;

#[cfg(feature = "pcoconfig")]
pub mod config_ext;

pub use error::{Error, Result};
pub use setlist::SetlistEncoder;
pub use smf::{EventKind, MidiFile, Track, TrackEvent};

#[cfg(feature = "pcoconfig")]
pub use config_ext::MidiConfigExt;
