use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

pub const MIDI_MIME: &str = "audio/midi";
pub const MIDI_EXTENSIONS: &[&str] = &["mid", "midi"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOrigin {
    Local(PathBuf),
    Remote,
}

impl fmt::Display for TrackOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackOrigin::Local(path) => write!(f, "{}", path.display()),
            TrackOrigin::Remote => write!(f, "backend"),
        }
    }
}

/// The file currently selected for playback.
#[derive(Debug, Clone)]
pub struct LoadedTrack {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub origin: TrackOrigin,
}

impl LoadedTrack {
    pub fn from_path(path: &Path) -> Result<Self> {
        let is_midi = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                MIDI_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if !is_midi {
            return Err(Error::UnsupportedFile(path.display().to_string()));
        }

        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            bytes,
            mime: MIDI_MIME,
            origin: TrackOrigin::Local(path.to_path_buf()),
        })
    }

    /// Wraps a blob downloaded from the backend.
    pub fn from_remote(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: file_name.into(),
            bytes,
            mime: MIDI_MIME,
            origin: TrackOrigin::Remote,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

/// Issues monotonically increasing load tickets. Only the latest ticket is
/// current, so a download that resolves after a newer load began can be
/// recognised and dropped.
#[derive(Debug, Clone, Default)]
pub struct LoadSequencer {
    latest: Arc<AtomicU64>,
}

impl LoadSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> LoadTicket {
        LoadTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}
