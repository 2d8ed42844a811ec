mod player;
mod progress;
mod sequence;
mod state_machine;

pub use player::Player;
pub use progress::{Progress, format_time, percent};
pub use sequence::{Song, SongEvent, SongEventKind};
pub use state_machine::{
    DEFAULT_NOTE_DURATION, PlaybackSnapshot, TransportController, TransportState,
};

#[cfg(test)]
pub(crate) mod test_support {
    /// Builds a Standard MIDI File from raw track chunk bodies.
    pub fn smf_bytes(format: u16, division: u16, tracks: &[&[u8]]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"MThd");
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&format.to_be_bytes());
        bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&division.to_be_bytes());
        for track in tracks {
            bytes.extend_from_slice(b"MTrk");
            bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
            bytes.extend_from_slice(track);
        }
        bytes
    }

    /// 480 ticks per quarter. Starts at 120 BPM and drops to 60 BPM at one
    /// second. Notes: C4 0.0s-0.5s, E4 0.5s-2.0s, G4 at 2.0s with no
    /// note-off. Lasts two seconds.
    pub fn tempo_change_song() -> Vec<u8> {
        let conductor: &[u8] = &[
            0x00, 0xFF, 0x03, 0x04, b'L', b'e', b'a', b'd',
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20,
            0x87, 0x40, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40,
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let notes: &[u8] = &[
            0x00, 0x90, 0x3C, 0x64,
            0x83, 0x60, 0x80, 0x3C, 0x00,
            0x00, 0x90, 0x40, 0x64,
            0x87, 0x40, 0x90, 0x40, 0x00,
            0x00, 0x90, 0x43, 0x50,
            0x00, 0xFF, 0x2F, 0x00,
        ];
        smf_bytes(1, 480, &[conductor, notes])
    }
}
