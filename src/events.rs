/// Events emitted by the [`Player`](crate::timing::Player) while it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    NoteOn {
        pitch: u8,
        velocity: u8,
        /// Seconds, when the file pairs the note with a note-off
        duration: Option<f64>,
    },
    /// Fired for every file event the player passes, in song seconds.
    TimingTick { total: f64, remaining: f64 },
    EndOfSequence,
}
