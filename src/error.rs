use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file: {0} (expected a .mid file)")]
    UnsupportedFile(String),

    #[error("Failed to parse MIDI data: {0}")]
    Midi(#[from] midly::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel error: {0}")]
    Channel(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Channel closed by server")]
    ChannelClosed,

    #[error("Socket.IO protocol error: {0}")]
    Protocol(String),

    #[error("Malformed channel frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to read config: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("No audio output device")]
    NoOutputDevice,

    #[error("Audio output config: {0}")]
    AudioConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}
