pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod loader;
pub mod remote;
pub mod timing;
pub mod ui;

pub use config::Config;
pub use engine::{EngineCommand, EngineHandle, EngineUpdate, spawn_engine, spawn_engine_with};
pub use error::{Error, Result};
pub use loader::{LoadSequencer, LoadTicket, LoadedTrack};
pub use remote::{BridgeCommand, BridgeHandle, BridgeUpdate, spawn_bridge};
pub use ui::ComposerApp;
