mod bridge;
mod channel;
mod fetch;
pub mod packet;

pub use bridge::{BridgeCommand, BridgeHandle, BridgeUpdate, RemoteBridge, spawn_bridge};
pub use channel::{
    ChannelConnection, ClientEvent, DATA_EVENT, GENERATE_COMMAND, LOGS_EVENT, ServerEvent,
};
pub use fetch::{FileFetcher, FileRequest, HttpFileFetcher};
