use crossbeam::channel::{Receiver, Sender};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use super::{ChannelConnection, FileFetcher, HttpFileFetcher, ServerEvent};
use crate::config::Config;
use crate::engine::EngineCommand;
use crate::loader::{LoadSequencer, LoadTicket, LoadedTrack};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    Generate,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeUpdate {
    Connected,
    Disconnected,
    ServerLog(String),
    Downloading(String),
    Downloaded(String),
    Error(String),
}

pub struct BridgeHandle {
    pub command_tx: mpsc::UnboundedSender<BridgeCommand>,
    pub update_rx: Receiver<BridgeUpdate>,
}

/// Routes backend events: filenames become downloads handed to the engine,
/// log lines go to the log sink.
pub struct RemoteBridge<F> {
    fetcher: Arc<F>,
    loads: LoadSequencer,
    engine_tx: Sender<EngineCommand>,
    update_tx: Sender<BridgeUpdate>,
    downloads: JoinSet<()>,
}

impl<F: FileFetcher + 'static> RemoteBridge<F> {
    pub fn new(
        fetcher: F,
        loads: LoadSequencer,
        engine_tx: Sender<EngineCommand>,
        update_tx: Sender<BridgeUpdate>,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            loads,
            engine_tx,
            update_tx,
            downloads: JoinSet::new(),
        }
    }

    /// Must be called from within a `tokio` runtime: a filename starts its
    /// download as a task on that runtime.
    pub fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Log(message) => {
                info!(target: "composer::server", "{}", message);
                let _ = self.update_tx.send(BridgeUpdate::ServerLog(message));
            }
            ServerEvent::Filename(file_name) => {
                info!("Filename received: {}", file_name);
                let ticket = self.loads.issue();
                let _ = self
                    .update_tx
                    .send(BridgeUpdate::Downloading(file_name.clone()));
                self.downloads.spawn(download(
                    self.fetcher.clone(),
                    file_name,
                    ticket,
                    self.engine_tx.clone(),
                    self.update_tx.clone(),
                ));
            }
        }
    }

    /// Waits for every download started so far.
    pub async fn finish_downloads(&mut self) {
        while let Some(result) = self.downloads.join_next().await {
            report_download_task(result);
        }
    }

    /// Serves the connection until the server hangs up or a
    /// [`BridgeCommand::Shutdown`] arrives. Downloads still running when the
    /// server hangs up are completed; a shutdown cancels them.
    pub async fn run(
        &mut self,
        mut connection: ChannelConnection,
        mut commands: mpsc::UnboundedReceiver<BridgeCommand>,
    ) {
        let mut shutdown = false;
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(BridgeCommand::Generate) => {
                        info!("Sending generate music request");
                        if let Err(e) = connection.send_generate().await {
                            error!("Failed to send generate request: {}", e);
                            let _ = self.update_tx.send(BridgeUpdate::Error(format!(
                                "Failed to send generate request: {}",
                                e
                            )));
                        }
                    }
                    Some(BridgeCommand::Shutdown) | None => {
                        shutdown = true;
                        break;
                    }
                },
                event = connection.next_event() => match event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) if connection.is_connected() => {
                        warn!("Ignoring channel packet: {}", e);
                    }
                    Some(Err(e)) => {
                        error!("Channel error: {}", e);
                        let _ = self.update_tx.send(BridgeUpdate::Error(e.to_string()));
                        break;
                    }
                    None => {
                        warn!("Channel closed by {}", connection.url());
                        break;
                    }
                },
                Some(result) = self.downloads.join_next(), if !self.downloads.is_empty() => {
                    report_download_task(result);
                }
            }
        }

        if shutdown {
            self.downloads.abort_all();
        }
        self.finish_downloads().await;

        if let Err(e) = connection.disconnect().await {
            warn!("Failed to close channel cleanly: {}", e);
        }
        let _ = self.update_tx.send(BridgeUpdate::Disconnected);
    }
}

async fn download<F: FileFetcher>(
    fetcher: Arc<F>,
    file_name: String,
    ticket: LoadTicket,
    engine_tx: Sender<EngineCommand>,
    update_tx: Sender<BridgeUpdate>,
) {
    match fetcher.fetch(&file_name).await {
        Ok(bytes) => {
            info!("File received: {} ({} bytes)", file_name, bytes.len());
            let _ = update_tx.send(BridgeUpdate::Downloaded(file_name.clone()));
            let track = LoadedTrack::from_remote(file_name, bytes);
            let _ = engine_tx.send(EngineCommand::LoadTrack { track, ticket });
        }
        Err(e) => {
            error!("Error downloading {}: {}", file_name, e);
            let _ = update_tx.send(BridgeUpdate::Error(format!(
                "Error downloading {}: {}",
                file_name, e
            )));
        }
    }
}

fn report_download_task(result: std::result::Result<(), JoinError>) {
    if let Err(e) = result {
        if !e.is_cancelled() {
            error!("Download task failed: {}", e);
        }
    }
}

/// Starts the bridge on its own thread with a `tokio` runtime.
pub fn spawn_bridge(
    config: Config,
    loads: LoadSequencer,
    engine_tx: Sender<EngineCommand>,
) -> BridgeHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = crossbeam::channel::unbounded();

    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Failed to build bridge runtime: {}", e);
                let _ = update_tx.send(BridgeUpdate::Error(e.to_string()));
                return;
            }
        };

        runtime.block_on(async move {
            let setup = config
                .channel_url()
                .and_then(|url| Ok((url, HttpFileFetcher::from_config(&config)?)));
            let (url, fetcher) = match setup {
                Ok(setup) => setup,
                Err(e) => {
                    error!("{}", e);
                    let _ = update_tx.send(BridgeUpdate::Error(e.to_string()));
                    return;
                }
            };

            let connection = match ChannelConnection::connect(&url).await {
                Ok(connection) => connection,
                Err(e) => {
                    error!("Failed to connect to {}: {}", url, e);
                    let _ = update_tx.send(BridgeUpdate::Error(format!(
                        "Failed to connect to {}: {}",
                        url, e
                    )));
                    let _ = update_tx.send(BridgeUpdate::Disconnected);
                    return;
                }
            };
            let _ = update_tx.send(BridgeUpdate::Connected);

            let mut bridge = RemoteBridge::new(fetcher, loads, engine_tx, update_tx);
            bridge.run(connection, command_rx).await;
        });
    });

    BridgeHandle {
        command_tx,
        update_rx,
    }
}
