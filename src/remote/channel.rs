use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};
use tracing::{debug, info, warn};
use url::Url;

use super::packet::{self, Frame, Handshake};
use crate::error::{Error, Result};

pub const GENERATE_COMMAND: &str = "generate music";
pub const DATA_EVENT: &str = "data";
pub const LOGS_EVENT: &str = "logs";

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Events pushed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Name of a freshly generated file, ready for download.
    Filename(String),
    Log(String),
}

impl ServerEvent {
    /// Maps a Socket.IO event to its variant. Only the first argument is
    /// kept; a non-string argument is kept as its JSON text.
    pub fn from_socket_event(name: &str, args: Vec<Value>) -> Result<Self> {
        let data = match args.into_iter().next() {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        match name {
            DATA_EVENT => Ok(ServerEvent::Filename(data)),
            LOGS_EVENT => Ok(ServerEvent::Log(data)),
            other => Err(Error::Protocol(format!("unexpected event {:?}", other))),
        }
    }
}

/// Events sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Request(String),
}

impl ClientEvent {
    pub fn generate() -> Self {
        ClientEvent::Request(GENERATE_COMMAND.to_string())
    }

    pub fn encode(&self) -> Result<String> {
        match self {
            ClientEvent::Request(text) => packet::encode_event(DATA_EVENT, text),
        }
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A single Socket.IO session with the backend, on the default namespace.
pub struct ChannelConnection {
    url: Url,
    socket: Option<Socket>,
    session: Handshake,
}

impl ChannelConnection {
    /// Opens the websocket and completes the Engine.IO open and Socket.IO
    /// connect exchange.
    pub async fn connect(url: &Url) -> Result<Self> {
        let (mut socket, _) = connect_async(url.as_str()).await?;
        let session = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&mut socket))
            .await
            .map_err(|_| Error::Protocol("handshake timed out".to_string()))??;
        info!("Connected to {} (session {})", url, session.sid);
        Ok(Self {
            url: url.clone(),
            socket: Some(socket),
            session,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    pub async fn send(&mut self, event: &ClientEvent) -> Result<()> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(Error::ChannelClosed);
        };
        socket.send(Message::Text(event.encode()?)).await?;
        Ok(())
    }

    pub async fn send_generate(&mut self) -> Result<()> {
        self.send(&ClientEvent::generate()).await
    }

    /// Waits for the next backend event, answering pings on the way.
    /// `None` once the session is closed. Transport errors and a server
    /// that stops pinging also close it; a malformed packet is returned as
    /// an error without closing.
    pub async fn next_event(&mut self) -> Option<Result<ServerEvent>> {
        let liveness = self.session.liveness();
        loop {
            let socket = self.socket.as_mut()?;
            let message = match tokio::time::timeout(liveness, socket.next()).await {
                Ok(message) => message,
                Err(_) => {
                    self.socket = None;
                    return Some(Err(Error::Protocol(format!(
                        "no ping from server for {:?}",
                        liveness
                    ))));
                }
            };

            match message {
                Some(Ok(Message::Text(text))) => match packet::decode(&text) {
                    Ok(Frame::Event { name, args }) => {
                        return Some(ServerEvent::from_socket_event(&name, args));
                    }
                    Ok(Frame::Ping(payload)) => {
                        if let Err(e) = socket.send(Message::Text(packet::pong(&payload))).await {
                            self.socket = None;
                            return Some(Err(e.into()));
                        }
                    }
                    Ok(Frame::Close) | Ok(Frame::Disconnect) => {
                        debug!("Server ended the session");
                        self.socket = None;
                        return None;
                    }
                    Ok(other) => debug!("Skipping packet {:?}", other),
                    Err(e) => return Some(Err(e)),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("Server closed channel: {:?}", frame);
                    self.socket = None;
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.socket = None;
                    return Some(Err(e.into()));
                }
                None => {
                    self.socket = None;
                    return None;
                }
            }
        }
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.send(Message::Text(packet::DISCONNECT.to_string())).await {
                warn!("Failed to leave namespace: {}", e);
            }
            socket.close(None).await?;
            info!("Disconnected from {}", self.url);
        }
        Ok(())
    }
}

async fn read_frame(socket: &mut Socket) -> Result<Frame> {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => return packet::decode(&text),
            Some(Ok(Message::Close(_))) | None => return Err(Error::ChannelClosed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

async fn handshake(socket: &mut Socket) -> Result<Handshake> {
    let session = match read_frame(socket).await? {
        Frame::Open(session) => session,
        other => {
            return Err(Error::Protocol(format!(
                "expected open packet, got {:?}",
                other
            )));
        }
    };

    socket.send(Message::Text(packet::CONNECT.to_string())).await?;
    loop {
        match read_frame(socket).await? {
            Frame::Connect => return Ok(session),
            Frame::Ping(payload) => socket.send(Message::Text(packet::pong(&payload))).await?,
            Frame::ConnectError(message) => {
                return Err(Error::Protocol(format!("connection refused: {}", message)));
            }
            Frame::Close | Frame::Disconnect => return Err(Error::ChannelClosed),
            other => debug!("Skipping packet during handshake {:?}", other),
        }
    }
}
