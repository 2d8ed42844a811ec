//! Engine.IO v4 packets carrying Socket.IO v5 messages, text frames only.
//!
//! A websocket frame holds one Engine.IO packet: a type digit followed by
//! its payload. Type `4` wraps a Socket.IO packet, which has its own type
//! digit, an optional `/namespace,` prefix, an optional ack id and a JSON
//! payload: `42["data","track42.mid"]`.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};

/// Socket.IO connect request for the default namespace.
pub const CONNECT: &str = "40";
pub const DISCONNECT: &str = "41";

/// Session settings sent by the server in the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    /// Milliseconds
    pub ping_interval: u64,
    /// Milliseconds
    pub ping_timeout: u64,
}

impl Handshake {
    /// How long the server may stay silent before the session counts as
    /// lost: one ping interval plus the ping timeout.
    pub fn liveness(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    /// Namespace connect acknowledged.
    Connect,
    Disconnect,
    Event { name: String, args: Vec<Value> },
    ConnectError(String),
    /// Upgrades, no-ops, acks and binary packets.
    Ignored,
}

pub fn decode(text: &str) -> Result<Frame> {
    let (kind, rest) = split_type(text)?;
    match kind {
        '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping(rest.to_string())),
        '3' => Ok(Frame::Pong(rest.to_string())),
        '4' => decode_message(rest),
        '5' | '6' => Ok(Frame::Ignored),
        other => Err(Error::Protocol(format!(
            "unknown Engine.IO packet type {:?}",
            other
        ))),
    }
}

fn decode_message(body: &str) -> Result<Frame> {
    let (kind, rest) = split_type(body)?;
    let rest = strip_namespace(rest);
    match kind {
        '0' => Ok(Frame::Connect),
        '1' => Ok(Frame::Disconnect),
        '2' => {
            let payload = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut args: Vec<Value> = serde_json::from_str(payload)?;
            if args.is_empty() {
                return Err(Error::Protocol("event without a name".to_string()));
            }
            match args.remove(0) {
                Value::String(name) => Ok(Frame::Event { name, args }),
                other => Err(Error::Protocol(format!("event name is not a string: {}", other))),
            }
        }
        '4' => Ok(Frame::ConnectError(connect_error_message(rest))),
        '3' | '5' | '6' => Ok(Frame::Ignored),
        other => Err(Error::Protocol(format!(
            "unknown Socket.IO packet type {:?}",
            other
        ))),
    }
}

fn split_type(text: &str) -> Result<(char, &str)> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty packet".to_string()))?;
    Ok((kind, chars.as_str()))
}

fn strip_namespace(rest: &str) -> &str {
    if !rest.starts_with('/') {
        return rest;
    }
    match rest.find(',') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    }
}

fn connect_error_message(payload: &str) -> String {
    serde_json::from_str::<Value>(payload)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| payload.to_string())
}

pub fn pong(payload: &str) -> String {
    format!("3{}", payload)
}

/// `42["<name>","<data>"]`
pub fn encode_event(name: &str, data: &str) -> Result<String> {
    Ok(format!("42{}", serde_json::to_string(&(name, data))?))
}
