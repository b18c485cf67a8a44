//! Socket.IO v4 over Engine.IO v4 framing, and the events the parking
//! backend pushes.
//!
//! Only the text subset the backend uses is supported: the default
//! namespace, JSON events, no binary attachments.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{RealtimeError, Result};

/// Client → server: subscribe to an area's room.
pub const JOIN_AREA: &str = "join-area";
/// Client → server: leave an area's room.
pub const LEAVE_AREA: &str = "leave-area";
/// Client → server: reprocess an area now.
pub const REFRESH_DATA: &str = "refresh-data";

/// Server → client: new data was processed for an area.
pub const DATA_UPDATED: &str = "data-updated";
/// Server → client: processing an area failed.
pub const DATA_UPDATE_ERROR: &str = "data-update-error";
/// Server → client: outcome of a `refresh-data` request.
pub const REFRESH_COMPLETE: &str = "refresh-complete";

/// One decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake (`0{...}`).
    Open(Value),
    /// Engine.IO close.
    Close,
    /// Engine.IO heartbeat from the server; must be answered with a pong.
    Ping(String),
    Pong(String),
    /// Socket.IO namespace connect acknowledgement (`40`).
    Connect(Value),
    /// Socket.IO namespace connect refusal (`44`).
    ConnectError(Value),
    /// Socket.IO namespace disconnect (`41`).
    Disconnect,
    /// Socket.IO event (`42[...]`).
    Event { name: String, data: Value },
    /// Anything the client does not act on (acks, noops, upgrades).
    Ignored,
}

/// Decode one WebSocket text frame.
pub fn decode(frame: &str) -> Result<Packet> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| RealtimeError::Protocol("empty frame".to_string()))?;
    let rest = chars.as_str();
    match kind {
        '0' => Ok(Packet::Open(parse_optional(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping(rest.to_string())),
        '3' => Ok(Packet::Pong(rest.to_string())),
        '4' => decode_socket(rest),
        '5' | '6' => Ok(Packet::Ignored),
        other => Err(RealtimeError::Protocol(format!(
            "unknown Engine.IO packet type {:?}",
            other
        ))),
    }
}

fn decode_socket(packet: &str) -> Result<Packet> {
    let mut chars = packet.chars();
    let kind = chars
        .next()
        .ok_or_else(|| RealtimeError::Protocol("empty Socket.IO packet".to_string()))?;
    let mut rest = chars.as_str();

    // Optional "/namespace," prefix.
    if rest.starts_with('/') {
        rest = rest.split_once(',').map(|(_, tail)| tail).unwrap_or("");
    }
    // Optional ack id.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        '0' => Ok(Packet::Connect(parse_optional(rest)?)),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(rest),
        '3' => Ok(Packet::Ignored),
        '4' => Ok(Packet::ConnectError(parse_optional(rest)?)),
        '5' | '6' => Err(RealtimeError::Protocol(
            "binary Socket.IO packets are not supported".to_string(),
        )),
        other => Err(RealtimeError::Protocol(format!(
            "unknown Socket.IO packet type {:?}",
            other
        ))),
    }
}

fn decode_event(payload: &str) -> Result<Packet> {
    let args: Vec<Value> = serde_json::from_str(payload)?;
    let mut args = args.into_iter();
    let name = match args.next() {
        Some(Value::String(name)) => name,
        _ => {
            return Err(RealtimeError::Protocol(format!(
                "event without a name: {}",
                payload
            )))
        }
    };
    let mut rest: Vec<Value> = args.collect();
    let data = match rest.len() {
        0 => Value::Null,
        1 => rest.remove(0),
        _ => Value::Array(rest),
    };
    Ok(Packet::Event { name, data })
}

fn parse_optional(payload: &str) -> Result<Value> {
    if payload.trim().is_empty() {
        Ok(Value::Null)
    } else {
        Ok(serde_json::from_str(payload)?)
    }
}

/// `40`: connect to the default namespace.
pub fn encode_connect() -> String {
    "40".to_string()
}

/// `41`: leave the default namespace.
pub fn encode_disconnect() -> String {
    "41".to_string()
}

pub fn encode_pong(payload: &str) -> String {
    format!("3{}", payload)
}

/// `42["name",data]`.
pub fn encode_event(name: &str, data: &Value) -> Result<String> {
    Ok(format!("42{}", serde_json::to_string(&json!([name, data]))?))
}

/// WebSocket endpoint of a Socket.IO server given its base URL.
pub fn socket_url(base: &str) -> Result<String> {
    let trimmed = base.trim().trim_end_matches('/');
    let (scheme, host) = [
        ("http://", "ws://"),
        ("https://", "wss://"),
        ("ws://", "ws://"),
        ("wss://", "wss://"),
    ]
    .iter()
    .find_map(|(prefix, scheme)| trimmed.strip_prefix(prefix).map(|host| (*scheme, host)))
    .ok_or_else(|| {
        RealtimeError::Config(format!(
            "realtime URL must be http(s) or ws(s): {:?}",
            base
        ))
    })?;
    if host.is_empty() {
        return Err(RealtimeError::Config(format!(
            "realtime URL has no host: {:?}",
            base
        )));
    }
    let host = host.trim_end_matches("/socket.io");
    Ok(format!("{}{}/socket.io/?EIO=4&transport=websocket", scheme, host))
}

/// `data-updated` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUpdated {
    pub area_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `data-update-error` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUpdateError {
    pub area_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `refresh-complete` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshComplete {
    pub area_id: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Event pushed by the server. Unknown names, and known names whose payload
/// does not fit, are kept as raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    DataUpdated(DataUpdated),
    DataUpdateError(DataUpdateError),
    RefreshComplete(RefreshComplete),
    Other { name: String, data: Value },
}

impl ServerEvent {
    pub fn parse(name: &str, data: Value) -> Self {
        let typed = match name {
            DATA_UPDATED => serde_json::from_value(data.clone())
                .ok()
                .map(ServerEvent::DataUpdated),
            DATA_UPDATE_ERROR => serde_json::from_value(data.clone())
                .ok()
                .map(ServerEvent::DataUpdateError),
            REFRESH_COMPLETE => serde_json::from_value(data.clone())
                .ok()
                .map(ServerEvent::RefreshComplete),
            _ => None,
        };
        typed.unwrap_or_else(|| ServerEvent::Other {
            name: name.to_string(),
            data,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            ServerEvent::DataUpdated(_) => DATA_UPDATED,
            ServerEvent::DataUpdateError(_) => DATA_UPDATE_ERROR,
            ServerEvent::RefreshComplete(_) => REFRESH_COMPLETE,
            ServerEvent::Other { name, .. } => name,
        }
    }

    pub fn area_id(&self) -> Option<&str> {
        match self {
            ServerEvent::DataUpdated(e) => Some(&e.area_id),
            ServerEvent::DataUpdateError(e) => Some(&e.area_id),
            ServerEvent::RefreshComplete(e) => Some(&e.area_id),
            ServerEvent::Other { data, .. } => data.get("areaId").and_then(Value::as_str),
        }
    }
}
