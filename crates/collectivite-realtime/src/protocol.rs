//! Engine.IO v4 / Socket.IO v5 text packet codec.
//!
//! Only the default namespace and text frames are used by the backend;
//! binary attachments are rejected.

use serde::Deserialize;
use serde_json::{Value, json};

/// Protocol error.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Empty packet")]
    Empty,
    #[error("Unknown packet type: {0:?}")]
    UnknownType(char),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed packet: {0}")]
    Malformed(String),
    #[error("Unsupported packet: {0}")]
    Unsupported(&'static str),
}

/// Parameters sent by the server in the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the session may upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping interval in milliseconds.
    pub ping_interval: u64,
    /// Time the server waits for a pong, in milliseconds.
    pub ping_timeout: u64,
    /// Largest accepted payload in bytes.
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// Engine.IO transport-level packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// Decode a text frame.
    ///
    /// # Errors
    /// Returns error on an empty frame, unknown type or invalid handshake.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Ok(Self::Message(rest.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            'b' => Err(ProtocolError::Unsupported("base64 binary frame")),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }

    /// Encode as a text frame. Clients never send `Open`.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open(h) => format!(
                "0{}",
                json!({
                    "sid": h.sid,
                    "upgrades": h.upgrades,
                    "pingInterval": h.ping_interval,
                    "pingTimeout": h.ping_timeout,
                    "maxPayload": h.max_payload,
                })
            ),
            Self::Close => "1".into(),
            Self::Ping => "2".into(),
            Self::Pong => "3".into(),
            Self::Message(payload) => format!("4{payload}"),
            Self::Upgrade => "5".into(),
            Self::Noop => "6".into(),
        }
    }
}

/// Default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Socket.IO packet carried inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Namespace connect; `auth` from the client, handshake data from the server.
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    /// Namespace disconnect.
    Disconnect { namespace: String },
    /// Named event.
    Event {
        namespace: String,
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    /// Acknowledgement of an event.
    Ack {
        namespace: String,
        id: u64,
        args: Vec<Value>,
    },
    /// Namespace connect refused (e.g. authentication middleware).
    ConnectError { namespace: String, message: String },
}

impl SocketPacket {
    /// Connect to the default namespace with an auth payload.
    #[must_use]
    pub fn connect(auth: Value) -> Self {
        Self::Connect {
            namespace: DEFAULT_NAMESPACE.into(),
            data: Some(auth),
        }
    }

    /// Event on the default namespace with a single argument.
    #[must_use]
    pub fn event(name: impl Into<String>, payload: Value) -> Self {
        Self::Event {
            namespace: DEFAULT_NAMESPACE.into(),
            id: None,
            name: name.into(),
            args: vec![payload],
        }
    }

    /// Disconnect from the default namespace.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::Disconnect {
            namespace: DEFAULT_NAMESPACE.into(),
        }
    }

    /// Namespace the packet belongs to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Decode the payload of an Engine.IO message.
    ///
    /// # Errors
    /// Returns error on unknown types, binary packets or malformed JSON.
    pub fn decode(payload: &str) -> Result<Self, ProtocolError> {
        let mut chars = payload.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let mut rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(ProtocolError::Unsupported("binary attachment"));
        }

        let namespace = if rest.starts_with('/') {
            let (nsp, tail) = rest.split_once(',').unwrap_or((rest, ""));
            rest = tail;
            nsp.to_string()
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let id = if digits > 0 {
            let id = rest[..digits]
                .parse()
                .map_err(|_| ProtocolError::Malformed(format!("ack id in {payload:?}")))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data: Option<Value> = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        match kind {
            '0' => Ok(Self::Connect { namespace, data }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let (name, args) = split_event(data, payload)?;
                Ok(Self::Event {
                    namespace,
                    id,
                    name,
                    args,
                })
            }
            '3' => {
                let id = id.ok_or_else(|| ProtocolError::Malformed("ack without id".into()))?;
                let args = match data {
                    Some(Value::Array(args)) => args,
                    None => Vec::new(),
                    Some(_) => return Err(ProtocolError::Malformed("ack payload".into())),
                };
                Ok(Self::Ack {
                    namespace,
                    id,
                    args,
                })
            }
            '4' => Ok(Self::ConnectError {
                namespace,
                message: connect_error_message(data),
            }),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }

    /// Encode as an Engine.IO message payload (without the leading `4`).
    #[must_use]
    pub fn encode(&self) -> String {
        let (kind, namespace) = match self {
            Self::Connect { namespace, .. } => ('0', namespace),
            Self::Disconnect { namespace } => ('1', namespace),
            Self::Event { namespace, .. } => ('2', namespace),
            Self::Ack { namespace, .. } => ('3', namespace),
            Self::ConnectError { namespace, .. } => ('4', namespace),
        };

        let mut out = String::new();
        out.push(kind);
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }

        match self {
            Self::Connect { data, .. } => {
                if let Some(data) = data {
                    out.push_str(&data.to_string());
                }
            }
            Self::Disconnect { .. } => {}
            Self::Event { id, name, args, .. } => {
                if let Some(id) = id {
                    out.push_str(&id.to_string());
                }
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                out.push_str(&Value::Array(array).to_string());
            }
            Self::Ack { id, args, .. } => {
                out.push_str(&id.to_string());
                out.push_str(&Value::Array(args.clone()).to_string());
            }
            Self::ConnectError { message, .. } => {
                out.push_str(&json!({ "message": message }).to_string());
            }
        }
        out
    }

    /// Wrap in an Engine.IO message packet.
    #[must_use]
    pub fn into_engine(self) -> EnginePacket {
        EnginePacket::Message(self.encode())
    }
}

fn split_event(data: Option<Value>, raw: &str) -> Result<(String, Vec<Value>), ProtocolError> {
    let Some(Value::Array(mut items)) = data else {
        return Err(ProtocolError::Malformed(format!("event payload in {raw:?}")));
    };
    if items.is_empty() {
        return Err(ProtocolError::Malformed("event without name".into()));
    }
    match items.remove(0) {
        Value::String(name) => Ok((name, items)),
        _ => Err(ProtocolError::Malformed("event name is not a string".into())),
    }
}

fn connect_error_message(data: Option<Value>) -> String {
    match data {
        Some(Value::String(message)) => message,
        Some(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("connection refused")
            .to_string(),
        _ => "connection refused".to_string(),
    }
}
