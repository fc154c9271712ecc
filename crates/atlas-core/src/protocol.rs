use crate::model::{Block, CacheEntry, Peer, Transaction};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Chain snapshots grow with the node, so the ceiling is generous.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Chain,
    Peers,
    Block,
    Cache,
    History,
    /// Legacy single-transaction lookup, superseded by `History`.
    Transactions,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Chain => "chain",
            Command::Peers => "peers",
            Command::Block => "block",
            Command::Cache => "cache",
            Command::History => "history",
            Command::Transactions => "transactions",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound request frame: `{"data": <command>, "params"?: <value>}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub data: Command,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub params: Option<Value>,
}

impl Query {
    pub fn new(data: Command) -> Self {
        Self { data, params: None }
    }

    pub fn chain() -> Self {
        Self::new(Command::Chain)
    }

    pub fn peers() -> Self {
        Self::new(Command::Peers)
    }

    pub fn cache() -> Self {
        Self::new(Command::Cache)
    }

    pub fn block(index: u64) -> Self {
        Self {
            data: Command::Block,
            params: Some(Value::from(index)),
        }
    }

    pub fn history(name: &str) -> Self {
        Self {
            data: Command::History,
            params: Some(Value::from(name)),
        }
    }

    pub fn transactions(name: &str) -> Self {
        Self {
            data: Command::Transactions,
            params: Some(Value::from(name)),
        }
    }
}

/// Inbound push message, decoded from `{"type": <tag>, "value": <payload>}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Chain(Vec<Block>),
    Block(Block),
    Peers(Vec<Peer>),
    Cache(Vec<CacheEntry>),
    History(Vec<Transaction>),
    /// Legacy running-log variant; one transaction per frame.
    Transactions(Transaction),
    Unknown { tag: String },
}

impl Envelope {
    pub fn tag(&self) -> &str {
        match self {
            Envelope::Chain(_) => "chain",
            Envelope::Block(_) => "block",
            Envelope::Peers(_) => "peers",
            Envelope::Cache(_) => "cache",
            Envelope::History(_) => "history",
            Envelope::Transactions(_) => "transactions",
            Envelope::Unknown { tag } => tag.as_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame exceeds max size: {size} > {max}")]
    OversizedFrame { size: usize, max: usize },
    #[error("frame encode failed: {0}")]
    Encode(String),
    #[error("frame decode failed: {0}")]
    Decode(String),
    #[error("payload for '{tag}' does not match expected shape: {reason}")]
    Payload { tag: String, reason: String },
}

pub fn encode_query(query: &Query, max_frame_bytes: usize) -> Result<String, FrameError> {
    let encoded = serde_json::to_string(query).map_err(|err| FrameError::Encode(err.to_string()))?;
    if encoded.len() > max_frame_bytes {
        return Err(FrameError::OversizedFrame {
            size: encoded.len(),
            max: max_frame_bytes,
        });
    }
    Ok(encoded)
}

/// Decodes one text frame. Unknown tags decode successfully as
/// [`Envelope::Unknown`]; only malformed frames are errors.
pub fn decode_envelope(frame: &str, max_frame_bytes: usize) -> Result<Envelope, FrameError> {
    if frame.len() > max_frame_bytes {
        return Err(FrameError::OversizedFrame {
            size: frame.len(),
            max: max_frame_bytes,
        });
    }
    let raw: RawEnvelope =
        serde_json::from_str(frame).map_err(|err| FrameError::Decode(err.to_string()))?;
    let envelope = match raw.tag.as_str() {
        "chain" => Envelope::Chain(payload(&raw.tag, raw.value)?),
        "block" => Envelope::Block(payload(&raw.tag, raw.value)?),
        "peers" => Envelope::Peers(payload(&raw.tag, raw.value)?),
        "cache" => Envelope::Cache(payload(&raw.tag, raw.value)?),
        "history" => Envelope::History(payload(&raw.tag, raw.value)?),
        "transactions" => Envelope::Transactions(payload(&raw.tag, raw.value)?),
        _ => Envelope::Unknown { tag: raw.tag },
    };
    Ok(envelope)
}

fn payload<T: DeserializeOwned>(tag: &str, value: Value) -> Result<T, FrameError> {
    serde_json::from_value(value).map_err(|err| FrameError::Payload {
        tag: tag.to_string(),
        reason: err.to_string(),
    })
}
