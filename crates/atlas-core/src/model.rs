use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub merkle_root: String,
    pub previous_hash: String,
    /// Seconds since the unix epoch.
    pub timestamp: u64,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub transaction_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub client_id: u64,
    pub data_name: String,
    pub operation: Operation,
    #[serde(default)]
    pub timestamp: u64,
}

/// Cache inventory row. `last_updated` and `last_accessed` are 0 when the
/// node has never touched the entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_updated: u64,
    #[serde(default)]
    pub last_accessed: u64,
    #[serde(default, alias = "transactions")]
    pub transaction_count: u64,
}

/// Another network participant. The client only needs something to print.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Peer(pub Value);

impl Peer {
    pub fn label(&self) -> String {
        match &self.0 {
            Value::String(value) => value.clone(),
            Value::Object(map) => ["id", "address", "addr"]
                .iter()
                .find_map(|key| match map.get(*key) {
                    Some(Value::String(value)) => Some(value.clone()),
                    Some(Value::Number(value)) => Some(value.to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| self.0.to_string()),
            other => other.to_string(),
        }
    }
}

/// Cache operation recorded by a transaction. The node emits either a
/// string tag or its numeric operation code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Set,
    Get,
    Delete,
    Other(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Set => "set",
            Operation::Get => "get",
            Operation::Delete => "delete",
            Operation::Other(raw) => raw.as_str(),
        }
    }

    fn from_code(code: u64) -> Self {
        match code {
            0 => Operation::Set,
            1 => Operation::Get,
            2 => Operation::Delete,
            other => Operation::Other(other.to_string()),
        }
    }

    fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "set" => Operation::Set,
            "get" => Operation::Get,
            "delete" | "del" => Operation::Delete,
            _ => Operation::Other(tag.to_string()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OperationVisitor;

        impl<'de> Visitor<'de> for OperationVisitor {
            type Value = Operation;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a cache operation as string tag or integer code")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Operation::from_code(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if value < 0 {
                    return Err(E::custom(format!(
                        "operation code cannot be negative: {value}"
                    )));
                }
                self.visit_u64(value as u64)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Operation::from_tag(value))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                self.visit_str(&value)
            }
        }

        deserializer.deserialize_any(OperationVisitor)
    }
}
