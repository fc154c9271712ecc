//! Shared data model and wire protocol for talking to an atlas ledger/cache node.

pub mod model;
pub mod protocol;

pub use model::{Block, CacheEntry, Operation, Peer, Transaction};
pub use protocol::{
    decode_envelope, encode_query, Command, Envelope, FrameError, Query, DEFAULT_MAX_FRAME_BYTES,
};
