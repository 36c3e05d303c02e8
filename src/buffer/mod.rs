//! Buffer abstractions for engine RPC encoding/decoding
//!
//! This module provides buffer types for reading and writing the packed,
//! four-byte aligned layout used on the engine channel.

mod read;
mod write;

pub use read::ReadBuffer;
pub use write::WriteBuffer;
