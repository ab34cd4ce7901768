#![warn(missing_docs)]

//! Cascade core types: content hashes, chunk payloads, per-chunk tags.
//!
//! Everything else in the workspace moves [`Chunk`] values around; this crate
//! defines what a chunk is and how its content is identified.

pub mod chunk;
pub mod data;
pub mod hash;

pub use chunk::{Chunk, Meta};
pub use data::Data;
pub use hash::{sum, Hash, HashError, HASH_WIDTH};
