//! Chunk payload carriers.

use bytes::Bytes;

/// A chunk's payload: materialized bytes, a sized placeholder for content
/// that lives elsewhere, or content whose size is unknown.
///
/// Placement charges destination quotas by payload size, so stages that
/// plan copies require a sized variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Data {
    /// Fully materialized bytes.
    Bytes(Bytes),
    /// Content stored elsewhere with a known size in bytes.
    Sized(u64),
    /// Content whose size cannot be determined.
    #[default]
    Unsized,
}

impl Data {
    /// Size in bytes, when known.
    pub fn size(&self) -> Option<u64> {
        match self {
            Data::Bytes(bytes) => Some(bytes.len() as u64),
            Data::Sized(size) => Some(*size),
            Data::Unsized => None,
        }
    }

    /// Materialized bytes, when present.
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Data::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl From<Bytes> for Data {
    fn from(bytes: Bytes) -> Self {
        Data::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Data::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Data {
    fn from(bytes: &'static [u8]) -> Self {
        Data::Bytes(Bytes::from_static(bytes))
    }
}
