//! The content-addressed unit of data moving through a pipeline.

use crate::data::Data;
use crate::hash::Hash;

/// Per-chunk tags the engine understands.
///
/// The original design is an open string-keyed bag; only two tags carry
/// meaning here, so they are modeled as typed fields and anything else a
/// producer might attach is ignored by construction.
#[derive(Debug, Clone, Default)]
pub struct Meta {
    group: Option<Vec<Chunk>>,
    integrity_check: Option<bool>,
}

impl Meta {
    /// Chunks to be placed atomically as one unit, in order.
    pub fn group(&self) -> Option<&[Chunk]> {
        self.group.as_deref()
    }

    /// Mark this chunk as a carrier for a group of chunks.
    pub fn set_group(&mut self, group: Vec<Chunk>) {
        self.group = Some(group);
    }

    /// Outcome of the last integrity verification, if one ran.
    pub fn integrity_check(&self) -> Option<bool> {
        self.integrity_check
    }

    /// Record the outcome of an integrity verification.
    pub fn set_integrity_check(&mut self, ok: bool) {
        self.integrity_check = Some(ok);
    }
}

/// Content-addressed unit of data.
///
/// Cloning is cheap: the payload is reference-counted. Chunks are created by
/// upstream producers and are immutable to the engine except for tag, hash
/// and payload rewrites performed by in-place pipeline stages.
#[derive(Debug, Clone)]
pub struct Chunk {
    hash: Hash,
    data: Data,
    meta: Meta,
}

impl Chunk {
    /// Create a chunk with a known hash and payload.
    pub fn new(hash: Hash, data: Data) -> Self {
        Self {
            hash,
            data,
            meta: Meta::default(),
        }
    }

    /// Create a chunk whose hash has not been stamped yet (all zeroes).
    pub fn with_data(data: Data) -> Self {
        Self::new(Hash::default(), data)
    }

    /// The content hash.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Stamp the content hash.
    pub fn set_hash(&mut self, hash: Hash) {
        self.hash = hash;
    }

    /// The payload.
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Replace the payload.
    pub fn set_data(&mut self, data: Data) {
        self.data = data;
    }

    /// The chunk's tags.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Mutable access to the chunk's tags.
    pub fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sum;

    #[test]
    fn group_tag() {
        let inner = Chunk::new(sum(b"one"), Data::from(vec![1u8]));
        let mut carrier = Chunk::with_data(Data::Unsized);
        assert!(carrier.meta().group().is_none());
        carrier.meta_mut().set_group(vec![inner.clone()]);
        let group = carrier.meta().group().unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].hash(), inner.hash());
    }

    #[test]
    fn integrity_tag() {
        let mut chunk = Chunk::with_data(Data::from(vec![0u8]));
        assert_eq!(chunk.meta().integrity_check(), None);
        chunk.meta_mut().set_integrity_check(false);
        assert_eq!(chunk.meta().integrity_check(), Some(false));
    }

    #[test]
    fn hash_restamp() {
        let mut chunk = Chunk::with_data(Data::from(vec![7u8]));
        assert_eq!(chunk.hash(), Hash::default());
        let h = sum(b"stamped");
        chunk.set_hash(h);
        assert_eq!(chunk.hash(), h);
    }
}
