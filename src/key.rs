//! ## Dedup key encoding
//!
//! Streams and chunks are identified inside the accumulator by fixed-width,
//! big-endian byte keys. Fixed widths matter: with variable-length encodings two
//! different field tuples could encode to the same bytes, silently merging
//! distinct chunks.
//!
//! - stream key: 8 bytes, the stream id.
//! - chunk key: 28 bytes, `stream (8) || min_time (8) || max_time (8) || checksum (4)`.
//!
//! `kb` and `entries` are deliberately excluded from the chunk key: two
//! descriptors with equal `(stream, min_time, max_time, checksum)` refer to the
//! same physical chunk regardless of what the index reports for its size.

/// Opaque 64-bit stream identifier, a hash of the stream's label set.
pub type StreamId = u64;

/// Descriptor for one physical chunk of log data belonging to a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkMeta {
    /// Identifier of the stream the chunk belongs to.
    pub stream: StreamId,
    /// Timestamp of the earliest entry in the chunk.
    pub min_time: i64,
    /// Timestamp of the latest entry in the chunk.
    pub max_time: i64,
    /// Checksum of the chunk contents.
    pub checksum: u32,
    /// Chunk size in kilobytes.
    pub kb: u32,
    /// Number of log entries in the chunk.
    pub entries: u32,
}

/// Stream key width in bytes.
pub(crate) const STREAM_KEY_LEN: usize = 8;
/// Chunk key width in bytes: stream + min_time + max_time + checksum.
pub(crate) const CHUNK_KEY_LEN: usize = 8 + 8 + 8 + 4;

/// Discriminated dedup key, dispatched to the matching filter by the accumulator.
pub(crate) enum DedupKey {
    Stream([u8; STREAM_KEY_LEN]),
    Chunk([u8; CHUNK_KEY_LEN]),
}

impl DedupKey {
    /// Encode a stream identifier as a dedup key.
    #[inline]
    pub(crate) fn stream(id: StreamId) -> Self {
        DedupKey::Stream(id.to_be_bytes())
    }

    /// Encode a chunk descriptor as a dedup key.
    #[inline]
    pub(crate) fn chunk(chunk: &ChunkMeta) -> Self {
        let mut key = [0u8; CHUNK_KEY_LEN];
        key[..8].copy_from_slice(&chunk.stream.to_be_bytes());
        key[8..16].copy_from_slice(&chunk.min_time.to_be_bytes());
        key[16..24].copy_from_slice(&chunk.max_time.to_be_bytes());
        key[24..].copy_from_slice(&chunk.checksum.to_be_bytes());
        DedupKey::Chunk(key)
    }
}
