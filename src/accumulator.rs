//! ## Deduplicating statistics accumulator
//!
//! One `StatsAccumulator` serves one query. Index shards are scanned by many
//! workers in parallel and the same stream or chunk is routinely reported by
//! more than one shard; the accumulator's job is to count each distinct key
//! once while keeping the repeated observations cheap.
//!
//! Membership is tracked with two fixed-size bloom filters, one sized for
//! stream keys and one for chunk keys. The filters answer "seen before?" with
//! no false negatives and a ~1% false-positive rate, so a novel key can be
//! misreported as already present and its counters skipped. That undercount is
//! bounded by the configured rate and is the accepted price for a fixed ~12.5MB
//! footprint; replacing the filters with exact sets would defeat the memory
//! budget.
//!
//! ### Locking protocol
//!
//! A single reader-writer lock guards both filters and the counters. Adds use
//! double-checked locking: an optimistic shared-lock membership test first, and
//! only on a miss an exclusive lock with an atomic test-and-insert deciding
//! who performs the one first-insert counter update. Repeated observations,
//! the overwhelming majority of calls during a multi-shard scan, never take
//! the exclusive lock.

use bloomfilter::Bloom;
use parking_lot::RwLock;

use crate::key::{ChunkMeta, DedupKey, StreamId, CHUNK_KEY_LEN, STREAM_KEY_LEN};
use crate::stats::Stats;

/// Designed stream-key cardinality: 1 million streams @ 1% error =~ 1.14MB.
const STREAM_CAPACITY: usize = 1_000_000;
/// Designed chunk-key cardinality: 10 million chunks @ 1% error =~ 11.43MB.
const CHUNK_CAPACITY: usize = 10_000_000;
/// Target false-positive rate for both filters.
const FP_RATE: f64 = 0.01;

/// Filters and counters guarded together by the accumulator's lock.
struct Filters {
    streams: Bloom<[u8; STREAM_KEY_LEN]>,
    chunks: Bloom<[u8; CHUNK_KEY_LEN]>,
    stats: Stats,
}

impl Filters {
    /// Return whether `key` tests as present in its filter.
    fn contains(&self, key: &DedupKey) -> bool {
        match key {
            DedupKey::Stream(k) => self.streams.check(k),
            DedupKey::Chunk(k) => self.chunks.check(k),
        }
    }

    /// Insert `key` into its filter, returning whether it was already present.
    fn insert(&mut self, key: &DedupKey) -> bool {
        match key {
            DedupKey::Stream(k) => self.streams.check_and_set(k),
            DedupKey::Chunk(k) => self.chunks.check_and_set(k),
        }
    }
}

/// Concurrency-safe, deduplicating statistics accumulator for one query.
///
/// Exceeding the designed cardinality does not fail; it degrades the
/// false-positive rate gracefully. The filters are never resized.
///
/// An accumulator deduplicates only within one process. When a query spans
/// index data served by separate processes, each process accumulates
/// independently and the final [`merge`](crate::merge) sums potentially
/// overlapping counts, so a stream or chunk straddling that boundary can be
/// counted twice. Accepted limitation; see the crate docs.
pub struct StatsAccumulator {
    inner: RwLock<Filters>,
}

impl StatsAccumulator {
    /// Create an accumulator with two freshly sized, empty filters and zeroed
    /// counters. Allocates ~12.5MB; prefer acquiring from an
    /// [`AccumulatorPool`](crate::AccumulatorPool) in steady state.
    pub fn new() -> Self {
        StatsAccumulator {
            inner: RwLock::new(Filters {
                streams: new_filter(STREAM_CAPACITY),
                chunks: new_filter(CHUNK_CAPACITY),
                stats: Stats::default(),
            }),
        }
    }

    /// Record one observation of a stream.
    ///
    /// The first observation of `id` increments `streams`; repeats are no-ops.
    pub fn add_stream(&self, id: StreamId) {
        let delta = Stats {
            streams: 1,
            ..Stats::default()
        };
        self.add(DedupKey::stream(id), delta);
    }

    /// Record one observation of a chunk.
    ///
    /// The first observation of the chunk's `(stream, min_time, max_time,
    /// checksum)` key increments `chunks` and adds its bytes and entries;
    /// repeats are no-ops regardless of the size fields they carry.
    pub fn add_chunk(&self, chunk: ChunkMeta) {
        let delta = Stats {
            streams: 0,
            chunks: 1,
            bytes: u64::from(chunk.kb) << 10,
            entries: u64::from(chunk.entries),
        };
        self.add(DedupKey::chunk(&chunk), delta);
    }

    /// Return a copy of the current counters.
    pub fn snapshot(&self) -> Stats {
        self.inner.read().stats
    }

    /// Clear both filters to empty (in place, without reallocating their
    /// bitmaps) and zero the counters.
    pub fn reset(&self) {
        let mut filters = self.inner.write();
        filters.streams.clear();
        filters.chunks.clear();
        filters.stats = Stats::default();
    }

    /// Apply `delta` to the counters iff `key` has not been seen before.
    ///
    /// Double-checked locking: the optimistic shared-lock test keeps already
    /// known keys off the exclusive path, and the exclusive test-and-insert
    /// guarantees that of any number of racing adds of one key exactly one
    /// performs the counter update.
    fn add(&self, key: DedupKey, delta: Stats) {
        {
            let filters = self.inner.read();
            if filters.contains(&key) {
                return;
            }
        }

        let mut filters = self.inner.write();
        if !filters.insert(&key) {
            filters.stats += delta;
        }
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an empty filter sized for `capacity` keys at the target error rate.
fn new_filter<const N: usize>(capacity: usize) -> Bloom<[u8; N]> {
    // Capacities are positive constants and FP_RATE is in (0, 1), the only
    // inputs `Bloom` rejects.
    Bloom::new_for_fp_rate(capacity, FP_RATE).expect("valid bloom filter parameters")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(stream: StreamId, min_time: i64, max_time: i64, checksum: u32) -> ChunkMeta {
        ChunkMeta {
            stream,
            min_time,
            max_time,
            checksum,
            kb: 4,
            entries: 100,
        }
    }

    #[test]
    fn test_add_stream_idempotent() {
        let acc = StatsAccumulator::new();
        acc.add_stream(42);
        acc.add_stream(42);
        assert_eq!(acc.snapshot().streams, 1);
    }

    #[test]
    fn test_add_chunk_accumulates_fields() {
        let acc = StatsAccumulator::new();
        acc.add_chunk(chunk(1, 0, 10, 0xAAAA));
        let stats = acc.snapshot();
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.bytes, 4096);
        assert_eq!(stats.entries, 100);
        assert_eq!(stats.streams, 0);
    }

    #[test]
    fn test_add_chunk_dedups_on_full_key() {
        let acc = StatsAccumulator::new();
        acc.add_chunk(chunk(1, 0, 10, 0xAAAA));
        acc.add_chunk(chunk(1, 0, 10, 0xAAAA));
        assert_eq!(acc.snapshot().chunks, 1);

        // same stream, different time range or checksum: distinct chunks
        acc.add_chunk(chunk(1, 10, 20, 0xAAAA));
        acc.add_chunk(chunk(1, 0, 10, 0xBBBB));
        assert_eq!(acc.snapshot().chunks, 3);
    }

    #[test]
    fn test_duplicate_chunk_ignores_size_fields() {
        let acc = StatsAccumulator::new();
        acc.add_chunk(chunk(7, 0, 10, 0xC0DE));
        acc.add_chunk(ChunkMeta {
            kb: 999,
            entries: 999,
            ..chunk(7, 0, 10, 0xC0DE)
        });
        let stats = acc.snapshot();
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.bytes, 4096);
        assert_eq!(stats.entries, 100);
    }

    #[test]
    fn test_streams_and_chunks_deduplicate_independently() {
        let acc = StatsAccumulator::new();
        acc.add_stream(1);
        acc.add_chunk(chunk(1, 0, 10, 0xAAAA));
        let stats = acc.snapshot();
        assert_eq!(stats.streams, 1);
        assert_eq!(stats.chunks, 1);
    }

    #[test]
    fn test_reset_clears_filters_and_counters() {
        let acc = StatsAccumulator::new();
        acc.add_stream(42);
        acc.add_chunk(chunk(1, 0, 10, 0xAAAA));
        acc.reset();

        assert_eq!(acc.snapshot(), Stats::default());

        // previously added keys count again after reset
        acc.add_stream(42);
        acc.add_chunk(chunk(1, 0, 10, 0xAAAA));
        let stats = acc.snapshot();
        assert_eq!(stats.streams, 1);
        assert_eq!(stats.chunks, 1);
    }

    #[test]
    fn test_concurrent_distinct_streams() {
        const WORKERS: u64 = 8;
        const PER_WORKER: u64 = 1_000;

        let acc = StatsAccumulator::new();
        std::thread::scope(|scope| {
            for worker in 0..WORKERS {
                let acc = &acc;
                scope.spawn(move || {
                    for i in 0..PER_WORKER {
                        acc.add_stream(worker * PER_WORKER + i);
                    }
                });
            }
        });

        assert_eq!(acc.snapshot().streams, WORKERS * PER_WORKER);
    }

    #[test]
    fn test_concurrent_same_key_counts_once() {
        const WORKERS: usize = 8;

        let acc = StatsAccumulator::new();
        std::thread::scope(|scope| {
            for _ in 0..WORKERS {
                let acc = &acc;
                scope.spawn(move || {
                    for _ in 0..1_000 {
                        acc.add_chunk(chunk(1, 0, 10, 0xAAAA));
                    }
                });
            }
        });

        let stats = acc.snapshot();
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.bytes, 4096);
        assert_eq!(stats.entries, 100);
    }
}
