//! `stats-accumulator` estimates how much data a log query will touch, streams,
//! chunks, bytes and log entries, across many independently scanned index
//! shards, without double-counting keys that more than one shard reports.
//!
//! # Design rationale
//!
//! ## Fixed memory budget
//! Deduplication is probabilistic: two fixed-size bloom filters per
//! accumulator, sized for 1 million stream keys and 10 million chunk keys at a
//! 1% false-positive rate (~1.14MB and ~11.43MB of bitmap). Exceeding the
//! designed cardinality degrades accuracy gracefully instead of growing the
//! footprint. See <https://hur.st/bloomfilter> to play with the sizing.
//!
//! ## Low contention
//! Accumulators are shared by all workers scanning shards for one query. Adds
//! use double-checked locking under a single reader-writer lock: already-known
//! keys, the common case by far, are answered under the shared lock; only a
//! genuinely novel key takes the exclusive lock, where a test-and-insert
//! decides which of the racing workers performs the one counter update.
//!
//! ## Pooling
//! At ~12.5MB per accumulator, allocating one per query would dominate query
//! setup. [`AccumulatorPool`] recycles released accumulators (clearing their
//! filters in place) and never evicts.
//!
//! # Accepted faults
//!
//! - A bloom false positive makes a novel key look already-seen, skipping its
//!   counters: a bounded undercount (~1% per filter), never a double count.
//! - Deduplication is per process. A query spanning index data served by
//!   separate processes (for example across a schema-period boundary) merges
//!   per-process snapshots by plain summation, so a stream or chunk on both
//!   sides is counted twice. Resolving statistics for all periods together
//!   would require the stores to share scan state, and shipping ~12.5MB filter
//!   bitmaps between them is too expensive; the double count stays.
//!
//! Both faults are deliberate trade-offs. Swapping the filters for exact sets
//! or "fixing" the merge would break the memory and latency budgets.
//!
//! # Example
//! ```
//! use stats_accumulator::{merge, AccumulatorPool, ChunkMeta};
//!
//! let pool = AccumulatorPool::new();
//!
//! let acc = pool.acquire();
//! acc.add_stream(0xdead_beef);
//! acc.add_chunk(ChunkMeta {
//!     stream: 0xdead_beef,
//!     min_time: 0,
//!     max_time: 1_000,
//!     checksum: 0x1234,
//!     kb: 4,
//!     entries: 100,
//! });
//! let local = acc.snapshot();
//! drop(acc); // releases back to the pool
//!
//! // combine with snapshots from other processes; absent ones are identity
//! let total = merge([Some(local), None]);
//! assert_eq!(total.streams, 1);
//! assert_eq!(total.bytes, 4096);
//! ```
pub mod accumulator;
mod key;
pub mod pool;
pub mod stats;

pub use accumulator::StatsAccumulator;
pub use key::{ChunkMeta, StreamId};
pub use pool::{AccumulatorPool, PooledAccumulator};
pub use stats::{merge, Stats};
