//! ## Statistics value type
//!
//! `Stats` is the aggregate record reported for a query: distinct streams and
//! chunks touched, plus the total bytes and log entries those chunks hold.
//!
//! The field names and four-`u64` layout are part of the response contract with
//! remote callers and must not change. Note the unit: `bytes`, never kilobytes;
//! the conversion from chunk sizes happens at accumulation time.
//!
//! `Stats` forms a commutative monoid under field-wise addition with the
//! all-zero value as identity, which is what makes parallel and incremental
//! accumulation across shards and processes safe: snapshots can be summed in
//! any order and grouping.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Aggregate statistics for the data a query is expected to touch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Number of distinct streams observed.
    pub streams: u64,
    /// Number of distinct chunks observed.
    pub chunks: u64,
    /// Total size of observed chunks in bytes.
    pub bytes: u64,
    /// Total number of log entries in observed chunks.
    pub entries: u64,
}

impl Add for Stats {
    type Output = Stats;

    #[inline]
    fn add(mut self, rhs: Stats) -> Stats {
        self += rhs;
        self
    }
}

impl AddAssign for Stats {
    #[inline]
    fn add_assign(&mut self, rhs: Stats) {
        self.streams += rhs.streams;
        self.chunks += rhs.chunks;
        self.bytes += rhs.bytes;
        self.entries += rhs.entries;
    }
}

impl Sum for Stats {
    #[inline]
    fn sum<I: Iterator<Item = Stats>>(iter: I) -> Stats {
        iter.fold(Stats::default(), Add::add)
    }
}

/// Fold any number of statistics snapshots into one by field-wise summation.
///
/// Absent snapshots (`None`) contribute the additive identity, mirroring how a
/// shard that produced no statistics participates in a cross-process merge.
/// With no arguments the result is the all-zero `Stats`.
///
/// Snapshots from different processes may overlap on streams or chunks that
/// straddle a schema-period boundary; `merge` sums them regardless. See the
/// crate docs for why this double count is accepted.
pub fn merge<I>(snapshots: I) -> Stats
where
    I: IntoIterator<Item = Option<Stats>>,
{
    snapshots.into_iter().flatten().sum()
}
