//! ## Accumulator pool
//!
//! Accumulators are expensive: the two filter bitmaps come to ~12.5MB each,
//! and a busy node starts many queries per second. The pool amortizes that
//! allocation by recycling accumulators between queries; it is unbounded and
//! never evicts, trading retained memory for allocation cost.
//!
//! Construct one pool at process start and pass it by reference to whatever
//! plans queries. Release is expressed as RAII: dropping the guard resets the
//! accumulator and returns it to the free list, so the pool cannot leak
//! entries on early-return paths.

use std::ops::Deref;

use parking_lot::Mutex;

use crate::accumulator::StatsAccumulator;

/// Process-wide cache of [`StatsAccumulator`]s.
pub struct AccumulatorPool {
    idle: Mutex<Vec<StatsAccumulator>>,
}

impl AccumulatorPool {
    /// Create an empty pool. Accumulators are constructed lazily on
    /// [`acquire`](Self::acquire) when the free list is empty.
    pub fn new() -> Self {
        AccumulatorPool {
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Return a ready-to-use, empty accumulator, recycling a previously
    /// released one when available.
    ///
    /// The guard owns the accumulator for the duration of one query; multiple
    /// workers of that query may share it through the guard's `Deref`.
    pub fn acquire(&self) -> PooledAccumulator<'_> {
        let recycled = self.idle.lock().pop();
        PooledAccumulator {
            pool: self,
            acc: Some(recycled.unwrap_or_default()),
        }
    }

    /// Reset `acc` to empty and put it back on the free list.
    fn release(&self, acc: StatsAccumulator) {
        acc.reset();
        self.idle.lock().push(acc);
    }
}

impl Default for AccumulatorPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped handle to a pooled [`StatsAccumulator`].
///
/// Dropping the guard releases the accumulator back to the pool
/// unconditionally; never retain references to it past the drop.
pub struct PooledAccumulator<'a> {
    pool: &'a AccumulatorPool,
    acc: Option<StatsAccumulator>,
}

impl Deref for PooledAccumulator<'_> {
    type Target = StatsAccumulator;

    fn deref(&self) -> &StatsAccumulator {
        // populated in `acquire`, taken only in `drop`
        self.acc.as_ref().expect("accumulator present until drop")
    }
}

impl Drop for PooledAccumulator<'_> {
    fn drop(&mut self) {
        if let Some(acc) = self.acc.take() {
            self.pool.release(acc);
        }
    }
}
