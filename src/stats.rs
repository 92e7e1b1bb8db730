//! Running statistics accumulators.
//!
//! Two shapes are used by the search tree:
//!
//! - [`UctStatistics`]: integer count plus incremental mean, shared
//!   between worker threads. The lock-free discipline is relaxed,
//!   independent atomic loads and stores of the two words: a reader may
//!   observe a count from just before or after a concurrent write, but it
//!   can never tear a float. Final values depend only on the multiset of
//!   added results.
//! - [`RaveStatistics`]: the same shape with a fractional count, so
//!   distance-weighted RAVE updates can add non-integer increments.
//!
//! [`RunningStat`] is the plain single-threaded variant used for search
//! summaries and policy statistics.

use std::sync::atomic::{AtomicU32, Ordering};

/// Count/mean accumulator with relaxed atomic storage.
#[derive(Debug, Default)]
pub struct UctStatistics {
    count: AtomicU32,
    /// f32 bits of the running mean.
    mean: AtomicU32,
}

impl UctStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn mean(&self) -> f32 {
        f32::from_bits(self.mean.load(Ordering::Relaxed))
    }

    /// Add one result. μ ← μ + (x − μ)/n.
    pub fn add(&self, value: f32) {
        let n = self.count.load(Ordering::Relaxed) + 1;
        let mean = f32::from_bits(self.mean.load(Ordering::Relaxed));
        let mean = mean + (value - mean) / n as f32;
        self.mean.store(mean.to_bits(), Ordering::Relaxed);
        self.count.store(n, Ordering::Relaxed);
    }

    /// Remove one previously added result (virtual-loss undo).
    pub fn remove(&self, value: f32) {
        let n = self.count.load(Ordering::Relaxed);
        if n <= 1 {
            self.clear();
            return;
        }
        let mean = f32::from_bits(self.mean.load(Ordering::Relaxed));
        let mean = (mean * n as f32 - value) / (n - 1) as f32;
        self.mean.store(mean.to_bits(), Ordering::Relaxed);
        self.count.store(n - 1, Ordering::Relaxed);
    }

    /// Overwrite with the given value and count.
    pub fn initialize(&self, value: f32, count: u32) {
        self.mean.store(value.to_bits(), Ordering::Relaxed);
        self.count.store(count, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.mean.store(0f32.to_bits(), Ordering::Relaxed);
    }

    /// Copy another accumulator's state into this one.
    pub fn copy_from(&self, other: &UctStatistics) {
        self.initialize(other.mean(), other.count());
    }

    /// Fold another accumulator in by count-weighted mean.
    pub fn merge_from(&self, other: &UctStatistics) {
        let n1 = self.count();
        let n2 = other.count();
        if n2 == 0 {
            return;
        }
        let total = n1 + n2;
        let mean =
            (self.mean() * n1 as f32 + other.mean() * n2 as f32) / total as f32;
        self.initialize(mean, total);
    }
}

/// RAVE accumulator: fractional count, relaxed atomic storage.
#[derive(Debug, Default)]
pub struct RaveStatistics {
    /// f32 bits of the accumulated weight.
    count: AtomicU32,
    /// f32 bits of the weighted mean.
    mean: AtomicU32,
}

impl RaveStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn count(&self) -> f32 {
        f32::from_bits(self.count.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn mean(&self) -> f32 {
        f32::from_bits(self.mean.load(Ordering::Relaxed))
    }

    /// Add a result with the given weight.
    pub fn add(&self, value: f32, weight: f32) {
        let n = self.count() + weight;
        let mean = self.mean();
        let mean = mean + (value - mean) * weight / n;
        self.mean.store(mean.to_bits(), Ordering::Relaxed);
        self.count.store(n.to_bits(), Ordering::Relaxed);
    }

    pub fn initialize(&self, value: f32, count: f32) {
        self.mean.store(value.to_bits(), Ordering::Relaxed);
        self.count.store(count.to_bits(), Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.count.store(0f32.to_bits(), Ordering::Relaxed);
        self.mean.store(0f32.to_bits(), Ordering::Relaxed);
    }

    pub fn copy_from(&self, other: &RaveStatistics) {
        self.initialize(other.mean(), other.count());
    }
}

/// Plain running mean for single-threaded bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    mean: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
    }

    pub fn merge(&mut self, other: &RunningStat) {
        if other.count == 0 {
            return;
        }
        let total = self.count + other.count;
        self.mean = (self.mean * self.count as f64 + other.mean * other.count as f64)
            / total as f64;
        self.count = total;
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn clear(&mut self) {
        *self = RunningStat::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_added_values() {
        let s = UctStatistics::new();
        for v in [1.0, 0.0, 1.0, 1.0] {
            s.add(v);
        }
        assert_eq!(s.count(), 4);
        assert!((s.mean() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn remove_undoes_add() {
        let s = UctStatistics::new();
        s.add(1.0);
        s.add(0.0);
        s.add(0.0);
        s.remove(0.0);
        assert_eq!(s.count(), 2);
        assert!((s.mean() - 0.5).abs() < 1e-6);
        s.remove(0.0);
        s.remove(1.0);
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn merge_is_count_weighted() {
        let a = UctStatistics::new();
        let b = UctStatistics::new();
        for _ in 0..3 {
            a.add(1.0);
        }
        b.add(0.0);
        a.merge_from(&b);
        assert_eq!(a.count(), 4);
        assert!((a.mean() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn merge_result_independent_of_split() {
        // The final (count, mean) depends only on the multiset of results.
        let values = [1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let whole = UctStatistics::new();
        for v in values {
            whole.add(v);
        }
        let left = UctStatistics::new();
        let right = UctStatistics::new();
        for v in &values[..2] {
            left.add(*v);
        }
        for v in &values[2..] {
            right.add(*v);
        }
        left.merge_from(&right);
        assert_eq!(left.count(), whole.count());
        assert!((left.mean() - whole.mean()).abs() < 1e-6);
    }

    #[test]
    fn rave_weighted_add() {
        let s = RaveStatistics::new();
        s.add(1.0, 1.0);
        s.add(0.0, 3.0);
        assert!((s.count() - 4.0).abs() < 1e-6);
        assert!((s.mean() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn running_stat_merge() {
        let mut a = RunningStat::default();
        let mut b = RunningStat::default();
        a.add(2.0);
        a.add(4.0);
        b.add(6.0);
        a.merge(&b);
        assert_eq!(a.count(), 3);
        assert!((a.mean() - 4.0).abs() < 1e-12);
    }
}
