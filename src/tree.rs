//! The search tree: a node pool with per-thread allocators.
//!
//! Nodes live in one pre-sized contiguous pool. Slot 0 is the root; the
//! rest is partitioned into disjoint per-thread bump allocators, so
//! expansion never contends on allocation. A parent's children are a
//! contiguous slice inside one allocator, published atomically by a
//! single compare-exchange of a packed (first, count) descriptor: the
//! first writer wins, losing writers roll their private cursor back.
//!
//! The search owns two pools of the same size and swaps them in O(1) for
//! subtree reuse ([`UctTree::extract_subtree`]) and low-count pruning
//! ([`UctTree::copy_prune_low_count`]).

use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::board::Point;
use crate::knowledge::MoveInfo;
use crate::stats::{RaveStatistics, UctStatistics};

/// Win/loss knowledge proven by exact evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proven {
    None,
    /// Proven win for the player who moved into this node.
    Win,
    /// Proven loss for the player who moved into this node.
    Loss,
}

impl Proven {
    fn from_u8(v: u8) -> Proven {
        match v {
            1 => Proven::Win,
            2 => Proven::Loss,
            _ => Proven::None,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Proven::None => 0,
            Proven::Win => 1,
            Proven::Loss => 2,
        }
    }
}

/// One node of the search tree.
///
/// All fields are atomics so the pool can be shared by reference across
/// worker threads; the child descriptor is the only field with
/// release/acquire ordering, everything else is relaxed per the
/// statistics discipline.
#[derive(Debug, Default)]
pub struct UctNode {
    mv: AtomicU32,
    stats: UctStatistics,
    rave: RaveStatistics,
    /// Times this node was visited as a position during backup.
    pos_count: AtomicU32,
    prior_value: AtomicU32,
    prior_count: AtomicU32,
    predictor: AtomicU32,
    proven: AtomicU8,
    virtual_loss: AtomicU32,
    /// Packed child range: (first << 32) | count, 0 while unexpanded.
    children: AtomicU64,
}

impl UctNode {
    fn reset(&self, mv: Point) {
        self.mv.store(mv as u32, Ordering::Relaxed);
        self.stats.clear();
        self.rave.clear();
        self.pos_count.store(0, Ordering::Relaxed);
        self.prior_value.store(0f32.to_bits(), Ordering::Relaxed);
        self.prior_count.store(0f32.to_bits(), Ordering::Relaxed);
        self.predictor.store(0f32.to_bits(), Ordering::Relaxed);
        self.proven.store(0, Ordering::Relaxed);
        self.virtual_loss.store(0, Ordering::Relaxed);
        self.children.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub fn mv(&self) -> Point {
        self.mv.load(Ordering::Relaxed) as Point
    }

    #[inline]
    pub fn stats(&self) -> &UctStatistics {
        &self.stats
    }

    #[inline]
    pub fn rave(&self) -> &RaveStatistics {
        &self.rave
    }

    #[inline]
    pub fn pos_count(&self) -> u32 {
        self.pos_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn inc_pos_count(&self) {
        self.pos_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn prior_value(&self) -> f32 {
        f32::from_bits(self.prior_value.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn prior_count(&self) -> f32 {
        f32::from_bits(self.prior_count.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn predictor(&self) -> f32 {
        f32::from_bits(self.predictor.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn proven(&self) -> Proven {
        Proven::from_u8(self.proven.load(Ordering::Relaxed))
    }

    pub fn set_proven(&self, proven: Proven) {
        self.proven.store(proven.as_u8(), Ordering::Relaxed);
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.children.load(Ordering::Acquire) != 0
    }

    /// The published (first, count) child range, if any.
    #[inline]
    pub fn children_range(&self) -> Option<(u32, u32)> {
        let packed = self.children.load(Ordering::Acquire);
        if packed == 0 {
            None
        } else {
            Some(((packed >> 32) as u32, packed as u32))
        }
    }

    /// Temporary loss applied while a worker descends past this node.
    pub fn add_virtual_loss(&self) {
        self.virtual_loss.fetch_add(1, Ordering::Relaxed);
        self.stats.add(0.0);
    }

    pub fn remove_virtual_loss(&self) {
        self.virtual_loss.fetch_sub(1, Ordering::Relaxed);
        self.stats.remove(0.0);
    }

    #[inline]
    pub fn virtual_loss_count(&self) -> u32 {
        self.virtual_loss.load(Ordering::Relaxed)
    }

    /// Copy everything except the child range from another node.
    fn copy_data_from(&self, other: &UctNode) {
        self.mv.store(other.mv.load(Ordering::Relaxed), Ordering::Relaxed);
        self.stats.copy_from(&other.stats);
        self.rave.copy_from(&other.rave);
        self.pos_count
            .store(other.pos_count(), Ordering::Relaxed);
        self.prior_value
            .store(other.prior_value().to_bits(), Ordering::Relaxed);
        self.prior_count
            .store(other.prior_count().to_bits(), Ordering::Relaxed);
        self.predictor
            .store(other.predictor().to_bits(), Ordering::Relaxed);
        self.proven.store(other.proven().as_u8(), Ordering::Relaxed);
        self.virtual_loss.store(0, Ordering::Relaxed);
        self.children.store(0, Ordering::Relaxed);
    }
}

/// Outcome of a `create_children` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateResult {
    /// This call published the children.
    Published,
    /// Another thread published first; the allocation was withdrawn.
    Raced,
    /// The allocator cannot hold the requested range.
    OutOfMemory,
}

/// Bump allocator over a fixed region of the pool. Only its owning
/// thread advances the cursor; other threads read it for node counts.
#[derive(Debug)]
struct Allocator {
    start: u32,
    end: u32,
    cursor: AtomicU32,
}

/// Pre-sized node pool with per-thread allocators.
pub struct UctTree {
    nodes: Box<[UctNode]>,
    allocators: Vec<Allocator>,
}

impl UctTree {
    /// Create a pool of `max_nodes` slots split over `num_allocators`
    /// per-thread regions. Slot 0 is the root.
    pub fn new(max_nodes: usize, num_allocators: usize) -> UctTree {
        assert!(num_allocators >= 1);
        assert!(max_nodes > num_allocators, "pool too small");
        assert!(max_nodes <= u32::MAX as usize);
        let nodes: Box<[UctNode]> = (0..max_nodes).map(|_| UctNode::default()).collect();
        let region = (max_nodes - 1) / num_allocators;
        let mut allocators = Vec::with_capacity(num_allocators);
        for i in 0..num_allocators {
            let start = 1 + i * region;
            let end = if i == num_allocators - 1 {
                max_nodes
            } else {
                start + region
            };
            allocators.push(Allocator {
                start: start as u32,
                end: end as u32,
                cursor: AtomicU32::new(start as u32),
            });
        }
        let tree = UctTree { nodes, allocators };
        tree.nodes[0].reset(crate::board::PASS);
        tree
    }

    #[inline]
    pub fn max_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn num_allocators(&self) -> usize {
        self.allocators.len()
    }

    /// Total nodes in use, root included.
    pub fn nu_nodes(&self) -> usize {
        1 + self
            .allocators
            .iter()
            .map(|a| (a.cursor.load(Ordering::Relaxed) - a.start) as usize)
            .sum::<usize>()
    }

    /// Unused slots in the given allocator.
    pub fn remaining_capacity(&self, allocator: usize) -> usize {
        let a = &self.allocators[allocator];
        (a.end - a.cursor.load(Ordering::Relaxed)) as usize
    }

    /// Reset to a fresh root and empty allocators.
    pub fn clear(&mut self) {
        for a in &self.allocators {
            a.cursor.store(a.start, Ordering::Relaxed);
        }
        self.nodes[0].reset(crate::board::PASS);
    }

    #[inline]
    pub fn root(&self) -> &UctNode {
        &self.nodes[0]
    }

    #[inline]
    pub fn node(&self, idx: u32) -> &UctNode {
        &self.nodes[idx as usize]
    }

    /// Iterate (index, node) over the published children of `idx`.
    pub fn children_of(&self, idx: u32) -> impl Iterator<Item = (u32, &UctNode)> {
        let range = self.node(idx).children_range();
        let (first, count) = range.unwrap_or((0, 0));
        (first..first + count).map(move |i| (i, self.node(i)))
    }

    /// Find the child of `parent` carrying the given move.
    pub fn find_child(&self, parent: u32, mv: Point) -> Option<u32> {
        let (first, count) = self.node(parent).children_range()?;
        (first..first + count).find(|&i| self.node(i).mv() == mv)
    }

    /// Atomically publish a contiguous child range for `parent`,
    /// allocating from the caller's allocator. First writer wins.
    pub fn create_children(
        &self,
        allocator: usize,
        parent: u32,
        moves: &[MoveInfo],
    ) -> CreateResult {
        debug_assert!(!moves.is_empty());
        let parent_node = self.node(parent);
        if parent_node.has_children() {
            return CreateResult::Raced;
        }
        let a = &self.allocators[allocator];
        let cursor = a.cursor.load(Ordering::Relaxed);
        let n = moves.len() as u32;
        if cursor + n > a.end {
            return CreateResult::OutOfMemory;
        }
        for (i, info) in moves.iter().enumerate() {
            let node = &self.nodes[(cursor + i as u32) as usize];
            node.reset(info.mv);
            node.prior_value
                .store(info.prior_value.to_bits(), Ordering::Relaxed);
            node.prior_count
                .store(info.prior_count.to_bits(), Ordering::Relaxed);
            node.predictor
                .store(info.predictor.to_bits(), Ordering::Relaxed);
            if info.prior_count > 0.0 {
                node.stats
                    .initialize(info.prior_value, info.prior_count.round() as u32);
            }
        }
        a.cursor.store(cursor + n, Ordering::Relaxed);
        let packed = ((cursor as u64) << 32) | n as u64;
        match parent_node
            .children
            .compare_exchange(0, packed, Ordering::Release, Ordering::Relaxed)
        {
            Ok(_) => CreateResult::Published,
            Err(_) => {
                // Lost the publish race; withdraw the private allocation.
                a.cursor.store(cursor, Ordering::Relaxed);
                CreateResult::Raced
            }
        }
    }

    /// Copy the subtree reached by `sequence` from `self` into `target`.
    /// `target` is cleared first; on timeout or exhaustion it is left
    /// empty and the call reports failure.
    pub fn extract_subtree(
        &self,
        target: &mut UctTree,
        sequence: &[Point],
        time_limit: Duration,
    ) -> bool {
        target.clear();
        let mut idx = 0u32;
        for &mv in sequence {
            match self.find_child(idx, mv) {
                Some(child) => idx = child,
                None => return false,
            }
        }
        let deadline = Instant::now() + time_limit;
        if self.copy_subtree(target, idx, 0, &deadline) {
            true
        } else {
            target.clear();
            false
        }
    }

    /// Copy the whole tree, dropping children below `min_count` visits.
    /// Statistics of surviving nodes are preserved node-for-node.
    pub fn copy_prune_low_count(&self, target: &mut UctTree, min_count: u32) -> bool {
        target.clear();
        let deadline = Instant::now() + Duration::from_secs(3600);
        let ok = self.copy_subtree_filtered(target, 0, 0, &deadline, min_count);
        if !ok {
            target.clear();
        }
        ok
    }

    fn copy_subtree(
        &self,
        target: &mut UctTree,
        src_root: u32,
        dst_root: u32,
        deadline: &Instant,
    ) -> bool {
        self.copy_subtree_filtered(target, src_root, dst_root, deadline, 0)
    }

    fn copy_subtree_filtered(
        &self,
        target: &mut UctTree,
        src_root: u32,
        dst_root: u32,
        deadline: &Instant,
        min_count: u32,
    ) -> bool {
        target.node(dst_root).copy_data_from(self.node(src_root));
        let mut queue: Vec<(u32, u32)> = vec![(src_root, dst_root)];
        let mut alloc_rr = 0usize;
        let mut copied = 0usize;
        while let Some((src, dst)) = queue.pop() {
            if copied % 512 == 0 && Instant::now() >= *deadline {
                return false;
            }
            let Some((first, count)) = self.node(src).children_range() else {
                continue;
            };
            let keep: Vec<u32> = (first..first + count)
                .filter(|&i| min_count == 0 || self.node(i).stats().count() >= min_count)
                .collect();
            if keep.is_empty() {
                continue;
            }
            // Round-robin over target allocators, skipping full ones.
            let n = keep.len() as u32;
            let mut placed = None;
            for probe in 0..target.allocators.len() {
                let id = (alloc_rr + probe) % target.allocators.len();
                let a = &target.allocators[id];
                let cursor = a.cursor.load(Ordering::Relaxed);
                if cursor + n <= a.end {
                    a.cursor.store(cursor + n, Ordering::Relaxed);
                    placed = Some((id, cursor));
                    break;
                }
            }
            let Some((id, cursor)) = placed else {
                return false;
            };
            alloc_rr = id + 1;
            for (i, &src_child) in keep.iter().enumerate() {
                let dst_child = cursor + i as u32;
                target
                    .node(dst_child)
                    .copy_data_from(self.node(src_child));
                queue.push((src_child, dst_child));
            }
            let packed = ((cursor as u64) << 32) | n as u64;
            target.node(dst).children.store(packed, Ordering::Release);
            copied += keep.len();
        }
        true
    }
}
