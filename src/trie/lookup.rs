//! Bounded-step point classification
//!
//! The trie indexes interval *end* values byte by byte. Every lookup resolves
//! to the interval with the smallest end that is not below the query point,
//! the same answer an upper-bound binary search over sorted ends would give,
//! and then confirms membership with `contains` since a partition may leave
//! gaps.

use std::slice;

use crate::interval::Interval;
use crate::trie::node::{byte_at, Branch, Leaf, NodeKind, TrieArena, DEPTH};

/// Immutable partition of 32-bit intervals with constant-step lookup.
///
/// Built by [`crate::TreeBuilder`] or [`crate::build_tree`]. Once built it is
/// never mutated, so it can be shared freely between reader threads.
#[derive(Debug, Clone)]
pub struct IntervalTree<T> {
    /// The partition, ascending by start (and therefore by end)
    intervals: Vec<Interval<T>>,
    arena: TrieArena,
}

impl<T> IntervalTree<T> {
    pub(crate) fn from_parts(intervals: Vec<Interval<T>>, arena: TrieArena) -> Self {
        Self { intervals, arena }
    }

    pub(crate) fn arena(&self) -> &TrieArena {
        &self.arena
    }

    /// Get the interval containing `point`, if any.
    ///
    /// Takes at most four descent steps plus one backtracking pass toward the
    /// root, regardless of how many intervals the tree holds.
    pub fn get_interval(&self, point: u32) -> Option<&Interval<T>> {
        let arena = &self.arena;
        let mut branch = arena.root();
        let mut depth = 0;

        loop {
            let byte = byte_at(point, depth);

            if byte < branch.min {
                // Every end below this branch is greater than the point.
                return self.candidate(arena.leftmost_leaf(arena.slot(branch, 0)), point);
            }
            if byte > branch.max {
                return self.backtrack(branch, depth, point);
            }

            let child = arena.slot(branch, usize::from(byte - branch.min));
            match child.kind() {
                NodeKind::Leaf(index) => {
                    let leaf = arena.leaf(index);
                    if leaf.owner == byte {
                        // All four bytes matched: the end equals the point.
                        return Some(&self.intervals[leaf.interval as usize]);
                    }
                    return self.candidate(leaf, point);
                }
                NodeKind::Branch(id) => {
                    let next = arena.branch(id);
                    if next.owner != byte {
                        // Gap-fill slot: the nearest greater byte holds the answer.
                        return self.candidate(arena.leftmost_leaf(child), point);
                    }
                    branch = next;
                    depth += 1;
                }
            }
        }
    }

    /// The point exceeds every end below `branch`; climb until an ancestor has
    /// a sibling with a greater byte.
    fn backtrack<'a>(
        &'a self,
        mut branch: &'a Branch,
        mut depth: usize,
        point: u32,
    ) -> Option<&'a Interval<T>> {
        let arena = &self.arena;
        while let Some(parent) = branch.parent {
            branch = arena.branch(parent);
            depth -= 1;

            // Computed wide so that byte 0xFF probes 256 and keeps climbing.
            let probe = u16::from(byte_at(point, depth)) + 1;
            if probe <= u16::from(branch.max) {
                debug_assert!(probe > u16::from(branch.min));
                let next = arena.slot(branch, usize::from(probe - u16::from(branch.min)));
                return self.candidate(arena.leftmost_leaf(next), point);
            }
        }
        None
    }

    #[inline]
    fn candidate(&self, leaf: &Leaf, point: u32) -> Option<&Interval<T>> {
        let interval = &self.intervals[leaf.interval as usize];
        interval.contains(point).then_some(interval)
    }

    /// Recursive formulation of [`Self::get_interval`], kept as a cross-check.
    pub(crate) fn get_interval_recursive(&self, point: u32) -> Option<&Interval<T>> {
        let leaf = self.search(self.arena.root(), point, 0)?;
        self.candidate(leaf, point)
    }

    fn search(&self, branch: &Branch, point: u32, depth: usize) -> Option<&Leaf> {
        let arena = &self.arena;
        let byte = byte_at(point, depth);
        if byte < branch.min {
            return Some(arena.leftmost_leaf(arena.slot(branch, 0)));
        }
        if byte > branch.max {
            return None;
        }

        let offset = usize::from(byte - branch.min);
        let child = arena.slot(branch, offset);
        let next = match child.kind() {
            NodeKind::Leaf(index) => return Some(arena.leaf(index)),
            NodeKind::Branch(id) => arena.branch(id),
        };
        if next.owner != byte {
            return Some(arena.leftmost_leaf(child));
        }

        match self.search(next, point, depth + 1) {
            Some(leaf) => Some(leaf),
            None if offset + 1 < branch.width() => {
                Some(arena.leftmost_leaf(arena.slot(branch, offset + 1)))
            }
            None => None,
        }
    }

    /// Number of intervals in the partition
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Always false, a tree is never built from an empty partition
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The partition in ascending order
    pub fn intervals(&self) -> &[Interval<T>] {
        &self.intervals
    }

    /// Iterate the partition in ascending order
    pub fn iter(&self) -> slice::Iter<'_, Interval<T>> {
        self.intervals.iter()
    }

    /// Smallest covered point
    pub fn min_point(&self) -> u32 {
        self.intervals.first().map_or(0, Interval::start)
    }

    /// Largest covered point
    pub fn max_point(&self) -> u32 {
        self.intervals.last().map_or(0, Interval::end)
    }

    /// Consume the tree, returning the sorted partition
    pub fn into_intervals(self) -> Vec<Interval<T>> {
        self.intervals
    }

    /// Get tree statistics
    pub fn stats(&self) -> TreeStats {
        let arena = &self.arena;
        let gap_fill_count = arena
            .branches()
            .iter()
            .map(|branch| {
                arena
                    .slots_of(branch)
                    .iter()
                    .zip(branch.min..=branch.max)
                    .filter(|&(&slot, byte)| arena.owner(slot) != byte)
                    .count()
            })
            .sum();

        TreeStats {
            interval_count: self.intervals.len(),
            branch_count: arena.branches().len(),
            leaf_count: arena.leaf_count(),
            slot_count: arena.slot_count(),
            gap_fill_count,
            depth: DEPTH,
            memory_usage: arena.memory_usage()
                + self.intervals.capacity() * std::mem::size_of::<Interval<T>>(),
        }
    }
}

impl<'a, T> IntoIterator for &'a IntervalTree<T> {
    type Item = &'a Interval<T>;
    type IntoIter = slice::Iter<'a, Interval<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Statistics about a built tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStats {
    /// Intervals in the partition
    pub interval_count: usize,
    /// Branches including the virtual root
    pub branch_count: usize,
    /// Leaves, one per interval
    pub leaf_count: usize,
    /// Child slots across all branches
    pub slot_count: usize,
    /// Slots holding a pointer to a greater sibling rather than their own child
    pub gap_fill_count: usize,
    /// Levels below the virtual root
    pub depth: usize,
    /// Approximate heap bytes held by the tree, attachments' own heap excluded
    pub memory_usage: usize,
}
