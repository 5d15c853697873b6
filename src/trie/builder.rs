//! Batch construction of the partition trie
//!
//! Building runs in three passes over the sorted partition:
//!
//! 1. Sort by start and reject overlapping or touching neighbours.
//! 2. Stage the trie breadth-first. Each staged node covers a contiguous run
//!    of the sorted intervals; its children split that run by the byte of each
//!    interval's *end* at the next depth.
//! 3. Freeze the staged nodes depth-first into the arena, filling every empty
//!    child slot with the nearest child holding a greater byte.

use std::collections::VecDeque;
use std::ops::Range;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::trie::lookup::IntervalTree;
use crate::trie::node::{byte_at, BranchId, NodeRef, TrieArena, DEPTH};

/// Build a tree with the default configuration.
///
/// Fails with an invalid-argument error if `intervals` is empty or if any two
/// intervals overlap or share an endpoint.
pub fn build_tree<T, I>(intervals: I) -> Result<IntervalTree<T>>
where
    I: IntoIterator<Item = Interval<T>>,
{
    TreeBuilder::new().build(intervals)
}

/// Configurable builder for [`IntervalTree`]
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    config: BuildConfig,
}

impl TreeBuilder {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with the given configuration
    pub fn with_config(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Get the builder configuration
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Sort, validate and freeze `intervals` into an immutable tree
    pub fn build<T, I>(&self, intervals: I) -> Result<IntervalTree<T>>
    where
        I: IntoIterator<Item = Interval<T>>,
    {
        let intervals: Vec<Interval<T>> = intervals.into_iter().collect();
        if intervals.is_empty() {
            return Err(Error::EmptyInput);
        }
        debug!(intervals = intervals.len(), "building partition trie");

        let intervals = self.sort(intervals)?;
        check_partition(&intervals)?;

        let staged = stage(&intervals)?;
        let mut arena = TrieArena::with_capacity(intervals.len());
        freeze(&staged, 0, None, &mut arena)?;
        arena.shrink_to_fit();

        let tree = IntervalTree::from_parts(intervals, arena);
        let stats = tree.stats();
        debug!(
            branches = stats.branch_count,
            leaves = stats.leaf_count,
            slots = stats.slot_count,
            gap_fills = stats.gap_fill_count,
            "partition trie built"
        );
        Ok(tree)
    }

    /// Sort ascending by start. Equal starts keep their input order.
    ///
    /// Only `(start, position)` keys are sorted, so the parallel path places no
    /// bounds on the attachment type.
    fn sort<T>(&self, intervals: Vec<Interval<T>>) -> Result<Vec<Interval<T>>> {
        if intervals.windows(2).all(|w| w[0].start() <= w[1].start()) {
            return Ok(intervals);
        }

        let mut keys: Vec<(u32, u32)> = intervals
            .iter()
            .enumerate()
            .map(|(position, interval)| (interval.start(), position as u32))
            .collect();
        self.sort_keys(&mut keys);

        let mut pending: Vec<Option<Interval<T>>> = intervals.into_iter().map(Some).collect();
        keys.iter()
            .map(|&(_, position)| {
                pending[position as usize]
                    .take()
                    .ok_or(Error::InvariantViolation("sort produced a duplicate position"))
            })
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn sort_keys(&self, keys: &mut [(u32, u32)]) {
        use rayon::slice::ParallelSliceMut;

        if self.config.parallel_sort && keys.len() >= self.config.parallel_sort_threshold {
            trace!(keys = keys.len(), "parallel sort");
            keys.par_sort_unstable();
        } else {
            keys.sort_unstable();
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn sort_keys(&self, keys: &mut [(u32, u32)]) {
        keys.sort_unstable();
    }
}

/// Reject neighbours where the next start does not lie past the previous end
fn check_partition<T>(sorted: &[Interval<T>]) -> Result<()> {
    for pair in sorted.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        if next.start() <= previous.end() {
            return Err(Error::OverlappingIntervals {
                previous: (previous.start(), previous.end()),
                next: (next.start(), next.end()),
            });
        }
    }
    Ok(())
}

/// Node of the breadth-first staging pass
#[derive(Debug, Clone)]
struct StagedNode {
    /// Byte of the covered ends at this node's own level
    byte: u8,
    /// 0 for the virtual root, 4 for leaves
    depth: u8,
    /// Covered run of the sorted intervals, `left..right`
    left: u32,
    right: u32,
    /// Children within the staged vector; always contiguous
    children: Range<u32>,
}

/// Stage the trie breadth-first. Index 0 of the result is the virtual root.
fn stage<T>(intervals: &[Interval<T>]) -> Result<Vec<StagedNode>> {
    let mut staged = vec![StagedNode {
        byte: 0,
        depth: 0,
        left: 0,
        right: intervals.len() as u32,
        children: 0..0,
    }];
    let mut queue = VecDeque::from([0usize]);
    // One scratch list reused for every parent.
    let mut scratch: SmallVec<[StagedNode; 16]> = SmallVec::new();
    let mut level = 0;

    while let Some(parent) = queue.pop_front() {
        let StagedNode {
            depth, left, right, ..
        } = staged[parent];
        if depth != level {
            trace!(depth, staged = staged.len(), "staging level");
            level = depth;
        }

        let child_depth = depth + 1;
        let mut previous: Option<u8> = None;
        for i in left..right {
            let byte = byte_at(intervals[i as usize].end(), usize::from(depth));
            match previous {
                Some(p) if p == byte && usize::from(child_depth) == DEPTH => {
                    return Err(Error::InvariantViolation("two intervals share an end"));
                }
                Some(p) if p == byte => continue,
                Some(p) if byte < p => {
                    return Err(Error::InvariantViolation("interval ends are not ascending"));
                }
                _ => {}
            }
            scratch.push(StagedNode {
                byte,
                depth: child_depth,
                left: i,
                right: i + 1,
                children: 0..0,
            });
            previous = Some(byte);
        }

        // Each sibling ends where the next begins; the last ends with its parent.
        let siblings = scratch.len();
        if siblings == 0 {
            return Err(Error::InvariantViolation("staged node covers no intervals"));
        }
        for k in 1..siblings {
            scratch[k - 1].right = scratch[k].left;
        }
        scratch[siblings - 1].right = right;

        let first = staged.len() as u32;
        for child in scratch.drain(..) {
            if usize::from(child_depth) < DEPTH {
                queue.push_back(staged.len());
            }
            staged.push(child);
        }
        staged[parent].children = first..staged.len() as u32;
    }

    Ok(staged)
}

/// Freeze staged node `index` and its subtree into `arena`
fn freeze(
    staged: &[StagedNode],
    index: usize,
    parent: Option<BranchId>,
    arena: &mut TrieArena,
) -> Result<NodeRef> {
    let node = &staged[index];
    if usize::from(node.depth) == DEPTH {
        return Ok(arena.push_leaf(node.byte, node.left as usize));
    }

    let children = node.children.start as usize..node.children.end as usize;
    if children.is_empty() {
        return Err(Error::InvariantViolation("branch without children"));
    }
    let (min, max) = (staged[children.start].byte, staged[children.end - 1].byte);
    if min > max {
        return Err(Error::InvariantViolation("empty byte range"));
    }

    let id = arena.push_branch(node.byte, min, max, parent);
    for child in children {
        let frozen = freeze(staged, child, Some(id), arena)?;
        arena.place_child(id, usize::from(staged[child].byte - min), frozen);
    }
    Ok(NodeRef::branch(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals(bounds: &[(u32, u32)]) -> Vec<Interval<usize>> {
        bounds
            .iter()
            .enumerate()
            .map(|(i, &(s, e))| Interval::new(i, s, e).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = build_tree(Vec::<Interval<()>>::new()).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_overlapping_input_rejected() {
        let err = build_tree(intervals(&[(5, 10), (8, 12)])).unwrap_err();
        assert!(matches!(
            err,
            Error::OverlappingIntervals {
                previous: (5, 10),
                next: (8, 12)
            }
        ));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_touching_input_rejected() {
        let err = build_tree(intervals(&[(5, 10), (10, 12)])).unwrap_err();
        assert!(matches!(err, Error::OverlappingIntervals { .. }));
    }

    #[test]
    fn test_duplicate_input_rejected() {
        let err = build_tree(intervals(&[(5, 10), (0, 1), (5, 10)])).unwrap_err();
        assert!(matches!(err, Error::OverlappingIntervals { .. }));
    }

    #[test]
    fn test_adjacent_input_accepted() {
        let tree = build_tree(intervals(&[(5, 10), (11, 12)])).unwrap();
        assert_eq!(tree.get_interval(10).map(|i| *i.attachment()), Some(0));
        assert_eq!(tree.get_interval(11).map(|i| *i.attachment()), Some(1));
    }

    #[test]
    fn test_unsorted_input_sorted_by_start() {
        let tree = build_tree(intervals(&[
            (0x8000_0000, 0x8000_00FF),
            (5, 8),
            (0xFFFF_0000, u32::MAX),
            (0x100, 0x1FF),
        ]))
        .unwrap();

        let starts: Vec<u32> = tree.iter().map(Interval::start).collect();
        assert_eq!(starts, vec![5, 0x100, 0x8000_0000, 0xFFFF_0000]);
        assert_eq!(tree.get_interval(0x8000_0010).map(|i| *i.attachment()), Some(0));
        assert_eq!(tree.get_interval(6).map(|i| *i.attachment()), Some(1));
    }

    #[test]
    fn test_sort_keeps_input_order_on_equal_starts() {
        // Equal starts are rejected afterwards, but the sort itself is stable.
        let builder = TreeBuilder::new();
        let sorted = builder
            .sort(intervals(&[(9, 9), (3, 4), (3, 3), (1, 1)]))
            .unwrap();
        let order: Vec<usize> = sorted.iter().map(|i| *i.attachment()).collect();
        assert_eq!(order, vec![3, 1, 2, 0]);
    }

    #[test]
    fn test_staging_groups_by_end_bytes() {
        let sorted = intervals(&[
            (0, 0x0100_0005),
            (0x0100_0006, 0x0100_0100),
            (0x0200_0000, 0x0200_0000),
        ]);
        let staged = stage(&sorted).unwrap();

        let root = &staged[0];
        let top: Vec<(u8, u32, u32)> = staged
            [root.children.start as usize..root.children.end as usize]
            .iter()
            .map(|n| (n.byte, n.left, n.right))
            .collect();
        assert_eq!(top, vec![(0x01, 0, 2), (0x02, 2, 3)]);

        let leaves: Vec<(u8, u32)> = staged
            .iter()
            .filter(|n| usize::from(n.depth) == DEPTH)
            .map(|n| (n.byte, n.left))
            .collect();
        assert_eq!(leaves, vec![(0x05, 0), (0x00, 1), (0x00, 2)]);
    }

    #[test]
    fn test_staging_is_breadth_first() {
        let sorted = intervals(&[(0, 0x0100_0000), (0x0100_0001, 0x0200_0000)]);
        let staged = stage(&sorted).unwrap();

        let depths: Vec<u8> = staged.iter().map(|n| n.depth).collect();
        assert!(depths.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(depths.iter().filter(|&&d| usize::from(d) == DEPTH).count(), 2);
    }

    #[test]
    fn test_staging_rejects_shared_end() {
        // Bypasses partition validation to reach the staging invariant.
        let sorted = intervals(&[(1, 10), (2, 10)]);
        assert!(matches!(stage(&sorted), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_staging_rejects_descending_ends() {
        let sorted = intervals(&[(1, 0x0200_0000), (2, 0x0100_0000)]);
        assert!(matches!(stage(&sorted), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_built_tree_validates() {
        let tree = build_tree(intervals(&[
            (0, 0),
            (1, 0x00FF_FFFF),
            (0x0100_0000, 0x0100_0000),
            (0x7F00_0000, 0x7FFF_FFFF),
            (0xFFFF_FFFF, 0xFFFF_FFFF),
        ]))
        .unwrap();
        tree.validate().unwrap();
    }

    #[test]
    fn test_builder_with_config() {
        let config = BuildConfig {
            parallel_sort: true,
            parallel_sort_threshold: 0,
        };
        let builder = TreeBuilder::with_config(config.clone());
        assert_eq!(builder.config(), &config);

        let tree = builder
            .build(intervals(&[(300, 400), (100, 200), (500, 600)]))
            .unwrap();
        assert_eq!(tree.get_interval(150).map(|i| *i.attachment()), Some(1));
        assert_eq!(tree.get_interval(550).map(|i| *i.attachment()), Some(2));
    }
}
