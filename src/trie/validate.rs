//! Structural checks over a frozen trie

use crate::error::{Error, Result};
use crate::trie::lookup::IntervalTree;
use crate::trie::node::{BranchId, NodeKind, DEPTH};

impl<T> IntervalTree<T> {
    /// Validate every structural invariant of the trie.
    ///
    /// Walks the whole tree, so this is meant for tests and debugging rather
    /// than the query path.
    pub fn validate(&self) -> Result<()> {
        let arena = self.arena();
        let root = arena.root();
        if root.parent.is_some() {
            return Err(Error::InvariantViolation("root has a parent"));
        }

        let mut next_interval = 0usize;
        // (branch, depth, end bytes above this branch)
        let mut stack = vec![(BranchId::ROOT, 0usize, 0u32)];
        while let Some((id, depth, prefix)) = stack.pop() {
            let branch = arena.branch(id);
            let slots = arena.slots_of(branch);
            let mut children = Vec::new();

            for (offset, &slot) in slots.iter().enumerate() {
                if slot.is_vacant() {
                    return Err(Error::InvariantViolation("vacant child slot"));
                }
                let byte = branch.min + offset as u8;
                let owner = arena.owner(slot);
                if owner < byte {
                    return Err(Error::InvariantViolation("slot points at a lesser byte"));
                }
                if owner > byte {
                    // Gap fill must resolve to the nearest greater owner.
                    if offset + 1 == slots.len() || slots[offset + 1] != slot {
                        return Err(Error::InvariantViolation("gap fill skips a nearer child"));
                    }
                    continue;
                }

                let prefix = (prefix << 8) | u32::from(byte);
                match slot.kind() {
                    NodeKind::Leaf(_) if depth + 1 != DEPTH => {
                        return Err(Error::InvariantViolation("leaf above the last level"));
                    }
                    NodeKind::Branch(_) if depth + 1 == DEPTH => {
                        return Err(Error::InvariantViolation("branch at the leaf level"));
                    }
                    NodeKind::Leaf(index) => {
                        let leaf = arena.leaf(index);
                        if leaf.interval as usize != next_interval {
                            return Err(Error::InvariantViolation("leaves out of interval order"));
                        }
                        if self.intervals()[next_interval].end() != prefix {
                            return Err(Error::InvariantViolation("leaf path differs from interval end"));
                        }
                        next_interval += 1;
                    }
                    NodeKind::Branch(child) => {
                        if arena.branch(child).parent != Some(id) {
                            return Err(Error::InvariantViolation("broken parent reference"));
                        }
                        children.push((child, depth + 1, prefix));
                    }
                }
            }

            if arena.owner(slots[0]) != branch.min || arena.owner(slots[slots.len() - 1]) != branch.max {
                return Err(Error::InvariantViolation("branch bounds are not owned"));
            }
            // Ascending order on pop.
            stack.extend(children.into_iter().rev());
        }

        if next_interval != self.len() || arena.leaf_count() != self.len() {
            return Err(Error::InvariantViolation("leaf count differs from interval count"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::trie::lookup::IntervalTree;
    use crate::trie::node::{NodeRef, TrieArena};
    use crate::{build_tree, Error, Interval};

    #[test]
    fn test_validate_built_trees() {
        let tree = build_tree(vec![Interval::new((), 5, 8).unwrap()]).unwrap();
        tree.validate().unwrap();

        let tree = build_tree(
            (0..255u32).map(|i| Interval::new(i, i * 0x0101_0101, i * 0x0101_0101).unwrap()),
        )
        .unwrap();
        tree.validate().unwrap();
        assert_eq!(tree.stats().gap_fill_count, 0);
    }

    #[test]
    fn test_validate_detects_broken_gap_fill() {
        // Root spans bytes 0..=2 with owners 0 and 2; slot 1 wrongly points back at 0.
        let intervals = vec![
            Interval::new((), 0, 0).unwrap(),
            Interval::new((), 0x0200_0000, 0x0200_0000).unwrap(),
        ];
        let mut arena = TrieArena::default();
        let root = arena.push_branch(0, 0, 2, None);
        let mut tops = Vec::new();
        for (index, top) in [(0usize, 0u8), (1, 2)] {
            let a = arena.push_branch(top, 0, 0, Some(root));
            let b = arena.push_branch(0, 0, 0, Some(a));
            let c = arena.push_branch(0, 0, 0, Some(b));
            let leaf = arena.push_leaf(0, index);
            arena.place_child(c, 0, leaf);
            arena.place_child(b, 0, NodeRef::branch(c));
            arena.place_child(a, 0, NodeRef::branch(b));
            tops.push(NodeRef::branch(a));
        }
        arena.place_child(root, 0, tops[0]);
        arena.place_child(root, 1, tops[0]);
        arena.place_child(root, 2, tops[1]);

        let tree = IntervalTree::from_parts(intervals, arena);
        assert!(matches!(tree.validate(), Err(Error::InvariantViolation(_))));
    }
}
