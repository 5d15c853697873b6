//! Frozen trie nodes
//!
//! The finished trie lives in three flat vectors: branches, leaves, and one
//! slab of child slots shared by every branch. A branch owns the contiguous
//! slot run `first_slot..first_slot + width`, where slot `i` answers for byte
//! `min + i`. Parents are plain indices, so ownership stays acyclic and the
//! whole structure drops as a unit.

use std::mem;

/// Number of byte levels below the virtual root
pub(crate) const DEPTH: usize = 4;

/// Shift that brings the byte for each depth into the low 8 bits, most significant first
const BYTE_SHIFT: [u32; DEPTH] = [24, 16, 8, 0];

/// Byte of `value` examined at `depth`
#[inline]
pub(crate) fn byte_at(value: u32, depth: usize) -> u8 {
    (value >> BYTE_SHIFT[depth]) as u8
}

/// Index of a branch in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BranchId(u32);

impl BranchId {
    /// The virtual root is always allocated first
    pub const ROOT: BranchId = BranchId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tagged reference stored in a child slot.
///
/// Layout:
/// - Bit 31 = 1: leaf (index into `leaves`)
/// - Bit 31 = 0: branch (index into `branches`)
/// - Special: `u32::MAX` = vacant slot, only observable while freezing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeRef(u32);

/// Decoded form of a [`NodeRef`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Branch(BranchId),
    Leaf(usize),
}

impl NodeRef {
    const LEAF_BIT: u32 = 1 << 31;
    const INDEX_MASK: u32 = Self::LEAF_BIT - 1;
    pub const VACANT: NodeRef = NodeRef(u32::MAX);

    #[inline]
    pub fn branch(id: BranchId) -> Self {
        debug_assert!(id.0 < Self::INDEX_MASK);
        Self(id.0)
    }

    #[inline]
    pub fn leaf(index: usize) -> Self {
        debug_assert!(index < Self::INDEX_MASK as usize);
        Self(index as u32 | Self::LEAF_BIT)
    }

    #[inline]
    pub fn is_vacant(self) -> bool {
        self == Self::VACANT
    }

    #[inline]
    pub fn kind(self) -> NodeKind {
        debug_assert!(!self.is_vacant());
        if self.0 & Self::LEAF_BIT != 0 {
            NodeKind::Leaf((self.0 & Self::INDEX_MASK) as usize)
        } else {
            NodeKind::Branch(BranchId(self.0))
        }
    }
}

/// Internal node covering the byte range `[min, max]` at its depth
#[derive(Debug, Clone, Copy)]
pub(crate) struct Branch {
    /// Byte this branch represents in its parent (0 for the virtual root)
    pub owner: u8,
    pub min: u8,
    pub max: u8,
    pub first_slot: u32,
    pub parent: Option<BranchId>,
}

impl Branch {
    /// Number of child slots, `max - min + 1`
    #[inline]
    pub fn width(&self) -> usize {
        usize::from(self.max - self.min) + 1
    }
}

/// Terminal node at depth 4
#[derive(Debug, Clone, Copy)]
pub(crate) struct Leaf {
    /// Lowest byte of the interval's end
    pub owner: u8,
    /// Index into the tree's sorted interval vector
    pub interval: u32,
}

/// Owner of every node of one trie
#[derive(Debug, Clone, Default)]
pub(crate) struct TrieArena {
    branches: Vec<Branch>,
    leaves: Vec<Leaf>,
    slots: Vec<NodeRef>,
}

impl TrieArena {
    pub fn with_capacity(leaves: usize) -> Self {
        Self {
            branches: Vec::new(),
            leaves: Vec::with_capacity(leaves),
            slots: Vec::new(),
        }
    }

    /// Allocate a branch and reserve its slot run, all vacant
    pub fn push_branch(&mut self, owner: u8, min: u8, max: u8, parent: Option<BranchId>) -> BranchId {
        debug_assert!(min <= max);
        let id = BranchId(self.branches.len() as u32);
        let branch = Branch {
            owner,
            min,
            max,
            first_slot: self.slots.len() as u32,
            parent,
        };
        self.slots
            .resize(self.slots.len() + branch.width(), NodeRef::VACANT);
        self.branches.push(branch);
        id
    }

    pub fn push_leaf(&mut self, owner: u8, interval: usize) -> NodeRef {
        let index = self.leaves.len();
        self.leaves.push(Leaf {
            owner,
            interval: interval as u32,
        });
        NodeRef::leaf(index)
    }

    /// Place `child` at `offset`, then fill every vacant slot below it with the same child.
    ///
    /// Children must be placed in ascending byte order; afterwards each slot
    /// without a real owner points at the nearest child with a greater byte.
    pub fn place_child(&mut self, id: BranchId, offset: usize, child: NodeRef) {
        let first = self.branches[id.index()].first_slot as usize;
        let run = &mut self.slots[first..first + offset + 1];
        run[offset] = child;
        for slot in run[..offset].iter_mut().rev() {
            if !slot.is_vacant() {
                break;
            }
            *slot = child;
        }
    }

    #[inline]
    pub fn branch(&self, id: BranchId) -> &Branch {
        &self.branches[id.index()]
    }

    #[inline]
    pub fn leaf(&self, index: usize) -> &Leaf {
        &self.leaves[index]
    }

    #[inline]
    pub fn root(&self) -> &Branch {
        self.branch(BranchId::ROOT)
    }

    /// Child slot `offset` of `branch`
    #[inline]
    pub fn slot(&self, branch: &Branch, offset: usize) -> NodeRef {
        debug_assert!(offset < branch.width());
        self.slots[branch.first_slot as usize + offset]
    }

    /// The slot run of `branch`
    pub fn slots_of(&self, branch: &Branch) -> &[NodeRef] {
        let first = branch.first_slot as usize;
        &self.slots[first..first + branch.width()]
    }

    /// Byte owned by the node behind `node`
    #[inline]
    pub fn owner(&self, node: NodeRef) -> u8 {
        match node.kind() {
            NodeKind::Branch(id) => self.branch(id).owner,
            NodeKind::Leaf(index) => self.leaf(index).owner,
        }
    }

    /// Follow slot 0 down to a leaf: the smallest end below `node`
    #[inline]
    pub fn leftmost_leaf(&self, mut node: NodeRef) -> &Leaf {
        loop {
            match node.kind() {
                NodeKind::Leaf(index) => return self.leaf(index),
                NodeKind::Branch(id) => node = self.slot(self.branch(id), 0),
            }
        }
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn memory_usage(&self) -> usize {
        self.branches.capacity() * mem::size_of::<Branch>()
            + self.leaves.capacity() * mem::size_of::<Leaf>()
            + self.slots.capacity() * mem::size_of::<NodeRef>()
    }

    /// Release spare capacity left over from building
    pub fn shrink_to_fit(&mut self) {
        self.branches.shrink_to_fit();
        self.leaves.shrink_to_fit();
        self.slots.shrink_to_fit();
    }
}
