//! Four-level byte trie over interval end values
//!
//! The trie is built once from a sorted partition and never changes
//! afterwards. Each level is keyed by one byte of the interval ends, most
//! significant first, and every branch keeps a dense child array in which
//! empty bytes point at the nearest greater sibling.

pub mod builder;
pub mod lookup;
pub(crate) mod node;
mod validate;

pub use builder::{build_tree, TreeBuilder};
pub use lookup::{IntervalTree, TreeStats};
