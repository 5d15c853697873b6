//! partition-trie: constant-step classification of 32-bit points
//!
//! This crate answers "which interval contains this point?" over a fixed
//! partition of disjoint closed `u32` intervals. Lookups take a bounded
//! number of steps independent of the number of intervals, which makes it a
//! good fit for address-to-region tables with hundreds of thousands of
//! entries under heavy query load.
//!
//! ```
//! use partition_trie::{build_tree, Interval};
//!
//! let tree = build_tree(vec![
//!     Interval::new("low", 5, 8)?,
//!     Interval::new("high", 0xFF00_0000, 0xFF00_FF00)?,
//! ])?;
//!
//! assert_eq!(tree.get_interval(6).map(|i| *i.attachment()), Some("low"));
//! assert!(tree.get_interval(9).is_none());
//! # Ok::<(), partition_trie::Error>(())
//! ```

#![warn(missing_docs)]

/// Closed interval value type
pub mod interval;

/// Trie construction and lookup
pub mod trie;

/// Line-oriented partition file loader
pub mod loader;


// Re-exports
pub use config::BuildConfig;
pub use error::{Error, Result};
pub use interval::Interval;
pub use loader::{format_ipv4, load_partition, parse_ipv4, parse_partition, LabelInterner};
pub use trie::{build_tree, IntervalTree, TreeBuilder, TreeStats};

/// Error types for partition-trie operations
pub mod error {
    use std::error::Error as StdError;
    use std::fmt;
    use std::io;

    /// Result alias used throughout the crate
    pub type Result<T> = std::result::Result<T, Error>;

    /// Error types that can occur while building a tree or loading a partition
    #[derive(Debug)]
    pub enum Error {
        /// The builder received no intervals
        EmptyInput,
        /// An interval was constructed with `start > end`
        InvalidRange {
            /// Requested lower bound
            start: u32,
            /// Requested upper bound
            end: u32,
        },
        /// Two intervals overlap or share an endpoint
        OverlappingIntervals {
            /// The interval that sorts first, as `(start, end)`
            previous: (u32, u32),
            /// The interval that collides with it, as `(start, end)`
            next: (u32, u32),
        },
        /// The builder broke one of its own invariants
        InvariantViolation(&'static str),
        /// An I/O error occurred
        Io(io::Error),
        /// A partition file line could not be parsed
        Parse {
            /// 1-based line number
            line: usize,
            /// What was wrong with it
            reason: String,
        },
    }

    impl Error {
        /// Whether this error was caused by bad input rather than a defect or I/O
        pub fn is_invalid_argument(&self) -> bool {
            matches!(
                self,
                Error::EmptyInput | Error::InvalidRange { .. } | Error::OverlappingIntervals { .. }
            )
        }
    }

    impl fmt::Display for Error {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Error::EmptyInput => write!(f, "No intervals to build from"),
                Error::InvalidRange { start, end } => {
                    write!(f, "Invalid interval: start {:#x} is above end {:#x}", start, end)
                }
                Error::OverlappingIntervals { previous, next } => write!(
                    f,
                    "Overlapping intervals: [{:#x},{:#x}] and [{:#x},{:#x}]",
                    previous.0, previous.1, next.0, next.1
                ),
                Error::InvariantViolation(msg) => write!(f, "Internal invariant violated: {}", msg),
                Error::Io(err) => write!(f, "I/O error: {}", err),
                Error::Parse { line, reason } => write!(f, "Parse error on line {}: {}", line, reason),
            }
        }
    }

    impl StdError for Error {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            match self {
                Error::Io(err) => Some(err),
                _ => None,
            }
        }
    }

    impl From<io::Error> for Error {
        fn from(err: io::Error) -> Self {
            Error::Io(err)
        }
    }
}

/// Configuration options for building trees
pub mod config {
    /// Configuration for a [`crate::TreeBuilder`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct BuildConfig {
        /// Sort large inputs on the rayon pool; needs the `parallel` feature
        pub parallel_sort: bool,
        /// Inputs shorter than this are always sorted on the calling thread
        pub parallel_sort_threshold: usize,
    }

    impl Default for BuildConfig {
        fn default() -> Self {
            Self {
                parallel_sort: true,
                parallel_sort_threshold: 16 * 1024,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::OverlappingIntervals {
            previous: (5, 10),
            next: (8, 12),
        };
        assert_eq!(err.to_string(), "Overlapping intervals: [0x5,0xa] and [0x8,0xc]");

        let err = Error::Parse {
            line: 3,
            reason: "missing ']'".to_string(),
        };
        assert_eq!(err.to_string(), "Parse error on line 3: missing ']'");
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn test_error_source() {
        use std::error::Error as _;

        let err = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
        assert!(Error::EmptyInput.source().is_none());
    }

    #[test]
    fn test_default_config() {
        let config = BuildConfig::default();
        assert!(config.parallel_sort);
        assert_eq!(config.parallel_sort_threshold, 16384);
    }
}
