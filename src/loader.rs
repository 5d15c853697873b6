//! Line-oriented partition files
//!
//! Each non-blank line describes one interval as a pair of dotted-quad
//! addresses followed by a label:
//!
//! ```text
//! ## comment
//! [1.0.0.0,1.0.0.255] Region A
//! [1.0.1.0,1.0.3.255] Region B
//! ```
//!
//! Large tables repeat the same label many times, so labels are interned and
//! equal labels share one allocation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;

use ahash::AHashSet;
use tracing::debug;

use crate::error::{Error, Result};
use crate::interval::Interval;

/// Parse a dotted-quad address into its 32-bit value
pub fn parse_ipv4(text: &str) -> Option<u32> {
    text.trim().parse::<Ipv4Addr>().ok().map(u32::from)
}

/// Render a 32-bit value as a dotted-quad address
pub fn format_ipv4(value: u32) -> String {
    Ipv4Addr::from(value).to_string()
}

/// Deduplicates labels so equal attachments share one allocation
#[derive(Debug, Default)]
pub struct LabelInterner {
    labels: AHashSet<Arc<str>>,
}

impl LabelInterner {
    /// Create an empty interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared copy of `label`, allocating it on first sight
    pub fn intern(&mut self, label: &str) -> Arc<str> {
        if let Some(existing) = self.labels.get(label) {
            return Arc::clone(existing);
        }
        let label: Arc<str> = Arc::from(label);
        self.labels.insert(Arc::clone(&label));
        label
    }

    /// Number of distinct labels seen
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no label has been interned yet
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Read a partition file from disk
pub fn load_partition<P: AsRef<Path>>(path: P) -> Result<Vec<Interval<Arc<str>>>> {
    let file = File::open(path.as_ref())?;
    parse_partition(BufReader::new(file))
}

/// Parse partition lines from any buffered reader.
///
/// The intervals come back in file order; sorting and overlap checks are
/// left to the tree builder.
pub fn parse_partition<R: BufRead>(reader: R) -> Result<Vec<Interval<Arc<str>>>> {
    let mut interner = LabelInterner::new();
    let mut intervals = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with("##") {
            continue;
        }
        intervals.push(parse_line(line, index + 1, &mut interner)?);
    }

    debug!(
        intervals = intervals.len(),
        labels = interner.len(),
        "partition parsed"
    );
    Ok(intervals)
}

fn parse_line(line: &str, number: usize, interner: &mut LabelInterner) -> Result<Interval<Arc<str>>> {
    let parse_error = |reason: &str| Error::Parse {
        line: number,
        reason: reason.to_string(),
    };

    let body = line
        .strip_prefix('[')
        .ok_or_else(|| parse_error("expected '['"))?;
    let (range, label) = body
        .split_once(']')
        .ok_or_else(|| parse_error("missing ']'"))?;
    let (start, end) = range
        .split_once(',')
        .ok_or_else(|| parse_error("missing ',' between addresses"))?;

    let start = parse_ipv4(start).ok_or_else(|| parse_error("invalid start address"))?;
    let end = parse_ipv4(end).ok_or_else(|| parse_error("invalid end address"))?;
    let label = interner.intern(label.trim());

    Interval::new(label, start, end).map_err(|err| parse_error(&err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const SAMPLE: &str = "\
## sample partition
[0.0.0.0,0.255.255.255] Reserved

[1.0.0.0,1.0.0.255] Region A
[1.0.1.0,1.0.3.255] Region B
[1.0.4.0,1.0.7.255] Region A
";

    #[test]
    fn test_ipv4_conversion() {
        assert_eq!(parse_ipv4("127.0.0.1"), Some(0x7F00_0001));
        assert_eq!(parse_ipv4(" 255.255.255.255 "), Some(u32::MAX));
        assert_eq!(parse_ipv4("1.85.159.160"), Some(0x0155_9FA0));
        assert_eq!(parse_ipv4("256.0.0.1"), None);
        assert_eq!(parse_ipv4("1.2.3"), None);

        assert_eq!(format_ipv4(0x0808_0808), "8.8.8.8");
        assert_eq!(format_ipv4(0), "0.0.0.0");
    }

    #[test]
    fn test_interner_shares_labels() {
        let mut interner = LabelInterner::new();
        let a = interner.intern("Region A");
        let b = interner.intern("Region B");
        let a2 = interner.intern("Region A");

        assert!(Arc::ptr_eq(&a, &a2));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_parse_partition() {
        let intervals = parse_partition(Cursor::new(SAMPLE)).unwrap();

        assert_eq!(intervals.len(), 4);
        assert_eq!(intervals[0].start(), 0);
        assert_eq!(intervals[0].end(), 0x00FF_FFFF);
        assert_eq!(&**intervals[1].attachment(), "Region A");
        assert_eq!(intervals[2].start(), 0x0100_0100);
        assert!(Arc::ptr_eq(intervals[1].attachment(), intervals[3].attachment()));
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = parse_partition(Cursor::new("[1.0.0.0,1.0.0.255] ok\n1.0.1.0,1.0.1.9] bad\n"))
            .unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));

        let err = parse_partition(Cursor::new("[1.0.0.0 1.0.0.255] x\n")).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));

        let err = parse_partition(Cursor::new("[1.0.0.9,1.0.0.1] inverted\n")).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));

        let err = parse_partition(Cursor::new("[1.0.0.0,1.0.0.300] x\n")).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn test_load_partition_and_lookup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file.flush().unwrap();

        let intervals = load_partition(file.path()).unwrap();
        let tree = crate::build_tree(intervals).unwrap();

        let label = |addr: &str| {
            tree.get_interval(parse_ipv4(addr).unwrap())
                .map(|i| i.attachment().to_string())
        };
        assert_eq!(label("0.1.2.3").as_deref(), Some("Reserved"));
        assert_eq!(label("1.0.2.200").as_deref(), Some("Region B"));
        assert_eq!(label("1.0.7.255").as_deref(), Some("Region A"));
        assert_eq!(label("1.0.8.0"), None);
        assert_eq!(label("255.255.255.255"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_partition(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
