//! Closed interval over unsigned 32-bit points
//!
//! An `Interval` is the unit of classification: a `[start, end]` range with an
//! opaque attachment owned by whoever built it. Bounds are plain `u32`, so
//! every comparison is unsigned.

use std::fmt;

use crate::error::{Error, Result};

/// A closed range `[start, end]` carrying a caller-defined attachment
#[derive(Debug, Clone)]
pub struct Interval<T> {
    attachment: T,
    start: u32,
    end: u32,
}

impl<T> Interval<T> {
    /// Create a new interval, rejecting `start > end`
    pub fn new(attachment: T, start: u32, end: u32) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self {
            attachment,
            start,
            end,
        })
    }

    /// Interval covering exactly one point
    pub fn point(attachment: T, point: u32) -> Self {
        Self {
            attachment,
            start: point,
            end: point,
        }
    }

    /// Inclusive lower bound
    #[inline]
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Inclusive upper bound
    #[inline]
    pub fn end(&self) -> u32 {
        self.end
    }

    /// The caller's attachment
    #[inline]
    pub fn attachment(&self) -> &T {
        &self.attachment
    }

    /// Consume the interval, returning its attachment
    pub fn into_attachment(self) -> T {
        self.attachment
    }

    /// Whether `point` lies within `[start, end]`
    #[inline]
    pub fn contains(&self, point: u32) -> bool {
        self.start <= point && point <= self.end
    }

    /// Number of points covered; `u64` because `[0, u32::MAX]` holds 2^32 of them
    pub fn len(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }

    /// Always false, an interval covers at least one point
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether two intervals overlap or touch, i.e. cannot both be in a partition
    pub fn conflicts_with<U>(&self, other: &Interval<U>) -> bool {
        let (lo, hi) = if self.start <= other.start {
            (self.end, other.start)
        } else {
            (other.end, self.start)
        };
        // Sharing a single endpoint is already a conflict.
        hi <= lo
    }
}

impl<T: fmt::Display> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x},{:#x}]:{}", self.start, self.end, self.attachment)
    }
}
