//! Summary - the mergeable result value of row-producing extraction tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed time interval covered by an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The enclosing span of two intervals: outermost endpoints only.
    /// Gaps and overlaps between the inputs are not detected.
    fn span(self, other: Interval) -> Interval {
        Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Result of a data-extraction task: a row count plus the time interval
/// the extracted rows cover, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    row_count: u64,
    interval: Option<Interval>,
}

impl Summary {
    pub const EMPTY: Summary = Summary {
        row_count: 0,
        interval: None,
    };

    pub fn new(row_count: u64) -> Self {
        Self {
            row_count,
            interval: None,
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn interval(&self) -> Option<Interval> {
        self.interval
    }

    /// Merge two summaries from sibling or retried sub-extractions.
    ///
    /// If either side has zero rows the other is returned unchanged.
    /// Otherwise row counts are summed and the covered intervals merge
    /// into their enclosing span. The span does not verify that the two
    /// inputs are adjacent or disjoint; callers are expected not to
    /// issue overlapping extraction windows.
    pub fn combine(self, other: Summary) -> Summary {
        if self.row_count == 0 {
            return other;
        }
        if other.row_count == 0 {
            return self;
        }
        let interval = match (self.interval, other.interval) {
            (Some(a), Some(b)) => Some(a.span(b)),
            (a, b) => a.or(b),
        };
        Summary {
            row_count: self.row_count + other.row_count,
            interval,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.interval {
            Some(interval) => write!(f, "{} rows covering {}", self.row_count, interval),
            None => write!(f, "{} rows", self.row_count),
        }
    }
}
