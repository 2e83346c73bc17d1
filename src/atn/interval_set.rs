//! Sets of integers stored as sorted, disjoint, inclusive intervals.
//!
//! Used for token-type sets in parser automata and code-point sets in lexer
//! automata.

use std::fmt;

use crate::grammar::Vocabulary;

/// Token type of the end-of-file token
pub const EOF: i32 = -1;
/// Marker for "can reach the end of the rule" in lookahead sets
pub const EPSILON: i32 = -2;
/// Largest Unicode code point
pub const MAX_CHAR: i32 = 0x10FFFF;

/// An inclusive interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: i32,
    pub end: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(value: i32) -> Self {
        Self::of_range(value, value)
    }

    pub fn of_range(start: i32, end: i32) -> Self {
        let mut set = Self::new();
        set.add_range(start, end);
        set
    }

    pub fn add(&mut self, value: i32) {
        self.add_range(value, value);
    }

    pub fn add_range(&mut self, start: i32, end: i32) {
        if start > end {
            return;
        }
        let pos = self
            .intervals
            .partition_point(|iv| iv.end < start.saturating_sub(1));
        let mut merged = Interval { start, end };
        let mut last = pos;
        while last < self.intervals.len() && self.intervals[last].start <= end.saturating_add(1) {
            merged.start = merged.start.min(self.intervals[last].start);
            merged.end = merged.end.max(self.intervals[last].end);
            last += 1;
        }
        self.intervals.splice(pos..last, [merged]);
    }

    pub fn add_all(&mut self, other: &IntervalSet) {
        for iv in &other.intervals {
            self.add_range(iv.start, iv.end);
        }
    }

    pub fn remove(&mut self, value: i32) {
        *self = self.subtract(&Self::of(value));
    }

    pub fn contains(&self, value: i32) -> bool {
        let pos = self.intervals.partition_point(|iv| iv.end < value);
        self.intervals
            .get(pos)
            .is_some_and(|iv| iv.start <= value)
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn min_element(&self) -> Option<i32> {
        self.intervals.first().map(|iv| iv.start)
    }

    /// Number of values in the set
    pub fn size(&self) -> u64 {
        self.intervals
            .iter()
            .map(|iv| (iv.end as i64 - iv.start as i64 + 1) as u64)
            .sum()
    }

    /// All values in ascending order
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals.iter().flat_map(|iv| iv.start..=iv.end)
    }

    /// Values in `[min, max]` that are not in this set
    pub fn complement(&self, min: i32, max: i32) -> IntervalSet {
        Self::of_range(min, max).subtract(self)
    }

    pub fn subtract(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = IntervalSet::new();
        for iv in &self.intervals {
            let mut start = iv.start;
            let end = iv.end;
            for cut in &other.intervals {
                if cut.end < start || cut.start > end {
                    continue;
                }
                if cut.start > start {
                    result.intervals.push(Interval {
                        start,
                        end: cut.start - 1,
                    });
                }
                start = cut.end.saturating_add(1);
                if start > end {
                    break;
                }
            }
            if start <= end {
                result.intervals.push(Interval { start, end });
            }
        }
        result
    }

    pub fn or(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = self.clone();
        result.add_all(other);
        result
    }

    /// Render with token display names, e.g. `{INT, ID}` or `'='`
    pub fn to_string_with(&self, vocabulary: &Vocabulary) -> String {
        let names: Vec<String> = self
            .iter()
            .map(|ty| match ty {
                EOF => "<EOF>".to_string(),
                EPSILON => "<EPSILON>".to_string(),
                ty => vocabulary.display_name(ty),
            })
            .collect();
        match names.as_slice() {
            [] => "{}".to_string(),
            [single] => single.clone(),
            _ => format!("{{{}}}", names.join(", ")),
        }
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .intervals
            .iter()
            .map(|iv| {
                if iv.start == iv.end {
                    iv.start.to_string()
                } else {
                    format!("{}..{}", iv.start, iv.end)
                }
            })
            .collect();
        if parts.len() == 1 {
            write!(f, "{}", parts[0])
        } else {
            write!(f, "{{{}}}", parts.join(", "))
        }
    }
}

impl FromIterator<i32> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> Self {
        let mut set = IntervalSet::new();
        for v in iter {
            set.add(v);
        }
        set
    }
}
