//! Probe-sequence generators.
//!
//! A [`Cursor`] walks forward from a start slot, wrapping at the table
//! capacity, for a bounded number of positions. A [`DualCursor`] runs two
//! cursors in lock-step, alternating single steps, and caps each so that
//! neither walks into the region the other one starts in. Together the
//! two chains cover every slot exactly once.

/// Bounded, wrap-around walk over `0..capacity`.
#[derive(Debug, Clone)]
pub struct Cursor {
    start: usize,
    capacity: usize,
    limit: usize,
    yielded: usize,
}

impl Cursor {
    /// Creates a cursor that yields at most `limit` positions starting at
    /// `start % capacity`. The limit never exceeds the capacity.
    pub fn new(start: usize, capacity: usize, limit: usize) -> Self {
        let start = if capacity == 0 { 0 } else { start % capacity };
        Self {
            start,
            capacity,
            limit: limit.min(capacity),
            yielded: 0,
        }
    }

    /// Whether the cursor has produced at least one position.
    pub fn started(&self) -> bool {
        self.yielded > 0
    }

    /// Whether the cursor will produce nothing more.
    pub fn ended(&self) -> bool {
        self.yielded >= self.limit
    }

    /// Moves taken past the start position.
    pub fn move_count(&self) -> usize {
        self.yielded.saturating_sub(1)
    }

    /// Stops the walk early.
    pub fn end(&mut self) {
        self.yielded = self.yielded.max(self.limit);
    }
}

impl Iterator for Cursor {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.ended() {
            return None;
        }
        let index = (self.start + self.yielded) % self.capacity;
        self.yielded += 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.limit - self.yielded.min(self.limit);
        (remaining, Some(remaining))
    }
}

/// Which of the two interleaved probe chains produced a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Primary,
    Secondary,
}

/// Two cursors advanced alternately, primary first.
#[derive(Debug, Clone)]
pub struct DualCursor {
    primary: Cursor,
    secondary: Cursor,
    next_chain: Chain,
    yielded: usize,
}

impl DualCursor {
    /// Builds the interleaved walk from two `(start, limit)` pairs.
    ///
    /// Each requested limit is further capped by the distance to the
    /// other chain's start, so the primary chain stops just before the
    /// secondary start and the secondary wraps around to just before the
    /// primary start. When both starts coincide the primary chain owns the
    /// whole table.
    pub fn new(capacity: usize, primary: (usize, usize), secondary: (usize, usize)) -> Self {
        let (a, b) = if capacity == 0 {
            (0, 0)
        } else {
            (primary.0 % capacity, secondary.0 % capacity)
        };
        let gap = if capacity == 0 {
            0
        } else {
            (b + capacity - a) % capacity
        };
        let (primary_cap, secondary_cap) = if gap == 0 {
            (capacity, 0)
        } else {
            (gap, capacity - gap)
        };

        Self {
            primary: Cursor::new(a, capacity, primary.1.min(primary_cap)),
            secondary: Cursor::new(b, capacity, secondary.1.min(secondary_cap)),
            next_chain: Chain::Primary,
            yielded: 0,
        }
    }

    /// The walk used for table placement: both chains bounded only by
    /// the capacity.
    pub fn probe(capacity: usize, primary: usize, secondary: usize) -> Self {
        Self::new(capacity, (primary, capacity), (secondary, capacity))
    }

    /// Positions produced so far across both chains.
    pub fn move_count(&self) -> usize {
        self.yielded
    }

    pub fn ended(&self) -> bool {
        self.primary.ended() && self.secondary.ended()
    }

    /// Stops one chain; the other keeps going.
    pub fn end_chain(&mut self, chain: Chain) {
        match chain {
            Chain::Primary => self.primary.end(),
            Chain::Secondary => self.secondary.end(),
        }
    }

    fn cursor_mut(&mut self, chain: Chain) -> &mut Cursor {
        match chain {
            Chain::Primary => &mut self.primary,
            Chain::Secondary => &mut self.secondary,
        }
    }
}

impl Iterator for DualCursor {
    type Item = (usize, Chain);

    fn next(&mut self) -> Option<(usize, Chain)> {
        let preferred = self.next_chain;
        let other = match preferred {
            Chain::Primary => Chain::Secondary,
            Chain::Secondary => Chain::Primary,
        };

        for chain in [preferred, other] {
            if let Some(index) = self.cursor_mut(chain).next() {
                self.next_chain = match chain {
                    Chain::Primary => Chain::Secondary,
                    Chain::Secondary => Chain::Primary,
                };
                self.yielded += 1;
                return Some((index, chain));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(cursor: DualCursor) -> Vec<usize> {
        cursor.map(|(index, _)| index).collect()
    }

    #[test]
    fn test_cursor_wraps() {
        let cursor = Cursor::new(4, 6, 4);
        assert_eq!(cursor.collect::<Vec<_>>(), vec![4, 5, 0, 1]);
    }

    #[test]
    fn test_cursor_state() {
        let mut cursor = Cursor::new(2, 5, 3);
        assert!(!cursor.started());

        assert_eq!(cursor.next(), Some(2));
        assert_eq!(cursor.next(), Some(3));
        assert!(cursor.started());
        assert_eq!(cursor.move_count(), 1);
        assert!(!cursor.ended());

        cursor.next();
        assert!(cursor.ended());
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_cursor_limit_capped_by_capacity() {
        let cursor = Cursor::new(0, 3, 10);
        assert_eq!(cursor.count(), 3);
    }

    #[test]
    fn test_dual_cursor_even_split() {
        let cursor = DualCursor::new(6, (0, 3), (3, 3));
        assert_eq!(indices(cursor), vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_dual_cursor_uneven_split() {
        let mut cursor = DualCursor::new(6, (0, 6), (2, 6));
        let visited: Vec<_> = cursor.by_ref().map(|(index, _)| index).collect();
        assert_eq!(visited, vec![0, 2, 1, 3, 4, 5]);
        assert!(cursor.ended());
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_dual_cursor_same_start_covers_table() {
        let cursor = DualCursor::probe(5, 3, 3);
        assert_eq!(indices(cursor), vec![3, 4, 0, 1, 2]);
    }

    #[test]
    fn test_dual_cursor_full_coverage() {
        for capacity in 1..20 {
            for a in 0..capacity {
                for b in 0..capacity {
                    let mut seen = indices(DualCursor::probe(capacity, a, b));
                    seen.sort_unstable();
                    assert_eq!(seen, (0..capacity).collect::<Vec<_>>());
                }
            }
        }
    }

    #[test]
    fn test_end_chain() {
        let mut cursor = DualCursor::probe(6, 0, 3);
        assert_eq!(cursor.next(), Some((0, Chain::Primary)));
        cursor.end_chain(Chain::Primary);
        let rest = indices(cursor);
        assert_eq!(rest, vec![3, 4, 5]);
    }

    #[test]
    fn test_empty_capacity() {
        assert_eq!(DualCursor::probe(0, 7, 9).next(), None);
    }
}
