//! Packed boolean vector.
//!
//! Bits live in 64-bit words. The unused high bits of the last word are
//! always zero, which keeps `count_ones` and word-level scans honest
//! after the vector shrinks.

const WORD_BITS: usize = 64;

/// A resizable vector of booleans packed into `u64` words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
}

impl BitVector {
    /// Creates a vector of `len` cleared bits.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; Self::word_count(len)],
            len,
        }
    }

    /// Number of words needed to hold `len` bits.
    pub fn word_count(len: usize) -> usize {
        len.div_ceil(WORD_BITS)
    }

    /// Number of logical bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the bit at `index`. Out-of-range reads are `false`.
    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    /// Sets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`. Callers index with slot positions that
    /// were already bounds-checked against the owning table.
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.len, "bit index {index} out of range {}", self.len);
        let mask = 1 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Changes the logical length. New bits start cleared.
    pub fn resize(&mut self, len: usize) {
        self.words.resize(Self::word_count(len), 0);
        self.len = len;
        self.mask_tail();
    }

    /// Clears every bit and sets a new length, keeping the allocation.
    ///
    /// Reused words may hold bits from a previous life, so everything is
    /// zeroed rather than only the newly exposed range.
    pub fn reset(&mut self, len: usize) {
        self.words.clear();
        self.words.resize(Self::word_count(len), 0);
        self.len = len;
    }

    /// Clears every bit without changing the length.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates the positions of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_idx, &word)| {
                let mut bits = word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let offset = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some(word_idx * WORD_BITS + offset)
                })
            })
    }

    fn mask_tail(&mut self) {
        let used = self.len % WORD_BITS;
        if used != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << used) - 1;
            }
        }
    }
}
