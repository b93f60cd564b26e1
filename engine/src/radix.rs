//! Mixed-radix row indexing
//!
//! Maps a row number to one index per digit and back. The last digit varies
//! fastest: with radices `k_1..k_n`, strides are `P_n = 1` and
//! `P_i = P_{i+1} * k_{i+1}`, and `index_i(row) = (row / P_i) mod k_i`.
//!
//! Used for joint-table rows and for conditional-table parent combinations.

/// Positional numeral system with a per-digit base
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MixedRadix {
    radices: Vec<usize>,
    strides: Vec<usize>,
    len: usize,
}

impl MixedRadix {
    /// `None` when the number of combinations overflows `usize`
    pub fn new(radices: Vec<usize>) -> Option<Self> {
        let mut strides = vec![0; radices.len()];
        let mut product: usize = 1;
        for (i, &k) in radices.iter().enumerate().rev() {
            strides[i] = product;
            product = product.checked_mul(k)?;
        }
        Some(MixedRadix {
            radices,
            strides,
            len: product,
        })
    }

    pub fn radices(&self) -> &[usize] {
        &self.radices
    }

    pub fn digits(&self) -> usize {
        self.radices.len()
    }

    /// Number of distinct combinations (1 for zero digits)
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Place value of digit `i`
    pub fn stride(&self, i: usize) -> usize {
        self.strides[i]
    }

    /// Digit `i` of `row`; caller guarantees `row < len`
    pub fn digit(&self, row: usize, i: usize) -> usize {
        (row / self.strides[i]) % self.radices[i]
    }

    pub fn decode(&self, row: usize) -> Option<Vec<usize>> {
        if row >= self.len {
            return None;
        }
        Some((0..self.digits()).map(|i| self.digit(row, i)).collect())
    }

    pub fn encode(&self, combination: &[usize]) -> Option<usize> {
        if combination.len() != self.digits() {
            return None;
        }
        let mut row = 0;
        for (i, &index) in combination.iter().enumerate() {
            if index >= self.radices[i] {
                return None;
            }
            row += index * self.strides[i];
        }
        Some(row)
    }
}
