//! Index masks: which rows (or row×channel cells) of a table are accepted.
//!
//! Most tables end up fully accepted, so `Full` and `None` carry no bitmap.
//! Only partial results own an explicit bit vector, sized to the table.
//!
//! 2D layout: each row spans `nb_cols + 2` bits. The two trailing bits are
//! per-row markers, "no accepted cell" and "every cell accepted", so callers
//! can test a row's aggregate state before looking at cells.
//!
//! Masks are built once through [`MaskBuilder`] and never mutated afterwards.

use std::fmt;

/// Dense bit vector over 64-bit words.
#[derive(Clone, PartialEq, Eq)]
struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    fn with_len(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    #[inline]
    fn get(&self, i: usize) -> bool {
        i < self.len && (self.words[i / 64] >> (i % 64)) & 1 == 1
    }

    #[inline]
    fn set(&mut self, i: usize) {
        if i < self.len {
            self.words[i / 64] |= 1u64 << (i % 64);
        }
    }

    #[inline]
    fn clear(&mut self, i: usize) {
        if i < self.len {
            self.words[i / 64] &= !(1u64 << (i % 64));
        }
    }

    fn count_range(&self, start: usize, end: usize) -> usize {
        (start..end.min(self.len)).filter(|&i| self.get(i)).count()
    }
}

/// Explicit bitmap backing a partial mask.
#[derive(Clone, PartialEq, Eq)]
pub struct MaskBits {
    nb_rows: usize,
    /// 0 for a row mask.
    nb_cols: usize,
    bits: BitSet,
}

impl MaskBits {
    #[inline]
    fn stride(&self) -> usize {
        self.nb_cols + 2
    }

    #[inline]
    fn cell(&self, row: usize, col: usize) -> usize {
        row * self.stride() + col
    }

    #[inline]
    fn none_marker(&self, row: usize) -> usize {
        row * self.stride() + self.nb_cols
    }

    #[inline]
    fn full_marker(&self, row: usize) -> usize {
        row * self.stride() + self.nb_cols + 1
    }

    pub fn nb_rows(&self) -> usize {
        self.nb_rows
    }

    pub fn nb_cols(&self) -> usize {
        self.nb_cols
    }

    pub fn is_2d(&self) -> bool {
        self.nb_cols != 0
    }

    /// Accepted rows (row mask) or accepted cells (2D mask).
    pub fn count(&self) -> usize {
        if self.is_2d() {
            (0..self.nb_rows)
                .map(|row| {
                    let start = self.cell(row, 0);
                    self.bits.count_range(start, start + self.nb_cols)
                })
                .sum()
        } else {
            self.bits.count_range(0, self.nb_rows)
        }
    }
}

/// Row or row×channel membership.
#[derive(Clone, PartialEq, Eq)]
pub enum IndexMask {
    /// Everything accepted.
    Full,
    /// Nothing accepted.
    None,
    Explicit(MaskBits),
}

impl IndexMask {
    pub fn is_full(&self) -> bool {
        matches!(self, IndexMask::Full)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, IndexMask::None)
    }

    pub fn is_2d(&self) -> bool {
        matches!(self, IndexMask::Explicit(bits) if bits.is_2d())
    }

    /// Row acceptance. On a 2D mask: the row has at least one accepted cell.
    #[inline]
    pub fn accept(&self, row: usize) -> bool {
        match self {
            IndexMask::Full => true,
            IndexMask::None => false,
            IndexMask::Explicit(m) if m.is_2d() => {
                row < m.nb_rows && !m.bits.get(m.none_marker(row))
            }
            IndexMask::Explicit(m) => m.bits.get(row),
        }
    }

    /// Cell acceptance. On a row mask the column is ignored.
    #[inline]
    pub fn accept_cell(&self, row: usize, col: usize) -> bool {
        match self {
            IndexMask::Full => true,
            IndexMask::None => false,
            IndexMask::Explicit(m) if m.is_2d() => {
                row < m.nb_rows && col < m.nb_cols && m.bits.get(m.cell(row, col))
            }
            IndexMask::Explicit(m) => m.bits.get(row),
        }
    }

    /// O(1): the row has no accepted cell.
    pub fn is_row_empty(&self, row: usize) -> bool {
        !self.accept(row)
    }

    /// O(1): every cell of the row is accepted.
    pub fn is_row_full(&self, row: usize) -> bool {
        match self {
            IndexMask::Full => true,
            IndexMask::None => false,
            IndexMask::Explicit(m) if m.is_2d() => m.bits.get(m.full_marker(row)),
            IndexMask::Explicit(m) => m.bits.get(row),
        }
    }

    pub fn bits(&self) -> Option<&MaskBits> {
        match self {
            IndexMask::Explicit(m) => Some(m),
            _ => None,
        }
    }
}

/// True only for a present mask that is not `Full`.
pub fn is_not_full(mask: Option<&IndexMask>) -> bool {
    matches!(mask, Some(m) if !m.is_full())
}

impl fmt::Debug for IndexMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexMask::Full => write!(f, "IndexMask::Full"),
            IndexMask::None => write!(f, "IndexMask::None"),
            IndexMask::Explicit(m) if m.is_2d() => write!(
                f,
                "IndexMask::Cells({}x{}, accepted={})",
                m.nb_rows,
                m.nb_cols,
                m.count()
            ),
            IndexMask::Explicit(m) => {
                write!(f, "IndexMask::Rows({}, accepted={})", m.nb_rows, m.count())
            }
        }
    }
}

/// Builds an [`IndexMask`]; collapses to `Full`/`None` when possible.
pub struct MaskBuilder {
    bits: MaskBits,
}

impl MaskBuilder {
    /// Row mask over `nb_rows` rows, nothing accepted yet.
    pub fn rows(nb_rows: usize) -> Self {
        Self {
            bits: MaskBits {
                nb_rows,
                nb_cols: 0,
                bits: BitSet::with_len(nb_rows),
            },
        }
    }

    /// Row×channel mask, nothing accepted yet. `nb_cols == 0` degrades to a row mask.
    pub fn cells(nb_rows: usize, nb_cols: usize) -> Self {
        if nb_cols == 0 {
            return Self::rows(nb_rows);
        }
        Self {
            bits: MaskBits {
                nb_rows,
                nb_cols,
                bits: BitSet::with_len(nb_rows * (nb_cols + 2)),
            },
        }
    }

    pub fn accept_row(&mut self, row: usize) {
        if row >= self.bits.nb_rows {
            return;
        }
        if self.bits.is_2d() {
            for col in 0..self.bits.nb_cols {
                let i = self.bits.cell(row, col);
                self.bits.bits.set(i);
            }
        } else {
            self.bits.bits.set(row);
        }
    }

    pub fn accept_cell(&mut self, row: usize, col: usize) {
        if !self.bits.is_2d() {
            self.accept_row(row);
            return;
        }
        if row < self.bits.nb_rows && col < self.bits.nb_cols {
            let i = self.bits.cell(row, col);
            self.bits.bits.set(i);
        }
    }

    pub fn build(mut self) -> IndexMask {
        let nb_rows = self.bits.nb_rows;
        if !self.bits.is_2d() {
            let count = self.bits.count();
            return if count == nb_rows {
                IndexMask::Full
            } else if count == 0 {
                IndexMask::None
            } else {
                IndexMask::Explicit(self.bits)
            };
        }

        let nb_cols = self.bits.nb_cols;
        let mut full_rows = 0;
        let mut empty_rows = 0;
        for row in 0..nb_rows {
            let start = self.bits.cell(row, 0);
            let n = self.bits.bits.count_range(start, start + nb_cols);
            let none = self.bits.none_marker(row);
            let full = self.bits.full_marker(row);
            self.bits.bits.clear(none);
            self.bits.bits.clear(full);
            if n == 0 {
                self.bits.bits.set(none);
                empty_rows += 1;
            } else if n == nb_cols {
                self.bits.bits.set(full);
                full_rows += 1;
            }
        }
        if full_rows == nb_rows {
            IndexMask::Full
        } else if empty_rows == nb_rows {
            IndexMask::None
        } else {
            IndexMask::Explicit(self.bits)
        }
    }
}
