//! Storage symmetry classes of packed electron repulsion integrals, and the index mappings between
//! four-index tuples and positions in the packed buffer.
//!
//! All layouts are row-major and use the compound index `ij = i * (i + 1) / 2 + j` for `i >= j`.
//!
//! | class  | stored tuples               | outer pairs       | block per outer pair    |
//! |--------|-----------------------------|-------------------|-------------------------|
//! | `s8`   | `i >= j, k >= l, ij >= kl`  | `npair`, tril     | `ij + 1` values         |
//! | `s4`   | `i >= j, k >= l`            | `npair`, tril     | `npair` values          |
//! | `s2ij` | `i >= j`                    | `npair`, tril     | `n * n` values          |
//! | `s2kl` | `k >= l`                    | `n * n`, dense    | `npair` values          |
//! | `s1`   | all                         | `n * n`, dense    | `n * n` values          |

use crate::error::JKError;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EriSymm {
    /// 8-fold symmetry: `i >= j, k >= l, ij >= kl`.
    S8,
    /// 4-fold symmetry: `i >= j, k >= l`.
    S4,
    /// 2-fold symmetry on the bra pair: `i >= j`.
    S2ij,
    /// 2-fold symmetry on the ket pair: `k >= l`.
    S2kl,
    /// No permutation symmetry.
    S1,
}

/// Number of pairs `(i, j)` with `n > i >= j`.
#[inline]
pub fn npair(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Compound index of `(i, j)`, `i >= j`.
#[inline]
pub fn tri_index(i: usize, j: usize) -> usize {
    debug_assert!(i >= j);
    i * (i + 1) / 2 + j
}

/// Compound index of `(i, j)` in any order.
#[inline]
pub fn tri_index_sym(i: usize, j: usize) -> usize {
    if i >= j { tri_index(i, j) } else { tri_index(j, i) }
}

/// Recovers `(i, j)`, `i >= j`, from a compound index.
///
/// Integer triangular root, exact for every index whose `8 * ij + 1` fits in `usize`.
#[inline]
pub fn tri_unravel(ij: usize) -> (usize, usize) {
    let i = ((8 * ij + 1).isqrt() - 1) / 2;
    (i, ij - i * (i + 1) / 2)
}

/// Endless iterator over `(k, l)`, `k >= l`, in compound-index order: `(0, 0), (1, 0), (1, 1), (2, 0), ...`
///
/// Zipped against a packed lower-triangular slice, it labels every element with its pair.
#[derive(Debug, Clone, Default)]
pub struct TrilPairs {
    k: usize,
    l: usize,
}

impl Iterator for TrilPairs {
    type Item = (usize, usize);

    #[inline]
    fn next(&mut self) -> Option<(usize, usize)> {
        let item = (self.k, self.l);
        if self.l == self.k {
            self.k += 1;
            self.l = 0;
        } else {
            self.l += 1;
        }
        Some(item)
    }
}

pub fn tril_pairs() -> TrilPairs {
    TrilPairs::default()
}

/* #region symmetry images */

// The image enumerators take a tuple in the canonical stored order of their class and visit every
// distinct tuple that shares its value. Coinciding images (`i == j`, `k == l`, `(i, j) == (k, l)`) are
// visited once.

/// Images of `(i, j, k, l)` with `i >= j`, `k >= l`, `ij >= kl` under 8-fold symmetry.
#[inline(always)]
pub fn for_each_s8_image(i: usize, j: usize, k: usize, l: usize, mut f: impl FnMut(usize, usize, usize, usize)) {
    let swap_ij = i != j;
    let swap_kl = k != l;
    f(i, j, k, l);
    if swap_ij {
        f(j, i, k, l);
    }
    if swap_kl {
        f(i, j, l, k);
    }
    if swap_ij && swap_kl {
        f(j, i, l, k);
    }
    if (i, j) != (k, l) {
        f(k, l, i, j);
        if swap_kl {
            f(l, k, i, j);
        }
        if swap_ij {
            f(k, l, j, i);
        }
        if swap_ij && swap_kl {
            f(l, k, j, i);
        }
    }
}

/// Images of `(i, j, k, l)` with `i >= j`, `k >= l` under 4-fold symmetry.
#[inline(always)]
pub fn for_each_s4_image(i: usize, j: usize, k: usize, l: usize, mut f: impl FnMut(usize, usize, usize, usize)) {
    f(i, j, k, l);
    if i != j {
        f(j, i, k, l);
    }
    if k != l {
        f(i, j, l, k);
        if i != j {
            f(j, i, l, k);
        }
    }
}

/// Images of `(i, j, k, l)` with `i >= j` under bra-pair symmetry.
#[inline(always)]
pub fn for_each_s2ij_image(i: usize, j: usize, k: usize, l: usize, mut f: impl FnMut(usize, usize, usize, usize)) {
    f(i, j, k, l);
    if i != j {
        f(j, i, k, l);
    }
}

/// Images of `(i, j, k, l)` with `k >= l` under ket-pair symmetry.
#[inline(always)]
pub fn for_each_s2kl_image(i: usize, j: usize, k: usize, l: usize, mut f: impl FnMut(usize, usize, usize, usize)) {
    f(i, j, k, l);
    if k != l {
        f(i, j, l, k);
    }
}

/* #endregion */

impl EriSymm {
    pub const ALL: [EriSymm; 5] = [EriSymm::S8, EriSymm::S4, EriSymm::S2ij, EriSymm::S2kl, EriSymm::S1];

    pub fn name(self) -> &'static str {
        match self {
            EriSymm::S8 => "s8",
            EriSymm::S4 => "s4",
            EriSymm::S2ij => "s2ij",
            EriSymm::S2kl => "s2kl",
            EriSymm::S1 => "s1",
        }
    }

    /// Number of index permutations folded into one stored value.
    pub fn fold(self) -> usize {
        match self {
            EriSymm::S8 => 8,
            EriSymm::S4 => 4,
            EriSymm::S2ij | EriSymm::S2kl => 2,
            EriSymm::S1 => 1,
        }
    }

    /// Whether the outer index enumerates lower-triangular pairs (`ic >= jc`).
    pub fn tril_outer(self) -> bool {
        matches!(self, EriSymm::S8 | EriSymm::S4 | EriSymm::S2ij)
    }

    /// Total buffer length for basis dimension `n`, `None` on overflow.
    pub fn eri_len(self, n: usize) -> Option<usize> {
        let nn = n.checked_mul(n)?;
        let np = nn.checked_add(n)? / 2;
        match self {
            EriSymm::S8 => np.checked_mul(np.checked_add(1)?).map(|x| x / 2),
            EriSymm::S4 => np.checked_mul(np),
            EriSymm::S2ij | EriSymm::S2kl => np.checked_mul(nn),
            EriSymm::S1 => nn.checked_mul(nn),
        }
    }

    /// Finds the class among `s8`, `s4` and `s1` whose buffer length is `len`.
    ///
    /// `s2ij` and `s2kl` share one length and are never inferred.
    pub fn detect(len: usize, n: usize) -> Option<EriSymm> {
        [EriSymm::S8, EriSymm::S4, EriSymm::S1].into_iter().find(|symm| symm.eri_len(n) == Some(len))
    }

    /// Number of outer pairs the driver iterates.
    #[inline]
    pub fn nouter(self, n: usize) -> usize {
        if self.tril_outer() { npair(n) } else { n * n }
    }

    /// Outer pair `(ic, jc)` of linear outer index `idx`.
    #[inline]
    pub fn outer_pair(self, idx: usize, n: usize) -> (usize, usize) {
        if self.tril_outer() { tri_unravel(idx) } else { (idx / n, idx % n) }
    }

    /// Inner pair `(k, l)` of position `kl` within a block.
    #[inline]
    pub fn inner_pair(self, kl: usize, n: usize) -> (usize, usize) {
        match self {
            EriSymm::S8 | EriSymm::S4 | EriSymm::S2kl => tri_unravel(kl),
            EriSymm::S2ij | EriSymm::S1 => (kl / n, kl % n),
        }
    }

    /// Offset of the block belonging to outer index `idx`.
    #[inline]
    pub fn block_offset(self, idx: usize, n: usize) -> usize {
        match self {
            EriSymm::S8 => idx * (idx + 1) / 2,
            EriSymm::S4 | EriSymm::S2kl => idx * npair(n),
            EriSymm::S2ij | EriSymm::S1 => idx * n * n,
        }
    }

    /// Length of the block belonging to outer index `idx`.
    #[inline]
    pub fn block_len(self, idx: usize, n: usize) -> usize {
        match self {
            EriSymm::S8 => idx + 1,
            EriSymm::S4 | EriSymm::S2kl => npair(n),
            EriSymm::S2ij | EriSymm::S1 => n * n,
        }
    }

    #[inline]
    pub fn block_range(self, idx: usize, n: usize) -> Range<usize> {
        let offset = self.block_offset(idx, n);
        offset..offset + self.block_len(idx, n)
    }

    /// Checked access to the block of outer index `idx`.
    pub fn block(self, eri: &[f64], idx: usize, n: usize) -> Option<&[f64]> {
        if idx >= self.nouter(n) {
            return None;
        }
        eri.get(self.block_range(idx, n))
    }

    /// Position of the value of `T[i, j, k, l]` in the packed buffer; indices in any order.
    pub fn offset(self, i: usize, j: usize, k: usize, l: usize, n: usize) -> usize {
        match self {
            EriSymm::S8 => {
                let ij = tri_index_sym(i, j);
                let kl = tri_index_sym(k, l);
                tri_index_sym(ij, kl)
            },
            EriSymm::S4 => tri_index_sym(i, j) * npair(n) + tri_index_sym(k, l),
            EriSymm::S2ij => tri_index_sym(i, j) * n * n + k * n + l,
            EriSymm::S2kl => (i * n + j) * npair(n) + tri_index_sym(k, l),
            EriSymm::S1 => ((i * n + j) * n + k) * n + l,
        }
    }

    /// Checked read of `T[i, j, k, l]`.
    pub fn get(self, eri: &[f64], i: usize, j: usize, k: usize, l: usize, n: usize) -> Option<f64> {
        if i >= n || j >= n || k >= n || l >= n {
            return None;
        }
        eri.get(self.offset(i, j, k, l, n)).copied()
    }

    /// Visits every distinct tuple sharing the value of the stored tuple `(i, j, k, l)`.
    #[inline]
    pub fn for_each_image(self, i: usize, j: usize, k: usize, l: usize, f: impl FnMut(usize, usize, usize, usize)) {
        match self {
            EriSymm::S8 => for_each_s8_image(i, j, k, l, f),
            EriSymm::S4 => for_each_s4_image(i, j, k, l, f),
            EriSymm::S2ij => for_each_s2ij_image(i, j, k, l, f),
            EriSymm::S2kl => for_each_s2kl_image(i, j, k, l, f),
            EriSymm::S1 => {
                let mut f = f;
                f(i, j, k, l)
            },
        }
    }
}

impl fmt::Display for EriSymm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EriSymm {
    type Err = JKError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        EriSymm::ALL.into_iter().find(|symm| symm.name() == lower).ok_or_else(|| JKError::UnknownSymm(s.to_string()))
    }
}
