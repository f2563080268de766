//! Conversion between packed integral layouts.

use crate::error::JKError;
use crate::symm::EriSymm;

/// Expected buffer length of `symm` for basis dimension `n`.
pub(crate) fn checked_eri_len(symm: EriSymm, n: usize) -> Result<usize, JKError> {
    if n == 0 {
        return Err(JKError::EmptyBasis);
    }
    symm.eri_len(n).ok_or(JKError::TooLarge { n, symm })
}

/// Repacks `eri`, stored in layout `from`, into layout `to`.
///
/// The tensor is assumed to carry the symmetry of both classes. Going to a more symmetric class keeps
/// one representative of each orbit; going to a less symmetric class replicates values.
pub fn restore(eri: &[f64], n: usize, from: EriSymm, to: EriSymm) -> Result<Vec<f64>, JKError> {
    let len_from = checked_eri_len(from, n)?;
    let len_to = checked_eri_len(to, n)?;
    if eri.len() != len_from {
        return Err(JKError::ShapeMismatch { what: "eri", expected: len_from, found: eri.len() });
    }
    if from == to {
        return Ok(eri.to_vec());
    }

    let mut out = Vec::with_capacity(len_to);
    for idx in 0..to.nouter(n) {
        let (i, j) = to.outer_pair(idx, n);
        for kl in 0..to.block_len(idx, n) {
            let (k, l) = to.inner_pair(kl, n);
            out.push(eri[from.offset(i, j, k, l, n)]);
        }
    }
    debug_assert_eq!(out.len(), len_to);
    Ok(out)
}

/// Packs a dense `n^4` row-major tensor into layout `symm`.
pub fn pack_eri(eri: &[f64], n: usize, symm: EriSymm) -> Result<Vec<f64>, JKError> {
    restore(eri, n, EriSymm::S1, symm)
}

/// Expands a packed buffer of layout `symm` into the dense `n^4` row-major tensor.
pub fn unpack_eri(eri: &[f64], n: usize, symm: EriSymm) -> Result<Vec<f64>, JKError> {
    restore(eri, n, symm, EriSymm::S1)
}
