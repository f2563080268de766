//! Coulomb pair kernels.
//!
//! Every kernel has the signature `(eri, dm, vj, n, ic, jc)`: `eri` is the packed block of outer pair
//! `(ic, jc)`, `dm` and `vj` are row-major `n * n` buffers. Results are accumulated into `vj`.
//!
//! Kernels named `*_s2kl` / `*_s2ij` produce only the lower triangle (`row >= col`) of their output.
//! On triangular outer classes the density is folded, `dm[k, l] + dm[l, k]` for `k > l` and
//! `dm[k, k]` on the diagonal, so that every stored value is read once.

use crate::symm::{npair, tri_index, tril_pairs};
use std::cmp::Ordering;

/* #region helpers */

/// Density summed over a pair and its transpose; the diagonal is taken once.
#[inline(always)]
pub(crate) fn folded_dm(dm: &[f64], n: usize, k: usize, l: usize) -> f64 {
    if k == l { dm[k * n + k] } else { dm[k * n + l] + dm[l * n + k] }
}

/// Folded density of a triangular outer pair; `None` for `ic < jc`, whose block belongs to `(jc, ic)`.
#[inline(always)]
fn folded_outer_dm(dm: &[f64], n: usize, ic: usize, jc: usize) -> Option<f64> {
    match ic.cmp(&jc) {
        Ordering::Greater => Some(dm[ic * n + jc] + dm[jc * n + ic]),
        Ordering::Equal => Some(dm[ic * n + ic]),
        Ordering::Less => None,
    }
}

/// `Σ_{k >= l} eri[kl] * (dm[k, l] + dm[l, k])`, diagonal once.
#[inline]
fn dot_tril_folded(eri: &[f64], dm: &[f64], n: usize) -> f64 {
    eri.iter().zip(tril_pairs()).map(|(&v, (k, l))| v * folded_dm(dm, n, k, l)).sum()
}

/// `vj[k, l] += alpha * eri[kl]` over the lower triangle.
#[inline]
fn axpy_tril(alpha: f64, eri: &[f64], vj: &mut [f64], n: usize) {
    eri.iter().zip(tril_pairs()).for_each(|(&v, (k, l))| vj[k * n + l] += alpha * v);
}

#[inline]
fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    y.iter_mut().zip(x).for_each(|(y, &x)| *y += alpha * x);
}

#[inline]
fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(&x, &y)| x * y).sum()
}

/* #endregion */

/* #region s8 */

/// `ijkl,ij->(s2)kl` on 8-fold integrals.
///
/// The block of `ij = (ic, jc)` holds `(ij|kl)` for `kl <= ij`. Each value contributes twice, to
/// `vj[ic, jc]` through `dm[k, l]` and to `vj[k, l]` through `dm[ic, jc]`, except for `kl == ij`.
pub fn s8_ij_s2kl(eri: &[f64], dm: &[f64], vj: &mut [f64], n: usize, ic: usize, jc: usize) {
    let Some(dm_ij) = folded_outer_dm(dm, n, ic, jc) else { return };
    let ij = tri_index(ic, jc);
    let Some((&eri_ijij, eri)) = eri[..=ij].split_last() else { return };

    let mut vj_ij = eri_ijij * dm_ij;
    for (&v, (k, l)) in eri.iter().zip(tril_pairs()) {
        vj_ij += v * folded_dm(dm, n, k, l);
        vj[k * n + l] += v * dm_ij;
    }
    vj[ic * n + jc] += vj_ij;
}

/// [`s8_ij_s2kl`] with the density given pre-folded as a packed lower triangle:
/// `tri_dm[ij] = dm[i, j] + dm[j, i]` for `i > j`, `tri_dm[ii] = dm[i, i]`.
pub fn s8_tridm_vj(eri: &[f64], tri_dm: &[f64], vj: &mut [f64], n: usize, ic: usize, jc: usize) {
    if ic < jc {
        return;
    }
    let ij = tri_index(ic, jc);
    let dm_ij = tri_dm[ij];
    let Some((&eri_ijij, eri)) = eri[..=ij].split_last() else { return };

    let mut vj_ij = eri_ijij * dm_ij;
    for ((&v, &dm_kl), (k, l)) in eri.iter().zip(tri_dm).zip(tril_pairs()) {
        vj_ij += v * dm_kl;
        vj[k * n + l] += v * dm_ij;
    }
    vj[ic * n + jc] += vj_ij;
}

/* #endregion */

/* #region s4 */

/// `ijkl,ij->(s2)kl` on 4-fold integrals.
pub fn s4_ij_s2kl(eri: &[f64], dm: &[f64], vj: &mut [f64], n: usize, ic: usize, jc: usize) {
    let Some(dm_ij) = folded_outer_dm(dm, n, ic, jc) else { return };
    axpy_tril(dm_ij, &eri[..npair(n)], vj, n);
}

/// `ijkl,kl->(s2)ij` on 4-fold integrals.
pub fn s4_kl_s2ij(eri: &[f64], dm: &[f64], vj: &mut [f64], n: usize, ic: usize, jc: usize) {
    if ic >= jc {
        vj[ic * n + jc] += dot_tril_folded(&eri[..npair(n)], dm, n);
    }
}

/* #endregion */

/* #region s2ij */

/// `ijkl,ij->kl` on bra-symmetric integrals.
pub fn s2ij_ij_s1kl(eri: &[f64], dm: &[f64], vj: &mut [f64], n: usize, ic: usize, jc: usize) {
    let Some(dm_ij) = folded_outer_dm(dm, n, ic, jc) else { return };
    axpy(dm_ij, &eri[..n * n], &mut vj[..n * n]);
}

/// `ijkl,kl->(s2)ij` on bra-symmetric integrals.
pub fn s2ij_kl_s2ij(eri: &[f64], dm: &[f64], vj: &mut [f64], n: usize, ic: usize, jc: usize) {
    if ic >= jc {
        s1_kl_s1ij(eri, dm, vj, n, ic, jc);
    }
}

/* #endregion */

/* #region s2kl */

/// `ijkl,ij->(s2)kl` on ket-symmetric integrals; outer pairs are dense, so `dm` is not folded.
pub fn s2kl_ij_s2kl(eri: &[f64], dm: &[f64], vj: &mut [f64], n: usize, ic: usize, jc: usize) {
    axpy_tril(dm[ic * n + jc], &eri[..npair(n)], vj, n);
}

/// `ijkl,kl->ij` on ket-symmetric integrals.
pub fn s2kl_kl_s1ij(eri: &[f64], dm: &[f64], vj: &mut [f64], n: usize, ic: usize, jc: usize) {
    vj[ic * n + jc] += dot_tril_folded(&eri[..npair(n)], dm, n);
}

/* #endregion */

/* #region s1 */

/// `ijkl,ij->kl` without symmetry.
pub fn s1_ij_s1kl(eri: &[f64], dm: &[f64], vj: &mut [f64], n: usize, ic: usize, jc: usize) {
    axpy(dm[ic * n + jc], &eri[..n * n], &mut vj[..n * n]);
}

/// `ijkl,kl->ij` without symmetry.
pub fn s1_kl_s1ij(eri: &[f64], dm: &[f64], vj: &mut [f64], n: usize, ic: usize, jc: usize) {
    vj[ic * n + jc] += dot(&eri[..n * n], &dm[..n * n]);
}

/* #endregion */

#[cfg(test)]
mod test {
    use super::*;
    use crate::symm::EriSymm;
    use crate::testing::*;
    use approx::assert_abs_diff_eq;

    /// Runs a kernel serially over all outer pairs of `symm`.
    fn run_all(
        kernel: fn(&[f64], &[f64], &mut [f64], usize, usize, usize),
        symm: EriSymm,
        eri: &[f64],
        dm: &[f64],
        n: usize,
    ) -> Vec<f64> {
        let mut vj = vec![0.0; n * n];
        for idx in 0..symm.nouter(n) {
            let (ic, jc) = symm.outer_pair(idx, n);
            kernel(&eri[symm.block_range(idx, n)], dm, &mut vj, n, ic, jc);
        }
        vj
    }

    #[test]
    fn test_folded_dm() {
        let dm = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(folded_dm(&dm, 2, 1, 0), 5.0);
        assert_eq!(folded_dm(&dm, 2, 0, 1), 5.0);
        assert_eq!(folded_dm(&dm, 2, 1, 1), 4.0);
    }

    #[test]
    fn test_s8_ij_s2kl_diagonal_block() {
        // n = 2, block of (ic, jc) = (1, 1) holds (11|00), (11|10), (11|11)
        let eri = [0.0, 0.0, 0.0, 0.5, 0.25, 2.0];
        let dm = [1.0, 3.0, 5.0, 7.0];
        let mut vj = vec![0.0; 4];
        s8_ij_s2kl(&eri[3..], &dm, &mut vj, 2, 1, 1);
        assert_abs_diff_eq!(vj[3], 0.5 * 1.0 + 0.25 * (3.0 + 5.0) + 2.0 * 7.0, epsilon = 1e-14);
        assert_abs_diff_eq!(vj[0], 0.5 * 7.0, epsilon = 1e-14);
        assert_abs_diff_eq!(vj[2], 0.25 * 7.0, epsilon = 1e-14);
        assert_eq!(vj[1], 0.0);
    }

    #[test]
    fn test_tril_outer_skips_upper_pairs() {
        let n = 3;
        let eri = random_eri(n, EriSymm::S4, 1);
        let dm = random_dm(n, 2, false);
        let mut vj = vec![0.0; n * n];
        s4_ij_s2kl(&eri, &dm, &mut vj, n, 0, 2);
        s4_kl_s2ij(&eri, &dm, &mut vj, n, 0, 2);
        s2ij_kl_s2ij(&eri, &dm, &mut vj, n, 1, 2);
        s8_ij_s2kl(&eri, &dm, &mut vj, n, 1, 2);
        assert!(vj.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_s8_tridm_matches_s8() {
        let n = 6;
        let eri = random_eri(n, EriSymm::S8, 3);
        let dm = random_dm(n, 4, false);
        let tri_dm = crate::util::fold_tril(&dm, n);
        let vj_ref = run_all(s8_ij_s2kl, EriSymm::S8, &eri, &dm, n);
        let vj = run_all(s8_tridm_vj, EriSymm::S8, &eri, &tri_dm, n);
        assert_abs_diff_eq!(vj.as_slice(), vj_ref.as_slice(), epsilon = 1e-12);
    }

    #[test]
    fn test_s1_scenario_identity_dm() {
        // T[i, j, k, l] = (i + 1) + 10 (j + 1) + 100 (k + 1) + 1000 (l + 1), dm = I
        // vj[i, j] = Σ_k T[i, j, k, k] = 3 (i + 1) + 30 (j + 1) + 1100 * 6
        let n = 3;
        let mut eri = vec![0.0; n * n * n * n];
        for (i, j, k, l) in itertools::iproduct!(0..n, 0..n, 0..n, 0..n) {
            eri[((i * n + j) * n + k) * n + l] =
                (i + 1) as f64 + 10.0 * (j + 1) as f64 + 100.0 * (k + 1) as f64 + 1000.0 * (l + 1) as f64;
        }
        let dm = identity(n);
        let vj = run_all(s1_kl_s1ij, EriSymm::S1, &eri, &dm, n);
        assert_eq!(vj[0], 6633.0);
        assert_eq!(vj[n + 2], 6696.0);
        assert_eq!(vj[2 * n + 1], 6669.0);
        assert_eq!(vj[2 * n + 2], 6699.0);
    }

    #[test]
    fn test_s2ij_kernels_agree_on_symmetric_blocks() {
        // s2ij_ij_s1kl and s2kl_ij_s2kl describe the same contraction on an s4 tensor
        let n = 4;
        let s4 = random_eri(n, EriSymm::S4, 5);
        let dm = random_dm(n, 6, false);
        let s2ij = crate::pack::restore(&s4, n, EriSymm::S4, EriSymm::S2ij).unwrap();
        let vj_s2ij = run_all(s2ij_ij_s1kl, EriSymm::S2ij, &s2ij, &dm, n);
        let vj_s4 = run_all(s4_ij_s2kl, EriSymm::S4, &s4, &dm, n);
        assert_abs_diff_eq!(tril(&vj_s2ij, n).as_slice(), vj_s4.as_slice(), epsilon = 1e-12);
    }
}
