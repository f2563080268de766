//! Exchange pair kernels.
//!
//! Same calling convention as [`crate::vj`]. Two contraction patterns exist:
//!
//! - `jk_*il`: `vk[i, l] += (ij|kl) dm[j, k]`
//! - `il_*jk`: `vk[j, k] += (ij|kl) dm[i, l]`
//!
//! A stored value stands for every tuple in its symmetry orbit, and each of those tuples writes its own
//! output cell. Orbits are enumerated by the image functions of [`crate::symm`], which visit coinciding
//! tuples on the diagonals only once. `*_s2il` kernels keep the cells with `i >= l`.

use crate::symm::{for_each_s2ij_image, for_each_s2kl_image, for_each_s4_image, for_each_s8_image, npair};
use crate::symm::{tri_index, tril_pairs};

/// `vk[i, l] += v * dm[j, k]`, restricted to `i >= l` when `LOWER`.
#[inline(always)]
#[allow(clippy::too_many_arguments)]
fn jk_il<const LOWER: bool>(vk: &mut [f64], dm: &[f64], n: usize, v: f64, i: usize, j: usize, k: usize, l: usize) {
    if !LOWER || i >= l {
        vk[i * n + l] += v * dm[j * n + k];
    }
}

/// `vk[j, k] += v * dm[i, l]`.
#[inline(always)]
#[allow(clippy::too_many_arguments)]
fn il_jk(vk: &mut [f64], dm: &[f64], n: usize, v: f64, i: usize, j: usize, k: usize, l: usize) {
    vk[j * n + k] += v * dm[i * n + l];
}

/* #region s8 */

fn s8_jk<const LOWER: bool>(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    if ic < jc {
        return;
    }
    let ij = tri_index(ic, jc);
    for (&v, (k, l)) in eri[..=ij].iter().zip(tril_pairs()) {
        for_each_s8_image(ic, jc, k, l, |i, j, k, l| jk_il::<LOWER>(vk, dm, n, v, i, j, k, l));
    }
}

/// `ijkl,jk->il` on 8-fold integrals. `dm` may be non-symmetric; the output is complete.
pub fn s8_jk_s1il(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    s8_jk::<false>(eri, dm, vk, n, ic, jc);
}

/// `ijkl,jk->(s2)il` on 8-fold integrals; lower triangle of [`s8_jk_s1il`].
///
/// For a symmetric `dm` the full result is symmetric and the lower triangle determines it.
pub fn s8_jk_s2il(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    s8_jk::<true>(eri, dm, vk, n, ic, jc);
}

/* #endregion */

/* #region s4 */

/// Stored `(kl)` values of row `k`, `l = 0..=k`.
#[inline(always)]
fn s4_row(eri: &[f64], k: usize) -> &[f64] {
    &eri[tri_index(k, 0)..=tri_index(k, k)]
}

/// `ijkl,jk->il` on 4-fold integrals.
pub fn s4_jk_s1il(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    if ic < jc {
        return;
    }
    for (&v, (k, l)) in eri[..npair(n)].iter().zip(tril_pairs()) {
        for_each_s4_image(ic, jc, k, l, |i, j, k, l| jk_il::<false>(vk, dm, n, v, i, j, k, l));
    }
}

/// `ijkl,il->jk` on 4-fold integrals.
///
/// Relabelling `(i, j, k, l) -> (j, i, l, k)` turns this into `ijkl,jk->il`, so the two share one body.
pub fn s4_il_s1jk(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    s4_jk_s1il(eri, dm, vk, n, ic, jc);
}

/// `ijkl,jk->(s2)il` on 4-fold integrals.
///
/// Loop bounds are cut so that only cells `vk[r, c]` with `r >= c` are visited. With `ic > jc` the
/// `k` range splits at `jc` and `ic`: below `jc` all four images land in the lower triangle, between
/// `jc` and `ic` the `vk[jc, k]` image drops out, and above `ic` only columns `l <= ic` remain.
pub fn s4_jk_s2il(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    let eri = &eri[..npair(n)];
    let (i, j) = (ic, jc);

    if ic > jc {
        for k in 0..=jc {
            let eri_k = s4_row(eri, k);
            for (l, &v) in eri_k[..k].iter().enumerate() {
                vk[j * n + l] += v * dm[i * n + k];
                vk[j * n + k] += v * dm[i * n + l];
                vk[i * n + l] += v * dm[j * n + k];
                vk[i * n + k] += v * dm[j * n + l];
            }
            let v = eri_k[k];
            vk[j * n + k] += v * dm[i * n + k];
            vk[i * n + k] += v * dm[j * n + k];
        }
        for k in jc + 1..=ic {
            let eri_k = s4_row(eri, k);
            for (l, &v) in eri_k[..=jc].iter().enumerate() {
                vk[j * n + l] += v * dm[i * n + k];
                vk[i * n + l] += v * dm[j * n + k];
                vk[i * n + k] += v * dm[j * n + l];
            }
            for (l, &v) in eri_k[..k].iter().enumerate().skip(jc + 1) {
                vk[i * n + l] += v * dm[j * n + k];
                vk[i * n + k] += v * dm[j * n + l];
            }
            vk[i * n + k] += eri_k[k] * dm[j * n + k];
        }
        for k in ic + 1..n {
            let eri_k = s4_row(eri, k);
            for (l, &v) in eri_k[..=jc].iter().enumerate() {
                vk[j * n + l] += v * dm[i * n + k];
                vk[i * n + l] += v * dm[j * n + k];
            }
            for (l, &v) in eri_k[..=ic].iter().enumerate().skip(jc + 1) {
                vk[i * n + l] += v * dm[j * n + k];
            }
        }
    } else if ic == jc {
        for k in 0..=ic {
            let eri_k = s4_row(eri, k);
            for (l, &v) in eri_k[..k].iter().enumerate() {
                vk[i * n + l] += v * dm[i * n + k];
                vk[i * n + k] += v * dm[i * n + l];
            }
            vk[i * n + k] += eri_k[k] * dm[i * n + k];
        }
        for k in ic + 1..n {
            for (l, &v) in s4_row(eri, k)[..=ic].iter().enumerate() {
                vk[i * n + l] += v * dm[i * n + k];
            }
        }
    }
}

/// `ijkl,il->(s2)jk` on 4-fold integrals; shares the body of [`s4_jk_s2il`].
pub fn s4_il_s2jk(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    s4_jk_s2il(eri, dm, vk, n, ic, jc);
}

/* #endregion */

/* #region s2ij */

/// `ijkl,jk->il` on bra-symmetric integrals. The block is the dense `(k, l)` matrix of `(ic, jc)`.
pub fn s2ij_jk_s1il(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    if ic < jc {
        return;
    }
    for (k, eri_k) in eri[..n * n].chunks_exact(n).enumerate() {
        for_each_s2ij_image(ic, jc, k, 0, |i, j, _, _| {
            let d = dm[j * n + k];
            vk[i * n..(i + 1) * n].iter_mut().zip(eri_k).for_each(|(out, &v)| *out += v * d);
        });
    }
}

/// `ijkl,il->jk` on bra-symmetric integrals.
pub fn s2ij_il_s1jk(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    if ic < jc {
        return;
    }
    for (k, eri_k) in eri[..n * n].chunks_exact(n).enumerate() {
        for_each_s2ij_image(ic, jc, k, 0, |i, j, _, _| {
            let dm_i = &dm[i * n..(i + 1) * n];
            vk[j * n + k] += eri_k.iter().zip(dm_i).map(|(&v, &d)| v * d).sum::<f64>();
        });
    }
}

/* #endregion */

/* #region s2kl */

/// `ijkl,jk->il` on ket-symmetric integrals.
pub fn s2kl_jk_s1il(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    for (&v, (k, l)) in eri[..npair(n)].iter().zip(tril_pairs()) {
        for_each_s2kl_image(ic, jc, k, l, |i, j, k, l| jk_il::<false>(vk, dm, n, v, i, j, k, l));
    }
}

/// `ijkl,il->jk` on ket-symmetric integrals.
pub fn s2kl_il_s1jk(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    for (&v, (k, l)) in eri[..npair(n)].iter().zip(tril_pairs()) {
        for_each_s2kl_image(ic, jc, k, l, |i, j, k, l| il_jk(vk, dm, n, v, i, j, k, l));
    }
}

/* #endregion */

/* #region s1 */

/// `ijkl,jk->il` without symmetry.
pub fn s1_jk_s1il(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    let vk_i = &mut vk[ic * n..(ic + 1) * n];
    for (k, eri_k) in eri[..n * n].chunks_exact(n).enumerate() {
        let d = dm[jc * n + k];
        vk_i.iter_mut().zip(eri_k).for_each(|(out, &v)| *out += v * d);
    }
}

/// `ijkl,il->jk` without symmetry.
pub fn s1_il_s1jk(eri: &[f64], dm: &[f64], vk: &mut [f64], n: usize, ic: usize, jc: usize) {
    let dm_i = &dm[ic * n..(ic + 1) * n];
    for (k, eri_k) in eri[..n * n].chunks_exact(n).enumerate() {
        vk[jc * n + k] += eri_k.iter().zip(dm_i).map(|(&v, &d)| v * d).sum::<f64>();
    }
}

/* #endregion */
