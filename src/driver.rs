//! Parallel drivers over outer pairs.
//!
//! The outer-pair space of the storage class is split into rayon tasks. Every task folds its pairs
//! into private `n * n` accumulators, which are added into the shared outputs under a mutex once the
//! task finishes.

use crate::error::JKError;
use crate::kernel::{JKernel, KKernel};
use crate::pack::checked_eri_len;
use crate::prelude::*;
use crate::util::check_finite;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// J request: kernel, density, output.
pub type JTask<'a> = (JKernel, &'a [f64], &'a mut [f64]);
/// K request: kernel, density, output.
pub type KTask<'a> = (KKernel, &'a [f64], &'a mut [f64]);

/// Task-private partial results.
struct PairAccum {
    vj: Vec<f64>,
    vk: Vec<f64>,
}

impl PairAccum {
    fn new(nj: usize, nk: usize) -> Self {
        Self { vj: vec![0.0; nj], vk: vec![0.0; nk] }
    }
}

fn add_into(out: &mut [f64], part: &[f64]) {
    out.iter_mut().zip(part).for_each(|(o, &p)| *o += p);
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), JKError> {
    if expected == found { Ok(()) } else { Err(JKError::ShapeMismatch { what, expected, found }) }
}

/// Contracts `eri` with `dmj` into `vj` and with `dmk` into `vk`.
///
/// Both kernels must read the same storage class. `vj` and `vk` are overwritten. Outputs of
/// lower-fill kernels hold only `row >= col`; the strict upper triangle is left zero.
#[allow(clippy::too_many_arguments)]
pub fn incore_drv(
    eri: &[f64],
    dmj: &[f64],
    dmk: &[f64],
    vj: &mut [f64],
    vk: &mut [f64],
    n: usize,
    fvj: JKernel,
    fvk: KKernel,
    config: &JKConfig,
) -> Result<(), JKError> {
    incore_drv_with(eri, n, Some((fvj, dmj, vj)), Some((fvk, dmk, vk)), config)
}

/// As [`incore_drv`], with either request optional.
pub fn incore_drv_with(
    eri: &[f64],
    n: usize,
    j_task: Option<JTask>,
    k_task: Option<KTask>,
    config: &JKConfig,
) -> Result<(), JKError> {
    if n == 0 {
        return Err(JKError::EmptyBasis);
    }

    let symm = match (&j_task, &k_task) {
        (Some((fvj, _, _)), _) => fvj.symm(),
        (None, Some((fvk, _, _))) => fvk.symm(),
        (None, None) => {
            log::warn!("incore_drv called without J or K kernel");
            return Ok(());
        },
    };
    if let (Some((fvj, _, _)), Some((fvk, _, _))) = (&j_task, &k_task) {
        if fvk.symm() != symm {
            return Err(JKError::KernelMismatch { kernel: fvk.name(), expected: fvk.symm(), found: fvj.symm() });
        }
    }

    // validate lengths before touching any output
    let nn = n.checked_mul(n).ok_or(JKError::TooLarge { n, symm })?;
    check_len("eri", checked_eri_len(symm, n)?, eri.len())?;
    if let Some((fvj, dmj, vj)) = &j_task {
        check_len("dmj", fvj.dm_len(n), dmj.len())?;
        check_len("vj", nn, vj.len())?;
    }
    if let Some((fvk, dmk, vk)) = &k_task {
        check_len("dmk", fvk.dm_len(n), dmk.len())?;
        check_len("vk", nn, vk.len())?;
    }
    if config.check_finite {
        check_finite("eri", eri)?;
        if let Some((_, dmj, _)) = &j_task {
            check_finite("dmj", dmj)?;
        }
        if let Some((_, dmk, _)) = &k_task {
            check_finite("dmk", dmk)?;
        }
    }

    let (fvj, vj) = match j_task {
        Some((fvj, dmj, vj)) => (Some((fvj, dmj)), Some(vj)),
        None => (None, None),
    };
    let (fvk, vk) = match k_task {
        Some((fvk, dmk, vk)) => (Some((fvk, dmk)), Some(vk)),
        None => (None, None),
    };
    let (vj, vk) = (vj.map(zeroed), vk.map(zeroed));

    let nouter = symm.nouter(n);
    if config.chunk_size == 0 {
        log::warn!("chunk_size 0 requested, using 1");
    }
    let chunk_size = config.chunk_size.max(1);
    let len_j = if fvj.is_some() { nn } else { 0 };
    let len_k = if fvk.is_some() { nn } else { 0 };
    log::debug!(
        "incore_drv: {symm}, n = {n}, {nouter} outer pairs, J = {}, K = {}",
        fvj.map_or("none", |(k, _)| k.name()),
        fvk.map_or("none", |(k, _)| k.name()),
    );

    let outputs = Mutex::new((vj, vk));
    let aborted = AtomicBool::new(false);
    let run = || {
        (0..nouter)
            .into_par_iter()
            .with_min_len(chunk_size)
            .fold(
                || PairAccum::new(len_j, len_k),
                |mut acc, idx| {
                    if aborted.load(Ordering::Relaxed) || config.is_cancelled() {
                        aborted.store(true, Ordering::Relaxed);
                        return acc;
                    }
                    let (ic, jc) = symm.outer_pair(idx, n);
                    let block = &eri[symm.block_range(idx, n)];
                    if let Some((fvj, dmj)) = fvj {
                        fvj.apply(block, dmj, &mut acc.vj, n, ic, jc);
                    }
                    if let Some((fvk, dmk)) = fvk {
                        fvk.apply(block, dmk, &mut acc.vk, n, ic, jc);
                    }
                    acc
                },
            )
            .for_each(|acc| {
                let mut guard = outputs.lock().unwrap_or_else(PoisonError::into_inner);
                let (vj, vk) = &mut *guard;
                if let Some(vj) = vj {
                    add_into(vj, &acc.vj);
                }
                if let Some(vk) = vk {
                    add_into(vk, &acc.vk);
                }
            });
    };

    let timer = std::time::Instant::now();
    match config.num_threads {
        Some(nthreads) => rayon::ThreadPoolBuilder::new().num_threads(nthreads).build()?.install(run),
        None => run(),
    }
    log::debug!("incore_drv: contraction took {:?}", timer.elapsed());

    if aborted.load(Ordering::Relaxed) {
        let (vj, vk) = outputs.into_inner().unwrap_or_else(PoisonError::into_inner);
        vj.into_iter().chain(vk).for_each(|out| out.fill(0.0));
        log::debug!("incore_drv: cancelled");
        return Err(JKError::Cancelled);
    }
    Ok(())
}

fn zeroed(out: &mut [f64]) -> &mut [f64] {
    out.fill(0.0);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kernel::{Contraction, Fill};
    use crate::pack::unpack_eri;
    use crate::symm::EriSymm;
    use crate::testing::*;
    use crate::util::{fold_tril, max_abs_diff};
    use std::sync::Arc;

    /// Dense reference for a kernel on a tensor that carries exactly the symmetry of its class.
    fn reference(eri: &[f64], dm: &[f64], n: usize, symm: EriSymm, contraction: Contraction, fill: Fill) -> Vec<f64> {
        let s1 = unpack_eri(eri, n, symm).unwrap();
        let full = contract_naive(&s1, dm, n, contraction);
        match fill {
            Fill::Full => full,
            Fill::Lower => tril(&full, n),
        }
    }

    #[test]
    fn test_j_kernels_match_dense() {
        let config = JKConfig::default();
        for n in [1, 2, 5] {
            for (seed, fvj) in JKernel::ALL.into_iter().enumerate() {
                let symm = fvj.symm();
                let eri = random_eri(n, symm, 100 + seed as u64);
                let dm = random_dm(n, 200 + seed as u64, false);
                let dm_in = if fvj == JKernel::S8TriDm { fold_tril(&dm, n) } else { dm.clone() };

                let mut vj = vec![f64::NAN; n * n];
                incore_drv_with(&eri, n, Some((fvj, dm_in.as_slice(), vj.as_mut_slice())), None, &config).unwrap();
                let vj_ref = reference(&eri, &dm, n, symm, fvj.contraction(), fvj.fill());
                assert!(max_abs_diff(&vj, &vj_ref) < 1e-10, "{fvj} n = {n}");
            }
        }
    }

    #[test]
    fn test_k_kernels_match_dense() {
        let config = JKConfig::default();
        for n in [1, 2, 5] {
            for (seed, fvk) in KKernel::ALL.into_iter().enumerate() {
                let symm = fvk.symm();
                let eri = random_eri(n, symm, 300 + seed as u64);
                let dm = random_dm(n, 400 + seed as u64, false);

                let mut vk = vec![f64::NAN; n * n];
                incore_drv_with(&eri, n, None, Some((fvk, dm.as_slice(), vk.as_mut_slice())), &config).unwrap();
                let vk_ref = reference(&eri, &dm, n, symm, fvk.contraction(), fvk.fill());
                assert!(max_abs_diff(&vk, &vk_ref) < 1e-10, "{fvk} n = {n}");
            }
        }
    }

    #[test]
    fn test_s2il_symmetrized_with_hermitian_dm() {
        let n = 6;
        let config = JKConfig::default();
        let dm = random_dm(n, 7, true);
        // K is symmetric for a symmetric density only when the integrals carry the full 8-fold symmetry
        let eri_s8 = random_eri(n, EriSymm::S8, 8);
        for (fvk_lower, fvk_full) in [(KKernel::S8JkS2il, KKernel::S8JkS1il), (KKernel::S4JkS2il, KKernel::S4JkS1il)] {
            let eri = crate::pack::restore(&eri_s8, n, EriSymm::S8, fvk_lower.symm()).unwrap();
            let mut lower = vec![0.0; n * n];
            let mut full = vec![0.0; n * n];
            incore_drv_with(&eri, n, None, Some((fvk_lower, dm.as_slice(), lower.as_mut_slice())), &config).unwrap();
            incore_drv_with(&eri, n, None, Some((fvk_full, dm.as_slice(), full.as_mut_slice())), &config).unwrap();
            crate::util::lower_to_upper(&mut lower, n);
            for i in 0..n {
                for j in 0..n {
                    assert_eq!(lower[i * n + j], lower[j * n + i]);
                }
            }
            assert!(max_abs_diff(&lower, &full) < 1e-12, "{fvk_lower}");
        }
    }

    #[test]
    fn test_s4_aliases() {
        let n = 5;
        let config = JKConfig::default();
        let eri = random_eri(n, EriSymm::S4, 9);
        let dm = random_dm(n, 10, false);
        for (alias, target) in [(KKernel::S4IlS1jk, KKernel::S4JkS1il), (KKernel::S4IlS2jk, KKernel::S4JkS2il)] {
            let mut a = vec![0.0; n * n];
            let mut b = vec![0.0; n * n];
            incore_drv_with(&eri, n, None, Some((alias, dm.as_slice(), a.as_mut_slice())), &config).unwrap();
            incore_drv_with(&eri, n, None, Some((target, dm.as_slice(), b.as_mut_slice())), &config).unwrap();
            assert!(max_abs_diff(&a, &b) < 1e-12, "{alias}");
        }
    }

    #[test]
    fn test_single_orbital_is_exact() {
        let config = JKConfig::default();
        let (eri, dm) = ([2.0], [3.0]);
        for symm in EriSymm::ALL {
            let fvj = JKernel::ALL.into_iter().find(|k| k.symm() == symm).unwrap();
            for fvk in KKernel::ALL.into_iter().filter(|k| k.symm() == symm) {
                let (mut vj, mut vk) = ([0.0], [0.0]);
                incore_drv(&eri, &dm, &dm, &mut vj, &mut vk, 1, fvj, fvk, &config).unwrap();
                assert_eq!((vj[0], vk[0]), (6.0, 6.0), "{fvj} {fvk}");
            }
        }
    }

    #[test]
    fn test_reduction_order_independence() {
        let n = 9;
        let eri = random_eri(n, EriSymm::S8, 11);
        let dm = random_dm(n, 12, false);
        let run = |num_threads, chunk_size| {
            let config = JKConfig { num_threads: Some(num_threads), chunk_size, ..Default::default() };
            let (mut vj, mut vk) = (vec![0.0; n * n], vec![0.0; n * n]);
            incore_drv(&eri, &dm, &dm, &mut vj, &mut vk, n, JKernel::S8IjS2kl, KKernel::S8JkS1il, &config).unwrap();
            (vj, vk)
        };
        let (vj_1, vk_1) = run(1, 1);
        let (vj_4, vk_4) = run(4, 7);
        assert!(max_abs_diff(&vj_1, &vj_4) < 1e-12);
        assert!(max_abs_diff(&vk_1, &vk_4) < 1e-12);
    }

    #[test]
    fn test_scenario_identity_dm() {
        let n = 3;
        let mut eri = vec![0.0; n * n * n * n];
        for (idx, v) in eri.iter_mut().enumerate() {
            let (i, j, k, l) = (idx / 27, idx / 9 % 3, idx / 3 % 3, idx % 3);
            *v = (i + 1) as f64 + 10.0 * (j + 1) as f64 + 100.0 * (k + 1) as f64 + 1000.0 * (l + 1) as f64;
        }
        let dm = identity(n);
        let (mut vj, mut vk) = (vec![0.0; n * n], vec![0.0; n * n]);
        let config = JKConfig::default();
        incore_drv(&eri, &dm, &dm, &mut vj, &mut vk, n, JKernel::S1KlS1ij, KKernel::S1JkS1il, &config).unwrap();
        assert_eq!(vj, vec![6633.0, 6663.0, 6693.0, 6636.0, 6666.0, 6696.0, 6639.0, 6669.0, 6699.0]);
        // vk[i, l] = Σ_j T[i, j, j, l] = 3 (i + 1) + 110 * 6 + 3000 (l + 1)
        assert_eq!(vk[0], 3663.0);
        assert_eq!(vk[2 * n + 1], 6669.0);
    }

    #[test]
    fn test_validation_errors() {
        let n = 3;
        let config = JKConfig::default();
        let eri = random_eri(n, EriSymm::S8, 13);
        let dm = random_dm(n, 14, false);
        let (mut vj, mut vk) = (vec![0.0; n * n], vec![0.0; n * n]);

        let err = incore_drv(&eri[1..], &dm, &dm, &mut vj, &mut vk, n, JKernel::S8IjS2kl, KKernel::S8JkS1il, &config);
        assert!(matches!(err, Err(JKError::ShapeMismatch { what: "eri", expected: 21, found: 20 })));

        let err = incore_drv(&eri, &dm, &dm, &mut vj, &mut vk, n, JKernel::S8IjS2kl, KKernel::S4JkS1il, &config);
        assert!(matches!(err, Err(JKError::KernelMismatch { kernel: "s4_jk_s1il", .. })));

        let err = incore_drv(&eri, &dm[..8], &dm, &mut vj, &mut vk, n, JKernel::S8IjS2kl, KKernel::S8JkS1il, &config);
        assert!(matches!(err, Err(JKError::ShapeMismatch { what: "dmj", .. })));

        let err = incore_drv(&eri, &dm, &dm, &mut vj, &mut vk[..4], n, JKernel::S8IjS2kl, KKernel::S8JkS1il, &config);
        assert!(matches!(err, Err(JKError::ShapeMismatch { what: "vk", .. })));

        // folded density has npair elements
        let err = incore_drv(&eri, &dm, &dm, &mut vj, &mut vk, n, JKernel::S8TriDm, KKernel::S8JkS1il, &config);
        assert!(matches!(err, Err(JKError::ShapeMismatch { what: "dmj", expected: 6, found: 9 })));

        let err = incore_drv(&[], &[], &[], &mut [], &mut [], 0, JKernel::S1KlS1ij, KKernel::S1JkS1il, &config);
        assert!(matches!(err, Err(JKError::EmptyBasis)));
    }

    #[test]
    fn test_check_finite() {
        let n = 2;
        let mut eri = random_eri(n, EriSymm::S4, 15);
        eri[4] = f64::NAN;
        let dm = random_dm(n, 16, false);
        let (mut vj, mut vk) = (vec![0.0; n * n], vec![0.0; n * n]);
        let config = JKConfig { check_finite: true, ..Default::default() };
        let err = incore_drv(&eri, &dm, &dm, &mut vj, &mut vk, n, JKernel::S4KlS2ij, KKernel::S4JkS1il, &config);
        assert!(matches!(err, Err(JKError::NonFinite { what: "eri", index: 4 })));
    }

    #[test]
    fn test_cancelled_leaves_zeroed_outputs() {
        let n = 4;
        let eri = random_eri(n, EriSymm::S8, 17);
        let dm = random_dm(n, 18, false);
        let (mut vj, mut vk) = (vec![1.0; n * n], vec![1.0; n * n]);
        let config = JKConfig { cancel: Some(Arc::new(AtomicBool::new(true))), ..Default::default() };
        let err = incore_drv(&eri, &dm, &dm, &mut vj, &mut vk, n, JKernel::S8IjS2kl, KKernel::S8JkS2il, &config);
        assert!(matches!(err, Err(JKError::Cancelled)));
        assert!(vj.iter().chain(&vk).all(|&v| v == 0.0));
    }
}
