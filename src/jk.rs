//! Coulomb and exchange matrices from packed integrals.

use crate::driver::incore_drv_with;
use crate::error::JKError;
use crate::kernel::{Fill, JKernel, KKernel};
use crate::prelude::*;
use crate::symm::EriSymm;
use crate::util::{fold_tril, lower_to_upper, matrix_from_vec, tensor_to_vec};

/// Kernels used for a storage class. `hermi` selects the lower-triangle variants.
pub fn select_kernels(symm: EriSymm, hermi: bool) -> (JKernel, KKernel) {
    match (symm, hermi) {
        (EriSymm::S8, true) => (JKernel::S8TriDm, KKernel::S8JkS2il),
        (EriSymm::S8, false) => (JKernel::S8IjS2kl, KKernel::S8JkS1il),
        (EriSymm::S4, true) => (JKernel::S4KlS2ij, KKernel::S4JkS2il),
        (EriSymm::S4, false) => (JKernel::S4KlS2ij, KKernel::S4JkS1il),
        (EriSymm::S2ij, _) => (JKernel::S2ijKlS2ij, KKernel::S2ijJkS1il),
        (EriSymm::S2kl, _) => (JKernel::S2klKlS1ij, KKernel::S2klJkS1il),
        (EriSymm::S1, _) => (JKernel::S1KlS1ij, KKernel::S1JkS1il),
    }
}

/// J (`ijkl,kl->ij`) and K (`ijkl,jk->il`) of one density matrix.
///
/// The storage class is inferred from `eri.len()` among `s8`, `s4` and `s1`. With `hermi`, `dm` must be
/// symmetric and the integrals real, so that K is symmetric and only its lower triangle is computed.
pub fn get_jk_incore(
    eri: &[f64],
    dm: TsrView,
    hermi: bool,
    with_j: bool,
    with_k: bool,
    config: &JKConfig,
) -> Result<JKResults, JKError> {
    let shape = dm.shape();
    if shape.len() != 2 || shape[0] != shape[1] {
        return Err(JKError::NotSquare(shape.to_vec()));
    }
    let n = shape[0];
    let symm = EriSymm::detect(eri.len(), n).ok_or(JKError::UnknownLayout { len: eri.len(), n })?;
    get_jk_incore_with_symm(eri, symm, tensor_to_vec(dm), n, hermi, with_j, with_k, config)
}

/// As [`get_jk_incore`], for an explicit storage class and a row-major density buffer.
#[allow(clippy::too_many_arguments)]
pub fn get_jk_incore_with_symm(
    eri: &[f64],
    symm: EriSymm,
    dm: Vec<f64>,
    n: usize,
    hermi: bool,
    with_j: bool,
    with_k: bool,
    config: &JKConfig,
) -> Result<JKResults, JKError> {
    let (vj, vk) = jk_buffers(eri, symm, &dm, n, hermi, with_j, with_k, config)?;
    let vj = with_j.then(|| matrix_from_vec(vj, n));
    let vk = with_k.then(|| matrix_from_vec(vk, n));
    Ok(JKResults { vj, vk })
}

/// Complete row-major `n * n` J and K; a buffer not requested is returned empty.
#[allow(clippy::too_many_arguments)]
pub(crate) fn jk_buffers(
    eri: &[f64],
    symm: EriSymm,
    dm: &[f64],
    n: usize,
    hermi: bool,
    with_j: bool,
    with_k: bool,
    config: &JKConfig,
) -> Result<(Vec<f64>, Vec<f64>), JKError> {
    let (fvj, fvk) = select_kernels(symm, hermi);
    log::debug!("get_jk_incore: {symm}, n = {n}, hermi = {hermi}, J = {fvj}, K = {fvk}");

    if dm.len() != n * n {
        return Err(JKError::ShapeMismatch { what: "dm", expected: n * n, found: dm.len() });
    }
    let dm_folded;
    let dmj = if fvj == JKernel::S8TriDm {
        dm_folded = fold_tril(dm, n);
        dm_folded.as_slice()
    } else {
        dm
    };

    let mut vj = if with_j { vec![0.0; n * n] } else { vec![] };
    let mut vk = if with_k { vec![0.0; n * n] } else { vec![] };
    let j_task = with_j.then_some((fvj, dmj, vj.as_mut_slice()));
    let k_task = with_k.then_some((fvk, dm, vk.as_mut_slice()));
    incore_drv_with(eri, n, j_task, k_task, config)?;

    if with_j && fvj.fill() == Fill::Lower {
        lower_to_upper(&mut vj, n);
    }
    if with_k && fvk.fill() == Fill::Lower {
        lower_to_upper(&mut vk, n);
    }
    Ok((vj, vk))
}
