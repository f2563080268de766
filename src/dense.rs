//! Dense four-index contractions by broadcasting, used as reference for the packed drivers.

use crate::error::JKError;
use crate::kernel::Contraction;
use crate::prelude::*;

fn check_shapes(eri4: &Tsr, dm: &TsrView) -> Result<usize, JKError> {
    let shape = dm.shape();
    if shape.len() != 2 || shape[0] != shape[1] {
        return Err(JKError::NotSquare(shape.to_vec()));
    }
    let n = shape[0];
    if eri4.shape()[..] != [n, n, n, n][..] {
        return Err(JKError::ShapeMismatch { what: "eri", expected: n.pow(4), found: eri4.shape().iter().product() });
    }
    Ok(n)
}

/// Contracts a dense `(n, n, n, n)` tensor with an `(n, n)` matrix.
pub fn contract_dense(eri4: &Tsr, dm: TsrView, contraction: Contraction) -> Result<Tsr, JKError> {
    check_shapes(eri4, &dm)?;
    let out = match contraction {
        Contraction::IjToKl => (eri4 * dm.i((.., .., None, None))).sum_axes([0, 1]),
        Contraction::KlToIj => (eri4 * dm.i((None, None, .., ..))).sum_axes([2, 3]),
        Contraction::JkToIl => (eri4 * dm.i((None, .., .., None))).sum_axes([1, 2]),
        Contraction::IlToJk => (eri4 * dm.i((.., None, None, ..))).sum_axes([0, 3]),
    };
    Ok(out)
}

/// Coulomb (`ijkl,kl->ij`) and exchange (`ijkl,jk->il`) matrices from the dense tensor.
pub fn get_jk_dense(eri4: &Tsr, dm: TsrView, with_j: bool, with_k: bool) -> Result<JKResults, JKError> {
    let vj = if with_j { Some(contract_dense(eri4, dm.view(), Contraction::KlToIj)?) } else { None };
    let vk = if with_k { Some(contract_dense(eri4, dm.view(), Contraction::JkToIl)?) } else { None };
    Ok(JKResults { vj, vk })
}
