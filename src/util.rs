use crate::error::JKError;
use crate::prelude::*;
use crate::symm::{npair, tril_pairs};
use libcint::prelude::*;

/// Obtain integrals (in row-major, same to PySCF but reverse of libcint).
///
/// For `int2e`, `(ij|kl)` sits at `((i n + j) n + k) n + l`.
pub fn intor_row_major(cint_data: &CInt, intor: &str) -> Tsr {
    let device = DeviceTsr::default();

    // intor, "s1", full_shls_slice
    let (out, shape) = cint_data.integrate_row_major(intor, None, None).into();
    rt::asarray((out, shape.c(), &device))
}

/// Row-major contiguous copy of a tensor's data.
pub fn tensor_to_vec(tsr: TsrView) -> Vec<f64> {
    tsr.reshape(-1).to_vec()
}

/// Builds an `(n, n)` tensor from a row-major buffer.
pub fn matrix_from_vec(data: Vec<f64>, n: usize) -> Tsr {
    let device = DeviceTsr::default();
    rt::asarray((data, vec![n, n].c(), &device))
}

/// Density folded onto its packed lower triangle: `dm[i, j] + dm[j, i]` for `i > j`, `dm[i, i]` on
/// the diagonal.
pub fn fold_tril(dm: &[f64], n: usize) -> Vec<f64> {
    tril_pairs().take(npair(n)).map(|(i, j)| crate::vj::folded_dm(dm, n, i, j)).collect()
}

/// Copies the lower triangle onto the upper one.
pub fn lower_to_upper(mat: &mut [f64], n: usize) {
    for i in 0..n {
        for j in 0..i {
            mat[j * n + i] = mat[i * n + j];
        }
    }
}

pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

/// First non-finite entry of `data`, reported as an error naming `what`.
pub fn check_finite(what: &'static str, data: &[f64]) -> Result<(), JKError> {
    match data.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(JKError::NonFinite { what, index }),
        None => Ok(()),
    }
}
