//! Fixtures shared by unit tests.

use crate::symm::EriSymm;
use rand::prelude::*;

pub fn random_vec(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Random tensor packed in `symm`; every stored value is independent.
pub fn random_eri(n: usize, symm: EriSymm, seed: u64) -> Vec<f64> {
    random_vec(symm.eri_len(n).unwrap(), seed)
}

/// Random `n * n` density, symmetrized when `hermi`.
pub fn random_dm(n: usize, seed: u64, hermi: bool) -> Vec<f64> {
    let mut dm = random_vec(n * n, seed);
    if hermi {
        for i in 0..n {
            for j in 0..i {
                let v = 0.5 * (dm[i * n + j] + dm[j * n + i]);
                dm[i * n + j] = v;
                dm[j * n + i] = v;
            }
        }
    }
    dm
}

pub fn identity(n: usize) -> Vec<f64> {
    let mut eye = vec![0.0; n * n];
    (0..n).for_each(|i| eye[i * n + i] = 1.0);
    eye
}

/// Copy of `mat` with the strict upper triangle zeroed.
pub fn tril(mat: &[f64], n: usize) -> Vec<f64> {
    let mut out = mat.to_vec();
    for i in 0..n {
        for j in i + 1..n {
            out[i * n + j] = 0.0;
        }
    }
    out
}

/// Direct four-index contraction on a dense `n^4` tensor.
pub fn contract_naive(eri_s1: &[f64], dm: &[f64], n: usize, contraction: crate::kernel::Contraction) -> Vec<f64> {
    use crate::kernel::Contraction::*;
    let mut out = vec![0.0; n * n];
    for (idx, &v) in eri_s1.iter().enumerate() {
        let (ij, kl) = (idx / (n * n), idx % (n * n));
        let (i, j, k, l) = (ij / n, ij % n, kl / n, kl % n);
        match contraction {
            IjToKl => out[k * n + l] += v * dm[i * n + j],
            KlToIj => out[i * n + j] += v * dm[k * n + l],
            JkToIl => out[i * n + l] += v * dm[j * n + k],
            IlToJk => out[j * n + k] += v * dm[i * n + l],
        }
    }
    out
}
