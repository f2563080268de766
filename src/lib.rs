#![allow(clippy::deref_addrof)]

pub mod prelude;

pub mod dense;
pub mod driver;
pub mod error;
pub mod jk;
pub mod kernel;
pub mod pack;
pub mod structs;
pub mod symm;
pub mod util;
pub mod vj;
pub mod vk;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
fn h2o_jk_reference() -> (Vec<f64>, prelude::Tsr, prelude::Tsr, prelude::Tsr, usize) {
    use crate::prelude::*;
    use libcint::prelude::*;

    let cint_data = init_h2o_def2_tzvp();
    let nao = cint_data.nao();
    let int2e = util::intor_row_major(&cint_data, "int2e");
    let dm = util::intor_row_major(&cint_data, "int1e_ovlp");
    let JKResults { vj, vk } = dense::get_jk_dense(&int2e, dm.view(), true, true).unwrap();
    (util::tensor_to_vec(int2e.view()), dm, vj.unwrap(), vk.unwrap(), nao)
}

#[test]
fn playground_packed_jk() {
    use crate::prelude::*;

    let (int2e, dm, vj_ref, vk_ref, nao) = h2o_jk_reference();
    let (vj_ref, vk_ref) = (util::tensor_to_vec(vj_ref.view()), util::tensor_to_vec(vk_ref.view()));
    let config = JKConfig::default();
    for symm in [EriSymm::S8, EriSymm::S4, EriSymm::S1] {
        let eri = pack::pack_eri(&int2e, nao, symm).unwrap();
        for hermi in [true, false] {
            let timer = std::time::Instant::now();
            let JKResults { vj, vk } = jk::get_jk_incore(&eri, dm.view(), hermi, true, true, &config).unwrap();
            println!("Time elapsed ({symm}, hermi = {hermi}): {:?}", timer.elapsed());
            let vj = util::tensor_to_vec(vj.unwrap().view());
            let vk = util::tensor_to_vec(vk.unwrap().view());
            assert!(util::max_abs_diff(&vj, &vj_ref) < 1e-10);
            assert!(util::max_abs_diff(&vk, &vk_ref) < 1e-10);
        }
    }
}

#[test]
fn playground_packed_jk_every_kernel() {
    use crate::prelude::*;

    let (int2e, dm, vj_ref, vk_ref, nao) = h2o_jk_reference();
    let (vj_ref, vk_ref) = (util::tensor_to_vec(vj_ref.view()), util::tensor_to_vec(vk_ref.view()));
    let dm = util::tensor_to_vec(dm.view());
    let config = JKConfig::default();

    // on real integrals every pattern reduces to J or K
    for fvj in JKernel::ALL {
        let eri = pack::pack_eri(&int2e, nao, fvj.symm()).unwrap();
        let dmj = if fvj == JKernel::S8TriDm { util::fold_tril(&dm, nao) } else { dm.clone() };
        let mut vj = vec![0.0; nao * nao];
        driver::incore_drv_with(&eri, nao, Some((fvj, dmj.as_slice(), vj.as_mut_slice())), None, &config).unwrap();
        if fvj.fill() == Fill::Lower {
            util::lower_to_upper(&mut vj, nao);
        }
        assert!(util::max_abs_diff(&vj, &vj_ref) < 1e-10, "{fvj}");
    }
    for fvk in KKernel::ALL {
        let eri = pack::pack_eri(&int2e, nao, fvk.symm()).unwrap();
        let mut vk = vec![0.0; nao * nao];
        driver::incore_drv_with(&eri, nao, None, Some((fvk, dm.as_slice(), vk.as_mut_slice())), &config).unwrap();
        if fvk.fill() == Fill::Lower {
            util::lower_to_upper(&mut vk, nao);
        }
        assert!(util::max_abs_diff(&vk, &vk_ref) < 1e-10, "{fvk}");
    }
}
