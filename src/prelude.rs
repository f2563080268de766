#![allow(unused)]

/* #region for API callers */

pub use crate::error::JKError;
pub use crate::kernel::{AnyKernel, Contraction, Fill, JKernel, KKernel};
pub use crate::structs::{JKConfig, JKResults};
pub use crate::symm::EriSymm;

// RSTSR backend
pub type DeviceTsr = DeviceFaer;

pub type Tsr<D = IxD> = Tensor<f64, DeviceTsr, D>;
pub type TsrView<'a, D = IxD> = TensorView<'a, f64, DeviceTsr, D>;

/* #endregion */

/* #region for developers */

pub(crate) use rayon::prelude::*;
pub(crate) use rstsr::prelude::*;

/* #endregion */
