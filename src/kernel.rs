//! Kernel catalogue: which storage class a kernel reads, which contraction it performs, and which part
//! of the output it fills.

use crate::error::JKError;
use crate::symm::{EriSymm, npair};
use crate::{vj, vk};
use std::fmt;
use std::str::FromStr;

/// Index pattern of a contraction, in einsum notation over `T[i, j, k, l]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Contraction {
    /// `ijkl,ij->kl`
    IjToKl,
    /// `ijkl,kl->ij`
    KlToIj,
    /// `ijkl,jk->il`
    JkToIl,
    /// `ijkl,il->jk`
    IlToJk,
}

impl Contraction {
    pub const ALL: [Contraction; 4] =
        [Contraction::IjToKl, Contraction::KlToIj, Contraction::JkToIl, Contraction::IlToJk];

    pub fn subscripts(self) -> &'static str {
        match self {
            Contraction::IjToKl => "ijkl,ij->kl",
            Contraction::KlToIj => "ijkl,kl->ij",
            Contraction::JkToIl => "ijkl,jk->il",
            Contraction::IlToJk => "ijkl,il->jk",
        }
    }
}

impl fmt::Display for Contraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subscripts())
    }
}

impl FromStr for Contraction {
    type Err = JKError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact = s.replace(' ', "").to_ascii_lowercase();
        match compact.as_str() {
            "ij->kl" | "ijkl,ij->kl" => Ok(Contraction::IjToKl),
            "kl->ij" | "ijkl,kl->ij" => Ok(Contraction::KlToIj),
            "jk->il" | "ijkl,jk->il" => Ok(Contraction::JkToIl),
            "il->jk" | "ijkl,il->jk" => Ok(Contraction::IlToJk),
            _ => Err(JKError::UnknownContraction(s.to_string())),
        }
    }
}

/// Part of the `n * n` output a kernel writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Every cell.
    Full,
    /// Cells with `row >= col`; the upper triangle stays zero.
    Lower,
}

/* #region JKernel */

/// Coulomb-type kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JKernel {
    S8IjS2kl,
    /// As [`JKernel::S8IjS2kl`], with the density passed pre-folded as a packed lower triangle.
    S8TriDm,
    S4IjS2kl,
    S4KlS2ij,
    S2ijIjS1kl,
    S2ijKlS2ij,
    S2klIjS2kl,
    S2klKlS1ij,
    S1IjS1kl,
    S1KlS1ij,
}

impl JKernel {
    pub const ALL: [JKernel; 10] = [
        JKernel::S8IjS2kl,
        JKernel::S8TriDm,
        JKernel::S4IjS2kl,
        JKernel::S4KlS2ij,
        JKernel::S2ijIjS1kl,
        JKernel::S2ijKlS2ij,
        JKernel::S2klIjS2kl,
        JKernel::S2klKlS1ij,
        JKernel::S1IjS1kl,
        JKernel::S1KlS1ij,
    ];

    pub fn name(self) -> &'static str {
        match self {
            JKernel::S8IjS2kl => "s8_ij_s2kl",
            JKernel::S8TriDm => "s8_tridm_vj",
            JKernel::S4IjS2kl => "s4_ij_s2kl",
            JKernel::S4KlS2ij => "s4_kl_s2ij",
            JKernel::S2ijIjS1kl => "s2ij_ij_s1kl",
            JKernel::S2ijKlS2ij => "s2ij_kl_s2ij",
            JKernel::S2klIjS2kl => "s2kl_ij_s2kl",
            JKernel::S2klKlS1ij => "s2kl_kl_s1ij",
            JKernel::S1IjS1kl => "s1_ij_s1kl",
            JKernel::S1KlS1ij => "s1_kl_s1ij",
        }
    }

    pub fn symm(self) -> EriSymm {
        match self {
            JKernel::S8IjS2kl | JKernel::S8TriDm => EriSymm::S8,
            JKernel::S4IjS2kl | JKernel::S4KlS2ij => EriSymm::S4,
            JKernel::S2ijIjS1kl | JKernel::S2ijKlS2ij => EriSymm::S2ij,
            JKernel::S2klIjS2kl | JKernel::S2klKlS1ij => EriSymm::S2kl,
            JKernel::S1IjS1kl | JKernel::S1KlS1ij => EriSymm::S1,
        }
    }

    pub fn contraction(self) -> Contraction {
        match self {
            JKernel::S8IjS2kl
            | JKernel::S8TriDm
            | JKernel::S4IjS2kl
            | JKernel::S2ijIjS1kl
            | JKernel::S2klIjS2kl
            | JKernel::S1IjS1kl => Contraction::IjToKl,
            JKernel::S4KlS2ij | JKernel::S2ijKlS2ij | JKernel::S2klKlS1ij | JKernel::S1KlS1ij => {
                Contraction::KlToIj
            },
        }
    }

    pub fn fill(self) -> Fill {
        match self {
            JKernel::S8IjS2kl
            | JKernel::S8TriDm
            | JKernel::S4IjS2kl
            | JKernel::S4KlS2ij
            | JKernel::S2ijKlS2ij
            | JKernel::S2klIjS2kl => Fill::Lower,
            JKernel::S2ijIjS1kl | JKernel::S2klKlS1ij | JKernel::S1IjS1kl | JKernel::S1KlS1ij => Fill::Full,
        }
    }

    /// Expected density length for basis dimension `n`.
    pub fn dm_len(self, n: usize) -> usize {
        match self {
            JKernel::S8TriDm => npair(n),
            _ => n * n,
        }
    }

    /// Applies the kernel to the block of outer pair `(ic, jc)`.
    #[inline]
    pub fn apply(self, eri: &[f64], dm: &[f64], out: &mut [f64], n: usize, ic: usize, jc: usize) {
        match self {
            JKernel::S8IjS2kl => vj::s8_ij_s2kl(eri, dm, out, n, ic, jc),
            JKernel::S8TriDm => vj::s8_tridm_vj(eri, dm, out, n, ic, jc),
            JKernel::S4IjS2kl => vj::s4_ij_s2kl(eri, dm, out, n, ic, jc),
            JKernel::S4KlS2ij => vj::s4_kl_s2ij(eri, dm, out, n, ic, jc),
            JKernel::S2ijIjS1kl => vj::s2ij_ij_s1kl(eri, dm, out, n, ic, jc),
            JKernel::S2ijKlS2ij => vj::s2ij_kl_s2ij(eri, dm, out, n, ic, jc),
            JKernel::S2klIjS2kl => vj::s2kl_ij_s2kl(eri, dm, out, n, ic, jc),
            JKernel::S2klKlS1ij => vj::s2kl_kl_s1ij(eri, dm, out, n, ic, jc),
            JKernel::S1IjS1kl => vj::s1_ij_s1kl(eri, dm, out, n, ic, jc),
            JKernel::S1KlS1ij => vj::s1_kl_s1ij(eri, dm, out, n, ic, jc),
        }
    }
}

impl fmt::Display for JKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JKernel {
    type Err = JKError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        JKernel::ALL.into_iter().find(|k| k.name() == lower).ok_or_else(|| JKError::UnknownKernel(s.to_string()))
    }
}

/* #endregion */

/* #region KKernel */

/// Exchange-type kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KKernel {
    S8JkS1il,
    S8JkS2il,
    S4JkS1il,
    S4IlS1jk,
    S4JkS2il,
    S4IlS2jk,
    S2ijJkS1il,
    S2ijIlS1jk,
    S2klJkS1il,
    S2klIlS1jk,
    S1JkS1il,
    S1IlS1jk,
}

impl KKernel {
    pub const ALL: [KKernel; 12] = [
        KKernel::S8JkS1il,
        KKernel::S8JkS2il,
        KKernel::S4JkS1il,
        KKernel::S4IlS1jk,
        KKernel::S4JkS2il,
        KKernel::S4IlS2jk,
        KKernel::S2ijJkS1il,
        KKernel::S2ijIlS1jk,
        KKernel::S2klJkS1il,
        KKernel::S2klIlS1jk,
        KKernel::S1JkS1il,
        KKernel::S1IlS1jk,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KKernel::S8JkS1il => "s8_jk_s1il",
            KKernel::S8JkS2il => "s8_jk_s2il",
            KKernel::S4JkS1il => "s4_jk_s1il",
            KKernel::S4IlS1jk => "s4_il_s1jk",
            KKernel::S4JkS2il => "s4_jk_s2il",
            KKernel::S4IlS2jk => "s4_il_s2jk",
            KKernel::S2ijJkS1il => "s2ij_jk_s1il",
            KKernel::S2ijIlS1jk => "s2ij_il_s1jk",
            KKernel::S2klJkS1il => "s2kl_jk_s1il",
            KKernel::S2klIlS1jk => "s2kl_il_s1jk",
            KKernel::S1JkS1il => "s1_jk_s1il",
            KKernel::S1IlS1jk => "s1_il_s1jk",
        }
    }

    pub fn symm(self) -> EriSymm {
        match self {
            KKernel::S8JkS1il | KKernel::S8JkS2il => EriSymm::S8,
            KKernel::S4JkS1il | KKernel::S4IlS1jk | KKernel::S4JkS2il | KKernel::S4IlS2jk => EriSymm::S4,
            KKernel::S2ijJkS1il | KKernel::S2ijIlS1jk => EriSymm::S2ij,
            KKernel::S2klJkS1il | KKernel::S2klIlS1jk => EriSymm::S2kl,
            KKernel::S1JkS1il | KKernel::S1IlS1jk => EriSymm::S1,
        }
    }

    pub fn contraction(self) -> Contraction {
        match self {
            KKernel::S8JkS1il
            | KKernel::S8JkS2il
            | KKernel::S4JkS1il
            | KKernel::S4JkS2il
            | KKernel::S2ijJkS1il
            | KKernel::S2klJkS1il
            | KKernel::S1JkS1il => Contraction::JkToIl,
            KKernel::S4IlS1jk | KKernel::S4IlS2jk | KKernel::S2ijIlS1jk | KKernel::S2klIlS1jk | KKernel::S1IlS1jk => {
                Contraction::IlToJk
            },
        }
    }

    pub fn fill(self) -> Fill {
        match self {
            KKernel::S8JkS2il | KKernel::S4JkS2il | KKernel::S4IlS2jk => Fill::Lower,
            _ => Fill::Full,
        }
    }

    pub fn dm_len(self, n: usize) -> usize {
        n * n
    }

    #[inline]
    pub fn apply(self, eri: &[f64], dm: &[f64], out: &mut [f64], n: usize, ic: usize, jc: usize) {
        match self {
            KKernel::S8JkS1il => vk::s8_jk_s1il(eri, dm, out, n, ic, jc),
            KKernel::S8JkS2il => vk::s8_jk_s2il(eri, dm, out, n, ic, jc),
            KKernel::S4JkS1il => vk::s4_jk_s1il(eri, dm, out, n, ic, jc),
            KKernel::S4IlS1jk => vk::s4_il_s1jk(eri, dm, out, n, ic, jc),
            KKernel::S4JkS2il => vk::s4_jk_s2il(eri, dm, out, n, ic, jc),
            KKernel::S4IlS2jk => vk::s4_il_s2jk(eri, dm, out, n, ic, jc),
            KKernel::S2ijJkS1il => vk::s2ij_jk_s1il(eri, dm, out, n, ic, jc),
            KKernel::S2ijIlS1jk => vk::s2ij_il_s1jk(eri, dm, out, n, ic, jc),
            KKernel::S2klJkS1il => vk::s2kl_jk_s1il(eri, dm, out, n, ic, jc),
            KKernel::S2klIlS1jk => vk::s2kl_il_s1jk(eri, dm, out, n, ic, jc),
            KKernel::S1JkS1il => vk::s1_jk_s1il(eri, dm, out, n, ic, jc),
            KKernel::S1IlS1jk => vk::s1_il_s1jk(eri, dm, out, n, ic, jc),
        }
    }
}

impl fmt::Display for KKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KKernel {
    type Err = JKError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        KKernel::ALL.into_iter().find(|k| k.name() == lower).ok_or_else(|| JKError::UnknownKernel(s.to_string()))
    }
}

/* #endregion */

/// Either kind of kernel, as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyKernel {
    J(JKernel),
    K(KKernel),
}

impl AnyKernel {
    pub fn all() -> impl Iterator<Item = AnyKernel> {
        JKernel::ALL.into_iter().map(AnyKernel::J).chain(KKernel::ALL.into_iter().map(AnyKernel::K))
    }

    pub fn name(self) -> &'static str {
        match self {
            AnyKernel::J(k) => k.name(),
            AnyKernel::K(k) => k.name(),
        }
    }

    pub fn symm(self) -> EriSymm {
        match self {
            AnyKernel::J(k) => k.symm(),
            AnyKernel::K(k) => k.symm(),
        }
    }

    pub fn contraction(self) -> Contraction {
        match self {
            AnyKernel::J(k) => k.contraction(),
            AnyKernel::K(k) => k.contraction(),
        }
    }

    pub fn fill(self) -> Fill {
        match self {
            AnyKernel::J(k) => k.fill(),
            AnyKernel::K(k) => k.fill(),
        }
    }

    pub fn dm_len(self, n: usize) -> usize {
        match self {
            AnyKernel::J(k) => k.dm_len(n),
            AnyKernel::K(k) => k.dm_len(n),
        }
    }
}

impl FromStr for AnyKernel {
    type Err = JKError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<JKernel>().map(AnyKernel::J).or_else(|_| s.parse::<KKernel>().map(AnyKernel::K))
    }
}
