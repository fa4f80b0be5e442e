//! Integration state of the fixed-size VODE (BDF) integrator.
//!
//! [`DvodeState`] carries the whole numerical history of one integration between steps:
//! the Nordsieck array `yh`, the step and order bookkeeping, the BDF coefficient tables,
//! the Jacobian storage and the counters. Everything is a fixed-size value generic over the
//! number of equations `NEQ`; the Jacobian storage `M` and the Jacobian cache policy `C`
//! are type parameters, so the choices are made when the crate is built:
//!
//! - `M`: [`DenseJacobian`] or a network-declared
//!   [`SparseJacobian`](crate::somelinalg::RustedLINPACK::sparse_lu::SparseJacobian);
//! - `C`: [`HostJacobianCache`] keeps a copy of the unscaled Jacobian so that it can be
//!   reused with a new step size, [`NoJacobianCache`] (selected by the `gpu` feature)
//!   stores nothing and forces a reevaluation every time the Newton matrix is rebuilt.
//!
//! The state is reinitialized by every call of `dvode` with `JSTART == 0`.
use crate::numerical::VODE::VODE_error::VodeError;
use crate::somelinalg::RustedLINPACK::dense_lu::DenseJacobian;
use crate::somelinalg::jacobian_storage::{JacobianMatrix, LinearSolveError};
use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use strum_macros::{Display, EnumIter, EnumString};

/// maximum order of the BDF formulas
pub const VODE_MAXORD: usize = 5;
/// number of columns of the Nordsieck array
pub const VODE_LMAX: usize = VODE_MAXORD + 1;
/// unit roundoff
pub const UROUND: f64 = f64::EPSILON;

/// Integrator-facing view of the ODE system `y' = f(t, y)`.
pub trait VodeSystem<const NEQ: usize> {
    type Jacobian: JacobianMatrix<NEQ>;
    fn rhs(
        &mut self,
        t: f64,
        y: &SVector<f64, NEQ>,
        ydot: &mut SVector<f64, NEQ>,
    ) -> Result<(), VodeError>;
    /// unscaled Jacobian df/dy at (t, y)
    fn jac(
        &mut self,
        t: f64,
        y: &SVector<f64, NEQ>,
        jac: &mut Self::Jacobian,
    ) -> Result<(), VodeError>;
    /// projects an accepted solution back onto the physically valid set
    fn clean(&self, _y: &mut SVector<f64, NEQ>) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JacobianMode {
    /// network supplied Jacobian (DVODE MITER = 1)
    Analytic,
    /// forward difference Jacobian (DVODE MITER = 2)
    Numerical,
}

/// Tunable constants of the integrator, owned by each state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VodeTuning {
    /// relative change in `H*RL1` that forces a new Newton matrix
    pub ccmxj: f64,
    pub hmin: f64,
    /// inverse of the maximum step size, 0 means unbounded
    pub hmxi: f64,
    pub max_steps_between_jacobian_evals: usize,
    /// MXNCF: corrector failures allowed in one step
    pub max_convergence_failures: usize,
    /// KFH: error test failures allowed in one step
    pub max_error_test_failures: usize,
    /// MAXCOR
    pub max_corrector_iterations: usize,
    pub max_steps: usize,
    pub max_order: usize,
    /// MXHNIL: how many `t + h == t` warnings are printed
    pub max_hnil_warnings: usize,
    pub jacobian: JacobianMode,
}

impl Default for VodeTuning {
    fn default() -> Self {
        VodeTuning {
            ccmxj: 0.2,
            hmin: 0.0,
            hmxi: 0.0,
            max_steps_between_jacobian_evals: 50,
            max_convergence_failures: 10,
            max_error_test_failures: 7,
            max_corrector_iterations: 3,
            max_steps: 150000,
            max_order: VODE_MAXORD,
            max_hnil_warnings: 10,
            jacobian: JacobianMode::Analytic,
        }
    }
}

impl VodeTuning {
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.ccmxj > 0.0) {
            return Err("ccmxj must be positive");
        }
        if !(self.hmin >= 0.0) || !(self.hmxi >= 0.0) {
            return Err("hmin and hmxi must be non-negative");
        }
        if self.max_order == 0 || self.max_order > VODE_MAXORD {
            return Err("max_order must be in 1..=5");
        }
        if self.max_convergence_failures == 0
            || self.max_error_test_failures < 3
            || self.max_corrector_iterations == 0
            || self.max_steps == 0
            || self.max_steps_between_jacobian_evals == 0
        {
            return Err("iteration limits are too small");
        }
        Ok(())
    }
}

/// Where the unscaled Jacobian is kept between Newton matrix rebuilds.
pub trait JacobianCache<const N: usize, M: JacobianMatrix<N>> {
    fn empty() -> Self;
    fn is_available(&self) -> bool;
    fn save(&mut self, jac: &M);
    /// copies the saved Jacobian into `jac`, false when nothing is saved
    fn restore(&self, jac: &mut M) -> bool;
    fn invalidate(&mut self);
}

/// Host policy: one saved copy of the unscaled Jacobian (`jac_save`).
#[derive(Debug, Clone)]
pub struct HostJacobianCache<M> {
    pub jac_save: Option<M>,
}

impl<const N: usize, M: JacobianMatrix<N>> JacobianCache<N, M> for HostJacobianCache<M> {
    fn empty() -> Self {
        HostJacobianCache { jac_save: None }
    }
    fn is_available(&self) -> bool {
        self.jac_save.is_some()
    }
    fn save(&mut self, jac: &M) {
        match self.jac_save.as_mut() {
            Some(saved) => saved.clone_from(jac),
            None => self.jac_save = Some(jac.clone()),
        }
    }
    fn restore(&self, jac: &mut M) -> bool {
        match &self.jac_save {
            Some(saved) => {
                jac.clone_from(saved);
                true
            }
            None => false,
        }
    }
    fn invalidate(&mut self) {
        self.jac_save = None;
    }
}

/// Device policy: nothing is stored, every rebuild reevaluates the Jacobian.
#[derive(Debug, Clone, Copy)]
pub struct NoJacobianCache<M> {
    _storage: PhantomData<M>,
}

impl<const N: usize, M: JacobianMatrix<N>> JacobianCache<N, M> for NoJacobianCache<M> {
    fn empty() -> Self {
        NoJacobianCache {
            _storage: PhantomData,
        }
    }
    fn is_available(&self) -> bool {
        false
    }
    fn save(&mut self, _jac: &M) {}
    fn restore(&self, _jac: &mut M) -> bool {
        false
    }
    fn invalidate(&mut self) {}
}

cfg_if::cfg_if! {
    if #[cfg(feature = "gpu")] {
        pub type DefaultJacobianCache<M> = NoJacobianCache<M>;
    } else {
        pub type DefaultJacobianCache<M> = HostJacobianCache<M>;
    }
}

/// Counters of a finished (or aborted) integration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VodeStats {
    pub NST: usize,
    pub NFE: usize,
    pub NJE: usize,
    pub NLU: usize,
    pub NNI: usize,
    pub NCFN: usize,
    pub NETF: usize,
    pub HU: f64,
    pub NQU: usize,
}

impl fmt::Display for VodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "steps: {}, rhs evals: {}, jac evals: {}, LU: {}, nonlinear iters: {}, conv. failures: {}, error test failures: {}, last h: {:e}, last order: {}",
            self.NST, self.NFE, self.NJE, self.NLU, self.NNI, self.NCFN, self.NETF, self.HU, self.NQU
        )
    }
}

pub struct DvodeState<const NEQ: usize, M = DenseJacobian<NEQ>, C = DefaultJacobianCache<M>> {
    // step size and order bookkeeping
    pub CONP: f64,
    pub CRATE: f64,
    pub DRC: f64,
    pub ETA: f64,
    pub ETAMAX: f64,
    pub H: f64,
    pub HNEW: f64,
    pub HSCAL: f64,
    pub PRL1: f64,
    pub RC: f64,
    pub RL1: f64,
    pub ACNRM: f64,
    pub HU: f64,
    pub tn: f64,

    // counters
    pub NST: usize,
    pub NFE: usize,
    pub NJE: usize,
    pub NLU: usize,
    pub NNI: usize,
    pub NCFN: usize,
    pub NETF: usize,
    pub NSLJ: usize,
    pub NSLP: usize,
    pub NHNIL: usize,

    pub KFLAG: i32,
    pub JSTART: i32,
    /// 0 no failure, 1 failure with a stale Jacobian, 2 failure with a current one
    pub ICF: i32,
    /// the Newton matrix must be rebuilt
    pub IPUP: bool,
    /// the Jacobian was evaluated at the current step
    pub JCUR: bool,
    pub NEWH: bool,
    pub L: usize,
    pub NEWQ: usize,
    pub NQ: usize,
    pub NQU: usize,
    pub NQWAIT: usize,

    pub el: [f64; VODE_LMAX],
    pub tau: [f64; VODE_LMAX],
    pub tq: [f64; 5],

    pub rtol: SVector<f64, NEQ>,
    pub atol: SVector<f64, NEQ>,
    pub t: f64,
    pub tout: f64,
    pub y: SVector<f64, NEQ>,

    /// Newton matrix storage: the Jacobian before scaling, the LU factors after
    pub jac: M,
    pub jac_cache: C,
    /// last factorization failure, reported if the step is finally abandoned
    pub last_solve_error: Option<LinearSolveError>,

    pub yh: SMatrix<f64, NEQ, VODE_LMAX>,
    pub ewt: SVector<f64, NEQ>,
    pub savf: SVector<f64, NEQ>,
    pub acor: SVector<f64, NEQ>,

    pub tuning: VodeTuning,
}

impl<const NEQ: usize, M: JacobianMatrix<NEQ>, C: JacobianCache<NEQ, M>> DvodeState<NEQ, M, C> {
    pub fn new(tuning: VodeTuning) -> Self {
        DvodeState {
            CONP: 0.0,
            CRATE: 1.0,
            DRC: 0.0,
            ETA: 1.0,
            ETAMAX: 1.0e4,
            H: 0.0,
            HNEW: 0.0,
            HSCAL: 0.0,
            PRL1: 1.0,
            RC: 0.0,
            RL1: 0.0,
            ACNRM: 0.0,
            HU: 0.0,
            tn: 0.0,
            NST: 0,
            NFE: 0,
            NJE: 0,
            NLU: 0,
            NNI: 0,
            NCFN: 0,
            NETF: 0,
            NSLJ: 0,
            NSLP: 0,
            NHNIL: 0,
            KFLAG: 0,
            JSTART: 0,
            ICF: 0,
            IPUP: true,
            JCUR: false,
            NEWH: false,
            L: 2,
            NEWQ: 1,
            NQ: 1,
            NQU: 0,
            NQWAIT: 2,
            el: [0.0; VODE_LMAX],
            tau: [0.0; VODE_LMAX],
            tq: [0.0; 5],
            rtol: SVector::repeat(1.0e-6),
            atol: SVector::repeat(1.0e-8),
            t: 0.0,
            tout: 0.0,
            y: SVector::zeros(),
            jac: M::zeros(),
            jac_cache: C::empty(),
            last_solve_error: None,
            yh: SMatrix::zeros(),
            ewt: SVector::zeros(),
            savf: SVector::zeros(),
            acor: SVector::zeros(),
            tuning,
        }
    }

    pub fn stats(&self) -> VodeStats {
        VodeStats {
            NST: self.NST,
            NFE: self.NFE,
            NJE: self.NJE,
            NLU: self.NLU,
            NNI: self.NNI,
            NCFN: self.NCFN,
            NETF: self.NETF,
            HU: self.HU,
            NQU: self.NQU,
        }
    }

    /// Sets the inverse error weights `1/(rtol_i |ycur_i| + atol_i)`.
    pub fn ewset(&mut self, ycur: &SVector<f64, NEQ>) -> Result<(), VodeError> {
        for i in 0..NEQ {
            let w = self.rtol[i] * ycur[i].abs() + self.atol[i];
            if !(w > 0.0) {
                return Err(VodeError::ZeroErrorWeight {
                    t: self.tn,
                    component: i,
                });
            }
            self.ewt[i] = 1.0 / w;
        }
        Ok(())
    }

    /// Dumps the whole record to the log
    #[cfg(not(feature = "gpu"))]
    pub fn print_state(&self) {
        log::info!("{}", self);
    }
}

/// Weighted root-mean-square norm with inverse weights `w`
pub fn vnorm<const N: usize>(v: &SVector<f64, N>, w: &SVector<f64, N>) -> f64 {
    if N == 0 {
        return 0.0;
    }
    let sum: f64 = v.iter().zip(w.iter()).map(|(a, b)| (a * b) * (a * b)).sum();
    (sum / N as f64).sqrt()
}

impl<const NEQ: usize, M, C> fmt::Display for DvodeState<NEQ, M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "t = {:e}, tn = {:e}, tout = {:e}", self.t, self.tn, self.tout)?;
        writeln!(f, "H = {:e}, HNEW = {:e}, HSCAL = {:e}, HU = {:e}", self.H, self.HNEW, self.HSCAL, self.HU)?;
        writeln!(f, "ETA = {:e}, ETAMAX = {:e}, CONP = {:e}, ACNRM = {:e}", self.ETA, self.ETAMAX, self.CONP, self.ACNRM)?;
        writeln!(f, "CRATE = {:e}, DRC = {:e}, RC = {:e}, RL1 = {:e}, PRL1 = {:e}", self.CRATE, self.DRC, self.RC, self.RL1, self.PRL1)?;
        writeln!(
            f,
            "NQ = {}, NEWQ = {}, NQU = {}, L = {}, NQWAIT = {}, NEWH = {}, KFLAG = {}, JSTART = {}",
            self.NQ, self.NEWQ, self.NQU, self.L, self.NQWAIT, self.NEWH, self.KFLAG, self.JSTART
        )?;
        writeln!(
            f,
            "NST = {}, NFE = {}, NJE = {}, NLU = {}, NNI = {}, NCFN = {}, NETF = {}, NSLJ = {}, NSLP = {}",
            self.NST, self.NFE, self.NJE, self.NLU, self.NNI, self.NCFN, self.NETF, self.NSLJ, self.NSLP
        )?;
        writeln!(f, "ICF = {}, IPUP = {}, JCUR = {}", self.ICF, self.IPUP, self.JCUR)?;
        writeln!(f, "el = {:?}", self.el)?;
        writeln!(f, "tau = {:?}", self.tau)?;
        writeln!(f, "tq = {:?}", self.tq)?;
        for i in 0..NEQ {
            writeln!(
                f,
                "y[{}] = {:e}, rtol = {:e}, atol = {:e}, ewt = {:e}, savf = {:e}, acor = {:e}",
                i, self.y[i], self.rtol[i], self.atol[i], self.ewt[i], self.savf[i], self.acor[i]
            )?;
        }
        for i in 0..NEQ {
            write!(f, "yh[{}, :] =", i)?;
            for j in 0..VODE_LMAX {
                write!(f, " {:e}", self.yh[(i, j)])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
