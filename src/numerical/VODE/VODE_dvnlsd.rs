//! Modified Newton iteration for the BDF corrector.
//!
//! The corrector solves `y = yh[0] + acor` with
//! `acor - RL1*H*f(y) + RL1*yh[1] = 0`, iterating
//! `P * del = RL1*H*f(y) - (RL1*yh[1] + acor)` with the Newton matrix `P = I - H*RL1*J`
//! built from a possibly stale Jacobian. When `RC = (H*RL1)/(H*RL1)_P` differs from 1
//! (the step changed since P was formed) the increment is scaled by `2/(1 + RC)`.
use crate::numerical::VODE::VODE_error::VodeError;
use crate::numerical::VODE::VODE_type::{DvodeState, JacobianCache, VodeSystem, vnorm};
use crate::somelinalg::jacobian_storage::JacobianMatrix;
use log::{debug, trace};
use nalgebra::SVector;

/// factor by which the convergence rate estimate may drop per iteration
pub const CRDOWN: f64 = 0.3;
/// divergence ratio
pub const RDIV: f64 = 2.0;

impl<const NEQ: usize, M: JacobianMatrix<NEQ>, C: JacobianCache<NEQ, M>> DvodeState<NEQ, M, C> {
    /// Corrector for one step attempt. `nflag` is 0 on the first attempt of a step,
    /// -1 after a convergence failure and -2 after an error test failure.
    ///
    /// Returns `Ok(true)` when converged (`acor` and `ACNRM` hold the correction),
    /// `Ok(false)` on a convergence failure that the step controller must handle,
    /// `Err` only when the system itself fails.
    pub fn dvnlsd<S: VodeSystem<NEQ, Jacobian = M>>(
        &mut self,
        sys: &mut S,
        nflag: i32,
    ) -> Result<bool, VodeError> {
        let ccmxj = self.tuning.ccmxj;
        let msbp = self.tuning.max_steps_between_jacobian_evals;
        let maxcor = self.tuning.max_corrector_iterations;

        if self.JSTART == 0 {
            self.NSLP = 0;
            self.IPUP = true;
        }
        if nflag == 0 {
            self.ICF = 0;
        }
        if nflag == -2 {
            self.IPUP = true;
        }
        self.DRC = (self.RC - 1.0).abs();
        if self.DRC > ccmxj || self.NST >= self.NSLP + msbp {
            self.IPUP = true;
        }

        loop {
            let mut m = 0;
            let mut delp = 0.0;
            self.y = self.yh.column(0).into_owned();
            sys.rhs(self.tn, &self.y, &mut self.savf)?;
            self.NFE += 1;

            if self.IPUP {
                let factored = self.dvjac(sys)?;
                self.IPUP = false;
                self.RC = 1.0;
                self.DRC = 0.0;
                self.CRATE = 1.0;
                self.NSLP = self.NST;
                if !factored {
                    self.ICF = 2;
                    self.IPUP = true;
                    return Ok(false);
                }
            }

            self.acor.fill(0.0);
            let yh1: SVector<f64, NEQ> = self.yh.column(1).into_owned();
            let mut converged = false;
            loop {
                if !self.savf.iter().all(|v| v.is_finite()) {
                    debug!("non-finite right-hand side in the corrector at t = {:e}", self.tn);
                    break;
                }
                let hrl1 = self.RL1 * self.H;
                let mut del_y: SVector<f64, NEQ> =
                    self.savf * hrl1 - (yh1 * self.RL1 + self.acor);
                if self.jac.solve(&mut del_y).is_err() {
                    break;
                }
                self.NNI += 1;
                if self.RC != 1.0 {
                    del_y *= 2.0 / (1.0 + self.RC);
                }
                let del = vnorm(&del_y, &self.ewt);
                self.acor += del_y;
                self.y = self.yh.column(0) + self.acor;
                if !del.is_finite() {
                    break;
                }

                if m != 0 {
                    self.CRATE = (CRDOWN * self.CRATE).max(del / delp);
                }
                let dcon = del * self.CRATE.min(1.0) / self.tq[3];
                if dcon <= 1.0 {
                    self.ACNRM = if m == 0 {
                        del
                    } else {
                        vnorm(&self.acor, &self.ewt)
                    };
                    converged = true;
                    break;
                }
                m += 1;
                if m == maxcor || (m >= 2 && del > RDIV * delp) {
                    break;
                }
                delp = del;
                sys.rhs(self.tn, &self.y, &mut self.savf)?;
                self.NFE += 1;
            }

            if converged {
                self.JCUR = false;
                self.ICF = 0;
                trace!("corrector converged in {} iterations, ACNRM = {:e}", m + 1, self.ACNRM);
                return Ok(true);
            }

            // retry with a new Newton matrix unless the Jacobian is already current
            if self.JCUR {
                self.ICF = 2;
                self.IPUP = true;
                return Ok(false);
            }
            self.ICF = 1;
            self.IPUP = true;
        }
    }
}
