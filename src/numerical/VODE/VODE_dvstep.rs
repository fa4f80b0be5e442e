//! One step of the variable-order variable-step BDF method.
//!
//! A step moves through Predict -> Correct -> error test, and then either Accept (with
//! step size and order selection) or one of the retry paths:
//!  - corrector failure: retract, shrink H by `ETACF`, retry; `MXNCF` failures are fatal;
//!  - error test failure: retract, shrink H from the error estimate; after three
//!    failures drop the order (at order 1 restart the history from a fresh derivative);
//!    `KFH` failures are fatal.
use crate::numerical::VODE::VODE_error::VodeError;
use crate::numerical::VODE::VODE_type::{DvodeState, JacobianCache, VodeSystem, vnorm};
use crate::somelinalg::jacobian_storage::JacobianMatrix;
use log::{debug, trace};
use nalgebra::SVector;

pub const ADDON: f64 = 1.0e-6;
pub const BIAS1: f64 = 6.0;
pub const BIAS2: f64 = 6.0;
pub const BIAS3: f64 = 10.0;
pub const ETACF: f64 = 0.25;
pub const ETAMIN: f64 = 0.1;
pub const ETAMXF: f64 = 0.2;
pub const ETAMX1: f64 = 1.0e4;
pub const ETAMX2: f64 = 10.0;
pub const ETAMX3: f64 = 10.0;
/// error test failures after which the order is reduced
pub const KFC: i32 = -3;
pub const THRESH: f64 = 1.5;

impl<const NEQ: usize, M: JacobianMatrix<NEQ>, C: JacobianCache<NEQ, M>> DvodeState<NEQ, M, C> {
    /// Takes one step of size `H` (or smaller, after rejections) from `tn`.
    /// On success `KFLAG = 0`, `tn` is advanced and `yh` holds the new history; on a fatal
    /// failure `tn` and `yh` are those of the last accepted step.
    pub fn dvstep<S: VodeSystem<NEQ, Jacobian = M>>(
        &mut self,
        sys: &mut S,
    ) -> Result<(), VodeError> {
        let hmin = self.tuning.hmin;
        let mxncf = self.tuning.max_convergence_failures;
        let kfh = -(self.tuning.max_error_test_failures as i32);
        let lmax = self.tuning.max_order + 1;

        self.KFLAG = 0;
        let told = self.tn;
        let mut ncf = 0;
        self.JCUR = false;
        let mut nflag = 0;

        if self.JSTART == 0 {
            // first step: order 1, history already holds y0 and h*f0
            self.NQ = 1;
            self.L = 2;
            self.tau[0] = self.H;
            self.PRL1 = 1.0;
            self.RC = 0.0;
            self.ETAMAX = ETAMX1;
            self.NQWAIT = 2;
            self.HSCAL = self.H;
        } else if self.NEWH {
            if self.NEWQ != self.NQ {
                let iord = if self.NEWQ < self.NQ { -1 } else { 1 };
                self.dvjust(iord);
                self.NQ = self.NEWQ;
                self.L = self.NQ + 1;
                self.NQWAIT = self.L;
            }
            self.rescale_history();
        }

        let dsm = loop {
            self.tn += self.H;
            self.predict();
            self.dvset();
            self.RL1 = 1.0 / self.el[1];
            self.RC *= self.RL1 / self.PRL1;
            self.PRL1 = self.RL1;

            let converged = match self.dvnlsd(sys, nflag) {
                Ok(converged) => converged,
                Err(e) => {
                    // leave the history at the last accepted step
                    self.tn = told;
                    self.retract();
                    self.KFLAG = -2;
                    return Err(e);
                }
            };
            if !converged {
                // corrector failed to converge
                ncf += 1;
                self.NCFN += 1;
                self.ETAMAX = 1.0;
                self.tn = told;
                self.retract();
                if self.H.abs() <= hmin * 1.00001 || ncf == mxncf {
                    self.KFLAG = -2;
                    return Err(match self.last_solve_error {
                        Some(cause) => VodeError::SingularMatrix {
                            t: self.tn,
                            h: self.H,
                            cause,
                        },
                        None => VodeError::RepeatedConvergenceFailures {
                            t: self.tn,
                            h: self.H,
                        },
                    });
                }
                self.ETA = ETACF.max(hmin / self.H.abs());
                nflag = -1;
                debug!(
                    "corrector failed at t = {:e} with h = {:e}, retry with eta = {}",
                    self.tn, self.H, self.ETA
                );
                self.rescale_history();
                continue;
            }

            let dsm = self.ACNRM / self.tq[1];
            if dsm <= 1.0 {
                break dsm;
            }

            // error test failed
            self.KFLAG -= 1;
            self.NETF += 1;
            nflag = -2;
            self.tn = told;
            self.retract();
            if self.H.abs() <= hmin * 1.00001 {
                self.KFLAG = -1;
                return Err(VodeError::RepeatedErrorTestFailures {
                    t: self.tn,
                    h: self.H,
                });
            }
            self.ETAMAX = 1.0;
            if self.KFLAG > KFC {
                let flotl = self.L as f64;
                self.ETA = 1.0 / ((BIAS2 * dsm).powf(1.0 / flotl) + ADDON);
                self.ETA = self.ETA.max(hmin / self.H.abs()).max(ETAMIN);
                if self.KFLAG <= -2 && self.ETA > ETAMXF {
                    self.ETA = ETAMXF;
                }
                debug!(
                    "error test failed at t = {:e}, h = {:e}, dsm = {:e}, eta = {}",
                    self.tn, self.H, dsm, self.ETA
                );
                self.rescale_history();
                continue;
            }
            if self.KFLAG <= kfh {
                self.KFLAG = -1;
                return Err(VodeError::RepeatedErrorTestFailures {
                    t: self.tn,
                    h: self.H,
                });
            }
            self.ETA = ETAMIN.max(hmin / self.H.abs());
            if self.NQ > 1 {
                // reduce the order by one and retry
                self.dvjust(-1);
                self.L = self.NQ;
                self.NQ -= 1;
                self.NQWAIT = self.L;
                debug!("repeated error test failures, order reduced to {}", self.NQ);
                self.rescale_history();
                continue;
            }
            // at order 1: restart from a freshly evaluated derivative
            self.H *= self.ETA;
            self.HSCAL = self.H;
            self.tau[0] = self.H;
            let y0: SVector<f64, NEQ> = self.yh.column(0).into_owned();
            sys.rhs(self.tn, &y0, &mut self.savf)?;
            self.NFE += 1;
            let hf = self.savf * self.H;
            self.yh.set_column(1, &hf);
            self.NQWAIT = 10;
            debug!("order 1 restart at t = {:e} with h = {:e}", self.tn, self.H);
        };

        // step accepted
        self.KFLAG = 0;
        self.NST += 1;
        self.HU = self.H;
        self.NQU = self.NQ;
        for i in (1..=self.NQ).rev() {
            self.tau[i] = self.tau[i - 1];
        }
        self.tau[0] = self.H;
        for j in 0..self.L {
            let ej = self.el[j];
            self.yh.column_mut(j).axpy(ej, &self.acor, 1.0);
        }
        self.NQWAIT = self.NQWAIT.saturating_sub(1);
        if self.L != lmax && self.NQWAIT == 1 {
            self.yh.set_column(lmax - 1, &self.acor);
            self.CONP = self.tq[4];
        }

        if self.ETAMAX != 1.0 {
            self.select_order(dsm, lmax);
        } else {
            if self.NQWAIT < 2 {
                self.NQWAIT = 2;
            }
            self.NEWQ = self.NQ;
            self.NEWH = false;
            self.ETA = 1.0;
            self.HNEW = self.H;
        }

        self.ETAMAX = if self.NST <= 10 { ETAMX2 } else { ETAMX3 };
        let r = 1.0 / self.tq[1];
        self.acor *= r;

        // project the accepted solution onto the physical set
        let mut y0: SVector<f64, NEQ> = self.yh.column(0).into_owned();
        sys.clean(&mut y0);
        self.yh.set_column(0, &y0);

        self.JSTART = 1;
        trace!(
            "step {} accepted: t = {:e}, h = {:e}, q = {}, next h = {:e}, next q = {}",
            self.NST, self.tn, self.HU, self.NQU, self.HNEW, self.NEWQ
        );
        Ok(())
    }

    /// Chooses the step ratio `ETA` and the order `NEWQ` for the next step.
    fn select_order(&mut self, dsm: f64, lmax: usize) {
        let flotl = self.L as f64;
        let etaq = 1.0 / ((BIAS2 * dsm).powf(1.0 / flotl) + ADDON);
        if self.NQWAIT != 0 {
            self.ETA = etaq;
            self.NEWQ = self.NQ;
        } else {
            self.NQWAIT = 2;
            let mut etaqm1 = 0.0;
            if self.NQ != 1 {
                let col: SVector<f64, NEQ> = self.yh.column(self.L - 1).into_owned();
                let ddn = vnorm(&col, &self.ewt) / self.tq[0];
                etaqm1 = 1.0 / ((BIAS1 * ddn).powf(1.0 / (flotl - 1.0)) + ADDON);
            }
            let mut etaqp1 = 0.0;
            if self.L != lmax {
                let cnquot = (self.tq[4] / self.CONP) * (self.H / self.tau[1]).powi(self.L as i32);
                let saved: SVector<f64, NEQ> = self.yh.column(lmax - 1).into_owned();
                self.savf = self.acor - saved * cnquot;
                let dup = vnorm(&self.savf, &self.ewt) / self.tq[2];
                etaqp1 = 1.0 / ((BIAS3 * dup).powf(1.0 / (flotl + 1.0)) + ADDON);
            }
            if etaq >= etaqp1 {
                if etaq < etaqm1 {
                    self.ETA = etaqm1;
                    self.NEWQ = self.NQ - 1;
                } else {
                    self.ETA = etaq;
                    self.NEWQ = self.NQ;
                }
            } else if etaqp1 > etaqm1 {
                self.ETA = etaqp1;
                self.NEWQ = self.NQ + 1;
                self.yh.set_column(lmax - 1, &self.acor);
            } else {
                self.ETA = etaqm1;
                self.NEWQ = self.NQ - 1;
            }
        }

        if self.ETA < THRESH || self.ETAMAX == 1.0 {
            self.NEWQ = self.NQ;
            self.NEWH = false;
            self.ETA = 1.0;
            self.HNEW = self.H;
        } else {
            self.ETA = self.ETA.min(self.ETAMAX);
            self.ETA /= (self.H.abs() * self.tuning.hmxi * self.ETA).max(1.0);
            self.NEWH = true;
            self.HNEW = self.H * self.ETA;
        }
    }
}
