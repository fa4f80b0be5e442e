use crate::numerical::VODE::VODE_error::VodeError;
use crate::numerical::VODE::VODE_type::{DvodeState, JacobianCache, UROUND, VodeSystem, vnorm};
use crate::somelinalg::jacobian_storage::JacobianMatrix;
use log::{debug, warn};
use nalgebra::SVector;

impl<const NEQ: usize, M: JacobianMatrix<NEQ>, C: JacobianCache<NEQ, M>> DvodeState<NEQ, M, C> {
    /// Integrates from `t` to `tout` (DVODE with ITASK = 1, ISTATE = 1).
    ///
    /// On success `y` is the solution interpolated at `tout` and `t = tout`. On a fatal
    /// failure `y` holds the last accepted solution and `t` the time it was reached.
    pub fn dvode<S: VodeSystem<NEQ, Jacobian = M>>(
        &mut self,
        sys: &mut S,
    ) -> Result<(), VodeError> {
        self.tuning
            .validate()
            .map_err(VodeError::IllegalInput)?;
        for i in 0..NEQ {
            if !(self.rtol[i] > 0.0) || !(self.atol[i] > 0.0) {
                return Err(VodeError::IllegalInput("rtol and atol must be positive"));
            }
        }
        if !self.t.is_finite() || !self.tout.is_finite() {
            return Err(VodeError::IllegalInput("t and tout must be finite"));
        }
        if !self.y.iter().all(|v| v.is_finite()) {
            return Err(VodeError::IllegalInput("initial y is not finite"));
        }
        if self.tout == self.t {
            return Ok(());
        }

        self.initialize(sys)?;

        let result = self.integrate(sys);
        if result.is_err() {
            // hand back the last accepted solution
            self.y = self.yh.column(0).into_owned();
            self.t = self.tn;
        }
        result
    }

    /// Resets the bookkeeping, evaluates `f(t, y)` and sets up the first step.
    fn initialize<S: VodeSystem<NEQ, Jacobian = M>>(
        &mut self,
        sys: &mut S,
    ) -> Result<(), VodeError> {
        self.JSTART = 0;
        self.tn = self.t;
        self.NST = 0;
        self.NJE = 0;
        self.NNI = 0;
        self.NCFN = 0;
        self.NETF = 0;
        self.NLU = 0;
        self.NSLJ = 0;
        self.NSLP = 0;
        self.NHNIL = 0;
        self.NQU = 0;
        self.HU = 0.0;
        self.ICF = 0;
        self.IPUP = true;
        self.JCUR = false;
        self.NEWH = false;
        self.NQ = 1;
        self.L = 2;
        self.NEWQ = 1;
        self.ETA = 1.0;
        self.CRATE = 1.0;
        self.last_solve_error = None;
        self.jac_cache.invalidate();
        self.yh.fill(0.0);

        self.yh.set_column(0, &self.y);
        let y0 = self.y;
        sys.rhs(self.t, &y0, &mut self.savf)?;
        self.NFE = 1;
        if !self.savf.iter().all(|v| v.is_finite()) {
            return Err(VodeError::IllegalInput("initial derivative is not finite"));
        }
        self.yh.set_column(1, &self.savf);
        self.ewset(&y0)?;

        let mut h0 = self.dvhin(sys)?;
        let rh = h0.abs() * self.tuning.hmxi;
        if rh > 1.0 {
            h0 /= rh;
        }
        if h0.abs() < self.tuning.hmin {
            h0 = self.tuning.hmin.copysign(h0);
        }
        self.H = h0;
        self.HNEW = h0;
        self.yh.column_mut(1).scale_mut(h0);
        debug!(
            "integration from t = {:e} to tout = {:e}, initial step h0 = {:e}",
            self.t, self.tout, h0
        );
        Ok(())
    }

    /// Main stepping loop; stops once `tn` has passed `tout`.
    fn integrate<S: VodeSystem<NEQ, Jacobian = M>>(
        &mut self,
        sys: &mut S,
    ) -> Result<(), VodeError> {
        let mxstep = self.tuning.max_steps;
        let mxhnil = self.tuning.max_hnil_warnings;
        let nslast = self.NST;
        loop {
            if self.NST > 0 && (self.tn - self.tout) * self.H >= 0.0 {
                let mut y = self.dvindy(self.tout)?;
                sys.clean(&mut y);
                self.y = y;
                self.t = self.tout;
                return Ok(());
            }
            if self.NST - nslast >= mxstep {
                warn!(
                    "at t = {:e} maximum number of steps ({}) reached before tout = {:e}",
                    self.tn, mxstep, self.tout
                );
                return Err(VodeError::TooMuchWork {
                    t: self.tn,
                    steps: self.NST,
                });
            }
            if self.NST > 0 {
                let ycur: SVector<f64, NEQ> = self.yh.column(0).into_owned();
                if let Err(e) = self.ewset(&ycur) {
                    warn!("{}", e);
                    return Err(e);
                }
                let tolsf = UROUND * vnorm(&ycur, &self.ewt);
                if tolsf > 1.0 {
                    warn!(
                        "at t = {:e} too much accuracy requested, tolerance scale factor {:e}",
                        self.tn, tolsf
                    );
                    return Err(VodeError::TooMuchAccuracy { t: self.tn, tolsf });
                }
            }
            if self.tn + self.H == self.tn {
                self.NHNIL += 1;
                if self.NHNIL <= mxhnil {
                    warn!(
                        "t (= {:e}) and h (= {:e}) are such that t + h = t on the next step",
                        self.tn, self.H
                    );
                    if self.NHNIL == mxhnil {
                        warn!("above warning has been issued {} times and will not be issued again", mxhnil);
                    }
                }
            }

            if let Err(e) = self.dvstep(sys) {
                warn!("integration stopped: {}", e);
                return Err(e);
            }
        }
    }

    /// Initial step size from the second derivative estimate of DVHIN.
    /// Expects `yh[0] = y0`, `yh[1] = f(t0, y0)` and inverse weights in `ewt`.
    pub fn dvhin<S: VodeSystem<NEQ, Jacobian = M>>(
        &mut self,
        sys: &mut S,
    ) -> Result<f64, VodeError> {
        let t0 = self.t;
        let tdist = (self.tout - t0).abs();
        let tround = UROUND * t0.abs().max(self.tout.abs());
        if tdist < 2.0 * tround {
            return Err(VodeError::IllegalInput("tout is too close to t to start"));
        }

        // lower and upper bounds on h0
        let hlb = 100.0 * tround;
        let mut hub = 0.1 * tdist;
        for i in 0..NEQ {
            let delyi = 0.1 * self.yh[(i, 0)].abs() + self.atol[i];
            let afi = self.yh[(i, 1)].abs();
            if afi * hub > delyi {
                hub = delyi / afi;
            }
        }

        let direction = (self.tout - t0).signum();
        let mut iter = 0;
        let mut hg = (hlb * hub).sqrt();
        if hub < hlb {
            return Ok(hg * direction);
        }

        let y0: SVector<f64, NEQ> = self.yh.column(0).into_owned();
        let f0: SVector<f64, NEQ> = self.yh.column(1).into_owned();
        let mut temp: SVector<f64, NEQ> = SVector::zeros();
        let mut hnew;
        loop {
            let h = hg * direction;
            let y = y0 + f0 * h;
            sys.rhs(t0 + h, &y, &mut temp)?;
            temp = (temp - f0) / h;
            let yddnrm = vnorm(&temp, &self.ewt);
            hnew = if yddnrm * hub * hub > 2.0 {
                (2.0 / yddnrm).sqrt()
            } else {
                (hg * hub).sqrt()
            };
            iter += 1;
            if iter >= 4 {
                break;
            }
            let hrat = hnew / hg;
            if hrat > 0.5 && hrat < 2.0 {
                break;
            }
            if iter >= 2 && hnew > 2.0 * hg {
                hnew = hg;
                break;
            }
            hg = hnew;
        }
        self.NFE += iter;

        let h0 = (hnew * 0.5).max(hlb).min(hub);
        Ok(h0 * direction)
    }
}
