use crate::numerical::VODE::VODE_error::VodeError;
use crate::numerical::VODE::VODE_type::{
    DvodeState, JacobianCache, JacobianMode, UROUND, VodeSystem, vnorm,
};
use crate::somelinalg::jacobian_storage::JacobianMatrix;
use log::{debug, trace};
use nalgebra::SVector;

impl<const NEQ: usize, M: JacobianMatrix<NEQ>, C: JacobianCache<NEQ, M>> DvodeState<NEQ, M, C> {
    /// Builds and factors the Newton matrix `P = I - H*RL1*J` at the predicted `y`.
    ///
    /// J is reevaluated when nothing is cached, on the first step, when it is older than
    /// `max_steps_between_jacobian_evals` steps, or after corrector failures (`ICF`);
    /// otherwise the cached unscaled Jacobian is reused with the new `H*RL1`.
    /// Returns `Ok(false)` when the factorization fails (zero pivot), which the
    /// corrector handles as a convergence failure.
    pub fn dvjac<S: VodeSystem<NEQ, Jacobian = M>>(
        &mut self,
        sys: &mut S,
    ) -> Result<bool, VodeError> {
        let ccmxj = self.tuning.ccmxj;
        let msbj = self.tuning.max_steps_between_jacobian_evals;

        let reevaluate = !self.jac_cache.is_available()
            || self.NST == 0
            || self.NST > self.NSLJ + msbj
            || (self.ICF == 1 && self.DRC < ccmxj)
            || self.ICF == 2;

        if reevaluate || !self.jac_cache.restore(&mut self.jac) {
            self.NJE += 1;
            self.NSLJ = self.NST;
            self.JCUR = true;
            match self.tuning.jacobian {
                JacobianMode::Analytic => {
                    self.jac.set_zero();
                    sys.jac(self.tn, &self.y, &mut self.jac)?;
                }
                JacobianMode::Numerical => self.numerical_jac(sys)?,
            }
            self.jac_cache.save(&self.jac);
            trace!("Jacobian evaluated at t = {:e}, NJE = {}", self.tn, self.NJE);
        } else {
            self.JCUR = false;
        }

        let hrl1 = self.H * self.RL1;
        self.jac.scale_add_identity(-hrl1);
        self.NLU += 1;
        match self.jac.factor() {
            Ok(()) => {
                self.last_solve_error = None;
                Ok(true)
            }
            Err(e) => {
                debug!("Newton matrix factorization failed at t = {:e}: {}", self.tn, e);
                self.last_solve_error = Some(e);
                Ok(false)
            }
        }
    }

    /// Forward difference Jacobian around the predicted `y`, `savf = f(tn, y)`.
    fn numerical_jac<S: VodeSystem<NEQ, Jacobian = M>>(
        &mut self,
        sys: &mut S,
    ) -> Result<(), VodeError> {
        let fac = vnorm(&self.savf, &self.ewt);
        let mut r0 = 1000.0 * self.H.abs() * UROUND * NEQ as f64 * fac;
        if r0 == 0.0 {
            r0 = 1.0;
        }
        let srur = UROUND.sqrt();
        let mut ftem: SVector<f64, NEQ> = SVector::zeros();
        let mut y = self.y;
        self.jac.set_zero();
        for j in 0..NEQ {
            let yj = y[j];
            let r = (srur * yj.abs()).max(r0 / self.ewt[j]);
            y[j] += r;
            let fac = 1.0 / r;
            sys.rhs(self.tn, &y, &mut ftem)?;
            for i in 0..NEQ {
                self.jac.set(i, j, (ftem[i] - self.savf[i]) * fac);
            }
            y[j] = yj;
        }
        self.NFE += NEQ;
        Ok(())
    }
}
