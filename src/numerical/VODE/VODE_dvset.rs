//! Nordsieck history and BDF coefficients.
//!
//! Column j of `yh` holds `h^j y^(j) / j!`. For the fixed-leading-coefficient BDF of order
//! q the corrector is written as `yh_new = yh_pred + el * acor`, with `el` the coefficients
//! of the polynomial
//!
//! ```text
//!   Lambda(x) = (1 + x / xi*_q) * prod_{i=1}^{q-1} (1 + x / xi_i),   xi_i = (t_n - t_{n-i}) / h
//! ```
//!
//! (Jackson & Sacks-Davis, Byrne & Hindmarsh 1975). `tq` collects the error constants used
//! by the local error test (`tq[1]`), by the order selection (`tq[0]`, `tq[2]`, `tq[4]`)
//! and by the corrector convergence test (`tq[3]`).
use crate::numerical::VODE::VODE_error::VodeError;
use crate::numerical::VODE::VODE_type::{DvodeState, JacobianCache, UROUND, VODE_LMAX};
use crate::somelinalg::jacobian_storage::JacobianMatrix;
use nalgebra::SVector;

/// scale of the convergence test constant relative to the error test constant
pub const CORTES: f64 = 0.1;

impl<const NEQ: usize, M: JacobianMatrix<NEQ>, C: JacobianCache<NEQ, M>> DvodeState<NEQ, M, C> {
    /// Computes `el` and `tq` for the current order `NQ`, step `H` and step history `tau`.
    pub fn dvset(&mut self) {
        let nq = self.NQ;
        let l = self.L;
        let flotnq = nq as f64;
        let el = &mut self.el;
        let tau = &self.tau;
        let tq = &mut self.tq;

        for e in el.iter_mut().take(l).skip(2) {
            *e = 0.0;
        }
        el[0] = 1.0;
        el[1] = 1.0;
        let mut alph0 = -1.0;
        let mut ahatn0 = -1.0;
        let mut hsum = self.H;
        let mut rxi = 1.0;
        let mut rxis = 1.0;

        if nq != 1 {
            // coefficients of prod (1 + x/xi_j) for j = 1..q-2
            for j in 1..nq.saturating_sub(1) {
                hsum += tau[j - 1];
                rxi = self.H / hsum;
                let jp1 = j + 1;
                alph0 -= 1.0 / jp1 as f64;
                for i in (2..=j + 2).rev() {
                    el[i - 1] += el[i - 2] * rxi;
                }
            }
            alph0 -= 1.0 / flotnq;
            rxis = -el[1] - alph0;
            hsum += tau[nq - 2];
            rxi = self.H / hsum;
            ahatn0 = -el[1] - rxi;
            for i in (2..=nq + 1).rev() {
                el[i - 1] += el[i - 2] * rxis;
            }
        }

        let t1 = 1.0 - ahatn0 + alph0;
        let t2 = 1.0 + flotnq * t1;
        tq[1] = (alph0 * t2 / t1).abs();
        tq[4] = (t2 / (el[l - 1] * rxi / rxis)).abs();
        if self.NQWAIT == 1 {
            let cnqm1 = rxis / el[l - 1];
            let t3 = alph0 + 1.0 / flotnq;
            let t4 = ahatn0 + rxi;
            let elp = t3 / (1.0 - t4 + t3);
            tq[0] = (elp * rxis * (1.0 + t4) * cnqm1).abs();
            hsum += tau[nq - 1];
            rxi = self.H / hsum;
            let t5 = alph0 - 1.0 / (flotnq + 1.0);
            let t6 = ahatn0 - rxi;
            let elp = t2 / (1.0 - t6 + t5);
            tq[2] = (elp * rxi * (flotnq + 1.0) * t5).abs();
        }
        tq[3] = CORTES * tq[1];
    }

    /// Adjusts the history array for an order change `iord = +1` (raise) or `-1` (lower),
    /// before `NQ` itself is changed.
    pub fn dvjust(&mut self, iord: i32) {
        let nq = self.NQ;
        let l = self.L;
        if nq == 2 && iord != 1 {
            return;
        }
        self.el = [0.0; VODE_LMAX];
        self.el[2] = 1.0;

        if iord != 1 {
            // order decrease
            let mut hsum = 0.0;
            for j in 1..nq.saturating_sub(1) {
                hsum += self.tau[j - 1];
                let xi = hsum / self.HSCAL;
                for i in (3..=j + 3).rev() {
                    self.el[i - 1] = self.el[i - 1] * xi + self.el[i - 2];
                }
            }
            // subtract the correction terms from columns 3..q
            for j in 3..=nq {
                let ej = self.el[j - 1];
                for i in 0..NEQ {
                    self.yh[(i, j - 1)] -= ej * self.yh[(i, l - 1)];
                }
            }
            return;
        }

        // order increase: zero the new column and add the correction terms
        let mut alph0 = -1.0;
        let mut alph1 = 1.0;
        let mut prod = 1.0;
        let mut xiold = 1.0;
        let mut hsum = self.HSCAL;
        if nq != 1 {
            for j in 1..nq {
                let jp1 = j + 1;
                hsum += self.tau[jp1 - 1];
                let xi = hsum / self.HSCAL;
                prod *= xi;
                alph0 -= 1.0 / jp1 as f64;
                alph1 += 1.0 / xi;
                for i in (3..=j + 3).rev() {
                    self.el[i - 1] = self.el[i - 1] * xiold + self.el[i - 2];
                }
                xiold = xi;
            }
        }
        let t1 = (-alph0 - alph1) / prod;
        let lmax = self.tuning.max_order + 1;
        for i in 0..NEQ {
            self.yh[(i, l)] = t1 * self.yh[(i, lmax - 1)];
        }
        for j in 3..=nq + 1 {
            let ej = self.el[j - 1];
            for i in 0..NEQ {
                self.yh[(i, j - 1)] += ej * self.yh[(i, l)];
            }
        }
    }

    /// Predictor: multiplies the history array by the Pascal triangle matrix.
    pub fn predict(&mut self) {
        let nq = self.NQ;
        for jb in 1..=nq {
            for j in nq - jb..nq {
                for i in 0..NEQ {
                    self.yh[(i, j)] += self.yh[(i, j + 1)];
                }
            }
        }
    }

    /// Undoes [`DvodeState::predict`] after a failed step.
    pub fn retract(&mut self) {
        let nq = self.NQ;
        for jb in 1..=nq {
            for j in nq - jb..nq {
                for i in 0..NEQ {
                    self.yh[(i, j)] -= self.yh[(i, j + 1)];
                }
            }
        }
    }

    /// Rescales columns 1..L of the history for the step ratio `ETA` and sets the new step.
    pub fn rescale_history(&mut self) {
        let mut r = 1.0;
        for j in 1..self.L {
            r *= self.ETA;
            for i in 0..NEQ {
                self.yh[(i, j)] *= r;
            }
        }
        self.H = self.HSCAL * self.ETA;
        self.HSCAL = self.H;
        self.RC *= self.ETA;
    }

    /// Interpolates the Nordsieck polynomial of the last step to `t` (DVINDY with k = 0).
    pub fn dvindy(&self, t: f64) -> Result<SVector<f64, NEQ>, VodeError> {
        let tfuzz = 100.0 * UROUND * (self.tn.abs() + self.HU.abs()) * self.HU.signum();
        let tp = self.tn - self.HU - tfuzz;
        let tn1 = self.tn + tfuzz;
        if (t - tp) * (t - tn1) > 0.0 {
            return Err(VodeError::IllegalInput(
                "interpolation time is outside the last step",
            ));
        }
        let s = (t - self.tn) / self.H;
        let mut dky: SVector<f64, NEQ> = self.yh.column(self.L - 1).into_owned();
        for j in (0..self.NQ).rev() {
            dky = self.yh.column(j) + dky * s;
        }
        Ok(dky)
    }
}
