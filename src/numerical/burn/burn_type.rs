use crate::numerical::burn::eos_type::EosState;
use crate::somelinalg::jacobian_storage::JacobianMatrix;
use nalgebra::SVector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical state of one zone being burned.
///
/// The integrator works on `y = (X_1..X_NSPEC, T, e)`; everything else here is input to
/// the network and the EOS or bookkeeping reported back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnState<const NSPEC: usize> {
    pub rho: f64,
    pub T: f64,
    /// specific internal energy, integrated together with the composition
    pub e: f64,
    pub xn: [f64; NSPEC],

    pub cv: f64,
    pub cp: f64,
    pub y_e: f64,
    pub eta: f64,
    pub cs: f64,
    pub abar: f64,
    pub zbar: f64,

    // thermodynamics cached at the last full EOS call
    pub T_old: f64,
    pub dcvdT: f64,
    pub dcpdT: f64,
    pub cv_old: f64,
    pub cp_old: f64,

    pub self_heat: bool,
    pub time: f64,

    pub n_rhs: usize,
    pub n_jac: usize,
    pub n_step: usize,
    pub success: bool,
}

impl<const NSPEC: usize> BurnState<NSPEC> {
    /// index of temperature in the integration vector
    pub const NET_ITEMP: usize = NSPEC;
    /// index of energy in the integration vector
    pub const NET_IENUC: usize = NSPEC + 1;

    pub fn new(rho: f64, T: f64, e: f64, xn: [f64; NSPEC]) -> Self {
        BurnState {
            rho,
            T,
            e,
            xn,
            cv: 0.0,
            cp: 0.0,
            y_e: 0.0,
            eta: 0.0,
            cs: 0.0,
            abar: 0.0,
            zbar: 0.0,
            T_old: T,
            dcvdT: 0.0,
            dcpdT: 0.0,
            cv_old: 0.0,
            cp_old: 0.0,
            self_heat: true,
            time: 0.0,
            n_rhs: 0,
            n_jac: 0,
            n_step: 0,
            success: true,
        }
    }
}

impl<const NSPEC: usize> fmt::Display for BurnState<NSPEC> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rho = {:e}, T = {:e}, e = {:e}", self.rho, self.T, self.e)?;
        for (n, x) in self.xn.iter().enumerate() {
            writeln!(f, "X[{}] = {:e}", n, x)?;
        }
        write!(
            f,
            "cv = {:e}, cp = {:e}, abar = {}, zbar = {}, n_rhs = {}, n_jac = {}, n_step = {}, success = {}",
            self.cv, self.cp, self.abar, self.zbar, self.n_rhs, self.n_jac, self.n_step, self.success
        )
    }
}

pub fn burn_to_eos<const NSPEC: usize>(state: &BurnState<NSPEC>, eos_state: &mut EosState<NSPEC>) {
    eos_state.rho = state.rho;
    eos_state.T = state.T;
    eos_state.e = state.e;
    eos_state.xn = state.xn;
    eos_state.cv = state.cv;
    eos_state.cp = state.cp;
    eos_state.y_e = state.y_e;
    eos_state.eta = state.eta;
    eos_state.cs = state.cs;
    eos_state.abar = state.abar;
    eos_state.zbar = state.zbar;
}

pub fn eos_to_burn<const NSPEC: usize>(eos_state: &EosState<NSPEC>, state: &mut BurnState<NSPEC>) {
    state.rho = eos_state.rho;
    state.T = eos_state.T;
    state.e = eos_state.e;
    state.xn = eos_state.xn;
    state.cv = eos_state.cv;
    state.cp = eos_state.cp;
    state.y_e = eos_state.y_e;
    state.eta = eos_state.eta;
    state.cs = eos_state.cs;
    state.abar = eos_state.abar;
    state.zbar = eos_state.zbar;
}

/// Reaction network: right-hand side and Jacobian of `y = (X, T, e)`.
///
/// `NEQ` must be `NSPEC + 2`. The network chooses how its Jacobian is stored through
/// `JacobianStorage` (dense, or sparse with a compile-time pattern).
pub trait ReactionNetwork<const NSPEC: usize, const NEQ: usize> {
    type JacobianStorage: JacobianMatrix<NEQ>;
    fn actual_rhs(&self, state: &BurnState<NSPEC>, ydot: &mut SVector<f64, NEQ>);
    /// fills the nonzero entries; the storage is zeroed beforehand
    fn actual_jac(&self, state: &BurnState<NSPEC>, jac: &mut Self::JacobianStorage);
}

/// Settings of `clean_state` and `update_thermodynamics`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermoSettings {
    /// always call the EOS in the right-hand side when self-heating
    pub call_eos_in_rhs: bool,
    /// relative temperature change that triggers a new EOS call
    pub dT_crit: f64,
    /// floor of the mass fractions
    pub small_x_safe: f64,
    pub renormalize_abundances: bool,
    pub max_temp: f64,
}

impl Default for ThermoSettings {
    fn default() -> Self {
        ThermoSettings {
            call_eos_in_rhs: true,
            dT_crit: 1.0e20,
            small_x_safe: 1.0e-30,
            renormalize_abundances: false,
            max_temp: 1.0e11,
        }
    }
}

/// Relative and absolute tolerances by variable group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnTolerances {
    pub rtol_spec: f64,
    pub atol_spec: f64,
    pub rtol_temp: f64,
    pub atol_temp: f64,
    pub rtol_enuc: f64,
    pub atol_enuc: f64,
}

impl Default for BurnTolerances {
    fn default() -> Self {
        BurnTolerances {
            rtol_spec: 1.0e-12,
            atol_spec: 1.0e-8,
            rtol_temp: 1.0e-6,
            atol_temp: 1.0e-6,
            rtol_enuc: 1.0e-6,
            atol_enuc: 1.0e-6,
        }
    }
}

impl BurnTolerances {
    pub fn validate(&self) -> Result<(), &'static str> {
        let all = [
            self.rtol_spec,
            self.atol_spec,
            self.rtol_temp,
            self.atol_temp,
            self.rtol_enuc,
            self.atol_enuc,
        ];
        if all.iter().all(|v| *v > 0.0 && v.is_finite()) {
            Ok(())
        } else {
            Err("all tolerances must be positive and finite")
        }
    }
}
