//! Equation of state interface consumed by the burner.
//!
//! The integrator never calls an EOS directly: `update_thermodynamics` fills an
//! [`EosState`] from the burn state and the current integration vector and asks the
//! [`Eos`] collaborator either for a full evaluation or only for the composition
//! quantities (`abar`, `zbar`, `y_e`). A simple [`GammaLawEos`] (ideal gas of fully ionized
//! nuclei) is provided for networks that do not need anything richer.
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Boltzmann constant, erg/K
pub const K_B: f64 = 1.380649e-16;
/// atomic mass unit, g
pub const M_U: f64 = 1.66053906660e-24;

/// Which pair of thermodynamic variables is the input of an EOS call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EosInput {
    /// density and temperature
    RhoT,
    /// density and enthalpy
    RhoH,
    /// temperature and pressure
    TP,
    /// density and pressure
    RhoP,
    /// density and internal energy
    RhoE,
    /// pressure and entropy
    PS,
    /// pressure and enthalpy
    PH,
    /// temperature and enthalpy
    TH,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EosError {
    Unsupported(EosInput),
    InvalidState(&'static str),
    NotConverged { input: EosInput, iterations: usize },
}

impl fmt::Display for EosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EosError::Unsupported(input) => write!(f, "EOS input mode {} is not supported", input),
            EosError::InvalidState(msg) => write!(f, "invalid EOS state: {}", msg),
            EosError::NotConverged { input, iterations } => write!(
                f,
                "EOS inversion for input {} did not converge in {} iterations",
                input, iterations
            ),
        }
    }
}

impl std::error::Error for EosError {}

/// Thermodynamic state exchanged with the EOS (cgs units).
#[derive(Debug, Clone, PartialEq)]
pub struct EosState<const NSPEC: usize> {
    pub rho: f64,
    pub T: f64,
    pub p: f64,
    pub e: f64,
    pub h: f64,
    pub s: f64,
    pub xn: [f64; NSPEC],

    pub dpdT: f64,
    pub dpdr: f64,
    pub dedT: f64,
    pub dedr: f64,
    pub dhdT: f64,
    pub dhdr: f64,
    pub dsdT: f64,
    pub dsdr: f64,
    pub dpde: f64,
    pub dpdr_e: f64,

    pub cv: f64,
    pub cp: f64,
    pub xne: f64,
    pub xnp: f64,
    pub eta: f64,
    pub pele: f64,
    pub ppos: f64,
    pub mu: f64,
    pub mu_e: f64,
    pub y_e: f64,
    pub gam1: f64,
    pub cs: f64,
    pub abar: f64,
    pub zbar: f64,
}

impl<const NSPEC: usize> EosState<NSPEC> {
    pub fn new() -> Self {
        EosState {
            rho: 0.0,
            T: 0.0,
            p: 0.0,
            e: 0.0,
            h: 0.0,
            s: 0.0,
            xn: [0.0; NSPEC],
            dpdT: 0.0,
            dpdr: 0.0,
            dedT: 0.0,
            dedr: 0.0,
            dhdT: 0.0,
            dhdr: 0.0,
            dsdT: 0.0,
            dsdr: 0.0,
            dpde: 0.0,
            dpdr_e: 0.0,
            cv: 0.0,
            cp: 0.0,
            xne: 0.0,
            xnp: 0.0,
            eta: 0.0,
            pele: 0.0,
            ppos: 0.0,
            mu: 0.0,
            mu_e: 0.0,
            y_e: 0.0,
            gam1: 0.0,
            cs: 0.0,
            abar: 0.0,
            zbar: 0.0,
        }
    }
}

impl<const NSPEC: usize> Default for EosState<NSPEC> {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Eos<const NSPEC: usize> {
    /// Full evaluation for the given input pair.
    fn eos(&self, input: EosInput, state: &mut EosState<NSPEC>) -> Result<(), EosError>;
    /// Composition-derived quantities only (`abar`, `zbar`, `y_e`, `mu_e`).
    fn composition(&self, state: &mut EosState<NSPEC>);
    /// Lowest temperature the EOS accepts.
    fn min_temperature(&self) -> f64;
}

/// Ideal gas of fully ionized nuclei with a constant ratio of specific heats.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaLawEos<const NSPEC: usize> {
    pub gamma: f64,
    /// mass numbers
    pub aion: [f64; NSPEC],
    /// charge numbers
    pub zion: [f64; NSPEC],
    pub mintemp: f64,
}

impl<const NSPEC: usize> GammaLawEos<NSPEC> {
    pub fn new(gamma: f64, aion: [f64; NSPEC], zion: [f64; NSPEC]) -> Self {
        GammaLawEos {
            gamma,
            aion,
            zion,
            mintemp: 1.0e4,
        }
    }

    /// k / (mu m_u), the gas constant per unit mass of the mixture
    fn specific_gas_constant(&self, state: &EosState<NSPEC>) -> f64 {
        K_B / (state.mu * M_U)
    }

    fn eval_rho_t(&self, state: &mut EosState<NSPEC>) -> Result<(), EosError> {
        if !(state.rho > 0.0) {
            return Err(EosError::InvalidState("density must be positive"));
        }
        if !state.T.is_finite() {
            return Err(EosError::InvalidState("temperature is not finite"));
        }
        state.T = state.T.max(self.mintemp);
        let g = self.gamma;
        let r = self.specific_gas_constant(state);

        state.p = state.rho * r * state.T;
        state.e = r * state.T / (g - 1.0);
        state.h = state.e + state.p / state.rho;
        state.s = r * (state.T.ln() / (g - 1.0) - state.rho.ln());

        state.dpdT = state.p / state.T;
        state.dpdr = state.p / state.rho;
        state.dedT = state.e / state.T;
        state.dedr = 0.0;
        state.dhdT = g * state.dedT;
        state.dhdr = 0.0;
        state.dsdT = state.dedT / state.T;
        state.dsdr = -r / state.rho;
        state.dpde = (g - 1.0) * state.rho;
        state.dpdr_e = (g - 1.0) * state.e;

        state.cv = state.dedT;
        state.cp = g * state.cv;
        state.gam1 = g;
        state.cs = (g * state.p / state.rho).sqrt();
        state.xne = state.rho * state.zbar / (state.abar * M_U);
        state.xnp = 0.0;
        state.eta = 0.0;
        state.pele = 0.0;
        state.ppos = 0.0;
        Ok(())
    }
}

impl<const NSPEC: usize> Eos<NSPEC> for GammaLawEos<NSPEC> {
    fn eos(&self, input: EosInput, state: &mut EosState<NSPEC>) -> Result<(), EosError> {
        self.composition(state);
        let g = self.gamma;
        match input {
            EosInput::RhoT => {}
            EosInput::RhoE => {
                state.T = state.e * (g - 1.0) / self.specific_gas_constant(state);
            }
            EosInput::RhoH => {
                state.T = state.h * (g - 1.0) / (g * self.specific_gas_constant(state));
            }
            EosInput::RhoP => {
                if !(state.rho > 0.0) {
                    return Err(EosError::InvalidState("density must be positive"));
                }
                state.T = state.p / (state.rho * self.specific_gas_constant(state));
            }
            EosInput::TP => {
                if !(state.T > 0.0) {
                    return Err(EosError::InvalidState("temperature must be positive"));
                }
                state.rho = state.p / (state.T * self.specific_gas_constant(state));
            }
            EosInput::PS | EosInput::PH | EosInput::TH => {
                return Err(EosError::Unsupported(input));
            }
        }
        self.eval_rho_t(state)
    }

    fn composition(&self, state: &mut EosState<NSPEC>) {
        let mut sum_y = 0.0;
        let mut sum_zy = 0.0;
        for n in 0..NSPEC {
            let yn = state.xn[n] / self.aion[n];
            sum_y += yn;
            sum_zy += self.zion[n] * yn;
        }
        if sum_y > 0.0 {
            state.abar = 1.0 / sum_y;
            state.zbar = state.abar * sum_zy;
        }
        state.y_e = sum_zy;
        state.mu_e = if sum_zy > 0.0 { 1.0 / sum_zy } else { 0.0 };
        state.mu = state.abar / (1.0 + state.zbar);
    }

    fn min_temperature(&self) -> f64 {
        self.mintemp
    }
}
