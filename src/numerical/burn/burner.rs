use crate::Utils::config::BurnerConfig;
use crate::numerical::VODE::VODE_error::{VodeError, VodeStatus};
use crate::numerical::VODE::VODE_type::{DefaultJacobianCache, DvodeState, VodeStats};
use crate::numerical::burn::burn_system::BurnSystem;
use crate::numerical::burn::burn_type::{BurnState, ReactionNetwork, burn_to_eos};
use crate::numerical::burn::eos_type::{Eos, EosInput, EosState};
use crate::numerical::burn::vode_interface::{burn_to_vode, vode_to_burn};
use log::{info, warn};

/// Integration state used by the burner for a given network: the network's Jacobian
/// storage and the cache policy of the build.
pub type BurnerState<const NEQ: usize, M> = DvodeState<NEQ, M, DefaultJacobianCache<M>>;

/// Burns `state` for a time interval `dt` with the VODE integrator.
///
/// On return the composition, temperature and energy of `state` are those reached at
/// `dt` (or at the last accepted step if the integration failed), `n_rhs`, `n_jac` and
/// `n_step` hold the integrator counters and `success` tells whether the burn completed
/// with a physically valid result. An invalid `config` is rejected with
/// [`VodeError::IllegalInput`] before `state` is touched.
pub fn actual_integrator<const NSPEC: usize, const NEQ: usize, N, E>(
    state: &mut BurnState<NSPEC>,
    dt: f64,
    network: &N,
    eos: &E,
    config: &BurnerConfig,
) -> Result<VodeStats, VodeError>
where
    N: ReactionNetwork<NSPEC, NEQ>,
    E: Eos<NSPEC>,
{
    if let Err(e) = config.validate() {
        warn!("burn rejected: {}", e);
        return Err(VodeError::IllegalInput("invalid burner configuration"));
    }
    if NSPEC as f64 * config.thermo.small_x_safe >= 1.0 {
        warn!(
            "burn rejected: {} species floored at {:e} cannot sum to 1",
            NSPEC, config.thermo.small_x_safe
        );
        return Err(VodeError::IllegalInput("small_x_safe too large for the network"));
    }
    let mut vode_state = BurnerState::<NEQ, N::JacobianStorage>::new(config.integrator);
    vode_state.t = 0.0;
    vode_state.tout = dt;

    let tol = &config.tolerances;
    for n in 0..NSPEC {
        vode_state.rtol[n] = tol.rtol_spec;
        vode_state.atol[n] = tol.atol_spec;
    }
    vode_state.rtol[BurnState::<NSPEC>::NET_ITEMP] = tol.rtol_temp;
    vode_state.atol[BurnState::<NSPEC>::NET_ITEMP] = tol.atol_temp;
    vode_state.rtol[BurnState::<NSPEC>::NET_IENUC] = tol.rtol_enuc;
    vode_state.atol[BurnState::<NSPEC>::NET_IENUC] = tol.atol_enuc;

    // thermodynamic caches at the starting temperature
    let mut eos_state = EosState::<NSPEC>::new();
    burn_to_eos(state, &mut eos_state);
    eos.eos(EosInput::RhoT, &mut eos_state)?;
    state.cv = eos_state.cv;
    state.cp = eos_state.cp;
    state.abar = eos_state.abar;
    state.zbar = eos_state.zbar;
    state.y_e = eos_state.y_e;
    state.T_old = state.T;
    state.cv_old = eos_state.cv;
    state.cp_old = eos_state.cp;
    state.dcvdT = 0.0;
    state.dcpdT = 0.0;
    state.success = true;

    burn_to_vode(state, &mut vode_state);
    let e_start = state.e;

    let result = {
        let mut system = BurnSystem::new(&mut *state, network, eos, config.thermo);
        vode_state.dvode(&mut system)
    };

    vode_to_burn(&vode_state, state);
    state.n_rhs = vode_state.NFE;
    state.n_jac = vode_state.NJE;
    state.n_step = vode_state.NST;
    state.time = vode_state.t;

    let finite = state.xn.iter().all(|x| x.is_finite()) && state.T.is_finite() && state.e.is_finite();
    state.success = result.is_ok() && finite;

    let status = VodeStatus::from_result(&result);
    match &result {
        Ok(()) => info!(
            "burn over dt = {:e} finished: T = {:e}, energy released = {:e}, {}",
            dt,
            state.T,
            state.e - e_start,
            vode_state.stats()
        ),
        Err(e) => {
            warn!("burn failed with status {} (istate {}): {}", status, status.istate(), e);
            #[cfg(not(feature = "gpu"))]
            vode_state.print_state();
        }
    }
    result.map(|_| vode_state.stats())
}
