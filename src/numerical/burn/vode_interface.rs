//! Glue between the burn state and the integration vector `y = (X_1..X_NSPEC, T, e)`.
use crate::numerical::VODE::VODE_type::{DvodeState, JacobianCache};
use crate::numerical::burn::burn_type::{BurnState, ThermoSettings, burn_to_eos, eos_to_burn};
use crate::numerical::burn::eos_type::{Eos, EosError, EosInput, EosState};
use crate::somelinalg::jacobian_storage::JacobianMatrix;
use nalgebra::SVector;

/// Copies species, temperature and energy into `vode_state.y`.
pub fn burn_to_vode<const NSPEC: usize, const NEQ: usize, M, C>(
    state: &BurnState<NSPEC>,
    vode_state: &mut DvodeState<NEQ, M, C>,
) where
    M: JacobianMatrix<NEQ>,
    C: JacobianCache<NEQ, M>,
{
    const { assert!(NEQ == NSPEC + 2, "integration vector must hold NSPEC species, T and e") };
    for n in 0..NSPEC {
        vode_state.y[n] = state.xn[n];
    }
    vode_state.y[BurnState::<NSPEC>::NET_ITEMP] = state.T;
    vode_state.y[BurnState::<NSPEC>::NET_IENUC] = state.e;
}

/// Inverse of [`burn_to_vode`].
pub fn vode_to_burn<const NSPEC: usize, const NEQ: usize, M, C>(
    vode_state: &DvodeState<NEQ, M, C>,
    state: &mut BurnState<NSPEC>,
) where
    M: JacobianMatrix<NEQ>,
    C: JacobianCache<NEQ, M>,
{
    const { assert!(NEQ == NSPEC + 2, "integration vector must hold NSPEC species, T and e") };
    for n in 0..NSPEC {
        state.xn[n] = vode_state.y[n];
    }
    state.T = vode_state.y[BurnState::<NSPEC>::NET_ITEMP];
    state.e = vode_state.y[BurnState::<NSPEC>::NET_IENUC];
}

/// Divides the mass fractions by their sum.
pub fn renormalize_species<const NSPEC: usize, const NEQ: usize>(y: &mut SVector<f64, NEQ>) {
    let sum: f64 = y.iter().take(NSPEC).sum();
    if sum > 0.0 {
        for n in 0..NSPEC {
            y[n] /= sum;
        }
    }
}

/// Clamps the mass fractions into `[small_x_safe, 1]` (renormalizing if requested) and the
/// temperature into `[min_temp, max_temp]`.
///
/// The renormalized fractions sum to 1 while `NSPEC * small_x_safe` is far below 1, which
/// the burner checks before integrating.
pub fn clean_y<const NSPEC: usize, const NEQ: usize>(
    y: &mut SVector<f64, NEQ>,
    settings: &ThermoSettings,
    min_temp: f64,
) {
    const { assert!(NEQ == NSPEC + 2, "integration vector must hold NSPEC species, T and e") };
    let small_x = settings.small_x_safe;
    for n in 0..NSPEC {
        y[n] = y[n].min(1.0).max(small_x);
    }
    if settings.renormalize_abundances {
        renormalize_species::<NSPEC, NEQ>(y);
        // entries the division pushed below the floor are held there and the others
        // give up the difference, so the sum stays 1
        let mut at_floor = [false; NSPEC];
        let mut floored = 0.0;
        let mut free = 0.0;
        for n in 0..NSPEC {
            if y[n] < small_x {
                y[n] = small_x;
                at_floor[n] = true;
                floored += small_x;
            } else {
                free += y[n];
            }
        }
        if floored > 0.0 && free > 0.0 {
            let scale = (1.0 - floored) / free;
            for n in 0..NSPEC {
                if !at_floor[n] {
                    y[n] *= scale;
                }
            }
        }
    }
    let itemp = BurnState::<NSPEC>::NET_ITEMP;
    y[itemp] = y[itemp].max(min_temp).min(settings.max_temp);
}

/// `clean_y` applied to the state vector of an integration.
pub fn clean_state<const NSPEC: usize, const NEQ: usize, M, C>(
    vode_state: &mut DvodeState<NEQ, M, C>,
    settings: &ThermoSettings,
    min_temp: f64,
) where
    M: JacobianMatrix<NEQ>,
    C: JacobianCache<NEQ, M>,
{
    clean_y::<NSPEC, NEQ>(&mut vode_state.y, settings, min_temp);
}

/// Brings the thermodynamics of `state` up to date with the integration vector `y`.
///
/// A full EOS call (density-temperature input) is made when `call_eos_in_rhs` is set for
/// a self-heating burn, or when the temperature moved by more than `dT_crit` relative to
/// the last full call, in which case the finite-difference `dcvdT`/`dcpdT` and the
/// `T_old`/`cv_old`/`cp_old` caches are refreshed. Otherwise only the composition is
/// updated.
pub fn update_thermodynamics<const NSPEC: usize, const NEQ: usize, E: Eos<NSPEC>>(
    state: &mut BurnState<NSPEC>,
    y: &SVector<f64, NEQ>,
    eos: &E,
    settings: &ThermoSettings,
) -> Result<(), EosError> {
    const { assert!(NEQ == NSPEC + 2, "integration vector must hold NSPEC species, T and e") };
    let mut eos_state = EosState::<NSPEC>::new();
    burn_to_eos(state, &mut eos_state);
    for n in 0..NSPEC {
        eos_state.xn[n] = y[n];
    }
    eos_state.T = y[BurnState::<NSPEC>::NET_ITEMP];
    eos_state.e = y[BurnState::<NSPEC>::NET_IENUC];

    if settings.call_eos_in_rhs && state.self_heat {
        eos.eos(EosInput::RhoT, &mut eos_state)?;
    } else if state.self_heat && (eos_state.T - state.T_old).abs() > settings.dT_crit * eos_state.T
    {
        eos.eos(EosInput::RhoT, &mut eos_state)?;
        state.dcvdT = (eos_state.cv - state.cv_old) / (eos_state.T - state.T_old);
        state.dcpdT = (eos_state.cp - state.cp_old) / (eos_state.T - state.T_old);
        state.T_old = eos_state.T;
        state.cv_old = eos_state.cv;
        state.cp_old = eos_state.cp;
    } else {
        eos.composition(&mut eos_state);
    }

    eos_to_burn(&eos_state, state);
    Ok(())
}
