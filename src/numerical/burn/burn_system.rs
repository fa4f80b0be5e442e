use crate::numerical::VODE::VODE_error::VodeError;
use crate::numerical::VODE::VODE_type::VodeSystem;
use crate::numerical::burn::burn_type::{BurnState, ReactionNetwork, ThermoSettings};
use crate::numerical::burn::eos_type::Eos;
use crate::numerical::burn::vode_interface::{clean_y, update_thermodynamics};
use nalgebra::SVector;

/// The ODE system seen by the integrator: a reaction network evaluated on a burn state
/// whose thermodynamics follow the integration vector.
///
/// Every evaluation works on a cleaned copy of the iterate (mass fractions and temperature
/// in range), refreshes the thermodynamics through the EOS and then calls the network.
pub struct BurnSystem<'a, const NSPEC: usize, const NEQ: usize, N, E> {
    pub state: &'a mut BurnState<NSPEC>,
    pub network: &'a N,
    pub eos: &'a E,
    pub settings: ThermoSettings,
}

impl<'a, const NSPEC: usize, const NEQ: usize, N, E> BurnSystem<'a, NSPEC, NEQ, N, E>
where
    N: ReactionNetwork<NSPEC, NEQ>,
    E: Eos<NSPEC>,
{
    pub fn new(
        state: &'a mut BurnState<NSPEC>,
        network: &'a N,
        eos: &'a E,
        settings: ThermoSettings,
    ) -> Self {
        BurnSystem {
            state,
            network,
            eos,
            settings,
        }
    }

    fn prepare(&mut self, t: f64, y: &SVector<f64, NEQ>) -> Result<(), VodeError> {
        let mut y_clean = *y;
        clean_y::<NSPEC, NEQ>(&mut y_clean, &self.settings, self.eos.min_temperature());
        update_thermodynamics(self.state, &y_clean, self.eos, &self.settings)?;
        self.state.time = t;
        Ok(())
    }
}

impl<const NSPEC: usize, const NEQ: usize, N, E> VodeSystem<NEQ> for BurnSystem<'_, NSPEC, NEQ, N, E>
where
    N: ReactionNetwork<NSPEC, NEQ>,
    E: Eos<NSPEC>,
{
    type Jacobian = N::JacobianStorage;

    fn rhs(
        &mut self,
        t: f64,
        y: &SVector<f64, NEQ>,
        ydot: &mut SVector<f64, NEQ>,
    ) -> Result<(), VodeError> {
        self.prepare(t, y)?;
        ydot.fill(0.0);
        self.network.actual_rhs(self.state, ydot);
        self.state.n_rhs += 1;
        Ok(())
    }

    fn jac(
        &mut self,
        t: f64,
        y: &SVector<f64, NEQ>,
        jac: &mut Self::Jacobian,
    ) -> Result<(), VodeError> {
        self.prepare(t, y)?;
        self.network.actual_jac(self.state, jac);
        self.state.n_jac += 1;
        Ok(())
    }

    fn clean(&self, y: &mut SVector<f64, NEQ>) {
        clean_y::<NSPEC, NEQ>(y, &self.settings, self.eos.min_temperature());
    }
}
