//////////////////////////////////////////////////////////////////////////////////////////////////////////////////
//                         TESTS
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests_interface {
    use crate::numerical::VODE::VODE_type::{DvodeState, VodeTuning};
    use crate::numerical::burn::burn_type::{BurnState, ThermoSettings};
    use crate::numerical::burn::eos_type::{Eos, EosError, EosInput, EosState, GammaLawEos};
    use crate::numerical::burn::vode_interface::{
        burn_to_vode, clean_state, clean_y, update_thermodynamics, vode_to_burn,
    };
    use approx::assert_relative_eq;
    use nalgebra::SVector;
    use std::cell::Cell;

    /// Gamma-law EOS that counts how it is called
    struct CountingEos {
        inner: GammaLawEos<3>,
        full_calls: Cell<usize>,
        composition_calls: Cell<usize>,
    }

    impl CountingEos {
        fn new() -> Self {
            CountingEos {
                inner: GammaLawEos::new(5.0 / 3.0, [4.0, 12.0, 16.0], [2.0, 6.0, 8.0]),
                full_calls: Cell::new(0),
                composition_calls: Cell::new(0),
            }
        }
    }

    impl Eos<3> for CountingEos {
        fn eos(&self, input: EosInput, state: &mut EosState<3>) -> Result<(), EosError> {
            self.full_calls.set(self.full_calls.get() + 1);
            self.inner.eos(input, state)
        }
        fn composition(&self, state: &mut EosState<3>) {
            self.composition_calls.set(self.composition_calls.get() + 1);
            self.inner.composition(state)
        }
        fn min_temperature(&self) -> f64 {
            self.inner.min_temperature()
        }
    }

    fn sample_state() -> BurnState<3> {
        BurnState::new(1.0e7, 3.0e8, 5.0e17, [0.5, 0.3, 0.2])
    }

    #[test]
    fn test_transfer_round_trip() {
        let state = sample_state();
        let mut vode_state = DvodeState::<5>::new(VodeTuning::default());
        burn_to_vode(&state, &mut vode_state);
        assert_eq!(vode_state.y[0], 0.5);
        assert_eq!(vode_state.y[BurnState::<3>::NET_ITEMP], 3.0e8);
        assert_eq!(vode_state.y[BurnState::<3>::NET_IENUC], 5.0e17);

        let mut back = BurnState::new(0.0, 0.0, 0.0, [0.0; 3]);
        vode_to_burn(&vode_state, &mut back);
        assert_eq!(back.xn, state.xn);
        assert_eq!(back.T, state.T);
        assert_eq!(back.e, state.e);
    }

    #[test]
    fn test_clean_state_bounds() {
        let settings = ThermoSettings::default();
        let mut vode_state = DvodeState::<5>::new(VodeTuning::default());
        vode_state.y = SVector::from([-1.0e-5, 1.2, 0.4, 1.0e3, 7.0]);
        clean_state::<3, 5, _, _>(&mut vode_state, &settings, 1.0e4);
        assert_eq!(vode_state.y[0], settings.small_x_safe);
        assert_eq!(vode_state.y[1], 1.0);
        assert_eq!(vode_state.y[2], 0.4);
        assert_eq!(vode_state.y[3], 1.0e4);
        // energy is left alone
        assert_eq!(vode_state.y[4], 7.0);

        vode_state.y[3] = 1.0e12;
        clean_state::<3, 5, _, _>(&mut vode_state, &settings, 1.0e4);
        assert_eq!(vode_state.y[3], settings.max_temp);
    }

    #[test]
    fn test_clean_renormalizes_and_is_idempotent() {
        let settings = ThermoSettings {
            renormalize_abundances: true,
            ..ThermoSettings::default()
        };
        let mut y = SVector::<f64, 5>::from([0.7, 0.6, -0.1, 2.0e9, 1.0]);
        clean_y::<3, 5>(&mut y, &settings, 1.0e4);
        let sum: f64 = y.iter().take(3).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-14);
        assert!(y.iter().take(3).all(|x| *x >= settings.small_x_safe && *x <= 1.0));

        let once = y;
        clean_y::<3, 5>(&mut y, &settings, 1.0e4);
        assert_relative_eq!(y, once, epsilon = 1e-14);
    }

    #[test]
    fn test_renormalize_with_a_large_floor() {
        let settings = ThermoSettings {
            renormalize_abundances: true,
            small_x_safe: 1.0e-3,
            ..ThermoSettings::default()
        };
        let mut y = SVector::<f64, 5>::from([1.0, 0.0, 0.0, 2.0e9, 1.0]);
        clean_y::<3, 5>(&mut y, &settings, 1.0e4);
        let sum: f64 = y.iter().take(3).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-14);
        assert_eq!(y[1], 1.0e-3);
        assert_eq!(y[2], 1.0e-3);
        assert_relative_eq!(y[0], 0.998, epsilon = 1e-14);
    }

    #[test]
    fn test_no_eos_call_without_self_heating() {
        let eos = CountingEos::new();
        let settings = ThermoSettings::default();
        let mut state = sample_state();
        state.self_heat = false;
        let mut y = SVector::<f64, 5>::from([0.5, 0.3, 0.2, 3.0e8, 5.0e17]);
        for k in 0..4 {
            y[3] *= 1.0 + 0.5 * k as f64;
            update_thermodynamics(&mut state, &y, &eos, &settings).unwrap();
        }
        assert_eq!(eos.full_calls.get(), 0);
        assert_eq!(eos.composition_calls.get(), 4);
        assert!(state.abar > 0.0);
    }

    #[test]
    fn test_eos_called_every_time_when_requested() {
        let eos = CountingEos::new();
        let settings = ThermoSettings::default();
        let mut state = sample_state();
        let y = SVector::<f64, 5>::from([0.5, 0.3, 0.2, 3.0e8, 5.0e17]);
        for _ in 0..3 {
            update_thermodynamics(&mut state, &y, &eos, &settings).unwrap();
        }
        assert_eq!(eos.full_calls.get(), 3);
        assert!(state.cv > 0.0);
        assert_eq!(state.T, 3.0e8);
    }

    #[test]
    fn test_eos_called_on_large_temperature_change() {
        let eos = CountingEos::new();
        let settings = ThermoSettings {
            call_eos_in_rhs: false,
            dT_crit: 0.01,
            ..ThermoSettings::default()
        };
        let mut state = sample_state();
        let mut y = SVector::<f64, 5>::from([0.5, 0.3, 0.2, 3.0e8, 5.0e17]);

        y[3] = 3.0e8 * 1.005;
        update_thermodynamics(&mut state, &y, &eos, &settings).unwrap();
        assert_eq!(eos.full_calls.get(), 0);
        assert_eq!(state.T_old, 3.0e8);

        y[3] = 3.0e8 * 1.05;
        update_thermodynamics(&mut state, &y, &eos, &settings).unwrap();
        assert_eq!(eos.full_calls.get(), 1);
        assert_eq!(state.T_old, 3.0e8 * 1.05);
        assert!(state.cv_old > 0.0);
        assert!(state.dcvdT.is_finite());
    }

    #[test]
    fn test_gamma_law_composition() {
        let eos = GammaLawEos::<3>::new(5.0 / 3.0, [4.0, 12.0, 16.0], [2.0, 6.0, 8.0]);
        let mut eos_state = EosState::<3>::new();
        eos_state.xn = [1.0, 0.0, 0.0];
        eos.composition(&mut eos_state);
        assert_relative_eq!(eos_state.abar, 4.0, epsilon = 1e-12);
        assert_relative_eq!(eos_state.zbar, 2.0, epsilon = 1e-12);
        assert_relative_eq!(eos_state.y_e, 0.5, epsilon = 1e-12);
    }
}

#[cfg(test)]
mod tests_burner {
    use crate::Utils::config::BurnerConfig;
    use crate::numerical::VODE::VODE_error::VodeError;
    use crate::numerical::VODE::VODE_type::{DvodeState, JacobianMode, VodeTuning};
    use crate::numerical::burn::burn_system::BurnSystem;
    use crate::numerical::burn::burn_type::{
        BurnState, BurnTolerances, ReactionNetwork, ThermoSettings, burn_to_eos,
    };
    use crate::numerical::burn::burner::actual_integrator;
    use crate::numerical::burn::eos_type::{Eos, EosInput, EosState, GammaLawEos};
    use crate::numerical::burn::networks::{DecayChainNetwork, RobertsonNetwork, SparseRobertsonNetwork};
    use crate::numerical::burn::vode_interface::burn_to_vode;
    use crate::somelinalg::RustedLINPACK::dense_lu::DenseJacobian;
    use crate::somelinalg::RustedLINPACK::sparse_lu::{SparseJacobian, SparsityPattern};
    use crate::somelinalg::jacobian_storage::{JacobianMatrix, LinearSolveError};
    use approx::assert_relative_eq;
    use nalgebra::SVector;

    fn eos() -> GammaLawEos<3> {
        GammaLawEos::new(5.0 / 3.0, [4.0, 4.0, 4.0], [2.0, 2.0, 2.0])
    }

    fn config(rtol: f64, atol: f64) -> BurnerConfig {
        BurnerConfig {
            tolerances: BurnTolerances {
                rtol_spec: rtol,
                atol_spec: atol,
                ..BurnTolerances::default()
            },
            ..BurnerConfig::default()
        }
    }

    fn cold_state(xn: [f64; 3]) -> BurnState<3> {
        let mut state = BurnState::new(1.0e6, 1.0e8, 0.0, xn);
        state.self_heat = false;
        state
    }

    #[test]
    fn test_linear_decay() {
        let network = DecayChainNetwork::new(1.0, 0.0);
        let mut state = cold_state([1.0, 0.0, 0.0]);
        let rtol = 1e-10;
        let stats =
            actual_integrator::<3, 5, _, _>(&mut state, 1.0, &network, &eos(), &config(rtol, 1e-12))
                .unwrap();
        // rtol bounds the local error of each step; the error at tout accumulates over
        // all of them
        let global_bound = 100.0 * rtol;
        let x_a = (-1.0f64).exp();
        assert_relative_eq!(state.xn[0], x_a, max_relative = global_bound);
        assert_relative_eq!(state.xn[1], 1.0 - x_a, max_relative = global_bound);
        assert_relative_eq!(state.T, 1.0e8);
        assert!(state.success);
        assert_eq!(state.time, 1.0);
        assert_eq!(state.n_step, stats.NST);
        assert_eq!(state.n_rhs, stats.NFE);
        assert_eq!(state.n_jac, stats.NJE);
        assert!(stats.NST > 0 && stats.NFE >= stats.NST);
    }

    #[test]
    fn test_tighter_tolerance_takes_more_steps() {
        let network = DecayChainNetwork::new(1.0, 50.0);
        let mut loose = cold_state([1.0, 0.0, 0.0]);
        let mut tight = cold_state([1.0, 0.0, 0.0]);
        let loose_stats =
            actual_integrator::<3, 5, _, _>(&mut loose, 5.0, &network, &eos(), &config(1e-6, 1e-10))
                .unwrap();
        let tight_stats =
            actual_integrator::<3, 5, _, _>(&mut tight, 5.0, &network, &eos(), &config(1e-10, 1e-14))
                .unwrap();
        assert!(loose_stats.NST < tight_stats.NST);
        assert_relative_eq!(loose.xn[2], tight.xn[2], max_relative = 1e-4);
    }

    #[test]
    fn test_robertson_dense_and_sparse_agree() {
        let dense = RobertsonNetwork::<DenseJacobian<5>>::new([0.0; 3]);
        let sparse = SparseRobertsonNetwork::new([0.0; 3]);
        let config = config(1e-8, 1e-14);
        let mut s_dense = cold_state([1.0, 0.0, 0.0]);
        let mut s_sparse = cold_state([1.0, 0.0, 0.0]);
        actual_integrator::<3, 5, _, _>(&mut s_dense, 40.0, &dense, &eos(), &config).unwrap();
        actual_integrator::<3, 5, _, _>(&mut s_sparse, 40.0, &sparse, &eos(), &config).unwrap();

        assert_relative_eq!(s_dense.xn[0], 0.7158, max_relative = 1e-3);
        assert_relative_eq!(s_dense.xn[1], 9.185e-6, max_relative = 1e-2);
        let sum: f64 = s_dense.xn.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-8);
        for n in 0..3 {
            assert_relative_eq!(s_dense.xn[n], s_sparse.xn[n], max_relative = 1e-6);
        }
    }

    #[test]
    fn test_robertson_numerical_jacobian() {
        let network = RobertsonNetwork::<DenseJacobian<5>>::new([0.0; 3]);
        let analytic = config(1e-8, 1e-14);
        let mut numerical = analytic.clone();
        numerical.integrator.jacobian = JacobianMode::Numerical;
        let mut s_a = cold_state([1.0, 0.0, 0.0]);
        let mut s_n = cold_state([1.0, 0.0, 0.0]);
        actual_integrator::<3, 5, _, _>(&mut s_a, 40.0, &network, &eos(), &analytic).unwrap();
        actual_integrator::<3, 5, _, _>(&mut s_n, 40.0, &network, &eos(), &numerical).unwrap();
        assert_eq!(s_n.n_jac, 0);
        assert_relative_eq!(s_a.xn[0], s_n.xn[0], max_relative = 1e-5);
        assert_relative_eq!(s_a.xn[2], s_n.xn[2], max_relative = 1e-5);
    }

    #[test]
    fn test_self_heating_conserves_energy() {
        let q = [0.0, 0.0, 1.0e16];
        let network = RobertsonNetwork::<DenseJacobian<5>>::new(q);
        let mut state = BurnState::new(1.0e6, 1.0e8, 0.0, [1.0, 0.0, 0.0]);
        // consistent starting energy
        let eos = eos();
        let mut eos_state = EosState::<3>::new();
        burn_to_eos(&state, &mut eos_state);
        eos.eos(EosInput::RhoT, &mut eos_state).unwrap();
        state.e = eos_state.e;
        let e0 = state.e;
        let x0 = state.xn;

        actual_integrator::<3, 5, _, _>(&mut state, 40.0, &network, &eos, &config(1e-8, 1e-14))
            .unwrap();
        let released: f64 = (0..3).map(|i| q[i] * (state.xn[i] - x0[i])).sum();
        assert!(released > 0.0);
        assert_relative_eq!(state.e - e0, released, max_relative = 1e-6);
        assert!(state.T > 1.0e8);
        assert!(state.success);
    }

    #[test]
    fn test_too_much_work_reports_failure() {
        let network = DecayChainNetwork::new(1.0, 50.0);
        let mut state = cold_state([1.0, 0.0, 0.0]);
        let mut config = config(1e-10, 1e-14);
        config.integrator.max_steps = 10;
        let result = actual_integrator::<3, 5, _, _>(&mut state, 100.0, &network, &eos(), &config);
        assert!(matches!(result, Err(VodeError::TooMuchWork { .. })));
        assert!(!state.success);
        assert!(state.time > 0.0 && state.time < 100.0);
        assert_eq!(state.n_step, 10);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let network = DecayChainNetwork::new(1.0, 0.0);
        let mut state = cold_state([1.0, 0.0, 0.0]);
        let mut bad_floor = config(1e-8, 1e-12);
        bad_floor.thermo.small_x_safe = 0.0;
        let result = actual_integrator::<3, 5, _, _>(&mut state, 1.0, &network, &eos(), &bad_floor);
        assert!(matches!(result, Err(VodeError::IllegalInput(_))));
        assert_eq!(state.xn, [1.0, 0.0, 0.0]);
        assert_eq!(state.n_step, 0);

        let mut bad_order = config(1e-8, 1e-12);
        bad_order.integrator.max_order = 9;
        let result = actual_integrator::<3, 5, _, _>(&mut state, 1.0, &network, &eos(), &bad_order);
        assert!(matches!(result, Err(VodeError::IllegalInput(_))));
    }

    /// pattern with no entry at all in the temperature row
    struct NoTemperatureRow;
    impl SparsityPattern<3, 2> for NoTemperatureRow {
        const ENTRIES: [(usize, usize); 2] = [(0, 0), (2, 2)];
    }

    /// Single species decaying at a constant rate whose rate matrix has a zero row, so
    /// every Newton matrix `I - h*gamma*J` is singular.
    struct ZeroRowNetwork;

    impl ReactionNetwork<1, 3> for ZeroRowNetwork {
        type JacobianStorage = SparseJacobian<3, 2, NoTemperatureRow>;

        fn actual_rhs(&self, state: &BurnState<1>, ydot: &mut SVector<f64, 3>) {
            ydot[0] = -state.xn[0];
            ydot[1] = 0.0;
            ydot[2] = 0.0;
        }

        fn actual_jac(&self, _state: &BurnState<1>, jac: &mut Self::JacobianStorage) {
            jac.set(0, 0, -1.0);
        }
    }

    #[test]
    fn test_zero_row_jacobian_is_fatal() {
        let network = ZeroRowNetwork;
        let eos = GammaLawEos::<1>::new(5.0 / 3.0, [4.0], [2.0]);
        let mut state = BurnState::new(1.0e6, 1.0e8, 0.0, [0.9]);
        state.self_heat = false;

        let tuning = VodeTuning::default();
        let mut vode_state = DvodeState::<3, SparseJacobian<3, 2, NoTemperatureRow>>::new(tuning);
        vode_state.t = 0.0;
        vode_state.tout = 1.0;
        vode_state.rtol = SVector::from([1e-8, 1e-6, 1e-6]);
        vode_state.atol = SVector::from([1e-12, 1e-6, 1e-6]);
        burn_to_vode(&state, &mut vode_state);
        let y0 = vode_state.y;

        let result = {
            let mut system = BurnSystem::new(&mut state, &network, &eos, ThermoSettings::default());
            vode_state.dvode(&mut system)
        };
        assert_eq!(
            result,
            Err(VodeError::SingularMatrix {
                t: 0.0,
                h: vode_state.H,
                cause: LinearSolveError::MissingDiagonal { row: 1 },
            })
        );
        assert_eq!(vode_state.NCFN, tuning.max_convergence_failures);
        assert_eq!(vode_state.NST, 0);
        assert_eq!(vode_state.t, 0.0);
        assert_relative_eq!(vode_state.y, y0, epsilon = 1e-12);

        // through the burner the state is left at the start and flagged
        let mut state = BurnState::new(1.0e6, 1.0e8, 0.0, [0.9]);
        state.self_heat = false;
        let config = BurnerConfig::default();
        let result = actual_integrator::<1, 3, _, _>(&mut state, 1.0, &network, &eos, &config);
        assert!(matches!(result, Err(VodeError::SingularMatrix { .. })));
        assert!(!state.success);
        assert_relative_eq!(state.xn[0], 0.9, epsilon = 1e-14);
        assert_relative_eq!(state.T, 1.0e8);
        assert_eq!(state.time, 0.0);
        assert_eq!(state.n_step, 0);
    }
}
