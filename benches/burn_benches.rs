use RustedVODE::Utils::config::BurnerConfig;
use RustedVODE::numerical::burn::burn_type::BurnState;
use RustedVODE::numerical::burn::burner::actual_integrator;
use RustedVODE::numerical::burn::eos_type::GammaLawEos;
use RustedVODE::numerical::burn::networks::{RobertsonNetwork, SparseRobertsonNetwork};
use RustedVODE::somelinalg::RustedLINPACK::dense_lu::DenseJacobian;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn robertson_state() -> BurnState<3> {
    let mut state = BurnState::new(1.0e6, 1.0e8, 0.0, [1.0, 0.0, 0.0]);
    state.self_heat = false;
    state
}

fn bench_robertson_dense(c: &mut Criterion) {
    let network = RobertsonNetwork::<DenseJacobian<5>>::new([0.0; 3]);
    let eos = GammaLawEos::new(5.0 / 3.0, [4.0; 3], [2.0; 3]);
    let config = BurnerConfig::default();
    c.bench_function("Robertson dense", |b| {
        b.iter(|| {
            let mut state = robertson_state();
            let _ = actual_integrator::<3, 5, _, _>(&mut state, black_box(40.0), &network, &eos, &config);
            state
        })
    });
}

fn bench_robertson_sparse(c: &mut Criterion) {
    let network = SparseRobertsonNetwork::new([0.0; 3]);
    let eos = GammaLawEos::new(5.0 / 3.0, [4.0; 3], [2.0; 3]);
    let config = BurnerConfig::default();
    c.bench_function("Robertson sparse", |b| {
        b.iter(|| {
            let mut state = robertson_state();
            let _ = actual_integrator::<3, 5, _, _>(&mut state, black_box(40.0), &network, &eos, &config);
            state
        })
    });
}

criterion_group!(benches, bench_robertson_dense, bench_robertson_sparse);
criterion_main!(benches);
