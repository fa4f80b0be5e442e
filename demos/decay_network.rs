//! Burns a self-heating A -> B -> C chain and prints the zone before and after.
//!
//! ```text
//! cargo run --example decay_network -- [burner.toml]
//! ```
use RustedVODE::Utils::config::BurnerConfig;
use RustedVODE::Utils::logger::init_logger;
use RustedVODE::numerical::burn::burn_type::BurnState;
use RustedVODE::numerical::burn::burner::actual_integrator;
use RustedVODE::numerical::burn::eos_type::{Eos, EosInput, EosState, GammaLawEos};
use RustedVODE::numerical::burn::networks::DecayChainNetwork;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => BurnerConfig::from_file(path)?,
        None => BurnerConfig::default(),
    };
    init_logger(&config.log)?;

    // helium -> carbon -> oxygen, energies in erg/g per unit mass fraction
    let mut network = DecayChainNetwork::new(2.0, 0.5);
    network.q = [0.0, 5.8e17, 7.2e17];
    let eos = GammaLawEos::new(5.0 / 3.0, [4.0, 12.0, 16.0], [2.0, 6.0, 8.0]);

    let mut state = BurnState::new(1.0e6, 2.0e8, 0.0, [1.0, 0.0, 0.0]);
    let mut eos_state = EosState::<3>::new();
    eos_state.rho = state.rho;
    eos_state.T = state.T;
    eos_state.xn = state.xn;
    eos.eos(EosInput::RhoT, &mut eos_state)?;
    state.e = eos_state.e;
    println!("initial zone:\n{}\n", state);

    let stats = actual_integrator::<3, 5, _, _>(&mut state, 4.0, &network, &eos, &config)?;
    println!("final zone:\n{}\n", state);
    println!("{}", stats);
    Ok(())
}
