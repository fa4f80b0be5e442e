/// burn state, reaction network trait, tolerance and thermodynamics settings
pub mod burn_type;
/// equation of state interface and a gamma-law EOS
pub mod eos_type;
/// state transfer, clean_state, update_thermodynamics
pub mod vode_interface;
/// network + EOS + burn state as an ODE system for the integrator
pub mod burn_system;
/// burner entry point
pub mod burner;
/// constant-rate example networks (decay chain, Robertson)
pub mod networks;

mod burn_tests;
