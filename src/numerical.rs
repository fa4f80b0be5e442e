//! Stiff ODE integration for reaction networks
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// Variable-order variable-step BDF integrator (VODE) on fixed-size storage:
/// Nordsieck history, step and order control, modified Newton corrector, Jacobian reuse
pub mod VODE;
/// burn layer: physical state of a zone, EOS and network interfaces, the burner entry point
pub mod burn;
