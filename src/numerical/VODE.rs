/// integration state, tuning constants, Jacobian cache policies, the `VodeSystem` trait
pub mod VODE_type;
/// fatal outcomes and status codes
pub mod VODE_error;
/// BDF coefficients and Nordsieck history management (predict, retract, rescale, order change, interpolation)
pub mod VODE_dvset;
/// Newton matrix: Jacobian evaluation or reuse, scaling and factorization
pub mod VODE_dvjac;
/// modified Newton iteration for the corrector
pub mod VODE_dvnlsd;
/// one step: error test, step size and order selection
pub mod VODE_dvstep;
/// driver: initial step, stepping loop, interpolation to tout
pub mod VODE_dvode;
