//! linear algebra for the Newton systems of the integrator
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// storage capability shared by dense and sparse Jacobians
pub mod jacobian_storage;

pub mod RustedLINPACK;
