//! Storage capability shared by the Jacobian containers of the integrator.
//!
//! The integrator only needs a handful of operations on its Newton matrix: element access
//! (to let the network or the finite-difference routine fill it), the in-place
//! transformation `J -> I - gamma*J`, an in-place LU factorization and a solve with that
//! factorization. Two storages implement it:
//!  - [`DenseJacobian`](crate::somelinalg::RustedLINPACK::dense_lu::DenseJacobian): full
//!    `SMatrix<f64, N, N>` with LINPACK-style partial pivoting;
//!  - [`SparseJacobian`](crate::somelinalg::RustedLINPACK::sparse_lu::SparseJacobian):
//!    compressed rows over a pattern fixed at compile time by the reaction network,
//!    factored in place without pivoting.
//!
//! Both are fixed-size values: no heap allocation happens on the integration path.
use nalgebra::SVector;
use std::fmt;

/// Failures of the factor/solve layer. A zero pivot is recoverable for the integrator
/// (it is treated as a corrector convergence failure).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinearSolveError {
    /// exact zero pivot met while factoring column `pivot`
    Singular { pivot: usize },
    /// pattern entry `index` is out of range or not in strictly ascending row-major order
    UnorderedPattern { index: usize },
    /// the sparsity pattern lacks the diagonal entry of `row`
    MissingDiagonal { row: usize },
    /// the sparsity pattern is not closed under LU fill-in at (row, col)
    FillIn { row: usize, col: usize },
    /// factorization or solution produced Inf/NaN
    NonFinite,
    /// solve was requested before a successful factorization
    NotFactored,
}

impl fmt::Display for LinearSolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinearSolveError::Singular { pivot } => {
                write!(f, "singular matrix: zero pivot in column {}", pivot)
            }
            LinearSolveError::UnorderedPattern { index } => write!(
                f,
                "sparsity pattern entry {} is out of range or not sorted row-major",
                index
            ),
            LinearSolveError::MissingDiagonal { row } => {
                write!(f, "sparsity pattern has no diagonal entry in row {}", row)
            }
            LinearSolveError::FillIn { row, col } => write!(
                f,
                "sparsity pattern is not closed under fill-in: ({}, {}) is missing",
                row, col
            ),
            LinearSolveError::NonFinite => write!(f, "non-finite value in the linear solve"),
            LinearSolveError::NotFactored => write!(f, "matrix was not factored"),
        }
    }
}

impl std::error::Error for LinearSolveError {}

pub trait JacobianMatrix<const N: usize>: Clone {
    /// all-zero matrix (for sparse storage: every pattern entry zero)
    fn zeros() -> Self;
    /// element (i, j); entries outside a sparse pattern read as zero
    fn get(&self, i: usize, j: usize) -> f64;
    /// sets element (i, j); writes outside a sparse pattern are dropped
    fn set(&mut self, i: usize, j: usize, value: f64);
    fn set_zero(&mut self);

    fn add(&mut self, i: usize, j: usize, value: f64) {
        let old = self.get(i, j);
        self.set(i, j, old + value);
    }

    /// In place `self = I + con * self`. With `con = -gamma` this turns the stored Jacobian
    /// into the Newton matrix of the BDF corrector.
    fn scale_add_identity(&mut self, con: f64);

    /// In-place LU factorization of the current content.
    fn factor(&mut self) -> Result<(), LinearSolveError>;

    /// Solves `A x = b` with the factorization from [`JacobianMatrix::factor`], `b` is
    /// overwritten with `x`.
    fn solve(&self, b: &mut SVector<f64, N>) -> Result<(), LinearSolveError>;

    /// Dimension of the system
    fn dim(&self) -> usize {
        N
    }
}
