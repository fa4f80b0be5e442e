/// DGEFA/DGESL on fixed-size dense storage
pub mod dense_lu;
/// in-place LU over a compile-time sparsity pattern, no pivoting
pub mod sparse_lu;
