#![allow(non_snake_case)]
use crate::somelinalg::jacobian_storage::{JacobianMatrix, LinearSolveError};
use nalgebra::{SMatrix, SVector};

/// Dense fixed-size Jacobian with an in-place LU factorization.
///
/// Direct rewrite of the LINPACK pair DGEFA/DGESL (Gaussian elimination with partial
/// pivoting, column oriented) for nalgebra static storage. After `factor` the
/// matrix holds the multipliers below the diagonal (with the sign convention of LINPACK,
/// i.e. negated) and U on and above it; `pivots[k]` is the row swapped with row k.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseJacobian<const N: usize> {
    pub data: SMatrix<f64, N, N>,
    pivots: [usize; N],
    factored: bool,
}

impl<const N: usize> DenseJacobian<N> {
    pub fn from_matrix(data: SMatrix<f64, N, N>) -> Self {
        DenseJacobian {
            data,
            pivots: [0; N],
            factored: false,
        }
    }

    pub fn is_factored(&self) -> bool {
        self.factored
    }

    /// DGEFA. Returns the first column with an exact zero pivot; elimination still runs over
    /// the remaining columns as LINPACK does, but the factorization is reported unusable.
    fn dgefa(&mut self) -> Option<usize> {
        let a = &mut self.data;
        let mut info = None;
        if N == 0 {
            return info;
        }
        for k in 0..N - 1 {
            // row with the largest magnitude in column k at or below the diagonal
            let l = a.view_range(k..N, k).iamax() + k;
            self.pivots[k] = l;
            if a[(l, k)] == 0.0 {
                info.get_or_insert(k);
                continue;
            }
            if l != k {
                a.swap((l, k), (k, k));
            }
            let t = -1.0 / a[(k, k)];
            for i in k + 1..N {
                a[(i, k)] *= t;
            }
            // row elimination with column indexing
            for j in k + 1..N {
                let t = a[(l, j)];
                if l != k {
                    a.swap((l, j), (k, j));
                }
                for i in k + 1..N {
                    a[(i, j)] += t * a[(i, k)];
                }
            }
        }
        self.pivots[N - 1] = N - 1;
        if a[(N - 1, N - 1)] == 0.0 {
            info.get_or_insert(N - 1);
        }
        info
    }

    /// DGESL for the non-transposed system.
    fn dgesl(&self, b: &mut SVector<f64, N>) {
        let a = &self.data;
        if N == 0 {
            return;
        }
        // solve L y = b
        for k in 0..N - 1 {
            let l = self.pivots[k];
            let t = b[l];
            if l != k {
                b[l] = b[k];
                b[k] = t;
            }
            for i in k + 1..N {
                b[i] += t * a[(i, k)];
            }
        }
        // solve U x = y
        for k in (0..N).rev() {
            b[k] /= a[(k, k)];
            let t = -b[k];
            for i in 0..k {
                b[i] += t * a[(i, k)];
            }
        }
    }
}

impl<const N: usize> JacobianMatrix<N> for DenseJacobian<N> {
    fn zeros() -> Self {
        DenseJacobian::from_matrix(SMatrix::zeros())
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.data[(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[(i, j)] = value;
        self.factored = false;
    }

    fn set_zero(&mut self) {
        self.data.fill(0.0);
        self.factored = false;
    }

    fn scale_add_identity(&mut self, con: f64) {
        self.data *= con;
        for i in 0..N {
            self.data[(i, i)] += 1.0;
        }
        self.factored = false;
    }

    fn factor(&mut self) -> Result<(), LinearSolveError> {
        if self.data.iter().any(|v| !v.is_finite()) {
            return Err(LinearSolveError::NonFinite);
        }
        match self.dgefa() {
            Some(pivot) => Err(LinearSolveError::Singular { pivot }),
            None => {
                self.factored = true;
                Ok(())
            }
        }
    }

    fn solve(&self, b: &mut SVector<f64, N>) -> Result<(), LinearSolveError> {
        if !self.factored {
            return Err(LinearSolveError::NotFactored);
        }
        self.dgesl(b);
        if b.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(LinearSolveError::NonFinite)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Vector3};

    #[test]
    fn test_dense_solve_needs_pivoting() {
        // zero in the (0,0) position forces a row swap
        let A = Matrix3::new(0.0, 2.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0);
        let x_exact = Vector3::new(1.0, -2.0, 0.5);
        let mut b = A * x_exact;
        let mut jac = DenseJacobian::from_matrix(A);
        jac.factor().unwrap();
        jac.solve(&mut b).unwrap();
        assert_relative_eq!(b, x_exact, epsilon = 1e-13);
    }

    #[test]
    fn test_dense_newton_matrix() {
        let mut jac = DenseJacobian::<2>::zeros();
        jac.set(0, 0, -2.0);
        jac.set(0, 1, 1.0);
        jac.set(1, 0, 1.0);
        jac.set(1, 1, -2.0);
        jac.scale_add_identity(-0.5);
        // I - 0.5 J
        assert_relative_eq!(jac.get(0, 0), 2.0);
        assert_relative_eq!(jac.get(0, 1), -0.5);
        assert_relative_eq!(jac.get(1, 0), -0.5);
        assert_relative_eq!(jac.get(1, 1), 2.0);
        let mut b = SVector::<f64, 2>::new(1.5, 1.5);
        jac.factor().unwrap();
        jac.solve(&mut b).unwrap();
        assert_relative_eq!(b[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(b[1], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_dense_zero_row_is_singular() {
        let A = Matrix3::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 4.0, 5.0, 7.0);
        let mut jac = DenseJacobian::from_matrix(A);
        assert!(matches!(
            jac.factor(),
            Err(LinearSolveError::Singular { .. })
        ));
        let mut b = Vector3::new(1.0, 1.0, 1.0);
        assert_eq!(jac.solve(&mut b), Err(LinearSolveError::NotFactored));
    }

    #[test]
    fn test_dense_rejects_nan() {
        let mut jac = DenseJacobian::<2>::zeros();
        jac.set(0, 0, f64::NAN);
        jac.set(1, 1, 1.0);
        assert_eq!(jac.factor(), Err(LinearSolveError::NonFinite));
    }
}
