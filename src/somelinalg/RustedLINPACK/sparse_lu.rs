#![allow(non_snake_case)]
use crate::somelinalg::jacobian_storage::{JacobianMatrix, LinearSolveError};
use nalgebra::SVector;
use std::marker::PhantomData;

/// Compile-time sparsity pattern of a reaction network Jacobian.
///
/// `ENTRIES` lists the structurally nonzero `(row, col)` positions sorted row-major.
/// The pattern must contain every diagonal entry and be closed under LU fill-in
/// (eliminating without pivoting must never create an entry outside the list).
pub trait SparsityPattern<const N: usize, const NNZ: usize> {
    const ENTRIES: [(usize, usize); NNZ];
}

/// Compressed-row Jacobian over a fixed pattern, factored in place without pivoting.
///
/// The row ranges and the diagonal positions are computed once from the pattern; the only
/// mutable payload is `values`.
#[derive(Debug)]
pub struct SparseJacobian<const N: usize, const NNZ: usize, P> {
    pub values: [f64; NNZ],
    row_start: [usize; N],
    row_end: [usize; N],
    diag: [Option<usize>; N],
    factored: bool,
    _pattern: PhantomData<P>,
}

impl<const N: usize, const NNZ: usize, P> Clone for SparseJacobian<N, NNZ, P> {
    fn clone(&self) -> Self {
        SparseJacobian {
            values: self.values,
            row_start: self.row_start,
            row_end: self.row_end,
            diag: self.diag,
            factored: self.factored,
            _pattern: PhantomData,
        }
    }
}

impl<const N: usize, const NNZ: usize, P: SparsityPattern<N, NNZ>> SparseJacobian<N, NNZ, P> {
    #[inline]
    fn col(k: usize) -> usize {
        P::ENTRIES[k].1
    }

    /// position of (i, j) in `values`
    fn find(&self, i: usize, j: usize) -> Option<usize> {
        if i >= N {
            return None;
        }
        let (start, end) = (self.row_start[i], self.row_end[i]);
        P::ENTRIES[start..end]
            .binary_search_by_key(&j, |&(_, c)| c)
            .ok()
            .map(|k| k + start)
    }

    pub fn nnz(&self) -> usize {
        NNZ
    }

    /// Checks that the pattern is sorted row-major without duplicates, has every diagonal
    /// entry and is closed under fill-in.
    pub fn check_pattern() -> Result<(), LinearSolveError> {
        for (k, &(i, j)) in P::ENTRIES.iter().enumerate() {
            if i >= N || j >= N || (k > 0 && P::ENTRIES[k - 1] >= (i, j)) {
                return Err(LinearSolveError::UnorderedPattern { index: k });
            }
        }
        let layout = Self::zeros();
        for i in 0..N {
            if layout.diag[i].is_none() {
                return Err(LinearSolveError::MissingDiagonal { row: i });
            }
            for kk in layout.row_start[i]..layout.row_end[i] {
                let k = Self::col(kk);
                if k >= i {
                    break;
                }
                for jj in layout.row_start[k]..layout.row_end[k] {
                    let j = Self::col(jj);
                    if j > k && layout.find(i, j).is_none() {
                        return Err(LinearSolveError::FillIn { row: i, col: j });
                    }
                }
            }
        }
        Ok(())
    }
}

impl<const N: usize, const NNZ: usize, P: SparsityPattern<N, NNZ>> JacobianMatrix<N>
    for SparseJacobian<N, NNZ, P>
{
    fn zeros() -> Self {
        let mut row_start = [0; N];
        let mut row_end = [0; N];
        let mut diag = [None; N];
        let mut k = 0;
        for i in 0..N {
            row_start[i] = k;
            while k < NNZ && P::ENTRIES[k].0 == i {
                if P::ENTRIES[k].1 == i {
                    diag[i] = Some(k);
                }
                k += 1;
            }
            row_end[i] = k;
        }
        SparseJacobian {
            values: [0.0; NNZ],
            row_start,
            row_end,
            diag,
            factored: false,
            _pattern: PhantomData,
        }
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.find(i, j).map_or(0.0, |k| self.values[k])
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        if let Some(k) = self.find(i, j) {
            self.values[k] = value;
            self.factored = false;
        }
    }

    fn set_zero(&mut self) {
        self.values = [0.0; NNZ];
        self.factored = false;
    }

    fn scale_add_identity(&mut self, con: f64) {
        for v in self.values.iter_mut() {
            *v *= con;
        }
        for d in self.diag.iter().flatten() {
            self.values[*d] += 1.0;
        }
        self.factored = false;
    }

    /// Row-wise (IKJ) Doolittle elimination restricted to the pattern. L has a unit
    /// diagonal and is stored strictly below it, U on and above.
    fn factor(&mut self) -> Result<(), LinearSolveError> {
        if self.values.iter().any(|v| !v.is_finite()) {
            return Err(LinearSolveError::NonFinite);
        }
        for i in 0..N {
            for kk in self.row_start[i]..self.row_end[i] {
                let k = Self::col(kk);
                if k >= i {
                    break;
                }
                let dk = self.diag[k].ok_or(LinearSolveError::MissingDiagonal { row: k })?;
                let pivot = self.values[dk];
                if pivot == 0.0 {
                    return Err(LinearSolveError::Singular { pivot: k });
                }
                let lik = self.values[kk] / pivot;
                self.values[kk] = lik;
                for jj in dk + 1..self.row_end[k] {
                    let j = Self::col(jj);
                    let ij = self
                        .find(i, j)
                        .ok_or(LinearSolveError::FillIn { row: i, col: j })?;
                    self.values[ij] -= lik * self.values[jj];
                }
            }
            let di = self.diag[i].ok_or(LinearSolveError::MissingDiagonal { row: i })?;
            if self.values[di] == 0.0 {
                return Err(LinearSolveError::Singular { pivot: i });
            }
        }
        self.factored = true;
        Ok(())
    }

    fn solve(&self, b: &mut SVector<f64, N>) -> Result<(), LinearSolveError> {
        if !self.factored {
            return Err(LinearSolveError::NotFactored);
        }
        // forward: L y = b
        for i in 0..N {
            let mut s = b[i];
            for kk in self.row_start[i]..self.row_end[i] {
                let k = Self::col(kk);
                if k >= i {
                    break;
                }
                s -= self.values[kk] * b[k];
            }
            b[i] = s;
        }
        // backward: U x = y
        for i in (0..N).rev() {
            let di = self.diag[i].ok_or(LinearSolveError::MissingDiagonal { row: i })?;
            let mut s = b[i];
            for jj in di + 1..self.row_end[i] {
                s -= self.values[jj] * b[Self::col(jj)];
            }
            b[i] = s / self.values[di];
        }
        if b.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(LinearSolveError::NonFinite)
        }
    }
}
