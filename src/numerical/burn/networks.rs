//! Small reaction networks with constant rates.
//!
//! Both networks carry the energy equation `de/dt = sum_i q_i dX_i/dt` and, for a
//! self-heating burn, the temperature equation `dT/dt = (de/dt) / cv`.
use crate::numerical::burn::burn_type::{BurnState, ReactionNetwork};
use crate::somelinalg::RustedLINPACK::dense_lu::DenseJacobian;
use crate::somelinalg::RustedLINPACK::sparse_lu::{SparseJacobian, SparsityPattern};
use crate::somelinalg::jacobian_storage::JacobianMatrix;
use nalgebra::SVector;
use std::marker::PhantomData;

const ITEMP: usize = BurnState::<3>::NET_ITEMP;
const IENUC: usize = BurnState::<3>::NET_IENUC;

/// Fills the temperature and energy rows from the species rows of the Jacobian.
fn energy_rows<M: JacobianMatrix<5>>(state: &BurnState<3>, q: &[f64; 3], jac: &mut M) {
    for j in 0..3 {
        let dedx: f64 = (0..3).map(|i| q[i] * jac.get(i, j)).sum();
        jac.set(IENUC, j, dedx);
        if state.self_heat && state.cv > 0.0 {
            jac.set(ITEMP, j, dedx / state.cv);
        }
    }
}

fn energy_rhs(state: &BurnState<3>, q: &[f64; 3], ydot: &mut SVector<f64, 5>) {
    let enuc: f64 = (0..3).map(|i| q[i] * ydot[i]).sum();
    ydot[IENUC] = enuc;
    ydot[ITEMP] = if state.self_heat && state.cv > 0.0 {
        enuc / state.cv
    } else {
        0.0
    };
}

/// First-order chain A -> B -> C.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayChainNetwork {
    pub k1: f64,
    pub k2: f64,
    /// specific energy released per unit mass fraction of each species formed
    pub q: [f64; 3],
}

impl DecayChainNetwork {
    pub fn new(k1: f64, k2: f64) -> Self {
        DecayChainNetwork {
            k1,
            k2,
            q: [0.0; 3],
        }
    }
}

impl ReactionNetwork<3, 5> for DecayChainNetwork {
    type JacobianStorage = DenseJacobian<5>;

    fn actual_rhs(&self, state: &BurnState<3>, ydot: &mut SVector<f64, 5>) {
        let r1 = self.k1 * state.xn[0];
        let r2 = self.k2 * state.xn[1];
        ydot[0] = -r1;
        ydot[1] = r1 - r2;
        ydot[2] = r2;
        energy_rhs(state, &self.q, ydot);
    }

    fn actual_jac(&self, state: &BurnState<3>, jac: &mut Self::JacobianStorage) {
        jac.set(0, 0, -self.k1);
        jac.set(1, 0, self.k1);
        jac.set(1, 1, -self.k2);
        jac.set(2, 1, self.k2);
        energy_rows(state, &self.q, jac);
    }
}

/// Robertson's stiff kinetics problem written for mass fractions:
///
/// ```text
///   A -> B          k1 = 0.04
///   B + C -> A + C  k2 = 1e4
///   2B -> B + C     k3 = 3e7
/// ```
///
/// Generic over the Jacobian storage, see [`SparseRobertsonNetwork`].
#[derive(Debug, Clone, PartialEq)]
pub struct RobertsonNetwork<M = DenseJacobian<5>> {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub q: [f64; 3],
    _storage: PhantomData<M>,
}

impl<M> RobertsonNetwork<M> {
    pub fn new(q: [f64; 3]) -> Self {
        RobertsonNetwork {
            k1: 0.04,
            k2: 1.0e4,
            k3: 3.0e7,
            q,
            _storage: PhantomData,
        }
    }
}

impl<M: JacobianMatrix<5>> ReactionNetwork<3, 5> for RobertsonNetwork<M> {
    type JacobianStorage = M;

    fn actual_rhs(&self, state: &BurnState<3>, ydot: &mut SVector<f64, 5>) {
        let [a, b, c] = state.xn;
        let r1 = self.k1 * a;
        let r2 = self.k2 * b * c;
        let r3 = self.k3 * b * b;
        ydot[0] = -r1 + r2;
        ydot[1] = r1 - r2 - r3;
        ydot[2] = r3;
        energy_rhs(state, &self.q, ydot);
    }

    fn actual_jac(&self, state: &BurnState<3>, jac: &mut M) {
        let [_, b, c] = state.xn;
        jac.set(0, 0, -self.k1);
        jac.set(0, 1, self.k2 * c);
        jac.set(0, 2, self.k2 * b);
        jac.set(1, 0, self.k1);
        jac.set(1, 1, -self.k2 * c - 2.0 * self.k3 * b);
        jac.set(1, 2, -self.k2 * b);
        jac.set(2, 1, 2.0 * self.k3 * b);
        energy_rows(state, &self.q, jac);
    }
}

/// Nonzero structure of the Robertson Jacobian: full species block, temperature and
/// energy rows depending on the species, unit-free diagonal for T and e.
pub struct RobertsonPattern;

impl SparsityPattern<5, 17> for RobertsonPattern {
    const ENTRIES: [(usize, usize); 17] = [
        (0, 0),
        (0, 1),
        (0, 2),
        (1, 0),
        (1, 1),
        (1, 2),
        (2, 0),
        (2, 1),
        (2, 2),
        (3, 0),
        (3, 1),
        (3, 2),
        (3, 3),
        (4, 0),
        (4, 1),
        (4, 2),
        (4, 4),
    ];
}

pub type SparseRobertsonNetwork = RobertsonNetwork<SparseJacobian<5, 17, RobertsonPattern>>;
