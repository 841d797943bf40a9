//! Candidate initial guesses for the collocation solver.
//!
//! Collocation BVP solvers are highly sensitive to the initial guess. A flat
//! guess from the sampled state rarely converges near the interaction, so
//! one candidate is built per constant-control action pair of the bang-bang
//! set: positions and speeds are extrapolated with elementary kinematics and
//! the own-heading/own-speed costate channels follow the linear decay
//! lambda = -alpha * (t - t1) implied by the decoupled Hamiltonian system.
//! All candidates share one coarse mesh; the solver refines it per
//! candidate.

use nalgebra::{DMatrix, DVector};

/// Bang-bang acceleration pairs (a1, a2) tried per sample, in selection
/// enumeration order.
pub const ACTION_PAIRS: [(f64, f64); 4] = [(10.0, -5.0), (-5.0, 10.0), (-5.0, -5.0), (10.0, 10.0)];

/// Nodes of the coarse guess mesh.
pub const GUESS_NODES: usize = 4;

/// Uniform guess mesh over [0, t1].
pub fn guess_mesh(t1: f64) -> DVector<f64> {
    let step = t1 / (GUESS_NODES - 1) as f64;
    DVector::from_fn(GUESS_NODES, |i, _| i as f64 * step)
}

/// Augmented template column at t = 0: the sampled state, the costate
/// seeds of both players' own blocks and zeroed value accumulators.
pub fn template_column(x0: &DVector<f64>, n: usize, alpha: f64, t1: f64) -> DVector<f64> {
    let dim = 6 * n + 2;
    let mut col = DVector::zeros(dim);
    for i in 0..2 * n {
        col[i] = x0[i];
    }
    // lambda_1 own block: rows 2n..3n
    col[2 * n] = alpha;
    col[3 * n - 2] = -alpha * x0[n - 1] * t1;
    col[3 * n - 1] = alpha * t1;
    // lambda_2 own block: rows 5n..6n
    col[5 * n] = alpha;
    col[6 * n - 2] = -alpha * x0[2 * n - 1] * t1;
    col[6 * n - 1] = alpha * t1;
    col
}

/// One candidate guess for the action pair `(a1, a2)`: the template column
/// at every node, with position/speed and own-costate channels of the
/// interior and terminal nodes propagated analytically under constant
/// acceleration.
pub fn bang_bang_guess(
    x0: &DVector<f64>,
    n: usize,
    alpha: f64,
    t1: f64,
    action: (f64, f64),
) -> DMatrix<f64> {
    let (a1, a2) = action;
    let dim = 6 * n + 2;
    let mesh = guess_mesh(t1);
    let template = template_column(x0, n, alpha, t1);

    let mut guess = DMatrix::zeros(dim, GUESS_NODES);
    for c in 0..GUESS_NODES {
        guess.set_column(c, &template);
    }

    let (p1, v1) = (x0[0], x0[n - 1]);
    let (p2, v2) = (x0[n], x0[2 * n - 1]);
    for c in 1..GUESS_NODES {
        let t = mesh[c];
        // kinematic extrapolation of positions and speeds
        guess[(0, c)] = p1 + v1 * t + 0.5 * a1 * t * t;
        guess[(n - 1, c)] = v1 + a1 * t;
        guess[(n, c)] = p2 + v2 * t + 0.5 * a2 * t * t;
        guess[(2 * n - 1, c)] = v2 + a2 * t;
        // own heading/speed costates decay linearly to zero at the horizon
        guess[(3 * n - 2, c)] = -alpha * (v1 + a1 * t) * (t - t1);
        guess[(3 * n - 1, c)] = -alpha * (t - t1);
        guess[(6 * n - 2, c)] = -alpha * (v2 + a2 * t) * (t - t1);
        guess[(6 * n - 1, c)] = -alpha * (t - t1);
    }
    guess
}
