//! Two-vehicle narrow road interaction in Pontryagin two-point BVP form.
//!
//! Two vehicles approach a narrowing of the road in adjacent lanes and have
//! to negotiate the passing order. Each vehicle carries the kinematic state
//! (x, y, psi, v) and is controlled by its longitudinal acceleration,
//! clamped to [a_min, a_max]. Player i maximizes the reward functional
//!
//! V_i = int_0^T [ alpha * v_i - u_i^2 - b(X) ] dt
//!
//! where b(X) is a Gaussian proximity penalty between the two vehicles.
//! The first-order necessary conditions give the feedback controls
//! u_i = clamp(lambda_{i,v_i} / 2) and the costate dynamics implemented in
//! `aug_dynamics`; costates vanish at the horizon (no terminal reward).
//!
//! Augmented vector layout per mesh column (n = N_states = 4):
//!
//! rows 0..2n      X  = (x1, y1, psi1, v1, x2, y2, psi2, v2)
//! rows 2n..4n     lambda_1 over the joint state
//! rows 4n..6n     lambda_2 over the joint state
//! rows 6n, 6n+1   value accumulators; V_i = -aux_i(0)

use crate::problem::problem_traits::OCProblem;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::rngs::StdRng;

const N_STATES: usize = 4;

#[derive(Debug, Clone)]
pub struct NarrowRoadProblem {
    /// progress (speed) reward weight
    pub alpha: f64,
    /// time horizon, s
    pub t1: f64,
    /// proximity penalty weight
    pub beta: f64,
    /// proximity penalty length scale, m
    pub sigma: f64,
    pub a_min: f64,
    pub a_max: f64,
    /// sampling ranges for the initial state of each vehicle
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub psi_range: (f64, f64),
    pub v_range: (f64, f64),
}

impl Default for NarrowRoadProblem {
    fn default() -> NarrowRoadProblem {
        NarrowRoadProblem {
            alpha: 1.0,
            t1: 3.0,
            beta: 10.0,
            sigma: 5.0,
            a_min: -5.0,
            a_max: 10.0,
            x_range: (-36.0, -18.0),
            y_range: (-1.0, 1.0),
            psi_range: (-0.05, 0.05),
            v_range: (15.0, 25.0),
        }
    }
}

impl NarrowRoadProblem {
    pub fn clamp_control(&self, u: f64) -> f64 {
        u.max(self.a_min).min(self.a_max)
    }

    /// Gaussian proximity penalty between the vehicles.
    fn penalty(&self, dx: f64, dy: f64) -> f64 {
        let s2 = self.sigma * self.sigma;
        self.beta * (-(dx * dx + dy * dy) / (2.0 * s2)).exp()
    }
}

impl OCProblem for NarrowRoadProblem {
    fn name(&self) -> &'static str {
        "narrow_road"
    }
    fn n_states(&self) -> usize {
        N_STATES
    }
    fn alpha(&self) -> f64 {
        self.alpha
    }
    fn t1(&self) -> f64 {
        self.t1
    }

    fn sample_x0(&self, ns: usize, rng: &mut StdRng) -> DMatrix<f64> {
        let mut x0 = DMatrix::zeros(2 * N_STATES, ns);
        for j in 0..ns {
            for agent in 0..2 {
                let base = agent * N_STATES;
                x0[(base, j)] = rng.random_range(self.x_range.0..self.x_range.1);
                x0[(base + 1, j)] = rng.random_range(self.y_range.0..self.y_range.1);
                x0[(base + 2, j)] = rng.random_range(self.psi_range.0..self.psi_range.1);
                x0[(base + 3, j)] = rng.random_range(self.v_range.0..self.v_range.1);
            }
        }
        x0
    }

    fn aug_dynamics(&self, _t: &DVector<f64>, y: &DMatrix<f64>) -> DMatrix<f64> {
        let n = N_STATES;
        let dim = self.aug_dim();
        let m = y.ncols();
        let s2 = self.sigma * self.sigma;
        let mut f = DMatrix::zeros(dim, m);
        for j in 0..m {
            let (x1, y1, psi1, v1) = (y[(0, j)], y[(1, j)], y[(2, j)], y[(3, j)]);
            let (x2, y2, psi2, v2) = (y[(4, j)], y[(5, j)], y[(6, j)], y[(7, j)]);
            let (c1, s1) = (psi1.cos(), psi1.sin());
            let (c2, s2v) = (psi2.cos(), psi2.sin());
            // feedback controls from the stationarity condition
            let u1 = self.clamp_control(y[(3 * n - 1, j)] / 2.0);
            let u2 = self.clamp_control(y[(6 * n - 1, j)] / 2.0);

            let (dx, dy) = (x1 - x2, y1 - y2);
            let b = self.penalty(dx, dy);
            let db_dx1 = -b * dx / s2;
            let db_dy1 = -b * dy / s2;

            // state kinematics
            f[(0, j)] = v1 * c1;
            f[(1, j)] = v1 * s1;
            f[(2, j)] = 0.0;
            f[(3, j)] = u1;
            f[(4, j)] = v2 * c2;
            f[(5, j)] = v2 * s2v;
            f[(6, j)] = 0.0;
            f[(7, j)] = u2;

            // costates: lambda_dot_i = -dH_i/dX, identical structure for
            // both players except for the alpha term on the own speed
            for player in 0..2 {
                let base = 2 * n + player * 2 * n;
                let l = |k: usize| y[(base + k, j)];
                f[(base, j)] = db_dx1;
                f[(base + 1, j)] = db_dy1;
                f[(base + 2, j)] = v1 * (l(0) * s1 - l(1) * c1);
                let own1 = if player == 0 { self.alpha } else { 0.0 };
                f[(base + 3, j)] = -(own1 + l(0) * c1 + l(1) * s1);
                f[(base + 4, j)] = -db_dx1;
                f[(base + 5, j)] = -db_dy1;
                f[(base + 6, j)] = v2 * (l(4) * s2v - l(5) * c2);
                let own2 = if player == 1 { self.alpha } else { 0.0 };
                f[(base + 7, j)] = -(own2 + l(4) * c2 + l(5) * s2v);
            }

            // running rewards accumulated into the value channels
            f[(6 * n, j)] = self.alpha * v1 - u1 * u1 - b;
            f[(6 * n + 1, j)] = self.alpha * v2 - u2 * u2 - b;
        }
        f
    }

    fn bc_residual(
        &self,
        x0: &DVector<f64>,
        ya: &DVector<f64>,
        yb: &DVector<f64>,
    ) -> DVector<f64> {
        let n = N_STATES;
        let dim = self.aug_dim();
        let mut res = DVector::zeros(dim);
        // initial state pinned to the sample
        for i in 0..2 * n {
            res[i] = ya[i] - x0[i];
        }
        // costates and value accumulators vanish at the horizon
        for i in 2 * n..dim {
            res[i] = yb[i];
        }
        res
    }

    fn u_star(&self, _x: &DMatrix<f64>, a: &DMatrix<f64>) -> (DVector<f64>, DVector<f64>) {
        let n = N_STATES;
        let m = a.ncols();
        let mut u1 = DVector::zeros(m);
        let mut u2 = DVector::zeros(m);
        for j in 0..m {
            u1[j] = self.clamp_control(a[(n - 1, j)] / 2.0);
            u2[j] = self.clamp_control(a[(4 * n - 1, j)] / 2.0);
        }
        (u1, u2)
    }
}
