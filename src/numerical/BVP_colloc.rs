//! Collocation solver for two-point boundary value problems.
//!
//! 4th order collocation with residual control, in the SciPy/MATLAB lineage:
//! the solution is approximated by a C1 piecewise cubic satisfying the ODE at
//! the midpoints of the mesh intervals, the resulting nonlinear system is
//! solved by a damped Newton method with finite-difference Jacobians, and the
//! mesh is refined where the Lobatto-quadrature RMS residual estimate exceeds
//! the tolerance.
//!
//! Compared to a general-purpose solver of this family, unknown parameters
//! are not supported (the generator never solves parameterized BVPs), and
//! every dynamics/boundary evaluation passes through an explicit arithmetic
//! guard: a NaN or infinity produced anywhere inside a solve aborts that
//! solve with [`CollocError::NonFinite`] instead of poisoning the Newton
//! iteration. Callers treat such an abort like any other failed candidate.
//!
//! Algorithm outline:
//! 1) collocation residuals: Phi_j = y_{j+1} - y_j - h_j/6 (f_j + f_{j+1} + 4 f_mid)
//! 2) Newton iteration on (collocation, boundary) residual stack with
//!    backtracking line search and a reused LU decomposition
//! 3) interval-wise RMS residuals of y' - f, normalized by 1 + |f|,
//!    integrated with 5-point Lobatto quadrature
//! 4) nodes inserted where residuals exceed tol (one node) or 100*tol (two)
//! 5) repeat until residuals pass, the node budget is exhausted, or the
//!    Jacobian goes singular

use crate::numerical::CubicSpline::CubicSpline;
use nalgebra::{DMatrix, DVector, LU};
use thiserror::Error;

/// Machine epsilon for floating point arithmetic
const EPS: f64 = f64::EPSILON;

/// ODE right-hand side: (t, y) with one augmented column per entry of t.
pub type RhsFn<'a> = dyn Fn(&DVector<f64>, &DMatrix<f64>) -> DMatrix<f64> + 'a;

/// Boundary residual: (ya, yb), must return one entry per ODE component.
pub type BcFn<'a> = dyn Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64> + 'a;

/// Explicit policy for arithmetic anomalies during function evaluations.
/// `Strict` turns any non-finite value into [`CollocError::NonFinite`];
/// `Permissive` lets them flow into the Newton iteration (scipy's default
/// behavior without warning promotion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArithmeticGuard {
    #[default]
    Strict,
    Permissive,
}

impl ArithmeticGuard {
    fn check(&self, values: &[f64], context: &'static str) -> Result<(), CollocError> {
        if matches!(self, ArithmeticGuard::Strict) && !values.iter().all(|v| v.is_finite()) {
            return Err(CollocError::NonFinite { context });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CollocError {
    #[error("non-finite value produced by {context}")]
    NonFinite { context: &'static str },
    #[error("initial guess shape ({rows}, {cols}) does not match mesh of {mesh} nodes")]
    GuessShape { rows: usize, cols: usize, mesh: usize },
    #[error("dynamics returned {got_rows}x{got_cols}, expected {rows}x{cols}")]
    RhsShape {
        got_rows: usize,
        got_cols: usize,
        rows: usize,
        cols: usize,
    },
    #[error("boundary residual has {got} entries, expected {expected}")]
    BcSize { got: usize, expected: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollocStatus {
    Converged,
    MaxNodesExceeded,
    SingularJacobian,
    BcToleranceUnsatisfied,
}

impl CollocStatus {
    pub fn message(&self) -> &'static str {
        match self {
            CollocStatus::Converged => "The algorithm converged to the desired accuracy.",
            CollocStatus::MaxNodesExceeded => "The maximum number of mesh nodes is exceeded.",
            CollocStatus::SingularJacobian => {
                "A singular Jacobian encountered when solving the collocation system."
            }
            CollocStatus::BcToleranceUnsatisfied => {
                "The solver was unable to satisfy boundary conditions tolerance."
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollocOptions {
    /// target RMS residual per mesh interval
    pub tol: f64,
    /// node budget for mesh refinement
    pub max_nodes: usize,
    /// boundary residual tolerance, defaults to `tol`
    pub bc_tol: Option<f64>,
    /// 0 silent, 1 status line, 2 iteration table
    pub verbose: u8,
    pub guard: ArithmeticGuard,
}

impl Default for CollocOptions {
    fn default() -> CollocOptions {
        CollocOptions {
            tol: 1e-3,
            max_nodes: 1000,
            bc_tol: None,
            verbose: 0,
            guard: ArithmeticGuard::Strict,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollocResult {
    /// final mesh nodes
    pub x: DVector<f64>,
    /// solution values at mesh nodes, one column per node
    pub y: DMatrix<f64>,
    /// solution derivatives at mesh nodes
    pub yp: DMatrix<f64>,
    /// RMS residual estimate per mesh interval
    pub rms_residuals: DVector<f64>,
    pub niter: usize,
    pub status: CollocStatus,
    pub success: bool,
}

fn eval_rhs(
    fun: &RhsFn,
    x: &DVector<f64>,
    y: &DMatrix<f64>,
    guard: ArithmeticGuard,
) -> Result<DMatrix<f64>, CollocError> {
    let f = fun(x, y);
    if f.shape() != y.shape() {
        return Err(CollocError::RhsShape {
            got_rows: f.nrows(),
            got_cols: f.ncols(),
            rows: y.nrows(),
            cols: y.ncols(),
        });
    }
    guard.check(f.as_slice(), "dynamics")?;
    Ok(f)
}

fn eval_bc(
    bc: &BcFn,
    ya: &DVector<f64>,
    yb: &DVector<f64>,
    guard: ArithmeticGuard,
) -> Result<DVector<f64>, CollocError> {
    let res = bc(ya, yb);
    guard.check(res.as_slice(), "boundary conditions")?;
    Ok(res)
}

/// Forward-difference Jacobians of the RHS w.r.t. y, one (n, n) matrix per
/// mesh point.
pub fn estimate_rhs_jac(
    fun: &RhsFn,
    x: &DVector<f64>,
    y: &DMatrix<f64>,
    f0: &DMatrix<f64>,
    guard: ArithmeticGuard,
) -> Result<Vec<DMatrix<f64>>, CollocError> {
    let (n, m) = y.shape();
    let mut df_dy = Vec::with_capacity(m);
    for col in 0..m {
        let mut jacobian = DMatrix::zeros(n, n);
        for i in 0..n {
            let mut y_perturbed = y.clone();
            let hstep = EPS.sqrt() * (1.0 + y[(i, col)].abs());
            y_perturbed[(i, col)] += hstep;
            let f_new = eval_rhs(fun, x, &y_perturbed, guard)?;
            for row in 0..n {
                jacobian[(row, i)] = (f_new[(row, col)] - f0[(row, col)]) / hstep;
            }
        }
        df_dy.push(jacobian);
    }
    Ok(df_dy)
}

/// Forward-difference Jacobians of the boundary residual w.r.t. ya and yb.
pub fn estimate_bc_jac(
    bc: &BcFn,
    ya: &DVector<f64>,
    yb: &DVector<f64>,
    bc0: &DVector<f64>,
    guard: ArithmeticGuard,
) -> Result<(DMatrix<f64>, DMatrix<f64>), CollocError> {
    let n = ya.len();
    let mut dbc_dya = DMatrix::zeros(n, n);
    for i in 0..n {
        let mut ya_perturbed = ya.clone();
        let hstep = EPS.sqrt() * (1.0 + ya[i].abs());
        ya_perturbed[i] += hstep;
        let bc_new = eval_bc(bc, &ya_perturbed, yb, guard)?;
        for row in 0..n {
            dbc_dya[(row, i)] = (bc_new[row] - bc0[row]) / hstep;
        }
    }

    let mut dbc_dyb = DMatrix::zeros(n, n);
    for i in 0..n {
        let mut yb_perturbed = yb.clone();
        let hstep = EPS.sqrt() * (1.0 + yb[i].abs());
        yb_perturbed[i] += hstep;
        let bc_new = eval_bc(bc, ya, &yb_perturbed, guard)?;
        for row in 0..n {
            dbc_dyb[(row, i)] = (bc_new[row] - bc0[row]) / hstep;
        }
    }

    Ok((dbc_dya, dbc_dyb))
}

/// Collocation residuals at interval midpoints.
///
/// The solution is sought as a C1 cubic spline whose derivative matches the
/// RHS at the mesh nodes; the collocation condition equates the spline
/// derivative and the RHS at interval midpoints.
///
/// Returns (col_res, y_middle, f, f_middle).
pub fn collocation_residuals(
    fun: &RhsFn,
    y: &DMatrix<f64>,
    x: &DVector<f64>,
    h: &DVector<f64>,
    guard: ArithmeticGuard,
) -> Result<(DMatrix<f64>, DMatrix<f64>, DMatrix<f64>, DMatrix<f64>), CollocError> {
    let (n, m) = y.shape();

    let f = eval_rhs(fun, x, y, guard)?;

    let mut y_middle = DMatrix::zeros(n, m - 1);
    for i in 0..n {
        for j in 0..(m - 1) {
            y_middle[(i, j)] =
                0.5 * (y[(i, j + 1)] + y[(i, j)]) - 0.125 * h[j] * (f[(i, j + 1)] - f[(i, j)]);
        }
    }

    // midpoint RHS values, evaluated column by column
    let mut f_middle = DMatrix::zeros(n, m - 1);
    for j in 0..(m - 1) {
        let x_single = DVector::from_vec(vec![x[j] + 0.5 * h[j]]);
        let mut y_single = DMatrix::zeros(n, 1);
        for i in 0..n {
            y_single[(i, 0)] = y_middle[(i, j)];
        }
        let f_result = eval_rhs(fun, &x_single, &y_single, guard)?;
        for i in 0..n {
            f_middle[(i, j)] = f_result[(i, 0)];
        }
    }

    let mut col_res = DMatrix::zeros(n, m - 1);
    for i in 0..n {
        for j in 0..(m - 1) {
            col_res[(i, j)] = y[(i, j + 1)]
                - y[(i, j)]
                - h[j] / 6.0 * (f[(i, j)] + f[(i, j + 1)] + 4.0 * f_middle[(i, j)]);
        }
    }

    Ok((col_res, y_middle, f, f_middle))
}

/// Dense Jacobian of the stacked (collocation, boundary) system,
/// size (n*m, n*m).
fn assemble_global_jac(
    n: usize,
    m: usize,
    h: &DVector<f64>,
    df_dy: &[DMatrix<f64>],
    df_dy_middle: &[DMatrix<f64>],
    dbc_dya: &DMatrix<f64>,
    dbc_dyb: &DMatrix<f64>,
) -> DMatrix<f64> {
    let total_size = n * m;
    let mut jac = DMatrix::zeros(total_size, total_size);

    for i in 0..(m - 1) {
        let h_i = h[i];

        // diagonal block dPhi/dy_j
        let mut dphi_dy_0 = -DMatrix::identity(n, n);
        dphi_dy_0 -= (h_i / 6.0) * (&df_dy[i] + 2.0 * &df_dy_middle[i]);
        let t_diag = &df_dy_middle[i] * &df_dy[i];
        dphi_dy_0 -= (h_i * h_i / 12.0) * t_diag;

        let row_start = i * n;
        for r in 0..n {
            for c in 0..n {
                jac[(row_start + r, i * n + c)] = dphi_dy_0[(r, c)];
            }
        }

        // off-diagonal block dPhi/dy_{j+1}
        let mut dphi_dy_1 = DMatrix::identity(n, n);
        dphi_dy_1 -= (h_i / 6.0) * (&df_dy[i + 1] + 2.0 * &df_dy_middle[i]);
        let t_off = &df_dy_middle[i] * &df_dy[i + 1];
        dphi_dy_1 += (h_i * h_i / 12.0) * t_off;

        for r in 0..n {
            for c in 0..n {
                jac[(row_start + r, (i + 1) * n + c)] = dphi_dy_1[(r, c)];
            }
        }
    }

    let bc_row_start = (m - 1) * n;
    for r in 0..n {
        for c in 0..n {
            jac[(bc_row_start + r, c)] = dbc_dya[(r, c)];
            jac[(bc_row_start + r, (m - 1) * n + c)] = dbc_dyb[(r, c)];
        }
    }

    jac
}

/// Stack collocation residuals (column-major) and boundary residuals into
/// one vector of length n*m.
fn stack_residuals(
    col_res: &DMatrix<f64>,
    bc_res: &DVector<f64>,
    n: usize,
    m: usize,
) -> DVector<f64> {
    let mut res = DVector::zeros(n * m);
    for j in 0..(m - 1) {
        for i in 0..n {
            res[j * n + i] = col_res[(i, j)];
        }
    }
    for i in 0..n {
        res[(m - 1) * n + i] = bc_res[i];
    }
    res
}

/// Newton iteration on the collocation system with backtracking line search
/// and Jacobian reuse. Returns the updated node values and a singularity
/// flag.
fn newton_iterate(
    n: usize,
    m: usize,
    h: &DVector<f64>,
    fun: &RhsFn,
    bc: &BcFn,
    mut y: DMatrix<f64>,
    x: &DVector<f64>,
    bvp_tol: f64,
    bc_tol: f64,
    guard: ArithmeticGuard,
) -> Result<(DMatrix<f64>, bool), CollocError> {
    let max_iter = 8;
    let max_njev = 4;
    let sigma = 0.2; // Armijo constant
    let tau = 0.5; // step size decrease factor
    let n_trial = 4; // max backtracking steps

    // tolerance for raw collocation residuals
    let tol_r: DVector<f64> = h.map(|h_i| 2.0 / 3.0 * h_i * 5e-2 * bvp_tol);

    let mut njev = 0;
    let mut singular = false;
    let mut recompute_jac = true;
    let mut lu_decomp: Option<LU<f64, nalgebra::Dyn, nalgebra::Dyn>> = None;
    let mut cost = 0.0;

    for _iteration in 0..max_iter {
        let (col_res, y_middle, f, f_middle) = collocation_residuals(fun, &y, x, h, guard)?;
        let bc_res = eval_bc(
            bc,
            &y.column(0).into_owned(),
            &y.column(m - 1).into_owned(),
            guard,
        )?;
        let res = stack_residuals(&col_res, &bc_res, n, m);

        if recompute_jac {
            let df_dy = estimate_rhs_jac(fun, x, &y, &f, guard)?;

            let mut x_middle = DVector::zeros(m - 1);
            for j in 0..(m - 1) {
                x_middle[j] = x[j] + 0.5 * h[j];
            }
            let df_dy_middle = estimate_rhs_jac(fun, &x_middle, &y_middle, &f_middle, guard)?;

            let (dbc_dya, dbc_dyb) = estimate_bc_jac(
                bc,
                &y.column(0).into_owned(),
                &y.column(m - 1).into_owned(),
                &bc_res,
                guard,
            )?;

            let jac_matrix =
                assemble_global_jac(n, m, h, &df_dy, &df_dy_middle, &dbc_dya, &dbc_dyb);

            let lu = LU::new(jac_matrix);
            match lu.solve(&res) {
                Some(step) => {
                    lu_decomp = Some(lu);
                    cost = step.dot(&step);
                }
                None => {
                    singular = true;
                    break;
                }
            }
            njev += 1;
        }

        let Some(ref lu) = lu_decomp else {
            singular = true;
            break;
        };
        let Some(step) = lu.solve(&res) else {
            singular = true;
            break;
        };

        let mut y_step = DMatrix::zeros(n, m);
        for j in 0..m {
            for i in 0..n {
                y_step[(i, j)] = step[j * n + i];
            }
        }

        // backtracking line search on the Newton decrement
        let mut alpha = 1.0;
        let mut best_y = y.clone();
        let mut best_cost = cost;
        for trial in 0..=n_trial {
            let y_new = &y - alpha * &y_step;

            let (col_res_new, _, _, _) = collocation_residuals(fun, &y_new, x, h, guard)?;
            let bc_res_new = eval_bc(
                bc,
                &y_new.column(0).into_owned(),
                &y_new.column(m - 1).into_owned(),
                guard,
            )?;
            let res_new = stack_residuals(&col_res_new, &bc_res_new, n, m);

            if let Some(step_new) = lu.solve(&res_new) {
                let cost_new = step_new.dot(&step_new);
                if cost_new < (1.0 - 2.0 * alpha * sigma) * cost {
                    best_y = y_new;
                    best_cost = cost_new;
                    break;
                }
            }
            if trial < n_trial {
                alpha *= tau;
            }
        }

        y = best_y;
        cost = best_cost;

        // convergence check on the fresh residuals
        let (col_res_final, _, _, f_middle_final) = collocation_residuals(fun, &y, x, h, guard)?;
        let bc_res_final = eval_bc(
            bc,
            &y.column(0).into_owned(),
            &y.column(m - 1).into_owned(),
            guard,
        )?;

        let mut converged = true;
        'outer: for j in 0..(m - 1) {
            for i in 0..n {
                if col_res_final[(i, j)].abs() >= tol_r[j] * (1.0 + f_middle_final[(i, j)].abs()) {
                    converged = false;
                    break 'outer;
                }
            }
        }
        for i in 0..n {
            if bc_res_final[i].abs() >= bc_tol {
                converged = false;
                break;
            }
        }
        if converged {
            break;
        }

        // full steps keep the Jacobian, damped steps force a refresh
        recompute_jac = alpha != 1.0;
        if njev >= max_njev {
            break;
        }
    }

    Ok((y, singular))
}

/// RMS residual estimate per mesh interval.
///
/// Residuals y' - f of the spline solution, normalized by 1 + |f|, are
/// integrated over each interval with 5-point Lobatto quadrature (midpoint
/// plus two interior points at +-h/2 * sqrt(3/7)).
fn estimate_rms_residuals(
    fun: &RhsFn,
    sol: &CubicSpline,
    x: &DVector<f64>,
    h: &DVector<f64>,
    r_middle: &DMatrix<f64>,
    f_middle: &DMatrix<f64>,
    guard: ArithmeticGuard,
) -> Result<DVector<f64>, CollocError> {
    let (n, m1) = r_middle.shape();

    let mut x1 = DVector::zeros(m1);
    let mut x2 = DVector::zeros(m1);
    for j in 0..m1 {
        let mid = x[j] + 0.5 * h[j];
        let s = 0.5 * h[j] * (3.0f64 / 7.0).sqrt();
        x1[j] = mid + s;
        x2[j] = mid - s;
    }

    let x1_pts: Vec<f64> = x1.iter().cloned().collect();
    let x2_pts: Vec<f64> = x2.iter().cloned().collect();
    let y1 = sol.eval(&x1_pts);
    let y2 = sol.eval(&x2_pts);
    let y1_prime = sol.eval_derivative(&x1_pts);
    let y2_prime = sol.eval_derivative(&x2_pts);

    let f1 = eval_rhs(fun, &x1, &y1, guard)?;
    let f2 = eval_rhs(fun, &x2, &y2, guard)?;

    let mut rms_res = DVector::zeros(m1);
    for j in 0..m1 {
        let mut sum_r_middle = 0.0;
        let mut sum_r1 = 0.0;
        let mut sum_r2 = 0.0;
        for i in 0..n {
            let r_mid = r_middle[(i, j)] / (1.0 + f_middle[(i, j)].abs());
            let r1 = (y1_prime[(i, j)] - f1[(i, j)]) / (1.0 + f1[(i, j)].abs());
            let r2 = (y2_prime[(i, j)] - f2[(i, j)]) / (1.0 + f2[(i, j)].abs());
            sum_r_middle += r_mid * r_mid;
            sum_r1 += r1 * r1;
            sum_r2 += r2 * r2;
        }
        let integral = 0.5 * (32.0 / 45.0 * sum_r_middle + 49.0 / 90.0 * (sum_r1 + sum_r2));
        rms_res[j] = integral.sqrt();
    }

    Ok(rms_res)
}

/// Insert one node in the middle of the `insert_1` intervals and two nodes
/// (thirds) into the `insert_2` intervals.
pub fn refine_mesh(x: &DVector<f64>, insert_1: &[usize], insert_2: &[usize]) -> DVector<f64> {
    let mut new_points = x.iter().cloned().collect::<Vec<f64>>();
    for &i in insert_1 {
        new_points.push(0.5 * (x[i] + x[i + 1]));
    }
    for &i in insert_2 {
        new_points.push((2.0 * x[i] + x[i + 1]) / 3.0);
        new_points.push((x[i] + 2.0 * x[i + 1]) / 3.0);
    }
    new_points.sort_by(|a, b| a.partial_cmp(b).unwrap());
    DVector::from_vec(new_points)
}

/// Solve a two-point BVP by collocation with adaptive mesh refinement.
///
/// `x` is the initial mesh (ascending), `y` the initial guess with one
/// column per mesh node. The returned result carries the final mesh, node
/// values and the RMS residual estimate per interval; callers decide
/// acceptance on `rms_residuals` (and/or `success`).
pub fn solve_collocation(
    fun: &RhsFn,
    bc: &BcFn,
    mut x: DVector<f64>,
    mut y: DMatrix<f64>,
    options: &CollocOptions,
) -> Result<CollocResult, CollocError> {
    let n = y.nrows();
    let mut m = x.len();
    let guard = options.guard;

    if y.ncols() != m {
        return Err(CollocError::GuessShape {
            rows: y.nrows(),
            cols: y.ncols(),
            mesh: m,
        });
    }
    guard.check(y.as_slice(), "initial guess")?;

    let bc_tol = options.bc_tol.unwrap_or(options.tol);
    let max_iteration = 10;

    // shape validation up front, so per-candidate failures surface early
    let _ = eval_rhs(fun, &x, &y, guard)?;
    let bc_test = eval_bc(
        bc,
        &y.column(0).into_owned(),
        &y.column(m - 1).into_owned(),
        guard,
    )?;
    if bc_test.len() != n {
        return Err(CollocError::BcSize {
            got: bc_test.len(),
            expected: n,
        });
    }

    let mut status = CollocStatus::Converged;
    let mut iteration = 0;

    if options.verbose == 2 {
        println!(
            "{:^15}{:^15}{:^15}{:^15}{:^15}",
            "Iteration", "Max residual", "Max BC residual", "Total nodes", "Nodes added"
        );
    }

    loop {
        m = x.len();

        let mut h = DVector::zeros(m - 1);
        for i in 0..(m - 1) {
            h[i] = x[i + 1] - x[i];
        }

        let (y_new, singular) = newton_iterate(
            n,
            m,
            &h,
            fun,
            bc,
            y.clone(),
            &x,
            options.tol,
            bc_tol,
            guard,
        )?;
        y = y_new;
        iteration += 1;

        let (col_res, _y_middle, f, f_middle) = collocation_residuals(fun, &y, &x, &h, guard)?;
        let bc_res = eval_bc(
            bc,
            &y.column(0).into_owned(),
            &y.column(m - 1).into_owned(),
            guard,
        )?;
        let max_bc_res = bc_res.iter().map(|v| v.abs()).fold(0.0, f64::max);

        if singular {
            status = CollocStatus::SingularJacobian;
            break;
        }

        // relation between collocation and true residuals at the midpoint
        let mut r_middle = DMatrix::zeros(n, m - 1);
        for j in 0..(m - 1) {
            for i in 0..n {
                r_middle[(i, j)] = 1.5 * col_res[(i, j)] / h[j];
            }
        }

        let sol = CubicSpline::from_nodes(&y, &f, &x, &h);
        let rms_res = estimate_rms_residuals(fun, &sol, &x, &h, &r_middle, &f_middle, guard)?;
        let max_rms_res = rms_res.iter().cloned().fold(0.0, f64::max);

        let mut insert_1 = Vec::new();
        let mut insert_2 = Vec::new();
        for j in 0..(m - 1) {
            if rms_res[j] > options.tol && rms_res[j] < 100.0 * options.tol {
                insert_1.push(j);
            } else if rms_res[j] >= 100.0 * options.tol {
                insert_2.push(j);
            }
        }
        let nodes_added = insert_1.len() + 2 * insert_2.len();

        if m + nodes_added > options.max_nodes {
            status = CollocStatus::MaxNodesExceeded;
            if options.verbose == 2 {
                println!(
                    "{:^15}{:^15.2e}{:^15.2e}{:^15}{:^15}",
                    iteration,
                    max_rms_res,
                    max_bc_res,
                    m,
                    format!("({})", nodes_added)
                );
            }
            break;
        }

        if options.verbose == 2 {
            println!(
                "{:^15}{:^15.2e}{:^15.2e}{:^15}{:^15}",
                iteration, max_rms_res, max_bc_res, m, nodes_added
            );
        }

        if nodes_added > 0 {
            x = refine_mesh(&x, &insert_1, &insert_2);
            let x_eval: Vec<f64> = x.iter().cloned().collect();
            y = sol.eval(&x_eval);
        } else if max_bc_res <= bc_tol {
            status = CollocStatus::Converged;
            break;
        } else if iteration >= max_iteration {
            status = CollocStatus::BcToleranceUnsatisfied;
            break;
        }
    }

    if options.verbose > 0 {
        match status {
            CollocStatus::Converged => println!(
                "Solved in {} iterations, number of nodes {}.",
                iteration,
                x.len()
            ),
            CollocStatus::MaxNodesExceeded => {
                println!("Number of nodes exceeded after iteration {}.", iteration)
            }
            CollocStatus::SingularJacobian => {
                println!("Singular Jacobian encountered on iteration {}.", iteration)
            }
            CollocStatus::BcToleranceUnsatisfied => println!(
                "Unable to satisfy boundary conditions tolerance on iteration {}.",
                iteration
            ),
        }
    }

    // final residual estimate on the converged mesh
    let final_f = eval_rhs(fun, &x, &y, guard)?;
    let final_h = DVector::from_iterator(x.len() - 1, (0..x.len() - 1).map(|i| x[i + 1] - x[i]));
    let (col_res_final, _, _, f_middle_final) =
        collocation_residuals(fun, &y, &x, &final_h, guard)?;
    let mut r_middle_final = DMatrix::zeros(n, x.len() - 1);
    for j in 0..(x.len() - 1) {
        for i in 0..n {
            r_middle_final[(i, j)] = 1.5 * col_res_final[(i, j)] / final_h[j];
        }
    }
    let final_sol = CubicSpline::from_nodes(&y, &final_f, &x, &final_h);
    let final_rms_res = estimate_rms_residuals(
        fun,
        &final_sol,
        &x,
        &final_h,
        &r_middle_final,
        &f_middle_final,
        guard,
    )?;

    let success = status == CollocStatus::Converged;
    Ok(CollocResult {
        x,
        y,
        yp: final_f,
        rms_residuals: final_rms_res,
        niter: iteration,
        status,
        success,
    })
}
