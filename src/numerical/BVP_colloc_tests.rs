#[cfg(test)]
mod tests {
    use crate::numerical::BVP_colloc::{
        ArithmeticGuard, CollocError, CollocOptions, collocation_residuals, estimate_rhs_jac,
        refine_mesh, solve_collocation,
    };
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn test_rhs_jacobian_of_identity_system() {
        // f(x, y) = y, so df/dy is the identity at every mesh point
        let fun = |_x: &DVector<f64>, y: &DMatrix<f64>| y.clone();

        let x = DVector::from_vec(vec![0.0, 1.0]);
        let y = DMatrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let f0 = fun(&x, &y);

        let df_dy = estimate_rhs_jac(&fun, &x, &y, &f0, ArithmeticGuard::Strict).unwrap();
        assert_eq!(df_dy.len(), 2);
        for jacobian in &df_dy {
            for i in 0..2 {
                for j in 0..2 {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert!((jacobian[(i, j)] - expected).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_collocation_residuals_vanish_for_constant_solution() {
        // y' = 0 with constant node values: residuals must be exactly zero
        let fun = |_x: &DVector<f64>, y: &DMatrix<f64>| DMatrix::zeros(y.nrows(), y.ncols());

        let x = DVector::from_vec(vec![0.0, 0.5, 1.0]);
        let h = DVector::from_vec(vec![0.5, 0.5]);
        let y = DMatrix::from_element(3, 3, 2.5);

        let (col_res, y_middle, f, f_middle) =
            collocation_residuals(&fun, &y, &x, &h, ArithmeticGuard::Strict).unwrap();
        assert_eq!(f.shape(), (3, 3));
        assert_eq!(f_middle.shape(), (3, 2));
        for j in 0..2 {
            for i in 0..3 {
                assert!(col_res[(i, j)].abs() < 1e-14);
                assert!((y_middle[(i, j)] - 2.5).abs() < 1e-14);
            }
        }
    }

    #[test]
    fn test_solves_harmonic_oscillator_bvp() {
        // y'' = -y as a first order system, y(0) = 0, y'(0) = 1 on [0, pi];
        // the solution is sin(x)
        let fun = |_x: &DVector<f64>, y: &DMatrix<f64>| {
            let mut f = DMatrix::zeros(2, y.ncols());
            for j in 0..y.ncols() {
                f[(0, j)] = y[(1, j)];
                f[(1, j)] = -y[(0, j)];
            }
            f
        };
        let bc = |ya: &DVector<f64>, _yb: &DVector<f64>| {
            DVector::from_vec(vec![ya[0], ya[1] - 1.0])
        };

        let x = DVector::from_vec(vec![
            0.0,
            std::f64::consts::PI / 4.0,
            std::f64::consts::PI / 2.0,
            3.0 * std::f64::consts::PI / 4.0,
            std::f64::consts::PI,
        ]);
        let mut y = DMatrix::zeros(2, 5);
        for j in 0..5 {
            y[(0, j)] = x[j].sin();
            y[(1, j)] = x[j].cos();
        }

        let options = CollocOptions {
            tol: 1e-6,
            ..CollocOptions::default()
        };
        let res = solve_collocation(&fun, &bc, x, y, &options).unwrap();

        assert!(res.success, "status: {:?}", res.status);
        let max_rms = res.rms_residuals.iter().cloned().fold(0.0, f64::max);
        assert!(max_rms <= 1e-6, "max rms {}", max_rms);
        // boundary conditions
        assert!(res.y[(0, 0)].abs() < 1e-3, "left BC: {}", res.y[(0, 0)]);
        // solution resembles sin in the middle of the interval
        let mid = res.x.len() / 2;
        assert!(
            res.y[(0, mid)] > 0.5,
            "midpoint value {}",
            res.y[(0, mid)]
        );
    }

    #[test]
    fn test_linear_bvp_matches_exact_solution() {
        // y' = y with y(0) = 1: y(x) = exp(x); terminal value checked at 1
        let fun = |_x: &DVector<f64>, y: &DMatrix<f64>| y.clone();
        let bc = |ya: &DVector<f64>, _yb: &DVector<f64>| DVector::from_vec(vec![ya[0] - 1.0]);

        let x: DVector<f64> = DVector::from_vec(vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        let y: DMatrix<f64> = DMatrix::from_fn(1, 5, |_, j| (x[j]).exp());

        let options = CollocOptions {
            tol: 1e-8,
            ..CollocOptions::default()
        };
        let res = solve_collocation(&fun, &bc, x, y, &options).unwrap();
        assert!(res.success);
        let last = res.x.len() - 1;
        assert!(
            (res.y[(0, last)] - 1.0f64.exp()).abs() < 1e-4,
            "y(1) = {}",
            res.y[(0, last)]
        );
    }

    #[test]
    fn test_non_finite_dynamics_abort_the_solve() {
        let fun = |_x: &DVector<f64>, y: &DMatrix<f64>| {
            DMatrix::from_element(y.nrows(), y.ncols(), f64::NAN)
        };
        let bc = |ya: &DVector<f64>, _yb: &DVector<f64>| DVector::from_vec(vec![ya[0]]);

        let x = DVector::from_vec(vec![0.0, 1.0]);
        let y = DMatrix::zeros(1, 2);

        let err = solve_collocation(&fun, &bc, x, y, &CollocOptions::default()).unwrap_err();
        assert!(matches!(err, CollocError::NonFinite { .. }), "{err}");
    }

    #[test]
    fn test_guess_shape_mismatch_is_rejected() {
        let fun = |_x: &DVector<f64>, y: &DMatrix<f64>| y.clone();
        let bc = |ya: &DVector<f64>, _yb: &DVector<f64>| DVector::from_vec(vec![ya[0]]);

        let x = DVector::from_vec(vec![0.0, 0.5, 1.0]);
        let y = DMatrix::zeros(1, 2); // 2 columns for a 3 node mesh

        let err = solve_collocation(&fun, &bc, x, y, &CollocOptions::default()).unwrap_err();
        assert!(matches!(err, CollocError::GuessShape { .. }), "{err}");
    }

    #[test]
    fn test_refine_mesh_insertions() {
        let x = DVector::from_vec(vec![0.0, 1.0, 2.0]);
        let refined = refine_mesh(&x, &[0], &[1]);
        let expected = [0.0, 0.5, 1.0, 4.0 / 3.0, 5.0 / 3.0, 2.0];
        assert_eq!(refined.len(), expected.len());
        for (i, &e) in expected.iter().enumerate() {
            assert!((refined[i] - e).abs() < 1e-12, "node {}: {}", i, refined[i]);
        }
    }
}
