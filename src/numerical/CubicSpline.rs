//! Piecewise cubic polynomial over an ascending mesh, one polynomial per
//! solution component per interval. The solver builds it from node values
//! and node derivatives (cubic Hermite construction, coefficient formulas as
//! in scipy.interpolate.CubicSpline) and evaluates values and first
//! derivatives at refinement and quadrature points.

use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone)]
pub struct CubicSpline {
    /// breakpoints, ascending
    pub x: Vec<f64>,
    /// c[interval][component] = [c3, c2, c1, c0] in the local coordinate
    /// s = t - x[interval], highest degree first
    pub c: Vec<Vec<[f64; 4]>>,
}

impl CubicSpline {
    /// Build the C1 cubic interpolant from values `y` and derivatives `yp`
    /// at the mesh nodes `x` with intervals `h`.
    pub fn from_nodes(
        y: &DMatrix<f64>,
        yp: &DMatrix<f64>,
        x: &DVector<f64>,
        h: &DVector<f64>,
    ) -> CubicSpline {
        let (n, m) = y.shape();
        let mut c = vec![vec![[0.0; 4]; n]; m - 1];
        for j in 0..(m - 1) {
            for i in 0..n {
                let slope = (y[(i, j + 1)] - y[(i, j)]) / h[j];
                let t = (yp[(i, j)] + yp[(i, j + 1)] - 2.0 * slope) / h[j];
                c[j][i] = [
                    t / h[j],
                    (slope - yp[(i, j)]) / h[j] - t,
                    yp[(i, j)],
                    y[(i, j)],
                ];
            }
        }
        CubicSpline {
            x: x.iter().cloned().collect(),
            c,
        }
    }

    pub fn n_components(&self) -> usize {
        self.c.first().map(|interval| interval.len()).unwrap_or(0)
    }

    /// Values at `pts`, one column per point.
    pub fn eval(&self, pts: &[f64]) -> DMatrix<f64> {
        self.eval_impl(pts, 0)
    }

    /// First derivatives at `pts`, one column per point.
    pub fn eval_derivative(&self, pts: &[f64]) -> DMatrix<f64> {
        self.eval_impl(pts, 1)
    }

    fn eval_impl(&self, pts: &[f64], nu: usize) -> DMatrix<f64> {
        let n = self.n_components();
        let mut out = DMatrix::zeros(n, pts.len());
        let mut interval = 0usize;
        for (p, &xv) in pts.iter().enumerate() {
            interval = self.find_interval(xv, interval);
            let s = xv - self.x[interval];
            for i in 0..n {
                let [c3, c2, c1, c0] = self.c[interval][i];
                out[(i, p)] = match nu {
                    0 => ((c3 * s + c2) * s + c1) * s + c0,
                    _ => (3.0 * c3 * s + 2.0 * c2) * s + c1,
                };
            }
        }
        out
    }

    /// Locate the interval containing `xv`, starting the search from the
    /// previously used interval; points outside the mesh extrapolate from
    /// the nearest end interval.
    fn find_interval(&self, xv: f64, start: usize) -> usize {
        let n_int = self.c.len();
        let mut i = start.min(n_int - 1);
        while i > 0 && xv < self.x[i] {
            i -= 1;
        }
        while i + 1 < n_int && xv >= self.x[i + 1] {
            i += 1;
        }
        i
    }
}
