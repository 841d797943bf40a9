use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;

/// Contract between the generation pipeline and a concrete optimal control
/// problem in Pontryagin two-point BVP form.
///
/// The augmented vector stacked per mesh column is
/// `(X, A, aux)` with `X` of dimension `2 * n_states` (two agents), `A` of
/// dimension `4 * n_states` (each agent's costate over the joint state) and
/// two auxiliary value-accumulator channels, `6 * n_states + 2` rows total.
/// The accumulators integrate each agent's running reward with zero terminal
/// value, so the value of agent `i` at the initial condition is
/// `-aux_i(0)`.
pub trait OCProblem {
    /// short name used to derive the dataset file name
    fn name(&self) -> &'static str;
    /// per-agent state dimension
    fn n_states(&self) -> usize;
    /// progress reward weight, also the scale of the costate guess decay
    fn alpha(&self) -> f64;
    /// time horizon of every BVP, seconds
    fn t1(&self) -> f64;
    /// rows of the augmented vector the BVP solver operates on
    fn aug_dim(&self) -> usize {
        6 * self.n_states() + 2
    }

    /// Draw `ns` initial joint states, one per column, `2 * n_states` rows.
    fn sample_x0(&self, ns: usize, rng: &mut StdRng) -> DMatrix<f64>;

    /// RHS of the augmented ODE system. `y` holds one augmented vector per
    /// column, evaluated at the matching entry of `t`; the result has the
    /// same shape as `y`.
    fn aug_dynamics(&self, t: &DVector<f64>, y: &DMatrix<f64>) -> DMatrix<f64>;

    /// Two-point boundary residual for a trajectory started at `x0`:
    /// initial-state match on the state rows, terminal conditions on the
    /// costate and accumulator rows. Must return `aug_dim` entries.
    fn bc_residual(
        &self,
        x0: &DVector<f64>,
        ya: &DVector<f64>,
        yb: &DVector<f64>,
    ) -> DVector<f64>;

    /// Recover the optimal control signals from state/costate samples
    /// (columns of `x` and `a` are paired). Returns one row per agent.
    fn u_star(&self, x: &DMatrix<f64>, a: &DMatrix<f64>) -> (DVector<f64>, DVector<f64>);
}
