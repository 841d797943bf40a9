//! Problem definitions for the data generator: the OCProblem seam between
//! the generation pipeline and a concrete optimal control problem, plus the
//! two-vehicle narrow road scenario the datasets are generated for.
pub mod problem_traits;
/// two interacting vehicles merging into a narrow road section, kinematic
/// states (x, y, psi, v) per vehicle, bounded longitudinal acceleration
pub mod narrow_road;
