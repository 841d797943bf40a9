//! Numerical machinery of the generator.
/// 4th order collocation BVP solver with residual control and adaptive mesh
/// refinement, dense nalgebra linear algebra
pub mod BVP_colloc;
mod BVP_colloc_tests;
/// piecewise cubic (C1) trajectory representation used by the solver
pub mod CubicSpline;
