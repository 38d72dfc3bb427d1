//! B-spline and NURBS kernel: evaluation, knot refinement and removal, Bezier
//! decomposition, and degree elevation and reduction of curves, plus
//! tensor-product surface evaluation.
//!
//! Inputs are validated once when a [`BSplineCurve`] or [`BSplineSurface`]
//! is built. Homogeneous (rational) control points are handled like any
//! other coordinates; the `*_normalized` and `rational_*` operations divide
//! by the weight when asked to.

pub mod basis;
pub mod config;
pub mod curve;
pub mod error;
pub mod geometry;
pub mod surface;

pub use basis::{
    all_bernstein, basis_derivs, basis_funs, bernstein, binomial, find_span, horner, BinomialCache,
};
pub use config::Tolerance;
pub use curve::bezier::{bezier_points, de_casteljau, split_bezier};
pub use curve::{
    bezier_degree_reduce, global_interp_mat, interpolation_params, BSplineCurve, BezierReduction,
    BezierSegments, CurveDerivatives, DegreeReduction, KnotRemoval,
};
pub use error::{KernelError, Result};
pub use geometry::{KnotVector, Points};
pub use surface::{BSplineSurface, SurfaceDerivatives};
