//! B-spline / NURBS curves over a clamped knot vector.
//!
//! [`BSplineCurve`] is the validated wrapper every curve operation works on:
//! shape, ordering and clamping are checked once in [`BSplineCurve::new`] and
//! the algorithms in the submodules rely on them without re-checking.

pub mod bezier;
pub mod elevate;
pub mod eval;
pub mod interp;
pub mod reduce;
pub mod refine;
pub mod remove;

pub use eval::CurveDerivatives;
pub use interp::{global_interp_mat, interpolation_params};
pub use reduce::{bezier_degree_reduce, BezierReduction, DegreeReduction};
pub use refine::BezierSegments;
pub use remove::KnotRemoval;

use serde::{Deserialize, Serialize};

use crate::basis::find_span;
use crate::error::{KernelError, Result};
use crate::geometry::knots::KnotVector;
use crate::geometry::points::Points;

/// A piecewise polynomial curve: `nc` control points of any dimension and a
/// clamped knot vector of `nc + p + 1` values. The degree `p` is derived from
/// the two lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve")]
pub struct BSplineCurve {
    points: Points,
    knots: KnotVector,
    #[serde(skip_serializing)]
    degree: usize,
}

#[derive(Deserialize)]
struct RawCurve {
    points: Points,
    knots: KnotVector,
}

impl TryFrom<RawCurve> for BSplineCurve {
    type Error = KernelError;

    fn try_from(raw: RawCurve) -> Result<Self> {
        BSplineCurve::new(raw.points, raw.knots)
    }
}

/// Degree implied by `knots` and `points` control points, or the reason it
/// cannot be one.
pub(crate) fn derive_degree(knots: usize, points: usize) -> Result<usize> {
    if points == 0 {
        return Err(KernelError::EmptyControlPoints);
    }
    let implied_degree = knots as isize - points as isize - 1;
    if implied_degree < 1 {
        return Err(KernelError::KnotCountMismatch {
            knots,
            points,
            implied_degree,
        });
    }
    Ok(implied_degree as usize)
}

impl BSplineCurve {
    pub fn new(points: Points, knots: KnotVector) -> Result<Self> {
        let degree = derive_degree(knots.len(), points.len())?;
        knots.validate_clamped(degree)?;
        Ok(Self {
            points,
            knots,
            degree,
        })
    }

    /// Wrap the output of a kernel algorithm run on a valid curve.
    pub(crate) fn from_parts(points: Points, knots: KnotVector, degree: usize) -> Self {
        debug_assert_eq!(knots.len(), points.len() + degree + 1);
        Self {
            points,
            knots,
            degree,
        }
    }

    /// Convenience constructor from raw arrays.
    pub fn from_raw(dim: usize, coords: Vec<f64>, knots: Vec<f64>) -> Result<Self> {
        Self::new(Points::new(dim, coords)?, KnotVector::new(knots)?)
    }

    /// A single Bezier segment on `[0, 1]` through the given control points.
    pub fn bezier(points: Points) -> Result<Self> {
        let p = points.len().saturating_sub(1);
        let mut knots = vec![0.0; p + 1];
        knots.extend(std::iter::repeat_n(1.0, p + 1));
        Self::new(points, KnotVector::new(knots)?)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn points(&self) -> &Points {
        &self.points
    }

    pub fn knots(&self) -> &KnotVector {
        &self.knots
    }

    pub fn dim(&self) -> usize {
        self.points.dim()
    }

    pub fn num_control_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_knots(&self) -> usize {
        self.knots.len()
    }

    pub fn into_parts(self) -> (Points, KnotVector) {
        (self.points, self.knots)
    }

    /// Parameter domain `[U[p], U[m-p]]`.
    pub fn domain(&self) -> (f64, f64) {
        self.knots.domain(self.degree)
    }

    /// Number of Bezier segments: distinct interior knot values plus one.
    pub fn num_bezier_segments(&self) -> usize {
        self.knots.interior(self.degree).len() + 1
    }

    pub(crate) fn span(&self, u: f64) -> Result<usize> {
        find_span(
            self.knots.as_slice(),
            u,
            self.degree,
            self.num_control_points() - 1,
        )
    }

    /// Reject any parameter outside the domain before work starts.
    pub(crate) fn check_params(&self, params: &[f64]) -> Result<()> {
        let (start, end) = self.domain();
        match params.iter().find(|u| !(start..=end).contains(*u)) {
            Some(&value) => Err(KernelError::ParameterOutOfDomain { value, start, end }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_is_derived() {
        let c = BSplineCurve::from_raw(
            2,
            vec![0.0, 0.0, 1.0, 2.0, 2.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        assert_eq!(c.degree(), 2);
        assert_eq!(c.domain(), (0.0, 1.0));
        assert_eq!(c.num_bezier_segments(), 1);
    }

    #[test]
    fn test_knot_count_mismatch() {
        let err = BSplineCurve::from_raw(3, vec![0.0; 9], vec![0.0, 0.0, 1.0, 1.0]).unwrap_err();
        assert_eq!(
            err,
            KernelError::KnotCountMismatch {
                knots: 4,
                points: 3,
                implied_degree: 0
            }
        );
    }

    #[test]
    fn test_empty_points() {
        let err = BSplineCurve::from_raw(3, vec![], vec![0.0, 1.0]).unwrap_err();
        assert_eq!(err, KernelError::EmptyControlPoints);
    }

    #[test]
    fn test_unclamped_rejected() {
        let err = BSplineCurve::from_raw(
            1,
            vec![0.0, 1.0, 2.0],
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        )
        .unwrap_err();
        assert_eq!(err, KernelError::NotClamped { degree: 2 });
    }

    #[test]
    fn test_bezier_constructor() {
        let ctrl = Points::from_rows(&[[0.0, 0.0], [1.0, 1.0], [2.0, 0.0], [3.0, 1.0]]).unwrap();
        let c = BSplineCurve::bezier(ctrl).unwrap();
        assert_eq!(c.degree(), 3);
        assert_eq!(c.knots().as_slice(), &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_check_params() {
        let c = BSplineCurve::from_raw(1, vec![0.0, 1.0], vec![0.0, 0.0, 2.0, 2.0]).unwrap();
        assert!(c.check_params(&[0.0, 1.0, 2.0]).is_ok());
        assert!(matches!(
            c.check_params(&[0.5, 2.5]).unwrap_err(),
            KernelError::ParameterOutOfDomain { value, .. } if value == 2.5
        ));
    }

    #[test]
    fn test_serde_revalidates() {
        let c = BSplineCurve::from_raw(1, vec![0.0, 1.0], vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: BSplineCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);

        let bad = r#"{"points":{"dim":1,"coords":[0.0,1.0]},"knots":[0.0,1.0,1.0,1.0]}"#;
        assert!(serde_json::from_str::<BSplineCurve>(bad).is_err());
    }
}
