//! Degree reduction by one, segment by segment.
//!
//! Reduction is approximate. Every result carries an upper bound on the
//! distance between the reduced and the original curve so the caller can
//! accept or reject it.

use tracing::{debug, info, instrument};

use super::BSplineCurve;
use crate::basis::bernstein;
use crate::config::Tolerance;
use crate::error::{scratch, KernelError, Result};
use crate::geometry::knots::KnotVector;
use crate::geometry::points::{distance, Points};

/// A Bezier segment lowered by one degree.
#[derive(Debug, Clone, PartialEq)]
pub struct BezierReduction {
    pub points: Points,
    /// Bound on the maximum deviation from the input segment.
    pub error: f64,
}

/// A whole curve lowered by one degree.
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeReduction {
    pub curve: BSplineCurve,
    /// Error bound per Bezier segment of the input curve.
    pub segment_errors: Vec<f64>,
    pub max_error: f64,
}

impl DegreeReduction {
    pub fn is_acceptable(&self, tol: &Tolerance) -> bool {
        self.max_error <= tol.reduction
    }
}

/// Reduce the Bezier segment `q` of degree `p = q.len() - 1 >= 2` to degree
/// `p - 1`, using the two-sided recurrence from both ends toward the middle.
pub fn bezier_degree_reduce(q: &Points) -> Result<BezierReduction> {
    if q.is_empty() {
        return Err(KernelError::EmptyControlPoints);
    }
    let p = q.len() - 1;
    if p < 2 {
        return Err(KernelError::InvalidDegree {
            required: 2,
            actual: p,
        });
    }
    let d = q.dim();
    let r = (p - 1) / 2;
    let alpha = |i: usize| i as f64 / p as f64;
    let mut out = Points::from_raw(d, scratch(p * d)?);
    out.row_mut(0).copy_from_slice(q.row(0));
    out.row_mut(p - 1).copy_from_slice(q.row(p));

    let left_end = if p % 2 == 0 { r } else { r - 1 };
    for i in 1..=left_end {
        let a = alpha(i);
        for c in 0..d {
            let prev = out.row(i - 1)[c];
            out.row_mut(i)[c] = (q.row(i)[c] - a * prev) / (1.0 - a);
        }
    }
    for i in (r + 1..=p - 2).rev() {
        let a = alpha(i + 1);
        for c in 0..d {
            let next = out.row(i + 1)[c];
            out.row_mut(i)[c] = (q.row(i + 1)[c] - (1.0 - a) * next) / a;
        }
    }

    let error = if p % 2 == 0 {
        let mut mid = scratch(d)?;
        for (c, m) in mid.iter_mut().enumerate() {
            *m = 0.5 * (out.row(r)[c] + out.row(r + 1)[c]);
        }
        let gap = distance(q.row(r + 1), &mid);
        gap * bernstein(r + 1, p, 0.5)
    } else {
        let (ar, ar1) = (alpha(r), alpha(r + 1));
        let mut from_left = scratch(d)?;
        let mut from_right = scratch(d)?;
        for c in 0..d {
            from_left[c] = (q.row(r)[c] - ar * out.row(r - 1)[c]) / (1.0 - ar);
            from_right[c] = (q.row(r + 1)[c] - (1.0 - ar1) * out.row(r + 1)[c]) / ar1;
        }
        for (c, o) in out.row_mut(r).iter_mut().enumerate() {
            *o = 0.5 * (from_left[c] + from_right[c]);
        }
        // |B(r) - B(r+1)| peaks at u = (1 - 1/sqrt(p)) / 2.
        let peak = 0.5 * (1.0 - 1.0 / (p as f64).sqrt());
        let spread = (bernstein(r, p, peak) - bernstein(r + 1, p, peak)).abs();
        0.5 * (1.0 - ar) * distance(&from_left, &from_right) * spread
    };
    Ok(BezierReduction { points: out, error })
}

impl BSplineCurve {
    /// Lower the degree by one. Interior knot multiplicities drop by one, so
    /// simple knots disappear.
    #[instrument(skip_all, fields(degree = self.degree(), points = self.num_control_points()))]
    pub fn reduce_degree(&self) -> Result<DegreeReduction> {
        let p = self.degree();
        if p < 2 {
            return Err(KernelError::InvalidDegree {
                required: 2,
                actual: p,
            });
        }
        let segments = self.decompose()?;
        let nb = segments.len();
        let d = self.dim();
        let ph = p - 1;

        let mut coords = Vec::new();
        coords
            .try_reserve_exact((nb * ph + 1) * d)
            .map_err(|_| KernelError::ResourceExhausted {
                requested: (nb * ph + 1) * d,
            })?;
        let mut segment_errors = scratch(nb)?;
        for (i, err) in segment_errors.iter_mut().enumerate() {
            let reduced = bezier_degree_reduce(&segments.segment(i))?;
            *err = reduced.error;
            let skip = if i == 0 { 0 } else { d };
            coords.extend_from_slice(&reduced.points.as_slice()[skip..]);
        }

        let breakpoints = segments.breakpoints();
        let mut knots = Vec::with_capacity(coords.len() / d + ph + 1);
        for (i, &b) in breakpoints.iter().enumerate() {
            let mult = if i == 0 || i == nb { ph + 1 } else { ph };
            knots.extend(std::iter::repeat_n(b, mult));
        }
        let mut curve =
            BSplineCurve::from_parts(Points::from_raw(d, coords), KnotVector::from_raw(knots), ph);

        // Bring each breakpoint back to its original multiplicity minus one.
        for (seg, (value, mult)) in self.knots().interior(p).into_iter().enumerate() {
            let excess = p - mult;
            if excess == 0 {
                continue;
            }
            let r = curve
                .knots()
                .last_index_of(value, 0.0)
                .ok_or(KernelError::KnotNotFound(value))?;
            let s = curve.knots().multiplicity(value, 0.0);
            let step = curve.remove_checked(value, excess, r, s, f64::INFINITY)?;
            segment_errors[seg] += step.deviation;
            segment_errors[seg + 1] += step.deviation;
            curve = step.curve;
        }

        let max_error = segment_errors.iter().copied().fold(0.0, f64::max);
        info!(
            control_points = curve.num_control_points(),
            max_error, "reduced degree"
        );
        debug!(?segment_errors, "per-segment reduction error");
        Ok(DegreeReduction {
            curve,
            segment_errors,
            max_error,
        })
    }
}
