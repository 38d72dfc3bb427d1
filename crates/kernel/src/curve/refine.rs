use tracing::{debug, instrument};

use super::BSplineCurve;
use crate::error::{scratch, KernelError, Result};
use crate::geometry::knots::KnotVector;
use crate::geometry::points::Points;

/// A curve split into Bezier segments of `degree + 1` control points each,
/// consecutive segments sharing their boundary point.
#[derive(Debug, Clone, PartialEq)]
pub struct BezierSegments {
    degree: usize,
    points: Points,
    breakpoints: Vec<f64>,
}

impl BezierSegments {
    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All control points, `len() * degree + 1` rows.
    pub fn points(&self) -> &Points {
        &self.points
    }

    /// Parameter values bounding the segments, `len() + 1` of them.
    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    /// Control points of segment `i`.
    pub fn segment(&self, i: usize) -> Points {
        self.points.slice(i * self.degree, (i + 1) * self.degree + 1)
    }

    /// Segment `i` as a Bezier curve on `[0, 1]`.
    pub fn segment_curve(&self, i: usize) -> Result<BSplineCurve> {
        BSplineCurve::bezier(self.segment(i))
    }

    /// Parameter interval of segment `i` in the original curve.
    pub fn interval(&self, i: usize) -> (f64, f64) {
        (self.breakpoints[i], self.breakpoints[i + 1])
    }

    /// The equivalent B-spline with every interior knot of multiplicity
    /// `degree`.
    pub fn to_curve(&self) -> BSplineCurve {
        let p = self.degree;
        let last = self.breakpoints.len() - 1;
        let mut knots = Vec::with_capacity(self.points.len() + p + 1);
        for (i, &b) in self.breakpoints.iter().enumerate() {
            let mult = if i == 0 || i == last { p + 1 } else { p };
            knots.extend(std::iter::repeat_n(b, mult));
        }
        BSplineCurve::from_parts(self.points.clone(), KnotVector::from_raw(knots), p)
    }
}

impl BSplineCurve {
    /// Insert the sorted knot values `x`, returning a curve with `x.len()`
    /// more control points and the same shape.
    #[instrument(skip_all, fields(degree = self.degree(), inserted = x.len()))]
    pub fn refine(&self, x: &[f64]) -> Result<BSplineCurve> {
        if x.is_empty() {
            return Ok(self.clone());
        }
        self.check_refinement(x)?;

        let p = self.degree();
        let n = self.num_control_points() - 1;
        let m = n + p + 1;
        let r = x.len() - 1;
        let u = self.knots().as_slice();
        let pw = self.points();
        let dim = self.dim();

        let a = self.span(x[0])?;
        let b = self.span(x[r])? + 1;
        let mut q = Points::from_raw(dim, scratch((n + r + 2) * dim)?);
        let mut ubar = scratch(m + r + 2)?;

        for j in 0..=a - p {
            q.row_mut(j).copy_from_slice(pw.row(j));
        }
        for j in b - 1..=n {
            q.row_mut(j + r + 1).copy_from_slice(pw.row(j));
        }
        ubar[..=a].copy_from_slice(&u[..=a]);
        ubar[b + p + r + 1..].copy_from_slice(&u[b + p..]);

        let mut i = b + p - 1;
        let mut k = b + p + r;
        for &xj in x.iter().rev() {
            while xj <= u[i] && i > a {
                q.row_mut(k - p - 1).copy_from_slice(pw.row(i - p - 1));
                ubar[k] = u[i];
                k -= 1;
                i -= 1;
            }
            q.copy_row(k - p - 1, k - p);
            for l in 1..=p {
                let ind = k - p + l;
                let alfa = ubar[k + l] - xj;
                if alfa == 0.0 {
                    q.copy_row(ind - 1, ind);
                } else {
                    let alfa = alfa / (ubar[k + l] - u[i + l - p]);
                    q.lerp_rows(ind - 1, alfa, ind - 1, ind);
                }
            }
            ubar[k] = xj;
            k -= 1;
        }

        debug!(control_points = q.len(), knots = ubar.len(), "refined knot vector");
        Ok(BSplineCurve::from_parts(q, KnotVector::from_raw(ubar), p))
    }

    /// Split into Bezier segments by raising every interior knot to
    /// multiplicity `degree`.
    #[instrument(skip_all, fields(degree = self.degree()))]
    pub fn decompose(&self) -> Result<BezierSegments> {
        let p = self.degree();
        let interior = self.knots().interior(p);
        let mut x = Vec::new();
        for &(value, mult) in &interior {
            x.extend(std::iter::repeat_n(value, p - mult));
        }
        let refined = self.refine(&x)?;

        let (start, end) = self.domain();
        let mut breakpoints = Vec::with_capacity(interior.len() + 2);
        breakpoints.push(start);
        breakpoints.extend(interior.iter().map(|&(value, _)| value));
        breakpoints.push(end);

        let (points, _) = refined.into_parts();
        debug_assert_eq!(points.len(), (breakpoints.len() - 1) * p + 1);
        debug!(segments = breakpoints.len() - 1, "decomposed into Bezier segments");
        Ok(BezierSegments {
            degree: p,
            points,
            breakpoints,
        })
    }

    fn check_refinement(&self, x: &[f64]) -> Result<()> {
        if let Some(index) = x.windows(2).position(|w| w[0] > w[1]) {
            return Err(KernelError::UnsortedParameters {
                index: index + 1,
                previous: x[index],
                next: x[index + 1],
            });
        }
        let (start, end) = self.domain();
        if let Some(&value) = x.iter().find(|&&v| !(v > start && v < end)) {
            return Err(KernelError::ParameterOutOfDomain { value, start, end });
        }
        let p = self.degree();
        let mut rest = x;
        while let Some(&value) = rest.first() {
            let added = rest.iter().take_while(|&&v| v == value).count();
            let multiplicity = self.knots().multiplicity(value, 0.0) + added;
            if multiplicity > p {
                return Err(KernelError::ExcessiveMultiplicity {
                    value,
                    multiplicity,
                    degree: p,
                });
            }
            rest = &rest[added..];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn cubic() -> BSplineCurve {
        BSplineCurve::from_raw(
            2,
            vec![0.0, 0.0, 1.0, 2.0, 3.0, 2.5, 4.0, 0.0, 5.0, 1.0, 6.0, 3.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.4, 0.7, 1.0, 1.0, 1.0, 1.0],
        )
        .unwrap()
    }

    fn grid() -> Vec<f64> {
        (0..=20).map(|i| i as f64 / 20.0).collect()
    }

    #[test]
    fn test_refine_linear_midpoint() {
        let line =
            BSplineCurve::from_raw(2, vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let refined = line.refine(&[0.5]).unwrap();
        assert_eq!(refined.num_control_points(), 3);
        assert_eq!(refined.knots().as_slice(), &[0.0, 0.0, 0.5, 1.0, 1.0]);
        assert_eq!(refined.points().row(1), &[0.5, 0.5]);
    }

    #[test]
    fn test_refine_preserves_shape() {
        let c = cubic();
        let refined = c.refine(&[0.1, 0.4, 0.4, 0.55, 0.9]).unwrap();
        assert_eq!(refined.num_control_points(), c.num_control_points() + 5);
        assert_eq!(refined.num_knots(), c.num_knots() + 5);
        assert_eq!(refined.knots().multiplicity(0.4, 0.0), 3);
        let before = c.points_at(&grid()).unwrap();
        let after = refined.points_at(&grid()).unwrap();
        assert_relative_eq!(before.max_deviation(&after), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_refine_nonuniform_knots_preserves_shape() {
        let quad = BSplineCurve::from_raw(
            2,
            vec![0.0, 0.0, 1.0, 3.0, 2.0, -1.0, 3.0, 2.0, 4.0, 0.0, 5.0, 2.0],
            vec![0.0, 0.0, 0.0, 0.1, 0.5, 0.6, 1.0, 1.0, 1.0],
        )
        .unwrap();
        let cubic = BSplineCurve::from_raw(
            2,
            vec![
                0.0, 0.0, 1.0, 2.0, 2.0, -1.0, 3.0, 3.0, 4.0, 0.5, 5.0, 2.0, 6.0, 0.0,
            ],
            vec![0.0, 0.0, 0.0, 0.0, 0.1, 0.35, 0.9, 1.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        for (curve, x) in [(&quad, vec![0.5]), (&cubic, vec![0.05, 0.5, 0.95])] {
            let refined = curve.refine(&x).unwrap();
            let before = curve.points_at(&grid()).unwrap();
            let after = refined.points_at(&grid()).unwrap();
            assert_relative_eq!(before.max_deviation(&after), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_refine_empty_is_identity() {
        let c = cubic();
        assert_eq!(c.refine(&[]).unwrap(), c);
    }

    #[test]
    fn test_refine_validation() {
        let c = cubic();
        assert!(matches!(
            c.refine(&[0.5, 0.2]).unwrap_err(),
            KernelError::UnsortedParameters { index: 1, .. }
        ));
        assert!(matches!(
            c.refine(&[0.0]).unwrap_err(),
            KernelError::ParameterOutOfDomain { .. }
        ));
        assert_eq!(
            c.refine(&[0.7, 0.7, 0.7]).unwrap_err(),
            KernelError::ExcessiveMultiplicity {
                value: 0.7,
                multiplicity: 4,
                degree: 3
            }
        );
    }

    #[test]
    fn test_decompose_segments_match_curve() {
        let c = cubic();
        let segs = c.decompose().unwrap();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs.points().len(), 3 * 3 + 1);
        assert_eq!(segs.breakpoints(), &[0.0, 0.4, 0.7, 1.0]);
        for i in 0..segs.len() {
            let (a, b) = segs.interval(i);
            let bez = segs.segment_curve(i).unwrap();
            for t in [0.0, 0.3, 0.8, 1.0] {
                let local = bez.point_at(t).unwrap();
                let global = c.point_at(a + t * (b - a)).unwrap();
                for (x, y) in local.iter().zip(&global) {
                    assert_relative_eq!(x, y, epsilon = 1e-12);
                }
            }
        }
        let back = segs.to_curve();
        assert_eq!(back.knots().multiplicity(0.4, 0.0), 3);
        let dev = back.points_at(&grid()).unwrap().max_deviation(&c.points_at(&grid()).unwrap());
        assert_relative_eq!(dev, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_decompose_bezier_is_single_segment() {
        let knots = vec![0.0, 0.0, 0.0, 2.0, 2.0, 2.0];
        let c = BSplineCurve::from_raw(1, vec![0.0, 3.0, 1.0], knots).unwrap();
        let segs = c.decompose().unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs.segment(0), *c.points());
        assert_eq!(segs.to_curve(), c);
    }
}
