//! Operations on a single Bezier control polygon on `[0, 1]`.

use crate::basis::all_bernstein;
use crate::error::{scratch, KernelError, Result};
use crate::geometry::points::Points;

fn check(points: &Points, u: f64) -> Result<()> {
    if points.is_empty() {
        return Err(KernelError::EmptyControlPoints);
    }
    if !(0.0..=1.0).contains(&u) {
        return Err(KernelError::ParameterOutOfDomain {
            value: u,
            start: 0.0,
            end: 1.0,
        });
    }
    Ok(())
}

/// Every polygon of the de Casteljau triangle at `u`, from the input
/// polygon down to the single curve point.
pub fn de_casteljau(points: &Points, u: f64) -> Result<Vec<Points>> {
    check(points, u)?;
    let mut levels = Vec::with_capacity(points.len());
    levels.push(points.clone());
    for level in 1..points.len() {
        let prev = &levels[level - 1];
        let mut next = Points::from_raw(points.dim(), scratch((prev.len() - 1) * points.dim())?);
        for i in 0..next.len() {
            let pairs = prev.row(i).iter().zip(prev.row(i + 1));
            for (c, (a, b)) in next.row_mut(i).iter_mut().zip(pairs) {
                *c = (1.0 - u) * a + u * b;
            }
        }
        levels.push(next);
    }
    Ok(levels)
}

/// Split the segment at `u` into the polygons of `[0, u]` and `[u, 1]`.
pub fn split_bezier(points: &Points, u: f64) -> Result<(Points, Points)> {
    let levels = de_casteljau(points, u)?;
    let n = levels.len();
    let dim = points.dim();
    let mut left = Vec::with_capacity(n * dim);
    let mut right = Vec::with_capacity(n * dim);
    for level in &levels {
        left.extend_from_slice(level.row(0));
    }
    for level in levels.iter().rev() {
        right.extend_from_slice(level.row(level.len() - 1));
    }
    Ok((Points::from_raw(dim, left), Points::from_raw(dim, right)))
}

/// Points of the segment at each parameter, summed in Bernstein form.
pub fn bezier_points(points: &Points, params: &[f64]) -> Result<Points> {
    let dim = points.dim();
    let n = points.len().saturating_sub(1);
    let mut out = scratch(params.len() * dim)?;
    for (c, &u) in out.chunks_exact_mut(dim).zip(params) {
        check(points, u)?;
        for (b, row) in all_bernstein(n, u).into_iter().zip(points.rows()) {
            for (ci, pi) in c.iter_mut().zip(row) {
                *ci += b * pi;
            }
        }
    }
    Ok(Points::from_raw(dim, out))
}
