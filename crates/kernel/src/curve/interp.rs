//! Global interpolation support: parameter selection and the collocation
//! matrix. Solving `A * P = Q` is left to the caller.

use nalgebra::DMatrix;
use tracing::{debug, instrument};

use crate::basis::{find_span, BasisWorkspace};
use crate::error::{scratch, KernelError, Result};
use crate::geometry::knots::KnotVector;
use crate::geometry::points::Points;

/// Parameters on `[0, 1]` for interpolating `q`, spaced by chord length
/// raised to `exponent` (0 uniform, 0.5 centripetal, 1 chord length).
pub fn interpolation_params(q: &Points, exponent: f64) -> Result<Vec<f64>> {
    if q.is_empty() {
        return Err(KernelError::EmptyControlPoints);
    }
    let mut params = scratch(q.len())?;
    for k in 1..q.len() {
        let d = q.distance(k - 1, k);
        if d == 0.0 {
            return Err(KernelError::CoincidentPoints { index: k - 1 });
        }
        params[k] = params[k - 1] + d.powf(exponent);
    }
    if let Some(&total) = params.last() {
        if total > 0.0 {
            params.iter_mut().for_each(|u| *u /= total);
        }
    }
    if let Some(last) = params.last_mut().filter(|_| q.len() > 1) {
        *last = 1.0;
    }
    Ok(params)
}

/// Averaged knot vector and `nc x nc` collocation matrix for interpolating
/// `q` with a curve of `degree` at `params`.
///
/// Interior knots are the running average of `degree` consecutive
/// parameters; row `i` of the matrix holds the nonzero basis functions at
/// `params[i]` in columns `span - degree ..= span`.
#[instrument(skip_all, fields(degree = degree, points = q.len()))]
pub fn global_interp_mat(
    degree: usize,
    q: &Points,
    params: &[f64],
) -> Result<(KnotVector, DMatrix<f64>)> {
    let nc = q.len();
    if nc == 0 {
        return Err(KernelError::EmptyControlPoints);
    }
    if degree == 0 {
        return Err(KernelError::InvalidDegree {
            required: 1,
            actual: 0,
        });
    }
    if nc <= degree {
        return Err(KernelError::TooFewPoints { points: nc, degree });
    }
    if params.len() != nc {
        return Err(KernelError::ParameterCountMismatch {
            params: params.len(),
            points: nc,
        });
    }
    if let Some(index) = params.windows(2).position(|w| w[0] > w[1]) {
        return Err(KernelError::UnsortedParameters {
            index: index + 1,
            previous: params[index],
            next: params[index + 1],
        });
    }

    let m = nc + degree;
    let mut u = scratch(m + 1)?;
    u[m - degree..].fill(1.0);
    for j in 1..nc - degree {
        u[j + degree] = params[j..j + degree].iter().sum::<f64>() / degree as f64;
    }
    let knots = KnotVector::new(u)?;
    knots.validate_clamped(degree)?;

    let mut a = DMatrix::<f64>::zeros(nc, nc);
    let mut ws = BasisWorkspace::new(degree, 0)?;
    let mut basis = scratch(degree + 1)?;
    for (i, &ui) in params.iter().enumerate() {
        let span = find_span(knots.as_slice(), ui, degree, nc - 1)?;
        ws.funs(knots.as_slice(), ui, span, &mut basis);
        for (j, &nj) in basis.iter().enumerate() {
            a[(i, span - degree + j)] = nj;
        }
    }
    debug!(knots = knots.len(), "built collocation matrix");
    Ok((knots, a))
}
