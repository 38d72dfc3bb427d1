use tracing::{debug, instrument};

use super::BSplineCurve;
use crate::basis::{binomial, BasisWorkspace};
use crate::error::{scratch, KernelError, Result};
use crate::geometry::points::Points;

/// Position and derivatives of a curve at a batch of parameters, laid out
/// as `[order][sample][coordinate]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveDerivatives {
    order: usize,
    samples: usize,
    dim: usize,
    data: Vec<f64>,
}

impl CurveDerivatives {
    /// Highest derivative order held (0 is the position).
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The `k`-th derivative at sample `s`.
    pub fn get(&self, k: usize, s: usize) -> &[f64] {
        let start = (k * self.samples + s) * self.dim;
        &self.data[start..start + self.dim]
    }

    /// All samples of the `k`-th derivative.
    pub fn order_points(&self, k: usize) -> Points {
        let len = self.samples * self.dim;
        Points::from_raw(self.dim, self.data[k * len..(k + 1) * len].to_vec())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    fn get_mut(&mut self, k: usize, s: usize) -> &mut [f64] {
        let start = (k * self.samples + s) * self.dim;
        &mut self.data[start..start + self.dim]
    }
}

impl BSplineCurve {
    /// Curve points at each parameter, in raw (possibly homogeneous)
    /// coordinates.
    #[instrument(skip_all, fields(degree = self.degree(), samples = params.len()))]
    pub fn points_at(&self, params: &[f64]) -> Result<Points> {
        self.check_params(params)?;
        let p = self.degree();
        let dim = self.dim();
        let knots = self.knots().as_slice();
        let mut ws = BasisWorkspace::new(p, 0)?;
        let mut basis = scratch(p + 1)?;
        let mut out = scratch(params.len() * dim)?;

        for (c, &u) in out.chunks_exact_mut(dim).zip(params) {
            let span = self.span(u)?;
            ws.funs(knots, u, span, &mut basis);
            for (j, &nj) in basis.iter().enumerate() {
                let row = self.points().row(span - p + j);
                for (ci, pi) in c.iter_mut().zip(row) {
                    *ci += nj * pi;
                }
            }
        }
        debug!(points = params.len(), "evaluated curve points");
        Ok(Points::from_raw(dim, out))
    }

    /// Single-parameter form of [`BSplineCurve::points_at`].
    pub fn point_at(&self, u: f64) -> Result<Vec<f64>> {
        Ok(self.points_at(&[u])?.into_vec())
    }

    /// Curve points divided through by their last coordinate.
    pub fn points_at_normalized(&self, params: &[f64]) -> Result<Points> {
        self.points_at(params)?.to_cartesian()
    }

    /// Position and derivatives up to order `n` at each parameter. Orders
    /// above the degree are zero.
    #[instrument(skip_all, fields(degree = self.degree(), order = n, samples = params.len()))]
    pub fn derivs_at(&self, n: usize, params: &[f64]) -> Result<CurveDerivatives> {
        self.check_params(params)?;
        let p = self.degree();
        let dim = self.dim();
        let du = n.min(p);
        let knots = self.knots().as_slice();
        let mut ws = BasisWorkspace::new(p, du)?;
        let mut nders = scratch((du + 1) * (p + 1))?;
        let mut out = CurveDerivatives {
            order: n,
            samples: params.len(),
            dim,
            data: scratch((n + 1) * params.len() * dim)?,
        };

        for (s, &u) in params.iter().enumerate() {
            let span = self.span(u)?;
            ws.derivs(knots, u, span, du, &mut nders);
            for k in 0..=du {
                let weights = &nders[k * (p + 1)..(k + 1) * (p + 1)];
                let c = out.get_mut(k, s);
                for (j, &w) in weights.iter().enumerate() {
                    let row = self.points().row(span - p + j);
                    for (ci, pi) in c.iter_mut().zip(row) {
                        *ci += w * pi;
                    }
                }
            }
        }
        debug!(computed = du, zero_filled = n - du, "evaluated curve derivatives");
        Ok(out)
    }

    /// Cartesian derivatives of a rational curve whose control points are
    /// homogeneous, the weight being the last coordinate.
    #[instrument(skip_all, fields(degree = self.degree(), order = n, samples = params.len()))]
    pub fn rational_derivs_at(&self, n: usize, params: &[f64]) -> Result<CurveDerivatives> {
        if self.dim() < 2 {
            return Err(KernelError::InvalidDimension(self.dim()));
        }
        let homogeneous = self.derivs_at(n, params)?;
        let dim = self.dim() - 1;
        let mut out = CurveDerivatives {
            order: n,
            samples: params.len(),
            dim,
            data: scratch((n + 1) * params.len() * dim)?,
        };
        let mut v = scratch(dim)?;

        for s in 0..params.len() {
            let w0 = homogeneous.get(0, s)[dim];
            if w0 == 0.0 {
                return Err(KernelError::ZeroWeight { index: s });
            }
            for k in 0..=n {
                v.copy_from_slice(&homogeneous.get(k, s)[..dim]);
                for i in 1..=k {
                    let coeff = binomial(k, i) * homogeneous.get(i, s)[dim];
                    for (vj, cj) in v.iter_mut().zip(out.get(k - i, s)) {
                        *vj -= coeff * cj;
                    }
                }
                for (oj, vj) in out.get_mut(k, s).iter_mut().zip(&v) {
                    *oj = vj / w0;
                }
            }
        }
        Ok(out)
    }
}
