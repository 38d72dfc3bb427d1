//! Tensor-product B-spline surfaces.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::basis::{find_span, BasisWorkspace};
use crate::curve::derive_degree;
use crate::error::{scratch, KernelError, Result};
use crate::geometry::knots::KnotVector;
use crate::geometry::points::Points;

/// A `rows x cols` control grid, stored row-major (row index runs along
/// `u`), with an independent clamped knot vector per direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSurface")]
pub struct BSplineSurface {
    points: Points,
    rows: usize,
    cols: usize,
    knots_u: KnotVector,
    knots_v: KnotVector,
    #[serde(skip_serializing)]
    degree_u: usize,
    #[serde(skip_serializing)]
    degree_v: usize,
}

#[derive(Deserialize)]
struct RawSurface {
    points: Points,
    rows: usize,
    cols: usize,
    knots_u: KnotVector,
    knots_v: KnotVector,
}

impl TryFrom<RawSurface> for BSplineSurface {
    type Error = KernelError;

    fn try_from(raw: RawSurface) -> Result<Self> {
        BSplineSurface::new(raw.points, raw.rows, raw.cols, raw.knots_u, raw.knots_v)
    }
}

/// Mixed partial derivatives `S_{u^k v^l}` at a batch of parameters, laid
/// out as `[k][l][sample][coordinate]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDerivatives {
    order_u: usize,
    order_v: usize,
    samples: usize,
    dim: usize,
    data: Vec<f64>,
}

impl SurfaceDerivatives {
    pub fn order_u(&self) -> usize {
        self.order_u
    }

    pub fn order_v(&self) -> usize {
        self.order_v
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn offset(&self, k: usize, l: usize, s: usize) -> usize {
        ((k * (self.order_v + 1) + l) * self.samples + s) * self.dim
    }

    /// Derivative `k` times in `u` and `l` times in `v` at sample `s`.
    pub fn get(&self, k: usize, l: usize, s: usize) -> &[f64] {
        let start = self.offset(k, l, s);
        &self.data[start..start + self.dim]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

impl BSplineSurface {
    pub fn new(
        points: Points,
        rows: usize,
        cols: usize,
        knots_u: KnotVector,
        knots_v: KnotVector,
    ) -> Result<Self> {
        if points.is_empty() {
            return Err(KernelError::EmptyControlPoints);
        }
        if rows.checked_mul(cols) != Some(points.len()) {
            return Err(KernelError::GridShapeMismatch {
                points: points.len(),
                rows,
                cols,
            });
        }
        let degree_u = derive_degree(knots_u.len(), rows)?;
        let degree_v = derive_degree(knots_v.len(), cols)?;
        knots_u.validate_clamped(degree_u)?;
        knots_v.validate_clamped(degree_v)?;
        Ok(Self {
            points,
            rows,
            cols,
            knots_u,
            knots_v,
            degree_u,
            degree_v,
        })
    }

    pub fn degree_u(&self) -> usize {
        self.degree_u
    }

    pub fn degree_v(&self) -> usize {
        self.degree_v
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dim(&self) -> usize {
        self.points.dim()
    }

    pub fn points(&self) -> &Points {
        &self.points
    }

    pub fn knots_u(&self) -> &KnotVector {
        &self.knots_u
    }

    pub fn knots_v(&self) -> &KnotVector {
        &self.knots_v
    }

    /// Control point at grid position `(i, j)`.
    pub fn control_point(&self, i: usize, j: usize) -> &[f64] {
        self.points.row(i * self.cols + j)
    }

    pub fn domain_u(&self) -> (f64, f64) {
        self.knots_u.domain(self.degree_u)
    }

    pub fn domain_v(&self) -> (f64, f64) {
        self.knots_v.domain(self.degree_v)
    }

    fn check_params(&self, params: &[(f64, f64)]) -> Result<()> {
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        for &(u, v) in params {
            if !(u0..=u1).contains(&u) {
                return Err(KernelError::ParameterOutOfDomain {
                    value: u,
                    start: u0,
                    end: u1,
                });
            }
            if !(v0..=v1).contains(&v) {
                return Err(KernelError::ParameterOutOfDomain {
                    value: v,
                    start: v0,
                    end: v1,
                });
            }
        }
        Ok(())
    }

    fn spans(&self, u: f64, v: f64) -> Result<(usize, usize)> {
        Ok((
            find_span(self.knots_u.as_slice(), u, self.degree_u, self.rows - 1)?,
            find_span(self.knots_v.as_slice(), v, self.degree_v, self.cols - 1)?,
        ))
    }

    /// Surface points at each `(u, v)`, in raw (possibly homogeneous)
    /// coordinates.
    #[instrument(
        skip_all,
        fields(degree_u = self.degree_u, degree_v = self.degree_v, samples = params.len())
    )]
    pub fn points_at(&self, params: &[(f64, f64)]) -> Result<Points> {
        self.check_params(params)?;
        let (p, q) = (self.degree_u, self.degree_v);
        let dim = self.dim();
        let mut ws_u = BasisWorkspace::new(p, 0)?;
        let mut ws_v = BasisWorkspace::new(q, 0)?;
        let mut nu = scratch(p + 1)?;
        let mut nv = scratch(q + 1)?;
        let mut temp = scratch(dim)?;
        let mut out = scratch(params.len() * dim)?;

        for (c, &(u, v)) in out.chunks_exact_mut(dim).zip(params) {
            let (su, sv) = self.spans(u, v)?;
            ws_u.funs(self.knots_u.as_slice(), u, su, &mut nu);
            ws_v.funs(self.knots_v.as_slice(), v, sv, &mut nv);
            for (l, &bv) in nv.iter().enumerate() {
                temp.fill(0.0);
                for (k, &bu) in nu.iter().enumerate() {
                    let row = self.control_point(su - p + k, sv - q + l);
                    for (t, pt) in temp.iter_mut().zip(row) {
                        *t += bu * pt;
                    }
                }
                for (ci, t) in c.iter_mut().zip(&temp) {
                    *ci += bv * t;
                }
            }
        }
        debug!(points = params.len(), "evaluated surface points");
        Ok(Points::from_raw(dim, out))
    }

    /// Surface points divided through by their last coordinate.
    pub fn points_at_normalized(&self, params: &[(f64, f64)]) -> Result<Points> {
        self.points_at(params)?.to_cartesian()
    }

    /// All mixed partials up to `mu` in `u` and `mv` in `v`. Orders above the
    /// degree in either direction are zero.
    #[instrument(skip_all, fields(mu = mu, mv = mv, samples = params.len()))]
    pub fn derivs_at(
        &self,
        mu: usize,
        mv: usize,
        params: &[(f64, f64)],
    ) -> Result<SurfaceDerivatives> {
        self.check_params(params)?;
        let (p, q) = (self.degree_u, self.degree_v);
        let (du, dv) = (mu.min(p), mv.min(q));
        let dim = self.dim();
        let mut ws_u = BasisWorkspace::new(p, du)?;
        let mut ws_v = BasisWorkspace::new(q, dv)?;
        let mut nu = scratch((du + 1) * (p + 1))?;
        let mut nv = scratch((dv + 1) * (q + 1))?;
        let mut temp = scratch((q + 1) * dim)?;
        let mut out = SurfaceDerivatives {
            order_u: mu,
            order_v: mv,
            samples: params.len(),
            dim,
            data: scratch((mu + 1) * (mv + 1) * params.len() * dim)?,
        };

        for (s, &(u, v)) in params.iter().enumerate() {
            let (su, sv) = self.spans(u, v)?;
            ws_u.derivs(self.knots_u.as_slice(), u, su, du, &mut nu);
            ws_v.derivs(self.knots_v.as_slice(), v, sv, dv, &mut nv);
            for k in 0..=du {
                let bu = &nu[k * (p + 1)..(k + 1) * (p + 1)];
                temp.fill(0.0);
                for c in 0..=q {
                    let t = &mut temp[c * dim..(c + 1) * dim];
                    for (r, &w) in bu.iter().enumerate() {
                        let row = self.control_point(su - p + r, sv - q + c);
                        for (ti, pt) in t.iter_mut().zip(row) {
                            *ti += w * pt;
                        }
                    }
                }
                for l in 0..=dv {
                    let bv = &nv[l * (q + 1)..(l + 1) * (q + 1)];
                    let start = out.offset(k, l, s);
                    let skl = &mut out.data[start..start + dim];
                    for (c, &w) in bv.iter().enumerate() {
                        for (si, ti) in skl.iter_mut().zip(&temp[c * dim..(c + 1) * dim]) {
                            *si += w * ti;
                        }
                    }
                }
            }
        }
        debug!(computed_u = du, computed_v = dv, "evaluated surface derivatives");
        Ok(out)
    }
}
