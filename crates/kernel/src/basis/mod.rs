//! B-spline basis functions: span search, Cox-de Boor recurrence and
//! derivatives, plus the knot-free Bernstein and binomial helpers.

pub mod bernstein;
pub mod binomial;

pub use bernstein::{all_bernstein, bernstein, horner};
pub use binomial::{binomial, BinomialCache};

use crate::error::{scratch, KernelError, Result};

/// Find the knot span index `i` with `U[i] <= u < U[i+1]`.
///
/// `n` is the index of the last control point, so the valid range is
/// `U[degree] <= u <= U[n+1]`; at `u == U[n+1]` the span `n` is returned so
/// that the right end of the domain is closed.
///
/// The bisection keeps `U[low] <= u < U[high]` with `low <= mid < high` and
/// shrinks `high - low` on every step, so it ends after at most
/// `log2(n - degree + 1)` iterations. Every probed bracket is checked for
/// ordering; an unsorted knot vector fails instead of yielding a guess.
pub fn find_span(knots: &[f64], u: f64, degree: usize, n: usize) -> Result<usize> {
    if degree > n || n + degree + 2 != knots.len() {
        return Err(KernelError::KnotCountMismatch {
            knots: knots.len(),
            points: n + 1,
            implied_degree: knots.len() as isize - n as isize - 2,
        });
    }
    let (start, end) = (knots[degree], knots[n + 1]);
    if !(start..=end).contains(&u) {
        return Err(KernelError::ParameterOutOfDomain { value: u, start, end });
    }
    if u == end {
        return Ok(n);
    }

    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if let Some((i, j)) = [(low, mid), (mid, mid + 1), (mid + 1, high)]
            .into_iter()
            .find(|&(i, j)| knots[i] > knots[j])
        {
            return Err(KernelError::NonMonotonicKnots {
                index: i,
                previous: knots[i],
                next: knots[j],
            });
        }
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    Ok(mid)
}

/// The `degree + 1` nonzero basis functions `N[span-p..=span]` at `u`.
pub fn basis_funs(knots: &[f64], u: f64, degree: usize, span: usize) -> Result<Vec<f64>> {
    check_span(knots, u, degree, span)?;
    let mut ws = BasisWorkspace::new(degree, 0)?;
    let mut out = scratch(degree + 1)?;
    ws.funs(knots, u, span, &mut out);
    Ok(out)
}

/// Basis functions and their derivatives up to order `n`: row `k` holds the
/// `k`-th derivatives of the `degree + 1` nonzero functions. Rows above the
/// degree are zero.
pub fn basis_derivs(
    knots: &[f64],
    u: f64,
    degree: usize,
    span: usize,
    n: usize,
) -> Result<Vec<Vec<f64>>> {
    check_span(knots, u, degree, span)?;
    let order = n.min(degree);
    let mut ws = BasisWorkspace::new(degree, order)?;
    let mut flat = scratch((order + 1) * (degree + 1))?;
    ws.derivs(knots, u, span, order, &mut flat);
    let mut rows: Vec<Vec<f64>> = flat.chunks_exact(degree + 1).map(<[f64]>::to_vec).collect();
    rows.resize(n + 1, vec![0.0; degree + 1]);
    Ok(rows)
}

/// A caller-supplied span must leave `degree` knots on either side and
/// bracket `u` with a nonempty interval.
fn check_span(knots: &[f64], u: f64, degree: usize, span: usize) -> Result<()> {
    if span < degree || span + degree >= knots.len() {
        return Err(KernelError::KnotCountMismatch {
            knots: knots.len(),
            points: knots.len().saturating_sub(degree + 1),
            implied_degree: degree as isize,
        });
    }
    let (start, end) = (knots[span], knots[span + 1]);
    if start >= end {
        return Err(KernelError::DegenerateDomain { start, end });
    }
    if !(start <= u && u <= end) {
        return Err(KernelError::ParameterOutOfDomain { value: u, start, end });
    }
    Ok(())
}

/// Scratch tables for repeated basis evaluation at one degree.
///
/// Created once per kernel call and reused for every sample.
pub(crate) struct BasisWorkspace {
    degree: usize,
    left: Vec<f64>,
    right: Vec<f64>,
    /// `(p+1) x (p+1)`: basis values above the diagonal, knot differences
    /// below it.
    ndu: Vec<f64>,
    /// Two alternating rows of derivative coefficients.
    a: Vec<f64>,
}

impl BasisWorkspace {
    pub(crate) fn new(degree: usize, max_order: usize) -> Result<Self> {
        let p1 = degree + 1;
        let with_derivs = max_order > 0;
        Ok(Self {
            degree,
            left: scratch(p1)?,
            right: scratch(p1)?,
            ndu: if with_derivs { scratch(p1 * p1)? } else { Vec::new() },
            a: if with_derivs { scratch(2 * p1)? } else { Vec::new() },
        })
    }

    /// Cox-de Boor triangle, writing `p + 1` values into `out`.
    pub(crate) fn funs(&mut self, knots: &[f64], u: f64, span: usize, out: &mut [f64]) {
        let p = self.degree;
        out[0] = 1.0;
        for j in 1..=p {
            self.left[j] = u - knots[span + 1 - j];
            self.right[j] = knots[span + j] - u;
            let mut saved = 0.0;
            for r in 0..j {
                let temp = out[r] / (self.right[r + 1] + self.left[j - r]);
                out[r] = saved + self.right[r + 1] * temp;
                saved = self.left[j - r] * temp;
            }
            out[j] = saved;
        }
    }

    /// Basis values and derivatives up to `n <= degree`, written row-major
    /// into `out` as `(n + 1) x (degree + 1)`.
    pub(crate) fn derivs(&mut self, knots: &[f64], u: f64, span: usize, n: usize, out: &mut [f64]) {
        let p = self.degree;
        let p1 = p + 1;
        debug_assert!(n == 0 || (n <= p && self.ndu.len() == p1 * p1));
        if n == 0 {
            self.funs(knots, u, span, &mut out[..p1]);
            return;
        }
        let ndu = &mut self.ndu;
        let at = |i: usize, j: usize| i * p1 + j;

        ndu[0] = 1.0;
        for j in 1..=p {
            self.left[j] = u - knots[span + 1 - j];
            self.right[j] = knots[span + j] - u;
            let mut saved = 0.0;
            for r in 0..j {
                ndu[at(j, r)] = self.right[r + 1] + self.left[j - r];
                let temp = ndu[at(r, j - 1)] / ndu[at(j, r)];
                ndu[at(r, j)] = saved + self.right[r + 1] * temp;
                saved = self.left[j - r] * temp;
            }
            ndu[at(j, j)] = saved;
        }
        for j in 0..=p {
            out[j] = ndu[at(j, p)];
        }

        let a = &mut self.a;
        let pi = p as isize;
        for r in 0..=pi {
            let (mut s1, mut s2) = (0usize, p1);
            a[0] = 1.0;
            for k in 1..=n as isize {
                let mut der = 0.0;
                let rk = r - k;
                let pk = (pi - k) as usize;
                if r >= k {
                    a[s2] = a[s1] / ndu[at(pk + 1, rk as usize)];
                    der = a[s2] * ndu[at(rk as usize, pk)];
                }
                let j1 = if rk >= -1 { 1 } else { -rk };
                let j2 = if r - 1 <= pk as isize { k - 1 } else { pi - r };
                for j in j1..=j2 {
                    let (ju, rkj) = (j as usize, (rk + j) as usize);
                    a[s2 + ju] = (a[s1 + ju] - a[s1 + ju - 1]) / ndu[at(pk + 1, rkj)];
                    der += a[s2 + ju] * ndu[at(rkj, pk)];
                }
                if r <= pk as isize {
                    let (ku, ru) = (k as usize, r as usize);
                    a[s2 + ku] = -a[s1 + ku - 1] / ndu[at(pk + 1, ru)];
                    der += a[s2 + ku] * ndu[at(ru, pk)];
                }
                out[k as usize * p1 + r as usize] = der;
                std::mem::swap(&mut s1, &mut s2);
            }
        }

        let mut factor = p as f64;
        for k in 1..=n {
            for v in &mut out[k * p1..(k + 1) * p1] {
                *v *= factor;
            }
            factor *= (p - k) as f64;
        }
    }
}
