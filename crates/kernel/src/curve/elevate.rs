use tracing::{debug, instrument};

use super::BSplineCurve;
use crate::basis::binomial;
use crate::error::{scratch, Result};
use crate::geometry::knots::KnotVector;
use crate::geometry::points::Points;

/// Coefficients taking a degree `p` Bezier segment to degree `p + t`,
/// row-major `(p + t + 1) x (p + 1)`.
fn elevation_coefficients(p: usize, t: usize) -> Result<Vec<f64>> {
    let ph = p + t;
    let cols = p + 1;
    let mut alfs = scratch((ph + 1) * cols)?;
    alfs[0] = 1.0;
    alfs[ph * cols + p] = 1.0;
    for i in 1..=ph / 2 {
        let inv = 1.0 / binomial(ph, i);
        for j in i.saturating_sub(t)..=p.min(i) {
            alfs[i * cols + j] = inv * binomial(p, j) * binomial(t, i - j);
        }
    }
    for i in ph / 2 + 1..ph {
        for j in i.saturating_sub(t)..=p.min(i) {
            alfs[i * cols + j] = alfs[(ph - i) * cols + p - j];
        }
    }
    Ok(alfs)
}

impl BSplineCurve {
    /// Raise the degree by `t` without changing the shape.
    ///
    /// Every distinct knot value gains multiplicity `t`, so the new control
    /// point count is `nc + t * segments`.
    #[instrument(skip(self), fields(degree = self.degree(), points = self.num_control_points()))]
    pub fn elevate_degree(&self, t: usize) -> Result<BSplineCurve> {
        if t == 0 {
            return Ok(self.clone());
        }
        let p = self.degree();
        let n = self.num_control_points() - 1;
        let m = n + p + 1;
        let ph = p + t;
        let d = self.dim();
        let u = self.knots().as_slice();
        let pw = self.points();

        let segments = self.num_bezier_segments();
        let nq = self.num_control_points() + t * segments;
        let bezalfs = elevation_coefficients(p, t)?;
        let mut qw = Points::from_raw(d, scratch(nq * d)?);
        let mut uh = scratch(nq + ph + 1)?;
        let mut bpts = Points::from_raw(d, scratch((p + 1) * d)?);
        let mut ebpts = Points::from_raw(d, scratch((ph + 1) * d)?);
        let mut next_bpts = Points::from_raw(d, scratch(p.max(1) * d)?);
        let mut alfs = scratch(p.max(1))?;

        let mut mh = ph;
        let mut kind = ph + 1;
        let mut r: isize = -1;
        let mut a = p;
        let mut b = p + 1;
        let mut cind = 1;
        let mut ua = u[0];
        qw.row_mut(0).copy_from_slice(pw.row(0));
        uh[..=ph].fill(ua);
        for i in 0..=p {
            bpts.row_mut(i).copy_from_slice(pw.row(i));
        }

        while b < m {
            let i = b;
            while b < m && u[b] == u[b + 1] {
                b += 1;
            }
            let mul = b - i + 1;
            mh += mul + t;
            let ub = u[b];
            let oldr = r;
            r = p as isize - mul as isize;
            let lbz = if oldr > 0 { ((oldr + 2) / 2) as usize } else { 1 };
            let rbz = if r > 0 { ph - ((r + 1) / 2) as usize } else { ph };

            // Insert ub until it reaches multiplicity p.
            if r > 0 {
                let numer = ub - ua;
                for k in (mul + 1..=p).rev() {
                    alfs[k - mul - 1] = numer / (u[a + k] - ua);
                }
                for j in 1..=r as usize {
                    let s = mul + j;
                    for k in (s..=p).rev() {
                        bpts.lerp_rows(k, alfs[k - s], k, k - 1);
                    }
                    next_bpts.row_mut(r as usize - j).copy_from_slice(bpts.row(p));
                }
            }

            for i in lbz..=ph {
                let row = ebpts.row_mut(i);
                row.fill(0.0);
                for j in i.saturating_sub(t)..=p.min(i) {
                    let alpha = bezalfs[i * (p + 1) + j];
                    for (e, src) in row.iter_mut().zip(bpts.row(j)) {
                        *e += alpha * src;
                    }
                }
            }

            // Remove the knot ua introduced by the previous segment.
            if oldr > 1 {
                let mut first = kind as isize - 2;
                let mut last = kind as isize;
                let den = ub - ua;
                let bet = (ub - uh[kind - 1]) / den;
                for tr in 1..oldr {
                    let (mut i, mut j) = (first, last);
                    let mut kj = j - kind as isize + 1;
                    while j - i > tr {
                        if i < cind as isize {
                            let iu = i as usize;
                            let alf = (ub - uh[iu]) / (ua - uh[iu]);
                            qw.lerp_rows(iu, alf, iu, iu - 1);
                        }
                        if j >= lbz as isize {
                            let k = kj as usize;
                            let gam = if j - tr <= kind as isize - ph as isize + oldr {
                                (ub - uh[(j - tr) as usize]) / den
                            } else {
                                bet
                            };
                            ebpts.lerp_rows(k, gam, k, k + 1);
                        }
                        i += 1;
                        j -= 1;
                        kj -= 1;
                    }
                    first -= 1;
                    last += 1;
                }
            }

            if a != p {
                let count = (ph as isize - oldr) as usize;
                uh[kind..kind + count].fill(ua);
                kind += count;
            }
            for j in lbz..=rbz {
                qw.row_mut(cind).copy_from_slice(ebpts.row(j));
                cind += 1;
            }

            if b < m {
                let carried = r.max(0) as usize;
                for j in 0..carried {
                    bpts.row_mut(j).copy_from_slice(next_bpts.row(j));
                }
                for j in carried..=p {
                    bpts.row_mut(j).copy_from_slice(pw.row(b - p + j));
                }
                a = b;
                b += 1;
                ua = ub;
            } else {
                uh[kind..=kind + ph].fill(ub);
            }
        }

        let new_points = mh - ph;
        debug_assert_eq!(new_points, nq);
        let mut coords = qw.into_vec();
        coords.truncate(new_points * d);
        uh.truncate(mh + 1);
        debug!(control_points = new_points, knots = mh + 1, degree = ph, "elevated degree");
        Ok(BSplineCurve::from_parts(
            Points::from_raw(d, coords),
            KnotVector::from_raw(uh),
            ph,
        ))
    }
}
