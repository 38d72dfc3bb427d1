use tracing::{debug, info, instrument};

use super::BSplineCurve;
use crate::config::Tolerance;
use crate::error::{scratch, KernelError, Result};
use crate::geometry::knots::KnotVector;
use crate::geometry::points::{distance, Points};

/// Outcome of a knot removal. Removing fewer knots than requested is a
/// normal result: callers branch on `removed`.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotRemoval {
    /// Number of knots actually removed.
    pub removed: usize,
    /// Largest control polygon deviation among the accepted removals.
    pub deviation: f64,
    pub curve: BSplineCurve,
}

impl BSplineCurve {
    /// Try to remove the knot `u` up to `num` times.
    ///
    /// `r` is the index of the last occurrence of `u` in the knot vector and
    /// `s` its multiplicity. Each removal is accepted only while the
    /// recomputed control polygon stays within `tol` of the old one; the
    /// first rejection stops the loop.
    #[instrument(skip(self), fields(degree = self.degree()))]
    pub fn remove_knot(
        &self,
        u: f64,
        num: usize,
        r: usize,
        s: usize,
        tol: f64,
    ) -> Result<KnotRemoval> {
        self.check_removal(u, r, s)?;
        let outcome = self.remove_checked(u, num.min(s), r, s, tol)?;
        info!(requested = num, removed = outcome.removed, "knot removal finished");
        Ok(outcome)
    }

    /// Remove the knot matching `u` within `tol.knot`, `count` times or as
    /// many times as it occurs when `count` is `None`.
    pub fn remove_knot_value(
        &self,
        u: f64,
        count: Option<usize>,
        tol: &Tolerance,
    ) -> Result<KnotRemoval> {
        let r = self
            .knots()
            .last_index_of(u, tol.knot)
            .ok_or(KernelError::KnotNotFound(u))?;
        let value = self.knots()[r];
        let s = self.knots().multiplicity(value, 0.0);
        self.remove_knot(value, count.unwrap_or(s), r, s, tol.removal)
    }

    /// Remove every interior knot occurrence that can go within
    /// `tol.removal`, repeating until a full pass removes nothing.
    #[instrument(skip_all, fields(degree = self.degree(), knots = self.num_knots()))]
    pub fn remove_all_knots(&self, tol: &Tolerance) -> Result<KnotRemoval> {
        let mut total = KnotRemoval {
            removed: 0,
            deviation: 0.0,
            curve: self.clone(),
        };
        loop {
            let before = total.removed;
            for (value, _) in total.curve.knots().interior(self.degree()) {
                let knots = total.curve.knots();
                let s = knots.multiplicity(value, 0.0);
                let Some(r) = knots.last_index_of(value, 0.0) else {
                    continue;
                };
                let step = total.curve.remove_checked(value, s, r, s, tol.removal)?;
                if step.removed > 0 {
                    total.removed += step.removed;
                    total.deviation = total.deviation.max(step.deviation);
                    total.curve = step.curve;
                }
            }
            if total.removed == before {
                break;
            }
        }
        info!(removed = total.removed, "removed all removable knots");
        Ok(total)
    }

    fn check_removal(&self, u: f64, r: usize, s: usize) -> Result<()> {
        let (start, end) = self.domain();
        if u <= start || u >= end {
            return Err(KernelError::EndKnotRemoval);
        }
        let knots = self.knots().as_slice();
        let mismatch = KernelError::KnotIndexMismatch {
            index: r,
            multiplicity: s,
        };
        if s == 0 || s > r || r + 1 >= knots.len() {
            return Err(mismatch);
        }
        let run_ok = knots[r + 1 - s..=r].iter().all(|&k| k == u)
            && knots[r - s] != u
            && knots[r + 1] != u;
        if run_ok { Ok(()) } else { Err(mismatch) }
    }

    /// Removal loop proper; `r`, `s` and `num <= s` are already validated.
    pub(crate) fn remove_checked(
        &self,
        u: f64,
        num: usize,
        r: usize,
        s: usize,
        tol: f64,
    ) -> Result<KnotRemoval> {
        let p = self.degree();
        let n = self.num_control_points() - 1;
        let m = n + p + 1;
        let ord = p + 1;
        let d = self.dim();
        let knots = self.knots().as_slice();
        let mut pw = self.points().clone();
        let mut temp = scratch((2 * p + 1) * d)?;
        let mut blended = scratch(d)?;

        let fout = (2 * r - s - p) / 2;
        let mut first = r - p;
        let mut last = r - s;
        let mut deviation: f64 = 0.0;
        let mut t = 0;
        while t < num {
            let off = first - 1;
            temp[..d].copy_from_slice(pw.row(off));
            let tail = last + 1 - off;
            temp[tail * d..(tail + 1) * d].copy_from_slice(pw.row(last + 1));

            let (mut i, mut j) = (first as isize, last as isize);
            let (mut ii, mut jj) = (1usize, last - off);
            let ti = t as isize;
            while j - i > ti {
                let (iu, ju) = (i as usize, j as usize);
                let alfi = (u - knots[iu]) / (knots[iu + ord + t] - knots[iu]);
                let alfj = (u - knots[ju - t]) / (knots[ju + ord] - knots[ju - t]);
                for c in 0..d {
                    temp[ii * d + c] =
                        (pw.row(iu)[c] - (1.0 - alfi) * temp[(ii - 1) * d + c]) / alfi;
                    temp[jj * d + c] =
                        (pw.row(ju)[c] - alfj * temp[(jj + 1) * d + c]) / (1.0 - alfj);
                }
                i += 1;
                ii += 1;
                j -= 1;
                jj -= 1;
            }

            let step = if j - i < ti {
                distance(&temp[(ii - 1) * d..ii * d], &temp[(jj + 1) * d..(jj + 2) * d])
            } else {
                let iu = i as usize;
                let alfi = (u - knots[iu]) / (knots[iu + ord + t] - knots[iu]);
                for (c, b) in blended.iter_mut().enumerate() {
                    *b = alfi * temp[(ii + t + 1) * d + c] + (1.0 - alfi) * temp[(ii - 1) * d + c];
                }
                distance(pw.row(iu), &blended)
            };
            if step > tol {
                debug!(attempt = t + 1, deviation = step, tol, "knot removal rejected");
                break;
            }
            deviation = deviation.max(step);

            let (mut i, mut j) = (first, last);
            while j > i && j - i > t {
                pw.row_mut(i).copy_from_slice(&temp[(i - off) * d..(i - off + 1) * d]);
                pw.row_mut(j).copy_from_slice(&temp[(j - off) * d..(j - off + 1) * d]);
                i += 1;
                j -= 1;
            }
            first -= 1;
            last += 1;
            t += 1;
        }

        if t == 0 {
            return Ok(KnotRemoval {
                removed: 0,
                deviation: 0.0,
                curve: self.clone(),
            });
        }

        let mut new_knots = knots.to_vec();
        for k in r + 1..=m {
            new_knots[k - t] = new_knots[k];
        }
        new_knots.truncate(m + 1 - t);

        let mut j = fout;
        let mut i = j;
        for k in 1..t {
            if k % 2 == 1 {
                i += 1;
            } else {
                j -= 1;
            }
        }
        for k in i + 1..=n {
            pw.copy_row(j, k);
            j += 1;
        }
        let mut coords = pw.into_vec();
        coords.truncate((n + 1 - t) * d);

        Ok(KnotRemoval {
            removed: t,
            deviation,
            curve: BSplineCurve::from_parts(
                Points::from_raw(d, coords),
                KnotVector::from_raw(new_knots),
                p,
            ),
        })
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
    fn test_remove_inserted_linear_knot() {
        let line =
            BSplineCurve::from_raw(2, vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let refined = line.refine(&[0.5]).unwrap();
        let out = refined.remove_knot(0.5, 1, 2, 1, 0.0).unwrap();
        assert_eq!(out.removed, 1);
        assert_eq!(out.curve, line);
    }

    #[test]
    fn test_remove_inserted_cubic_knot_twice() {
        let c = cubic();
        let refined = c.refine(&[0.55, 0.55]).unwrap();
        let r = refined.knots().last_index_of(0.55, 0.0).unwrap();
        let out = refined.remove_knot(0.55, 2, r, 2, 1e-9).unwrap();
        assert_eq!(out.removed, 2);
        assert_eq!(out.curve.knots(), c.knots());
        assert_relative_eq!(out.curve.points().max_deviation(c.points()), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_partial_removal_is_not_an_error() {
        let c = cubic();
        let out = c.remove_knot(0.4, 1, 4, 1, 1e-9).unwrap();
        assert_eq!(out.removed, 0);
        assert_eq!(out.curve, c);
    }

    #[test]
    fn test_count_capped_at_multiplicity() {
        let refined = cubic().refine(&[0.2]).unwrap();
        let out = refined.remove_knot(0.2, 5, 4, 1, 1e-9).unwrap();
        assert_eq!(out.removed, 1);
    }

    #[test]
    fn test_removal_argument_checks() {
        let c = cubic();
        assert_eq!(
            c.remove_knot(0.4, 1, 5, 1, 0.0).unwrap_err(),
            KernelError::KnotIndexMismatch {
                index: 5,
                multiplicity: 1
            }
        );
        assert_eq!(
            c.remove_knot(0.4, 1, 4, 2, 0.0).unwrap_err(),
            KernelError::KnotIndexMismatch {
                index: 4,
                multiplicity: 2
            }
        );
        assert_eq!(
            c.remove_knot(0.0, 1, 3, 4, 0.0).unwrap_err(),
            KernelError::EndKnotRemoval
        );
        assert!(matches!(
            c.remove_knot_value(0.5, None, &Tolerance::default()).unwrap_err(),
            KernelError::KnotNotFound(_)
        ));
        assert_eq!(
            c.remove_knot_value(1.0, None, &Tolerance::default()).unwrap_err(),
            KernelError::EndKnotRemoval
        );
    }

    #[test]
    fn test_remove_by_value_matches_within_tolerance() {
        let refined = cubic().refine(&[0.25]).unwrap();
        let out = refined
            .remove_knot_value(0.25 + 1e-12, None, &Tolerance::default())
            .unwrap();
        assert_eq!(out.removed, 1);
        assert_eq!(out.curve.num_control_points(), 6);
    }

    #[test]
    fn test_remove_all_recovers_original() {
        let c = cubic();
        let refined = c.refine(&[0.2, 0.55, 0.55, 0.8]).unwrap();
        let out = refined.remove_all_knots(&Tolerance::default()).unwrap();
        assert_eq!(out.removed, 4);
        assert_eq!(out.curve.knots(), c.knots());
        let dev = out
            .curve
            .points_at(&grid())
            .unwrap()
            .max_deviation(&c.points_at(&grid()).unwrap());
        assert_relative_eq!(dev, 0.0, epsilon = 1e-9);
    }
}
