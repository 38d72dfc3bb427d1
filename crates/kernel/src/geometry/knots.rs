use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// A finite, non-decreasing sequence of knot values.
///
/// Construction only checks ordering. Whether the vector is clamped for a
/// given degree is a property of the (knots, control points) pair and is
/// checked by [`KnotVector::validate_clamped`] when a curve or surface is
/// built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct KnotVector {
    knots: Vec<f64>,
}

impl KnotVector {
    pub fn new(knots: Vec<f64>) -> Result<Self> {
        if let Some(index) = knots.iter().position(|k| !k.is_finite()) {
            return Err(KernelError::NonFiniteValue { index });
        }
        if let Some(index) = knots.windows(2).position(|w| w[0] > w[1]) {
            return Err(KernelError::NonMonotonicKnots {
                index,
                previous: knots[index],
                next: knots[index + 1],
            });
        }
        Ok(Self { knots })
    }

    /// Build from distinct values and their multiplicities.
    pub fn from_multiplicities(values: &[f64], multiplicities: &[usize]) -> Result<Self> {
        let knots = values
            .iter()
            .zip(multiplicities)
            .flat_map(|(&v, &m)| std::iter::repeat_n(v, m))
            .collect();
        Self::new(knots)
    }

    /// Clamped knot vector on `[0, 1]` with equally spaced simple interior
    /// knots.
    pub fn uniform(nctrl: usize, degree: usize) -> Result<Self> {
        if degree == 0 {
            return Err(KernelError::InvalidDegree { required: 1, actual: 0 });
        }
        if nctrl <= degree {
            return Err(KernelError::TooFewPoints {
                points: nctrl,
                degree,
            });
        }
        let nval = nctrl - degree + 1;
        let mut knots = Vec::with_capacity(nctrl + degree + 1);
        knots.extend(std::iter::repeat_n(0.0, degree));
        knots.extend((0..nval).map(|i| i as f64 / (nval - 1) as f64));
        knots.extend(std::iter::repeat_n(1.0, degree));
        Self::new(knots)
    }

    /// Clamped knot vector whose interior knots all have multiplicity
    /// `degree`, placed at consecutive integers. The curve is then a chain of
    /// Bezier segments, which requires `nctrl = k * degree + 1`.
    pub fn unblended(nctrl: usize, degree: usize) -> Result<Self> {
        if degree == 0 {
            return Err(KernelError::InvalidDegree { required: 1, actual: 0 });
        }
        let nparts = nctrl.saturating_sub(1) / degree;
        if nparts == 0 || nparts * degree + 1 != nctrl {
            return Err(KernelError::KnotCountMismatch {
                knots: nctrl + degree + 1,
                points: nctrl,
                implied_degree: degree as isize,
            });
        }
        let mut knots = Vec::with_capacity(nctrl + degree + 1);
        knots.push(0.0);
        for i in 0..=nparts {
            knots.extend(std::iter::repeat_n(i as f64, degree));
        }
        knots.push(nparts as f64);
        Self::new(knots)
    }

    /// Wrap knots produced by a kernel algorithm from valid input.
    pub(crate) fn from_raw(knots: Vec<f64>) -> Self {
        debug_assert!(knots.windows(2).all(|w| w[0] <= w[1]));
        Self { knots }
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.knots
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.knots
    }

    pub fn first(&self) -> f64 {
        self.knots.first().copied().unwrap_or(0.0)
    }

    pub fn last(&self) -> f64 {
        self.knots.last().copied().unwrap_or(0.0)
    }

    /// Distinct knot values paired with their multiplicities.
    pub fn distinct(&self) -> Vec<(f64, usize)> {
        let mut out: Vec<(f64, usize)> = Vec::new();
        for &k in &self.knots {
            match out.last_mut() {
                Some((v, m)) if *v == k => *m += 1,
                _ => out.push((k, 1)),
            }
        }
        out
    }

    /// Number of knots within `tol` of `u`.
    pub fn multiplicity(&self, u: f64, tol: f64) -> usize {
        self.knots.iter().filter(|&&k| (k - u).abs() <= tol).count()
    }

    /// Index of the last knot within `tol` of `u`.
    pub fn last_index_of(&self, u: f64, tol: f64) -> Option<usize> {
        self.knots.iter().rposition(|&k| (k - u).abs() <= tol)
    }

    /// Mirror the knot vector on its own range: `k -> first + last - k`.
    pub fn reversed(&self) -> Self {
        let (lo, hi) = (self.first(), self.last());
        Self {
            knots: self.knots.iter().rev().map(|&k| lo + hi - k).collect(),
        }
    }

    /// Parametric domain `[U[p], U[m-p]]` for degree `p`. The vector must
    /// already have passed [`KnotVector::validate_clamped`].
    pub(crate) fn domain(&self, degree: usize) -> (f64, f64) {
        (self.knots[degree], self.knots[self.knots.len() - degree - 1])
    }

    /// Distinct interior values with multiplicities, for degree `degree`.
    /// Same precondition as [`KnotVector::domain`].
    pub(crate) fn interior(&self, degree: usize) -> Vec<(f64, usize)> {
        let m = self.knots.len() - 1;
        KnotVector {
            knots: self.knots[degree + 1..m - degree].to_vec(),
        }
        .distinct()
    }

    /// Check that the vector is clamped for `degree`, that no interior knot
    /// repeats more than `degree` times and that the domain is not empty.
    pub fn validate_clamped(&self, degree: usize) -> Result<()> {
        let n = self.knots.len();
        if degree == 0 || n < 2 * (degree + 1) {
            return Err(KernelError::NotClamped { degree });
        }
        let (start, end) = self.domain(degree);
        let clamped_left = self.knots[..=degree].iter().all(|&k| k == start);
        let clamped_right = self.knots[n - degree - 1..].iter().all(|&k| k == end);
        if !clamped_left || !clamped_right {
            return Err(KernelError::NotClamped { degree });
        }
        if start >= end {
            return Err(KernelError::DegenerateDomain { start, end });
        }
        // An end run longer than degree + 1 leaves a zero-width span at the
        // domain boundary.
        if self.knots[degree + 1] == start || self.knots[n - degree - 2] == end {
            return Err(KernelError::NotClamped { degree });
        }
        if let Some(&(value, multiplicity)) =
            self.interior(degree).iter().find(|(_, m)| *m > degree)
        {
            return Err(KernelError::ExcessiveMultiplicity {
                value,
                multiplicity,
                degree,
            });
        }
        Ok(())
    }
}

impl Index<usize> for KnotVector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.knots[i]
    }
}

impl TryFrom<Vec<f64>> for KnotVector {
    type Error = KernelError;

    fn try_from(knots: Vec<f64>) -> Result<Self> {
        KnotVector::new(knots)
    }
}

impl From<KnotVector> for Vec<f64> {
    fn from(k: KnotVector) -> Self {
        k.knots
    }
}

impl fmt::Display for KnotVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .distinct()
            .iter()
            .map(|(v, m)| format!("{v}({m})"))
            .collect();
        write!(f, "KnotVector: {}", parts.join(", "))
    }
}
