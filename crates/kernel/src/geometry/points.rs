use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// An ordered set of points stored row-major, `dim` coordinates per point.
///
/// Points of dimension 4 are homogeneous `(w*x, w*y, w*z, w)`; the kernel
/// treats them like any other coordinates and never divides by the weight
/// unless asked to through [`Points::to_cartesian`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoints")]
pub struct Points {
    dim: usize,
    coords: Vec<f64>,
}

#[derive(Deserialize)]
struct RawPoints {
    dim: usize,
    coords: Vec<f64>,
}

impl TryFrom<RawPoints> for Points {
    type Error = KernelError;

    fn try_from(raw: RawPoints) -> Result<Self> {
        Points::new(raw.dim, raw.coords)
    }
}

impl Points {
    pub fn new(dim: usize, coords: Vec<f64>) -> Result<Self> {
        if dim == 0 {
            return Err(KernelError::InvalidDimension(dim));
        }
        if coords.len() % dim != 0 {
            return Err(KernelError::DimensionMismatch {
                len: coords.len(),
                dim,
            });
        }
        if let Some(index) = coords.iter().position(|c| !c.is_finite()) {
            return Err(KernelError::NonFiniteValue { index });
        }
        Ok(Self { dim, coords })
    }

    /// Build from fixed-size rows, e.g. `Points::from_rows(&[[0.0, 1.0], [2.0, 3.0]])`.
    pub fn from_rows<const D: usize>(rows: &[[f64; D]]) -> Result<Self> {
        Self::new(D, rows.iter().flatten().copied().collect())
    }

    /// `len` copies of the origin.
    pub fn zeros(dim: usize, len: usize) -> Result<Self> {
        if dim == 0 {
            return Err(KernelError::InvalidDimension(dim));
        }
        Ok(Self {
            dim,
            coords: crate::error::scratch(dim * len)?,
        })
    }

    pub(crate) fn from_raw(dim: usize, coords: Vec<f64>) -> Self {
        debug_assert!(dim > 0 && coords.len() % dim == 0);
        Self { dim, coords }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.coords.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.coords[i * self.dim..(i + 1) * self.dim]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        let d = self.dim;
        &mut self.coords[i * d..(i + 1) * d]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.coords.chunks_exact(self.dim)
    }

    /// Rows `start..end` as a new point set.
    pub fn slice(&self, start: usize, end: usize) -> Points {
        Points::from_raw(self.dim, self.coords[start * self.dim..end * self.dim].to_vec())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.coords
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.coords
    }

    /// Row `dst` becomes `alpha * row(a) + (1 - alpha) * row(b)`. The rows
    /// may alias, which the insertion and elevation recurrences rely on.
    pub(crate) fn lerp_rows(&mut self, dst: usize, alpha: f64, a: usize, b: usize) {
        let d = self.dim;
        for c in 0..d {
            self.coords[dst * d + c] =
                alpha * self.coords[a * d + c] + (1.0 - alpha) * self.coords[b * d + c];
        }
    }

    pub(crate) fn copy_row(&mut self, dst: usize, src: usize) {
        let d = self.dim;
        self.coords.copy_within(src * d..(src + 1) * d, dst * d);
    }

    /// Euclidean distance between two rows.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        distance(self.row(i), self.row(j))
    }

    /// Largest coordinate-wise distance between corresponding rows.
    pub fn max_deviation(&self, other: &Points) -> f64 {
        self.rows()
            .zip(other.rows())
            .map(|(a, b)| distance(a, b))
            .fold(0.0, f64::max)
    }

    /// Divide homogeneous points by their last coordinate, dropping it.
    pub fn to_cartesian(&self) -> Result<Points> {
        if self.dim < 2 {
            return Err(KernelError::InvalidDimension(self.dim));
        }
        let out_dim = self.dim - 1;
        let mut coords = Vec::with_capacity(self.len() * out_dim);
        for (index, row) in self.rows().enumerate() {
            let w = row[out_dim];
            if w == 0.0 {
                return Err(KernelError::ZeroWeight { index });
            }
            coords.extend(row[..out_dim].iter().map(|c| c / w));
        }
        Ok(Points::from_raw(out_dim, coords))
    }
}

pub(crate) fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_len() {
        let p = Points::from_rows(&[[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.dim(), 3);
        assert_eq!(p.row(1), &[1.0, 2.0, 3.0]);
        assert!((p.distance(0, 1) - 14.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_ragged_coordinates() {
        let err = Points::new(3, vec![0.0; 7]).unwrap_err();
        assert_eq!(err, KernelError::DimensionMismatch { len: 7, dim: 3 });
        assert_eq!(Points::new(0, vec![]).unwrap_err(), KernelError::InvalidDimension(0));
    }

    #[test]
    fn test_rejects_nan() {
        let err = Points::new(2, vec![0.0, f64::NAN]).unwrap_err();
        assert_eq!(err, KernelError::NonFiniteValue { index: 1 });
    }

    #[test]
    fn test_to_cartesian_divides_by_weight() {
        let p = Points::from_rows(&[[2.0, 4.0, 6.0, 2.0], [1.0, 1.0, 1.0, 1.0]]).unwrap();
        let c = p.to_cartesian().unwrap();
        assert_eq!(c.dim(), 3);
        assert_eq!(c.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(c.row(1), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_to_cartesian_zero_weight() {
        let p = Points::from_rows(&[[1.0, 0.0, 0.0, 0.0]]).unwrap();
        assert_eq!(p.to_cartesian().unwrap_err(), KernelError::ZeroWeight { index: 0 });
    }

    #[test]
    fn test_lerp_rows_in_place() {
        let mut p = Points::from_rows(&[[0.0, 0.0], [4.0, 8.0]]).unwrap();
        p.lerp_rows(0, 0.25, 0, 1);
        assert_eq!(p.row(0), &[3.0, 6.0]);
        p.copy_row(1, 0);
        assert_eq!(p.row(1), &[3.0, 6.0]);
    }
}
