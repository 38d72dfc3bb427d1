//! Tolerance configuration for the approximate kernel operations.

/// Tolerances used by knot lookup, knot removal and degree reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Two knot values closer than this are considered the same knot.
    pub knot: f64,
    /// Maximum control polygon deviation accepted by a knot removal.
    pub removal: f64,
    /// Maximum error bound accepted from a degree reduction.
    pub reduction: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            knot: 1e-10,
            removal: 1e-5,
            reduction: 1e-5,
        }
    }
}

impl Tolerance {
    /// Exact operations only.
    pub fn strict() -> Self {
        Self {
            knot: 0.0,
            removal: 0.0,
            reduction: 0.0,
        }
    }

    /// Tolerances suited to display-resolution geometry.
    pub fn loose() -> Self {
        Self {
            knot: 1e-8,
            removal: 1e-3,
            reduction: 1e-3,
        }
    }

    pub fn knots_equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.knot
    }
}
