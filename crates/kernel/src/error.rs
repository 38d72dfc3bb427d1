use thiserror::Error;

/// Failures raised at the entry of a kernel operation.
///
/// Every variant except [`KernelError::ResourceExhausted`] is an invalid
/// argument: the caller handed in arrays whose shapes, ordering or values
/// violate the operation's contract. Tolerance outcomes (partial knot
/// removal, degree-reduction error) are reported through return values and
/// never appear here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("Control point set is empty")]
    EmptyControlPoints,

    #[error("Point dimension must be at least 1, got {0}")]
    InvalidDimension(usize),

    #[error("Coordinate count {len} is not a multiple of the point dimension {dim}")]
    DimensionMismatch { len: usize, dim: usize },

    #[error("Knot count {knots} does not fit {points} control points (degree {implied_degree})")]
    KnotCountMismatch {
        knots: usize,
        points: usize,
        implied_degree: isize,
    },

    #[error("Knot vector decreases at index {index}: {previous} > {next}")]
    NonMonotonicKnots {
        index: usize,
        previous: f64,
        next: f64,
    },

    #[error("Non-finite value at index {index}")]
    NonFiniteValue { index: usize },

    #[error("Knot vector is not clamped for degree {degree}")]
    NotClamped { degree: usize },

    #[error("Interior knot {value} has multiplicity {multiplicity}, more than degree {degree}")]
    ExcessiveMultiplicity {
        value: f64,
        multiplicity: usize,
        degree: usize,
    },

    #[error("Parametric domain [{start}, {end}] is empty")]
    DegenerateDomain { start: f64, end: f64 },

    #[error("Parameter {value} lies outside the domain [{start}, {end}]")]
    ParameterOutOfDomain { value: f64, start: f64, end: f64 },

    #[error("Parameter values must be sorted: {previous} > {next} at index {index}")]
    UnsortedParameters {
        index: usize,
        previous: f64,
        next: f64,
    },

    #[error("Knot value {0} does not occur in the knot vector")]
    KnotNotFound(f64),

    #[error("Knot index {index} and multiplicity {multiplicity} do not match a knot run")]
    KnotIndexMismatch { index: usize, multiplicity: usize },

    #[error("End knots of a clamped vector cannot be removed")]
    EndKnotRemoval,

    #[error("Operation requires degree at least {required}, curve has degree {actual}")]
    InvalidDegree { required: usize, actual: usize },

    #[error("Control grid of {points} points does not match {rows} x {cols}")]
    GridShapeMismatch {
        points: usize,
        rows: usize,
        cols: usize,
    },

    #[error("{points} points cannot define a curve of degree {degree}")]
    TooFewPoints { points: usize, degree: usize },

    #[error("Got {params} parameter values for {points} points")]
    ParameterCountMismatch { params: usize, points: usize },

    #[error("Point {index} coincides with the point after it")]
    CoincidentPoints { index: usize },

    #[error("Homogeneous point {index} has zero weight")]
    ZeroWeight { index: usize },

    #[error("Scratch allocation of {requested} values failed")]
    ResourceExhausted { requested: usize },
}

impl KernelError {
    /// `true` for every contract violation by the caller.
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, KernelError::ResourceExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Allocate a zero-filled scratch buffer, reporting allocation failure
/// instead of aborting.
pub(crate) fn scratch(len: usize) -> Result<Vec<f64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| KernelError::ResourceExhausted { requested: len })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_classification() {
        assert!(KernelError::EmptyControlPoints.is_invalid_argument());
        assert!(KernelError::EndKnotRemoval.is_invalid_argument());
        assert!(!KernelError::ResourceExhausted { requested: 4 }.is_invalid_argument());
    }

    #[test]
    fn test_scratch_is_zeroed() {
        let buf = scratch(7).unwrap();
        assert_eq!(buf.len(), 7);
        assert!(buf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_scratch_reports_exhaustion() {
        let err = scratch(usize::MAX).unwrap_err();
        assert_eq!(err, KernelError::ResourceExhausted { requested: usize::MAX });
    }
}
