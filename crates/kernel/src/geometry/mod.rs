pub mod knots;
pub mod points;

pub use knots::KnotVector;
pub use points::Points;
