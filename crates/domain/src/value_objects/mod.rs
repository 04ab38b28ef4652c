//! Value objects - Immutable objects defined by their attributes

mod field_path;
mod hope;
mod tracker;

pub use field_path::FieldPath;
pub use hope::{Hope, HopeBounds};
pub use tracker::{Circle, Tracker, MAX_CIRCLES};
