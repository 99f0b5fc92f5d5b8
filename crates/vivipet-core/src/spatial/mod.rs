//! Spatial types: points, vectors, spacing, direction cosines and the
//! voxel-to-world frame tying them together.
//!
//! All types are thin wrappers over nalgebra.

pub mod point;
pub mod vector;
pub mod spacing;
pub mod direction;
pub mod frame;

pub use point::Point;
pub use vector::Vector;
pub use spacing::Spacing;
pub use direction::Direction;
pub use frame::SpatialFrame;

pub type Point3 = Point<3>;
pub type Vector3 = Vector<3>;
pub type Spacing3 = Spacing<3>;
pub type Direction3 = Direction<3>;
