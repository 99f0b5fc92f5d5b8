//! Direction cosine matrix.

use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};
use super::Vector;

/// Orientation of the volume axes in world space.
///
/// Column `i` is the unit direction of voxel axis `i`. Scanner frames are
/// usually orthonormal, but oblique or sheared acquisitions are allowed as
/// long as the matrix stays invertible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Identity orientation (voxel axes aligned with world axes).
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Try to compute the inverse of the direction matrix.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Get the inner nalgebra matrix.
    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Direction3 = Direction<3>;

    #[test]
    fn test_identity_is_its_own_inverse() {
        let d = Direction3::identity();
        assert_eq!(d.try_inverse(), Some(d));
        assert_eq!(d[(0, 0)], 1.0);
        assert_eq!(d[(0, 1)], 0.0);
    }

    #[test]
    fn test_flipped_axes() {
        // LPS-style flip of the first two axes.
        let d = Direction(SMatrix::<f64, 3, 3>::from_diagonal(&nalgebra::Vector3::new(-1.0, -1.0, 1.0)));
        let inv = d.try_inverse().unwrap();
        assert_eq!(inv, d);

        let v = d * Vector(nalgebra::Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(v.0, nalgebra::Vector3::new(-1.0, -2.0, 3.0));
    }

    #[test]
    fn test_singular_has_no_inverse() {
        let d: Direction3 = Direction(SMatrix::<f64, 3, 3>::zeros());
        assert!(d.try_inverse().is_none());
    }
}
