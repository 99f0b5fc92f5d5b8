//! Vector type for displacements and per-axis quantities.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// A vector in D-dimensional space.
///
/// Thin wrapper around nalgebra's `SVector` used for displacements between
/// world points and for per-axis quantities such as voxel spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

impl<const D: usize> Vector<D> {
    /// Create a vector from components.
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    /// Create a zero vector.
    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Components as a plain array.
    pub fn to_array(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.0[i];
        }
        out
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    /// Get the inner nalgebra vector.
    pub fn inner(&self) -> &SVector<f64, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Mul<f64> for Vector<D> {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self(self.0 * scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Vector3 = Vector<3>;

    #[test]
    fn test_vector_norm() {
        let v = Vector3::new([3.0, 4.0, 0.0]);
        assert!((v.norm() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_vector_scale() {
        let v = Vector3::new([0.5, 1.0, 2.0]) * 2.0;
        assert_eq!(v.to_array(), [1.0, 2.0, 4.0]);
    }
}
