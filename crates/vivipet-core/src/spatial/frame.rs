//! Voxel-to-world affine frames.
//!
//! A [`SpatialFrame`] is the 4×4 homogeneous matrix that maps a voxel index
//! `(i, j, k)` of a volume to scanner world coordinates in millimetres:
//!
//! ```text
//! world = A · [i, j, k, 1]ᵀ,   A = | R·diag(s)  o |
//!                                  |    0       1 |
//! ```
//!
//! where `o` is the origin (world position of voxel `(0, 0, 0)`), `s` the
//! voxel spacing and `R` the direction cosines.

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use crate::error::{Result, VivipetError};
use super::{Direction, Point, Spacing, Vector};

/// Determinants below this magnitude are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Voxel-to-world affine transform of a 3-D volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialFrame {
    affine: Matrix4<f64>,
}

impl SpatialFrame {
    /// Wrap a homogeneous 4×4 affine. The last row is not checked.
    pub fn from_affine(affine: Matrix4<f64>) -> Self {
        Self { affine }
    }

    /// Build from the three upper rows of the affine (NIfTI `srow_x/y/z` layout).
    pub fn from_rows(rows: [[f64; 4]; 3]) -> Self {
        let mut affine = Matrix4::identity();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                affine[(r, c)] = *value;
            }
        }
        Self { affine }
    }

    /// Build from origin, spacing and direction.
    pub fn from_geometry(origin: &Point<3>, spacing: &Spacing<3>, direction: &Direction<3>) -> Self {
        let linear = direction.inner() * Matrix3::from_diagonal(spacing.inner());
        let mut affine = Matrix4::identity();
        affine.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
        affine.fixed_view_mut::<3, 1>(0, 3).copy_from(&origin.inner().coords);
        Self { affine }
    }

    /// Identity frame: 1 mm isotropic voxels with voxel (0,0,0) at the world origin.
    pub fn identity() -> Self {
        Self { affine: Matrix4::identity() }
    }

    /// The full homogeneous matrix.
    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    /// Upper-left 3×3 block (rotation, zoom and shear).
    pub fn linear(&self) -> Matrix3<f64> {
        self.affine.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// World position of voxel `(0, 0, 0)`.
    pub fn origin(&self) -> Point<3> {
        Point::new([self.affine[(0, 3)], self.affine[(1, 3)], self.affine[(2, 3)]])
    }

    /// Voxel size along each axis: the norm of each column of the linear part.
    pub fn voxel_sizes(&self) -> Spacing<3> {
        let linear = self.linear();
        Vector::new([
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        ])
    }

    /// Frame of the same volume after block-reducing every axis by `factor`.
    ///
    /// The linear part is scaled and the translation kept, so voxel `(0,0,0)`
    /// stays anchored where it was.
    pub fn scaled(&self, factor: usize) -> Self {
        let mut affine = self.affine;
        let linear = self.linear() * factor as f64;
        affine.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
        Self { affine }
    }

    /// Whether the frame maps voxels to a non-degenerate world volume.
    pub fn is_invertible(&self) -> bool {
        let det = self.linear().determinant();
        det.is_finite() && det.abs() > SINGULAR_EPSILON
    }

    /// World-to-voxel matrix.
    pub fn try_inverse(&self) -> Result<Matrix4<f64>> {
        if !self.is_invertible() {
            return Err(VivipetError::geometry(format!(
                "spatial frame is singular (det = {:e})",
                self.linear().determinant()
            )));
        }
        self.affine
            .try_inverse()
            .ok_or_else(|| VivipetError::geometry("spatial frame cannot be inverted"))
    }

    /// Split into origin, spacing and direction cosines.
    pub fn decompose(&self) -> Result<(Point<3>, Spacing<3>, Direction<3>)> {
        if !self.is_invertible() {
            return Err(VivipetError::geometry(
                "cannot derive spacing and direction from a singular frame",
            ));
        }
        let linear = self.linear();
        let spacing = self.voxel_sizes();
        let columns: Vec<Vector3<f64>> = (0..3)
            .map(|c| linear.column(c).into_owned() / spacing[c])
            .collect();
        let direction = Direction(Matrix3::from_columns(&columns));
        Ok((self.origin(), spacing, direction))
    }

    /// Map a continuous voxel index to world coordinates.
    pub fn index_to_world(&self, index: &Point<3>) -> Point<3> {
        let h = self.affine * Vector4::new(index[0], index[1], index[2], 1.0);
        Point::new([h[0], h[1], h[2]])
    }

    /// Map a world point to a continuous voxel index.
    pub fn world_to_index(&self, point: &Point<3>) -> Result<Point<3>> {
        let inv = self.try_inverse()?;
        let h = inv * Vector4::new(point[0], point[1], point[2], 1.0);
        Ok(Point::new([h[0], h[1], h[2]]))
    }

    /// Voxel-to-voxel matrix taking indices of `self` to indices of `other`.
    ///
    /// Fails if either frame is singular.
    pub fn index_mapping_to(&self, other: &SpatialFrame) -> Result<Matrix4<f64>> {
        if !self.is_invertible() {
            return Err(VivipetError::geometry("target spatial frame is singular"));
        }
        Ok(other.try_inverse()? * self.affine)
    }
}

impl Default for SpatialFrame {
    fn default() -> Self {
        Self::identity()
    }
}
