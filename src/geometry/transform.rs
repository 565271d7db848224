//! Rotation builder and placement transforms
//!
//! Rotations compose by left-multiplication: `Rotation::IDENTITY.rotate_y(a).rotate_z(b)`
//! applies the Y rotation first, then Z, giving the matrix `Rz(b) * Ry(a)`.

use glam::{DAffine3, DMat3, DVec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation(pub DMat3);

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Rotation {
    pub const IDENTITY: Self = Self(DMat3::IDENTITY);

    #[inline]
    pub fn rotate_x(self, angle: f64) -> Self {
        Self(DMat3::from_rotation_x(angle) * self.0)
    }

    #[inline]
    pub fn rotate_y(self, angle: f64) -> Self {
        Self(DMat3::from_rotation_y(angle) * self.0)
    }

    #[inline]
    pub fn rotate_z(self, angle: f64) -> Self {
        Self(DMat3::from_rotation_z(angle) * self.0)
    }

    /// Rigid transform: rotate, then move to `translation`
    #[inline]
    pub fn then_translate(self, translation: DVec3) -> DAffine3 {
        DAffine3::from_mat3_translation(self.0, translation)
    }
}

/// Pure translation
#[inline]
pub fn translation(offset: DVec3) -> DAffine3 {
    DAffine3::from_translation(offset)
}

/// Rotation about the beam axis followed by a translation
#[inline]
pub fn rotated_about_z(angle: f64, position: DVec3) -> DAffine3 {
    Rotation::IDENTITY.rotate_z(angle).then_translate(position)
}
