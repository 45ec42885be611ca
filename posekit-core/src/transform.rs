/// Position/rotation/scale triples and their composition
use nalgebra::{Matrix4, UnitQuaternion, Vector3};

/// A local transform: translation, rotation and scale relative to a parent.
///
/// The rotation is a `UnitQuaternion`, so it is normalized by construction
/// and stays normalized through composition. The type is `Copy`; the
/// identity value is always copied out of [`Transform::identity`], never
/// shared or mutated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// The neutral transform: zero translation, identity rotation, unit scale.
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn from_rotation(rotation: UnitQuaternion<f32>) -> Self {
        Self {
            rotation,
            ..Self::identity()
        }
    }

    /// Compose into a 4x4 matrix as translation * rotation * scale.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply a delta transform on top of this one.
    ///
    /// Translation is added, scale multiplies component-wise, and the delta
    /// rotation composes on the left (`delta * base`), i.e. in the same
    /// space the base rotation lives in. The left-composition order is what
    /// makes an on-screen drag turn the bone in the dragged direction.
    pub fn displaced_by(&self, delta: &Transform) -> Self {
        Self {
            position: self.position + delta.position,
            rotation: delta.rotation * self.rotation,
            scale: self.scale.component_mul(&delta.scale),
        }
    }

    /// Interpolate between two transforms.
    ///
    /// Translation and scale interpolate linearly. Rotation uses spherical
    /// interpolation when `slerp` is set, otherwise normalized lerp.
    pub fn interpolate(&self, other: &Transform, t: f32, slerp: bool) -> Self {
        let rotation = if slerp {
            self.rotation.slerp(&other.rotation, t)
        } else {
            self.rotation.nlerp(&other.rotation, t)
        };
        Self {
            position: self.position.lerp(&other.position, t),
            rotation,
            scale: self.scale.lerp(&other.scale, t),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
