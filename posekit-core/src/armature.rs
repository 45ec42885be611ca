/// Bone tree model and load-time validation
use log::debug;
use nalgebra::{Matrix4, Point3, UnitQuaternion, Quaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{PosekitError, Result};
use crate::gizmo::AxisLocks;
use crate::transform::Transform;

/// One joint of the armature.
///
/// Bones are owned by the [`Armature`] that created them and reference
/// their children by index, never by pointer. Topology is immutable after
/// load; animated state lives in the pose evaluator's frame cache, not
/// here.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Local translation/rotation/scale relative to the parent at bind time.
    pub local: Transform,
    /// Local space -> bind-pose world space.
    pub bind_matrix: Matrix4<f32>,
    /// Bind-pose world space -> local space.
    pub inverse_bind_matrix: Matrix4<f32>,
    pub locks: AxisLocks,
}

impl Bone {
    /// World position of the bone head in the bind pose.
    pub fn bind_world_position(&self) -> Point3<f32> {
        self.bind_matrix.transform_point(&Point3::origin())
    }
}

/// A validated bone tree stored as a flat arena, root at index 0.
///
/// Children always refer forward (child index > parent index), which both
/// rules out cycles and guarantees a plain index-order walk visits parents
/// before children.
#[derive(Debug, Clone)]
pub struct Armature {
    bones: Vec<Bone>,
}

impl Armature {
    /// Build and validate an armature from a host-supplied descriptor.
    ///
    /// All structural violations are fatal here; nothing downstream checks
    /// topology again.
    pub fn from_descriptor(desc: &ArmatureDescriptor) -> Result<Self> {
        if desc.bones.is_empty() {
            return Err(PosekitError::EmptyArmature);
        }
        let len = desc.bones.len();

        // Unique names.
        for (i, bone) in desc.bones.iter().enumerate() {
            for other in &desc.bones[i + 1..] {
                if bone.name == other.name {
                    return Err(PosekitError::DuplicateBoneName(bone.name.clone()));
                }
            }
        }

        // Child indices: in range, strictly forward, single parent.
        let mut parents: Vec<Option<usize>> = vec![None; len];
        for (i, bone) in desc.bones.iter().enumerate() {
            for &child in &bone.children {
                if child >= len {
                    return Err(PosekitError::ChildIndexOutOfRange {
                        bone: bone.name.clone(),
                        child,
                        len,
                    });
                }
                if child <= i {
                    return Err(PosekitError::ChildIndexNotForward {
                        bone: bone.name.clone(),
                        child,
                        index: i,
                    });
                }
                if parents[child].is_some() {
                    return Err(PosekitError::MultipleParents { child });
                }
                parents[child] = Some(i);
            }
        }

        // Compose bind matrices parents-first; derive inverse binds that
        // the descriptor does not supply.
        let mut bones = Vec::with_capacity(len);
        for (i, bd) in desc.bones.iter().enumerate() {
            let local = bd.local_transform();
            let parent_bind = match parents[i] {
                Some(p) => {
                    let parent: &Bone = &bones[p];
                    parent.bind_matrix
                }
                None => Matrix4::identity(),
            };
            let bind_matrix = parent_bind * local.to_matrix();
            let inverse_bind_matrix = match bd.inverse_bind_matrix {
                Some(cols) => Matrix4::from_column_slice(&cols),
                None => bind_matrix
                    .try_inverse()
                    .ok_or_else(|| PosekitError::NonInvertibleBindMatrix(bd.name.clone()))?,
            };
            bones.push(Bone {
                name: bd.name.clone(),
                parent: parents[i],
                children: bd.children.clone(),
                local,
                bind_matrix,
                inverse_bind_matrix,
                locks: bd.locks(),
            });
        }

        debug!("loaded armature with {} bones", bones.len());
        Ok(Self { bones })
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone(&self, index: usize) -> &Bone {
        &self.bones[index]
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Resolve a bone name that configuration claims exists.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| PosekitError::UnknownBone(name.to_string()))
    }
}

/// Host-side armature description, decoded from JSON by the bridge.
///
/// Mirrors what an asset loader extracts from a skinned GLTF: named nodes
/// forming a tree, optional TRS per node and an inverse bind matrix per
/// skinned joint. Quaternions are `[x, y, z, w]`; matrices are 16 floats
/// in column-major order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmatureDescriptor {
    pub bones: Vec<BoneDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneDescriptor {
    pub name: String,
    #[serde(default)]
    pub children: Vec<usize>,
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub inverse_bind_matrix: Option<[f32; 16]>,
    #[serde(default)]
    pub lock_rotation: Option<[bool; 3]>,
    #[serde(default)]
    pub lock_translation: Option<[bool; 3]>,
}

impl BoneDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            translation: None,
            rotation: None,
            scale: None,
            inverse_bind_matrix: None,
            lock_rotation: None,
            lock_translation: None,
        }
    }

    fn local_transform(&self) -> Transform {
        let mut local = Transform::identity();
        if let Some([x, y, z]) = self.translation {
            local.position = Vector3::new(x, y, z);
        }
        if let Some([x, y, z, w]) = self.rotation {
            local.rotation = UnitQuaternion::new_normalize(Quaternion::new(w, x, y, z));
        }
        if let Some([x, y, z]) = self.scale {
            local.scale = Vector3::new(x, y, z);
        }
        local
    }

    fn locks(&self) -> AxisLocks {
        AxisLocks {
            rotation: self.lock_rotation.unwrap_or([false; 3]),
            translation: self.lock_translation.unwrap_or([false; 3]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_descriptor() -> ArmatureDescriptor {
        let mut root = BoneDescriptor::new("root");
        root.children = vec![1];
        let mut child = BoneDescriptor::new("child");
        child.translation = Some([0.0, 1.0, 0.0]);
        ArmatureDescriptor {
            bones: vec![root, child],
        }
    }

    #[test]
    fn test_chain_bind_matrices() {
        let armature = Armature::from_descriptor(&chain_descriptor()).unwrap();
        assert_eq!(armature.len(), 2);
        assert_eq!(armature.bone(1).parent, Some(0));

        let head = armature.bone(1).bind_world_position();
        assert!((head - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-6);

        // Derived inverse bind actually inverts the bind matrix.
        let product = armature.bone(1).bind_matrix * armature.bone(1).inverse_bind_matrix;
        assert!((product - Matrix4::identity()).norm() < 1e-5);
    }

    #[test]
    fn test_empty_armature_rejected() {
        let desc = ArmatureDescriptor { bones: vec![] };
        assert!(matches!(
            Armature::from_descriptor(&desc),
            Err(PosekitError::EmptyArmature)
        ));
    }

    #[test]
    fn test_out_of_range_child_rejected() {
        let mut root = BoneDescriptor::new("root");
        root.children = vec![5];
        let desc = ArmatureDescriptor { bones: vec![root] };
        assert!(matches!(
            Armature::from_descriptor(&desc),
            Err(PosekitError::ChildIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut root = BoneDescriptor::new("root");
        root.children = vec![1];
        let mut child = BoneDescriptor::new("child");
        child.children = vec![1]; // would be its own parent's sibling loop
        let desc = ArmatureDescriptor {
            bones: vec![root, child],
        };
        assert!(matches!(
            Armature::from_descriptor(&desc),
            Err(PosekitError::ChildIndexNotForward { .. })
        ));
    }

    #[test]
    fn test_double_parent_rejected() {
        let mut a = BoneDescriptor::new("a");
        a.children = vec![2];
        let mut b = BoneDescriptor::new("b");
        b.children = vec![2];
        let desc = ArmatureDescriptor {
            bones: vec![a, b, BoneDescriptor::new("c")],
        };
        assert!(matches!(
            Armature::from_descriptor(&desc),
            Err(PosekitError::MultipleParents { child: 2 })
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let desc = ArmatureDescriptor {
            bones: vec![BoneDescriptor::new("dup"), BoneDescriptor::new("dup")],
        };
        assert!(matches!(
            Armature::from_descriptor(&desc),
            Err(PosekitError::DuplicateBoneName(_))
        ));
    }

    #[test]
    fn test_require_unknown_bone() {
        let armature = Armature::from_descriptor(&chain_descriptor()).unwrap();
        assert_eq!(armature.require("child").unwrap(), 1);
        assert!(matches!(
            armature.require("tail"),
            Err(PosekitError::UnknownBone(_))
        ));
    }
}
