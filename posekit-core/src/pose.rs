/// Per-frame pose evaluation: bind pose -> animated pose -> skinning matrices
use nalgebra::{Matrix4, Point3, UnitQuaternion};

use crate::armature::Armature;
use crate::keyframe::TimelineSet;
use crate::transform::Transform;

/// Inputs that vary frame to frame. The evaluator is a pure function of
/// these plus the armature: the drag displacement is a delta reapplied
/// from scratch every frame, never integrated.
#[derive(Debug, Clone, Copy)]
pub struct PoseInputs<'a> {
    pub timelines: &'a TimelineSet,
    pub playhead: f32,
    pub use_slerp: bool,
    /// Bone the gizmo displacement applies to while a drag is active.
    pub dragged_bone: Option<usize>,
    pub displacement: Transform,
}

/// Per-bone scratch recomputed every frame, stored as parallel arrays
/// indexed by bone index. Owned by the evaluator, never by the bones:
/// armature topology stays immutable while this churns.
#[derive(Debug, Default)]
pub struct PoseBuffer {
    parent_globals: Vec<Matrix4<f32>>,
    globals: Vec<Matrix4<f32>>,
    finals: Vec<Matrix4<f32>>,
    locals: Vec<Transform>,
    global_rotations: Vec<UnitQuaternion<f32>>,
}

impl PoseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the arena parents-first and fill every per-bone slot.
    ///
    /// Per bone: the animated local transform is the sampled timeline value
    /// (bind local when the timeline is empty), displaced by the drag delta
    /// on the dragged bone only; then
    /// `global = parent_global * local` and `final = global * inverse_bind`.
    /// Children always have higher indices than their parent (validated at
    /// load), so plain index order is evaluation order.
    pub fn evaluate(&mut self, armature: &Armature, inputs: &PoseInputs) {
        let n = armature.len();
        self.resize(n);
        if n == 0 {
            return;
        }

        for i in 0..n {
            let bone = armature.bone(i);
            let mut local = inputs
                .timelines
                .timeline(i)
                .sample(inputs.playhead, inputs.use_slerp)
                .unwrap_or(bone.local);
            if inputs.dragged_bone == Some(i) {
                local = local.displaced_by(&inputs.displacement);
            }

            let (parent_global, parent_rotation) = match bone.parent {
                Some(p) => (self.globals[p], self.global_rotations[p]),
                None => (Matrix4::identity(), UnitQuaternion::identity()),
            };
            let global = parent_global * local.to_matrix();

            self.parent_globals[i] = parent_global;
            self.globals[i] = global;
            self.finals[i] = global * bone.inverse_bind_matrix;
            self.locals[i] = local;
            self.global_rotations[i] = parent_rotation * local.rotation;
        }
    }

    fn resize(&mut self, n: usize) {
        if self.finals.len() != n {
            self.parent_globals.resize(n, Matrix4::identity());
            self.globals.resize(n, Matrix4::identity());
            self.finals.resize(n, Matrix4::identity());
            self.locals.resize(n, Transform::identity());
            self.global_rotations.resize(n, UnitQuaternion::identity());
        }
    }

    /// Bone-index-aligned skinning matrices for the renderer.
    pub fn finals(&self) -> &[Matrix4<f32>] {
        &self.finals
    }

    pub fn final_of(&self, bone: usize) -> &Matrix4<f32> {
        &self.finals[bone]
    }

    /// The animated local transform, displacement included. This is what
    /// the host snapshots when it records a keyframe.
    pub fn local_of(&self, bone: usize) -> &Transform {
        &self.locals[bone]
    }

    /// Orientation of the bone in world space (rotation chain only; scale
    /// shear is ignored, which is what gizmo axes want).
    pub fn global_rotation_of(&self, bone: usize) -> UnitQuaternion<f32> {
        self.global_rotations[bone]
    }

    /// Posed world position of a bone head: its bind-pose world point
    /// pushed through the bone's final matrix, exactly the transform GPU
    /// skinning applies to mesh vertices, on a single point.
    pub fn world_position_of(&self, armature: &Armature, bone: usize) -> Point3<f32> {
        let bind_world = armature.bone(bone).bind_world_position();
        self.finals[bone].transform_point(&bind_world)
    }
}
