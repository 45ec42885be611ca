/// Keyframe snapshots and per-bone timelines
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// A recorded pose snapshot at a frame id.
///
/// The snapshot is a deep copy of the captured transform, never an alias of
/// live bone state. Scale is not persisted; restoring always yields unit
/// scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub frame_id: u32,
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Keyframe {
    /// Snapshot a live transform at a frame id.
    pub fn capture(frame_id: u32, transform: &Transform) -> Self {
        Self {
            frame_id,
            position: transform.position,
            rotation: transform.rotation,
        }
    }

    /// Rebuild a transform from the snapshot. Scale restores to 1.
    pub fn restore(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation,
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// Wire form of a keyframe for the host bridge. Quaternion is `[x, y, z, w]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyframeData {
    pub frame_id: u32,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

impl From<&Keyframe> for KeyframeData {
    fn from(kf: &Keyframe) -> Self {
        let q = kf.rotation.quaternion();
        Self {
            frame_id: kf.frame_id,
            position: [kf.position.x, kf.position.y, kf.position.z],
            rotation: [q.i, q.j, q.k, q.w],
        }
    }
}

impl From<&KeyframeData> for Keyframe {
    fn from(data: &KeyframeData) -> Self {
        let [x, y, z, w] = data.rotation;
        Self {
            frame_id: data.frame_id,
            position: Vector3::new(data.position[0], data.position[1], data.position[2]),
            rotation: UnitQuaternion::new_normalize(Quaternion::new(w, x, y, z)),
        }
    }
}

/// Keyframes for one bone, kept sorted ascending by frame id with unique
/// ids: inserting at an existing id replaces the stored keyframe.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    keys: Vec<Keyframe>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn insert(&mut self, keyframe: Keyframe) {
        match self.keys.binary_search_by_key(&keyframe.frame_id, |k| k.frame_id) {
            Ok(i) => self.keys[i] = keyframe,
            Err(i) => self.keys.insert(i, keyframe),
        }
    }

    pub fn remove(&mut self, frame_id: u32) -> Option<Keyframe> {
        match self.keys.binary_search_by_key(&frame_id, |k| k.frame_id) {
            Ok(i) => Some(self.keys.remove(i)),
            Err(_) => None,
        }
    }

    /// Sample the timeline at a fractional playhead.
    ///
    /// Clamps before the first and after the last key; between keys the
    /// bracketing pair interpolates linearly, with slerp rotation when
    /// `slerp` is set. Returns `None` for an empty timeline (callers fall
    /// back to the bind pose).
    pub fn sample(&self, playhead: f32, slerp: bool) -> Option<Transform> {
        let first = self.keys.first()?;
        if self.keys.len() == 1 || playhead <= first.frame_id as f32 {
            return Some(first.restore());
        }
        let last = self.keys.last()?;
        if playhead >= last.frame_id as f32 {
            return Some(last.restore());
        }

        // Bracketing pair around the playhead.
        let next_idx = self
            .keys
            .iter()
            .position(|k| (k.frame_id as f32) > playhead)
            .unwrap_or(self.keys.len() - 1);
        let a = &self.keys[next_idx - 1];
        let b = &self.keys[next_idx];
        let span = (b.frame_id - a.frame_id) as f32;
        let t = (playhead - a.frame_id as f32) / span;
        Some(a.restore().interpolate(&b.restore(), t, slerp))
    }
}

/// Timelines for every bone in the armature, indexed by bone index.
///
/// The host owns timeline state; this is the core-side mirror the bridge
/// keeps in sync so pose evaluation can sample without a host round trip.
#[derive(Debug, Clone, Default)]
pub struct TimelineSet {
    timelines: Vec<Timeline>,
}

impl TimelineSet {
    pub fn with_bone_count(count: usize) -> Self {
        Self {
            timelines: vec![Timeline::new(); count],
        }
    }

    pub fn timeline(&self, bone: usize) -> &Timeline {
        &self.timelines[bone]
    }

    pub fn timeline_mut(&mut self, bone: usize) -> &mut Timeline {
        &mut self.timelines[bone]
    }

    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }
}
