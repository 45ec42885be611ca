/// Posekit Core Library - Viewport manipulation engine for armature posing
///
/// This library provides the stateless-per-frame core of the animation
/// editor: armature pose evaluation, gizmo drag interaction, marker
/// picking and camera navigation. Rendering, asset loading and UI state
/// live in the host and talk to this crate through plain data.

pub mod armature;
pub mod camera;
pub mod error;
pub mod gizmo;
pub mod input;
pub mod keyframe;
pub mod marker;
pub mod pose;
pub mod raycast;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use armature::{Armature, ArmatureDescriptor, Bone, BoneDescriptor};
pub use camera::FlyCamera;
pub use error::{PosekitError, Result};
pub use gizmo::{Axis, AxisLocks, Gizmo, GizmoKind};
pub use input::{InputState, NavKey};
pub use keyframe::{Keyframe, KeyframeData, Timeline, TimelineSet};
pub use marker::{Marker, MarkerOwner, MarkerSet};
pub use pose::{PoseBuffer, PoseInputs};
pub use raycast::{Plane, Ray, Viewport};
pub use scene::{FrameEnv, FrameEvents, Scene};
pub use transform::Transform;
