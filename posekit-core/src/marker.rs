/// Clickable screen targets for bones and gizmo handles
use log::trace;
use nalgebra::{Matrix4, Point3, Vector2};

use crate::armature::Armature;
use crate::gizmo::{handle_world, Axis, GizmoKind};
use crate::pose::PoseBuffer;
use crate::raycast::{transform_point_projective, Ray, Viewport};

const BONE_COLOR: [f32; 4] = [0.85, 0.85, 0.85, 1.0];
const BONE_SELECTED_COLOR: [f32; 4] = [1.0, 1.0, 0.0, 1.0];
const DEBUG_COLOR: [f32; 4] = [1.0, 0.2, 1.0, 1.0];

/// What a marker stands for. Matching is exhaustive; there is no untyped
/// owner field to probe at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOwner {
    /// A joint of the armature, by bone index.
    Bone(usize),
    /// One of the three gizmo axis handles.
    Axis(Axis),
    /// A non-interactive diagnostic point.
    Debug,
}

impl MarkerOwner {
    /// Pick precedence; lower wins. Gizmo handles beat bone markers so a
    /// handle overlapping a bone on screen is still draggable, regardless
    /// of which is closer to the camera.
    fn precedence(&self) -> u8 {
        match self {
            MarkerOwner::Axis(_) => 0,
            MarkerOwner::Bone(_) => 1,
            MarkerOwner::Debug => 2,
        }
    }
}

/// A clickable/visualizable point tracked in world and screen space.
/// Created once at scene construction and mutated every frame; never
/// destroyed during a session.
#[derive(Debug, Clone, Copy)]
pub struct Marker {
    pub owner: MarkerOwner,
    pub position3d: Point3<f32>,
    pub position_ndc: Vector2<f32>,
    /// World-space pick-sphere radius, also the renderer's draw size.
    pub radius: f32,
    pub color: [f32; 4],
    pub clickable: bool,
    pub visible: bool,
}

impl Marker {
    fn new(owner: MarkerOwner, color: [f32; 4], clickable: bool) -> Self {
        Self {
            owner,
            position3d: Point3::origin(),
            position_ndc: Vector2::zeros(),
            radius: 0.0,
            color,
            clickable,
            visible: false,
        }
    }
}

/// Per-frame parameters for the marker refresh.
#[derive(Debug, Clone, Copy)]
pub struct MarkerRefresh {
    pub selected: Option<usize>,
    pub gizmo_kind: GizmoKind,
    pub gizmo_size: f32,
    pub marker_radius: f32,
    pub show_debug: bool,
}

/// The flat marker collection: one marker per bone, three axis handles,
/// one debug marker at the world origin.
#[derive(Debug, Default)]
pub struct MarkerSet {
    markers: Vec<Marker>,
}

impl MarkerSet {
    pub fn new(armature: &Armature) -> Self {
        let mut markers = Vec::with_capacity(armature.len() + 4);
        for i in 0..armature.len() {
            markers.push(Marker::new(MarkerOwner::Bone(i), BONE_COLOR, true));
        }
        for axis in Axis::ALL {
            markers.push(Marker::new(MarkerOwner::Axis(axis), axis.color(), true));
        }
        markers.push(Marker::new(MarkerOwner::Debug, DEBUG_COLOR, false));
        Self { markers }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Refresh world and screen positions after pose evaluation.
    ///
    /// Bone markers follow the posed bone heads; axis handles follow the
    /// selected bone (hidden when nothing is selected) and report
    /// clickability from that bone's locks; debug markers obey the env
    /// flag. Only positions, colors and flags change here: the collection
    /// itself is fixed for the session.
    pub fn refresh(
        &mut self,
        armature: &Armature,
        pose: &PoseBuffer,
        view_proj: &Matrix4<f32>,
        params: &MarkerRefresh,
    ) {
        let subject = params.selected.map(|bone| {
            (
                pose.world_position_of(armature, bone),
                pose.global_rotation_of(bone),
                armature.bone(bone).locks,
            )
        });

        for marker in &mut self.markers {
            match marker.owner {
                MarkerOwner::Bone(bone) => {
                    marker.position3d = pose.world_position_of(armature, bone);
                    marker.radius = params.marker_radius;
                    marker.visible = true;
                    marker.color = if params.selected == Some(bone) {
                        BONE_SELECTED_COLOR
                    } else {
                        BONE_COLOR
                    };
                }
                MarkerOwner::Axis(axis) => match subject {
                    Some((position, rotation, locks)) => {
                        marker.position3d = handle_world(
                            params.gizmo_kind,
                            axis,
                            params.gizmo_size,
                            position,
                            rotation,
                        );
                        marker.radius = params.marker_radius;
                        marker.visible = true;
                        marker.clickable = locks.allows(params.gizmo_kind, axis);
                    }
                    None => {
                        marker.visible = false;
                        marker.clickable = false;
                    }
                },
                MarkerOwner::Debug => {
                    marker.position3d = Point3::origin();
                    marker.radius = params.marker_radius;
                    marker.visible = params.show_debug;
                }
            }
            marker.position_ndc =
                transform_point_projective(view_proj, marker.position3d).coords.xy();
        }
    }

    /// Resolve a pixel click to the winning marker index.
    ///
    /// Casts the camera ray through the pixel and keeps every visible,
    /// clickable marker whose pick sphere it hits; ties resolve by owner
    /// precedence first, then by distance to the camera within the same
    /// precedence. A miss is a normal `None`, not an error.
    pub fn pick(
        &self,
        viewport: &Viewport,
        view_proj: &Matrix4<f32>,
        camera_position: Point3<f32>,
        pixel: Vector2<f32>,
    ) -> Option<usize> {
        let ray = Ray::from_camera(viewport, view_proj, pixel)?;

        let mut best: Option<(u8, f32, usize)> = None;
        for (index, marker) in self.markers.iter().enumerate() {
            if !marker.visible || !marker.clickable {
                continue;
            }
            if !ray.hits_sphere(marker.position3d, marker.radius) {
                continue;
            }
            let rank = marker.owner.precedence();
            let distance = (marker.position3d - camera_position).norm();
            let closer = match best {
                Some((best_rank, best_dist, _)) => {
                    rank < best_rank || (rank == best_rank && distance < best_dist)
                }
                None => true,
            };
            if closer {
                best = Some((rank, distance, index));
            }
        }

        let winner = best.map(|(_, _, index)| index);
        trace!("pick at ({}, {}) -> {:?}", pixel.x, pixel.y, winner);
        winner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armature::{ArmatureDescriptor, BoneDescriptor};
    use crate::keyframe::TimelineSet;
    use crate::pose::PoseInputs;
    use crate::transform::Transform;
    use nalgebra::Vector3;
    use std::f32::consts::FRAC_PI_2;

    fn look_down_z() -> (Viewport, Matrix4<f32>, Point3<f32>) {
        let eye = Point3::new(0.0, 0.0, 10.0);
        let view = Matrix4::look_at_rh(&eye, &Point3::origin(), &Vector3::y());
        let proj = Matrix4::new_perspective(800.0 / 600.0, FRAC_PI_2 * 0.5, 0.1, 100.0);
        (Viewport::new(800.0, 600.0), proj * view, eye)
    }

    fn two_bone_scene() -> (Armature, PoseBuffer, TimelineSet) {
        let mut root = BoneDescriptor::new("root");
        root.children = vec![1];
        let mut child = BoneDescriptor::new("child");
        child.translation = Some([0.0, 1.0, 0.0]);
        child.lock_rotation = Some([false, true, false]);
        let armature = Armature::from_descriptor(&ArmatureDescriptor {
            bones: vec![root, child],
        })
        .unwrap();
        let timelines = TimelineSet::with_bone_count(2);
        let mut pose = PoseBuffer::new();
        pose.evaluate(
            &armature,
            &PoseInputs {
                timelines: &timelines,
                playhead: 0.0,
                use_slerp: true,
                dragged_bone: None,
                displacement: Transform::identity(),
            },
        );
        (armature, pose, timelines)
    }

    fn refresh_params(selected: Option<usize>) -> MarkerRefresh {
        MarkerRefresh {
            selected,
            gizmo_kind: GizmoKind::Move,
            gizmo_size: 1.0,
            marker_radius: 0.2,
            show_debug: false,
        }
    }

    #[test]
    fn test_bone_markers_track_pose() {
        let (armature, pose, _timelines) = two_bone_scene();
        let (_viewport, view_proj, _eye) = look_down_z();
        let mut set = MarkerSet::new(&armature);
        set.refresh(&armature, &pose, &view_proj, &refresh_params(None));

        let child_marker = set.markers()[1];
        assert!((child_marker.position3d - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-5);
        assert!(child_marker.visible);
        // Child head is above the view center, so NDC y is positive.
        assert!(child_marker.position_ndc.y > 0.0);
    }

    #[test]
    fn test_axis_markers_hidden_without_selection() {
        let (armature, pose, _timelines) = two_bone_scene();
        let (_viewport, view_proj, _eye) = look_down_z();
        let mut set = MarkerSet::new(&armature);

        set.refresh(&armature, &pose, &view_proj, &refresh_params(None));
        for marker in set.markers() {
            if let MarkerOwner::Axis(_) = marker.owner {
                assert!(!marker.visible && !marker.clickable);
            }
        }

        set.refresh(&armature, &pose, &view_proj, &refresh_params(Some(0)));
        for marker in set.markers() {
            if let MarkerOwner::Axis(_) = marker.owner {
                assert!(marker.visible && marker.clickable);
            }
        }
    }

    #[test]
    fn test_locked_axis_marker_not_clickable() {
        let (armature, pose, _timelines) = two_bone_scene();
        let (_viewport, view_proj, _eye) = look_down_z();
        let mut set = MarkerSet::new(&armature);

        // Child locks rotation about Y; with the rotate gizmo up, that
        // handle must not be clickable while the others stay live.
        let params = MarkerRefresh {
            gizmo_kind: GizmoKind::Rotate,
            ..refresh_params(Some(1))
        };
        set.refresh(&armature, &pose, &view_proj, &params);
        for marker in set.markers() {
            if let MarkerOwner::Axis(axis) = marker.owner {
                assert_eq!(marker.clickable, axis != Axis::Y);
            }
        }
    }

    #[test]
    fn test_pick_precedence_beats_distance() {
        let (armature, _pose, _timelines) = two_bone_scene();
        let (viewport, view_proj, eye) = look_down_z();
        let mut set = MarkerSet::new(&armature);

        // Hand-place an axis handle behind a bone marker on the same ray:
        // the handle must win even though the bone is nearer.
        for marker in &mut set.markers {
            marker.visible = true;
            marker.clickable = true;
            marker.radius = 0.3;
            match marker.owner {
                MarkerOwner::Bone(0) => marker.position3d = Point3::new(0.0, 0.0, 2.0),
                MarkerOwner::Axis(Axis::X) => marker.position3d = Point3::new(0.0, 0.0, -3.0),
                _ => marker.position3d = Point3::new(50.0, 50.0, 0.0),
            }
        }
        let hit = set
            .pick(&viewport, &view_proj, eye, Vector2::new(400.0, 300.0))
            .unwrap();
        assert_eq!(set.markers()[hit].owner, MarkerOwner::Axis(Axis::X));
    }

    #[test]
    fn test_pick_same_type_nearer_wins() {
        let (armature, _pose, _timelines) = two_bone_scene();
        let (viewport, view_proj, eye) = look_down_z();
        let mut set = MarkerSet::new(&armature);

        for marker in &mut set.markers {
            match marker.owner {
                MarkerOwner::Bone(0) => {
                    marker.position3d = Point3::new(0.0, 0.0, 2.0);
                    marker.visible = true;
                    marker.radius = 0.3;
                }
                MarkerOwner::Bone(1) => {
                    marker.position3d = Point3::new(0.0, 0.0, -4.0);
                    marker.visible = true;
                    marker.radius = 0.3;
                }
                _ => {
                    marker.visible = false;
                    marker.clickable = false;
                }
            }
        }
        let hit = set
            .pick(&viewport, &view_proj, eye, Vector2::new(400.0, 300.0))
            .unwrap();
        assert_eq!(set.markers()[hit].owner, MarkerOwner::Bone(0));
    }

    #[test]
    fn test_pick_miss_is_none() {
        let (armature, pose, _timelines) = two_bone_scene();
        let (viewport, view_proj, eye) = look_down_z();
        let mut set = MarkerSet::new(&armature);
        set.refresh(&armature, &pose, &view_proj, &refresh_params(None));
        assert!(set
            .pick(&viewport, &view_proj, eye, Vector2::new(5.0, 5.0))
            .is_none());
    }
}
