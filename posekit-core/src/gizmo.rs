/// Gizmo axes and the drag-to-transform state machine
use log::debug;
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector2, Vector3};
use std::f32::consts::FRAC_1_SQRT_2;

use crate::raycast::{Plane, Ray, Viewport};
use crate::transform::Transform;

/// Manipulation axis. The enum is closed: an unknown axis is
/// unrepresentable, not a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(&self) -> Vector3<f32> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }

    /// Conventional handle color (X red, Y green, Z blue).
    pub fn color(&self) -> [f32; 4] {
        match self {
            Axis::X => [1.0, 0.2, 0.2, 1.0],
            Axis::Y => [0.2, 1.0, 0.2, 1.0],
            Axis::Z => [0.2, 0.5, 1.0, 1.0],
        }
    }
}

/// Which transform channel the gizmo manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoKind {
    Move,
    Rotate,
    Scale,
}

/// Per-bone manipulation locks. A locked axis is reported non-clickable
/// and a drag on it never starts. Scale is never locked.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisLocks {
    pub rotation: [bool; 3],
    pub translation: [bool; 3],
}

impl AxisLocks {
    pub fn allows(&self, kind: GizmoKind, axis: Axis) -> bool {
        match kind {
            GizmoKind::Move => !self.translation[axis.index()],
            GizmoKind::Rotate => !self.rotation[axis.index()],
            GizmoKind::Scale => true,
        }
    }
}

/// The fixed local point a handle is picked at: the arrow tip for Move and
/// Scale, a 45-degree quadrant point on the ring for Rotate.
pub fn handle_point(kind: GizmoKind, axis: Axis, size: f32) -> Point3<f32> {
    match kind {
        GizmoKind::Move | GizmoKind::Scale => Point3::from(axis.unit() * size),
        GizmoKind::Rotate => {
            let [u, v] = ring_axes(axis);
            Point3::from((u + v) * (size * FRAC_1_SQRT_2))
        }
    }
}

/// The two unit axes spanning the ring plane of a rotation axis.
fn ring_axes(axis: Axis) -> [Vector3<f32>; 2] {
    match axis {
        Axis::X => [Vector3::y(), Vector3::z()],
        Axis::Y => [Vector3::z(), Vector3::x()],
        Axis::Z => [Vector3::x(), Vector3::y()],
    }
}

/// World position of a handle point. Move handles are world-axis aligned;
/// Rotate and Scale handles follow the subject's orientation.
pub fn handle_world(
    kind: GizmoKind,
    axis: Axis,
    size: f32,
    subject_position: Point3<f32>,
    subject_rotation: UnitQuaternion<f32>,
) -> Point3<f32> {
    let local = handle_point(kind, axis, size);
    match kind {
        GizmoKind::Move => subject_position + local.coords,
        GizmoKind::Rotate | GizmoKind::Scale => subject_position + subject_rotation * local.coords,
    }
}

/// Everything the drag math needs about the current frame, captured fresh
/// each tick since the subject itself may be moving.
#[derive(Debug, Clone, Copy)]
pub struct DragContext {
    pub viewport: Viewport,
    pub view_proj: Matrix4<f32>,
    pub camera_position: Point3<f32>,
    pub subject_position: Point3<f32>,
    pub subject_rotation: UnitQuaternion<f32>,
    pub gizmo_size: f32,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    axis: Axis,
    kind: GizmoKind,
    /// Pixel of the initiating mouse-down. Every update reprojects from
    /// here, so the displacement is always first-click-to-now, never a sum
    /// of per-event deltas.
    anchor_pixel: Vector2<f32>,
}

/// Idle/Dragging state machine turning mouse drags into transform deltas.
///
/// The displacement is transient and visual: nothing is committed on
/// mouse-up, the state just returns to Idle with an identity displacement.
/// Persisting the displaced pose into a keyframe is the host's decision.
#[derive(Debug, Default)]
pub struct Gizmo {
    drag: Option<DragState>,
    temporary: Transform,
}

impl Gizmo {
    pub fn new() -> Self {
        Self {
            drag: None,
            temporary: Transform::identity(),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn dragged_axis(&self) -> Option<Axis> {
        self.drag.map(|d| d.axis)
    }

    /// The current drag delta; identity while idle.
    pub fn displacement(&self) -> &Transform {
        &self.temporary
    }

    /// Enter the Dragging state. Returns false (and stays Idle) when the
    /// subject's locks forbid this kind/axis pair.
    pub fn begin_drag(
        &mut self,
        axis: Axis,
        kind: GizmoKind,
        locks: &AxisLocks,
        anchor_pixel: Vector2<f32>,
    ) -> bool {
        if !locks.allows(kind, axis) {
            debug!("drag rejected: {:?} {:?} is locked", kind, axis);
            return false;
        }
        debug!("drag begin: {:?} {:?}", kind, axis);
        self.drag = Some(DragState {
            axis,
            kind,
            anchor_pixel,
        });
        self.temporary = Transform::identity();
        true
    }

    /// Leave the Dragging state, clearing the displacement. Also called
    /// when the selection changes or the pointer leaves the canvas.
    pub fn end_drag(&mut self) {
        if self.drag.take().is_some() {
            debug!("drag end");
        }
        self.temporary = Transform::identity();
    }

    /// Recompute the displacement for the current pointer position.
    ///
    /// Projects the anchor pixel and the current pixel onto a plane built
    /// around the drag axis facing the camera, then derives the delta per
    /// gizmo kind. The result is set, not accumulated: a later call fully
    /// replaces an earlier one. Degenerate rays (non-invertible camera)
    /// leave the previous displacement untouched.
    pub fn update_drag(&mut self, ctx: &DragContext, current_pixel: Vector2<f32>) {
        let Some(drag) = self.drag else {
            return;
        };

        let axis_dir = match drag.kind {
            GizmoKind::Move => drag.axis.unit(),
            GizmoKind::Rotate | GizmoKind::Scale => ctx.subject_rotation * drag.axis.unit(),
        };
        let axis_ray = Ray::new(ctx.subject_position, axis_dir);
        let plane = Plane::around_axis_toward(&axis_ray, ctx.camera_position);

        let anchor_ray = Ray::from_camera(&ctx.viewport, &ctx.view_proj, drag.anchor_pixel);
        let current_ray = Ray::from_camera(&ctx.viewport, &ctx.view_proj, current_pixel);
        let (Some(anchor_ray), Some(current_ray)) = (anchor_ray, current_ray) else {
            return;
        };

        let anchor_hit = plane.intersect_ray(&anchor_ray);
        let current_hit = plane.intersect_ray(&current_ray);

        match drag.kind {
            GizmoKind::Move => {
                let from = axis_ray.project_point(anchor_hit);
                let to = axis_ray.project_point(current_hit);
                self.temporary.position = to - from;
            }
            GizmoKind::Rotate => {
                let from = anchor_hit - ctx.subject_position;
                let to = current_hit - ctx.subject_position;
                self.temporary.rotation = UnitQuaternion::rotation_between(&from, &to)
                    .unwrap_or_else(UnitQuaternion::identity);
            }
            GizmoKind::Scale => {
                let from = axis_ray.project_point(anchor_hit);
                let to = axis_ray.project_point(current_hit);
                let stretch = (to - from).dot(&axis_dir) / ctx.gizmo_size.max(1e-6);
                let mut scale = Vector3::new(1.0, 1.0, 1.0);
                scale[drag.axis.index()] = 1.0 + stretch;
                self.temporary.scale = scale;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;
    use std::f32::consts::FRAC_PI_2;

    fn test_context() -> DragContext {
        let eye = Point3::new(0.0, 0.0, 10.0);
        let view = Matrix4::look_at_rh(&eye, &Point3::origin(), &Vector3::y());
        let proj = Matrix4::new_perspective(800.0 / 600.0, FRAC_PI_2 * 0.5, 0.1, 100.0);
        DragContext {
            viewport: Viewport::new(800.0, 600.0),
            view_proj: proj * view,
            camera_position: eye,
            subject_position: Point3::origin(),
            subject_rotation: UnitQuaternion::identity(),
            gizmo_size: 1.0,
        }
    }

    #[test]
    fn test_move_drag_overwrites_not_accumulates() {
        let ctx = test_context();
        let anchor = Vector2::new(400.0, 300.0);

        let mut dragged = Gizmo::new();
        assert!(dragged.begin_drag(Axis::X, GizmoKind::Move, &AxisLocks::default(), anchor));
        dragged.update_drag(&ctx, Vector2::new(500.0, 300.0));
        let after_far = dragged.displacement().position;
        dragged.update_drag(&ctx, Vector2::new(440.0, 300.0));
        let after_back = dragged.displacement().position;

        // Equivalent to a single drag straight to the final pixel.
        let mut direct = Gizmo::new();
        assert!(direct.begin_drag(Axis::X, GizmoKind::Move, &AxisLocks::default(), anchor));
        direct.update_drag(&ctx, Vector2::new(440.0, 300.0));
        let single = direct.displacement().position;

        assert!((after_back - single).norm() < 1e-5);
        assert!(after_back.x < after_far.x);
        // Constrained to the X axis.
        assert!(after_back.y.abs() < 1e-5 && after_back.z.abs() < 1e-5);
        assert!(after_back.x > 0.0);
    }

    #[test]
    fn test_rotate_drag_shortest_arc() {
        let ctx = test_context();
        // Anchor to the right of the subject, current above it: the plane
        // hits are +X-ish and +Y-ish, so the shortest arc is a quarter turn
        // about the camera-facing plane normal (+Z here).
        let mut gizmo = Gizmo::new();
        assert!(gizmo.begin_drag(
            Axis::X,
            GizmoKind::Rotate,
            &AxisLocks::default(),
            Vector2::new(500.0, 300.0),
        ));
        gizmo.update_drag(&ctx, Vector2::new(400.0, 200.0));

        let rotation = gizmo.displacement().rotation;
        assert!((rotation.angle() - FRAC_PI_2).abs() < 1e-3);
        let axis = rotation.axis().unwrap();
        assert!((axis.into_inner() - Vector3::z()).norm() < 1e-3);
    }

    #[test]
    fn test_scale_drag_stretches_axis() {
        let ctx = test_context();
        let mut gizmo = Gizmo::new();
        assert!(gizmo.begin_drag(
            Axis::X,
            GizmoKind::Scale,
            &AxisLocks::default(),
            Vector2::new(400.0, 300.0),
        ));
        gizmo.update_drag(&ctx, Vector2::new(500.0, 300.0));
        let scale = gizmo.displacement().scale;
        assert!(scale.x > 1.0);
        assert!((scale.y - 1.0).abs() < 1e-6 && (scale.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_locked_axis_rejects_drag() {
        let ctx = test_context();
        let locks = AxisLocks {
            rotation: [false, true, false],
            translation: [false; 3],
        };
        let mut gizmo = Gizmo::new();
        assert!(!gizmo.begin_drag(
            Axis::Y,
            GizmoKind::Rotate,
            &locks,
            Vector2::new(400.0, 300.0),
        ));
        assert!(!gizmo.is_dragging());

        // A forced update while idle must leave the displacement identity.
        gizmo.update_drag(&ctx, Vector2::new(500.0, 300.0));
        assert_eq!(*gizmo.displacement(), Transform::identity());

        // The same axis is still draggable for Move.
        assert!(gizmo.begin_drag(Axis::Y, GizmoKind::Move, &locks, Vector2::new(400.0, 300.0)));
    }

    #[test]
    fn test_end_drag_clears_displacement() {
        let ctx = test_context();
        let mut gizmo = Gizmo::new();
        gizmo.begin_drag(
            Axis::X,
            GizmoKind::Move,
            &AxisLocks::default(),
            Vector2::new(400.0, 300.0),
        );
        gizmo.update_drag(&ctx, Vector2::new(450.0, 300.0));
        gizmo.end_drag();
        assert!(!gizmo.is_dragging());
        assert_eq!(*gizmo.displacement(), Transform::identity());
    }

    #[test]
    fn test_rotate_handle_sits_on_ring() {
        let p = handle_point(GizmoKind::Rotate, Axis::X, 2.0);
        // On the YZ ring of radius 2, at the 45-degree quadrant point.
        assert!(p.x.abs() < 1e-6);
        assert!((p.coords.norm() - 2.0).abs() < 1e-5);
        assert!((p.y - p.z).abs() < 1e-6);
    }
}
