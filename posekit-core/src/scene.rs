/// Per-frame orchestration of the viewport engine
use log::warn;
use nalgebra::Matrix4;

use crate::armature::{Armature, ArmatureDescriptor};
use crate::camera::FlyCamera;
use crate::error::Result;
use crate::gizmo::{DragContext, Gizmo, GizmoKind};
use crate::input::InputState;
use crate::keyframe::{Keyframe, TimelineSet};
use crate::marker::{MarkerOwner, MarkerRefresh, MarkerSet};
use crate::pose::{PoseBuffer, PoseInputs};
use crate::raycast::Viewport;
use crate::transform::Transform;

/// Keyframes advanced per second while playback runs.
pub const PLAYBACK_FPS: f32 = 12.0;

/// Read-only per-frame snapshot of the host UI state. The core never
/// reaches for ambient state; everything it may react to arrives here.
#[derive(Debug, Clone)]
pub struct FrameEnv {
    pub selected_bone: Option<String>,
    pub gizmo_kind: GizmoKind,
    pub gizmo_size: f32,
    pub marker_radius: f32,
    pub move_speed: f32,
    pub rotate_speed: f32,
    pub show_debug_markers: bool,
    pub playing: bool,
    pub current_frame: u32,
    pub preview_range: (u32, u32),
    pub use_slerp: bool,
}

impl Default for FrameEnv {
    fn default() -> Self {
        Self {
            selected_bone: None,
            gizmo_kind: GizmoKind::Move,
            gizmo_size: 1.0,
            marker_radius: 0.1,
            move_speed: 3.0,
            rotate_speed: 0.25,
            show_debug_markers: false,
            playing: false,
            current_frame: 0,
            preview_range: (0, 0),
            use_slerp: true,
        }
    }
}

/// What a frame tick reports back to the host.
#[derive(Debug, Clone, Default)]
pub struct FrameEvents {
    /// A bone marker was clicked; the host should select this bone.
    pub selection_request: Option<String>,
}

/// The viewport engine: owns the armature, pose scratch, markers, gizmo
/// and camera, and runs them in a fixed order once per host frame
/// callback. All mutation happens inside [`Scene::advance`]; host event
/// handlers only record into the input state.
pub struct Scene {
    armature: Armature,
    timelines: TimelineSet,
    pose: PoseBuffer,
    markers: MarkerSet,
    gizmo: Gizmo,
    camera: FlyCamera,
    input: InputState,
    viewport: Viewport,
    playhead: f32,
    selected: Option<usize>,
    view_proj: Matrix4<f32>,
}

impl Scene {
    /// Build a scene from a host-supplied armature descriptor. Any
    /// structural problem with the armature aborts construction here;
    /// nothing degraded is ever rendered.
    pub fn new(descriptor: &ArmatureDescriptor) -> Result<Self> {
        let armature = Armature::from_descriptor(descriptor)?;
        let timelines = TimelineSet::with_bone_count(armature.len());
        let markers = MarkerSet::new(&armature);
        Ok(Self {
            armature,
            timelines,
            pose: PoseBuffer::new(),
            markers,
            gizmo: Gizmo::new(),
            camera: FlyCamera::new(),
            input: InputState::new(),
            viewport: Viewport::new(800.0, 600.0),
            playhead: 0.0,
            selected: None,
            view_proj: Matrix4::identity(),
        })
    }

    /// Where host event handlers record key and mouse events.
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Run one frame: drain input, update camera and playhead, evaluate
    /// the pose, apply the gizmo interaction, refresh markers.
    ///
    /// Picking resolves against the previous frame's marker positions and
    /// view-projection matrix, which is what was on screen when the user
    /// clicked.
    pub fn advance(&mut self, dt: f32, env: &FrameEnv) -> FrameEvents {
        let input = self.input.take_frame();
        let mut events = FrameEvents::default();

        // Selection comes from the env; changing it cancels any drag.
        let selected = self.resolve_selection(env);
        if selected != self.selected {
            self.gizmo.end_drag();
            self.selected = selected;
        }

        // Mouse-down: a gizmo handle starts a drag, a bone marker asks the
        // host to change selection, anything else begins a camera drag.
        if let Some(pixel) = input.pressed_at {
            let hit = self
                .markers
                .pick(&self.viewport, &self.view_proj, self.camera.position, pixel);
            match hit.map(|index| self.markers.markers()[index].owner) {
                Some(MarkerOwner::Axis(axis)) => {
                    if let Some(bone) = self.selected {
                        self.gizmo.begin_drag(
                            axis,
                            env.gizmo_kind,
                            &self.armature.bone(bone).locks,
                            pixel,
                        );
                    }
                }
                Some(MarkerOwner::Bone(bone)) => {
                    events.selection_request = Some(self.armature.bone(bone).name.clone());
                }
                Some(MarkerOwner::Debug) | None => {}
            }
        }
        if input.released || input.left_canvas {
            self.gizmo.end_drag();
        }

        // Camera: keys always move; the mouse only orbits while the button
        // is held on empty space, never during a gizmo drag.
        self.camera.update(dt, env.move_speed, &input.keys);
        if input.primary_down && !self.gizmo.is_dragging() {
            self.camera
                .look(input.mouse_delta.x, input.mouse_delta.y, env.rotate_speed);
        }
        self.view_proj = self
            .camera
            .projection_matrix(self.viewport.width, self.viewport.height)
            * self.camera.view_matrix();

        self.update_playhead(dt, env);

        // Pose evaluation consumes the displacement as it stands; the drag
        // math below refreshes it from the evaluated pose for the next
        // tick.
        let dragged_bone = if self.gizmo.is_dragging() {
            self.selected
        } else {
            None
        };
        let inputs = PoseInputs {
            timelines: &self.timelines,
            playhead: self.playhead,
            use_slerp: env.use_slerp,
            dragged_bone,
            displacement: *self.gizmo.displacement(),
        };
        self.pose.evaluate(&self.armature, &inputs);

        if let Some(bone) = dragged_bone {
            let ctx = DragContext {
                viewport: self.viewport,
                view_proj: self.view_proj,
                camera_position: self.camera.position,
                subject_position: self.pose.world_position_of(&self.armature, bone),
                subject_rotation: self.pose.global_rotation_of(bone),
                gizmo_size: env.gizmo_size,
            };
            self.gizmo.update_drag(&ctx, input.mouse_pos);
        }

        let refresh = MarkerRefresh {
            selected: self.selected,
            gizmo_kind: env.gizmo_kind,
            gizmo_size: env.gizmo_size,
            marker_radius: env.marker_radius,
            show_debug: env.show_debug_markers,
        };
        self.markers
            .refresh(&self.armature, &self.pose, &self.view_proj, &refresh);

        events
    }

    fn resolve_selection(&self, env: &FrameEnv) -> Option<usize> {
        let name = env.selected_bone.as_deref()?;
        let index = self.armature.index_of(name);
        if index.is_none() {
            warn!("selected bone '{name}' does not exist in the armature");
        }
        index
    }

    fn update_playhead(&mut self, dt: f32, env: &FrameEnv) {
        if !env.playing {
            self.playhead = env.current_frame as f32;
            return;
        }
        let (start, end) = env.preview_range;
        let span = end.saturating_sub(start) as f32;
        if span <= 0.0 {
            self.playhead = start as f32;
            return;
        }
        let advanced = self.playhead + dt * PLAYBACK_FPS;
        self.playhead = start as f32 + (advanced - start as f32).rem_euclid(span);
    }

    // --- Renderer-facing state ---

    pub fn skinning_matrices(&self) -> &[Matrix4<f32>] {
        self.pose.finals()
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.camera.view_matrix()
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.camera
            .projection_matrix(self.viewport.width, self.viewport.height)
    }

    pub fn armature(&self) -> &Armature {
        &self.armature
    }

    pub fn playhead(&self) -> f32 {
        self.playhead
    }

    // --- Keyframe bridge ---

    /// Snapshot a bone's current animated local transform, drag
    /// displacement included. This is what "record keyframe" in the host
    /// UI reads.
    pub fn capture_keyframe(&self, bone: &str, frame_id: u32) -> Result<Keyframe> {
        let index = self.armature.require(bone)?;
        Ok(Keyframe::capture(frame_id, self.pose.local_of(index)))
    }

    pub fn store_keyframe(&mut self, bone: &str, keyframe: Keyframe) -> Result<()> {
        let index = self.armature.require(bone)?;
        self.timelines.timeline_mut(index).insert(keyframe);
        Ok(())
    }

    pub fn remove_keyframe(&mut self, bone: &str, frame_id: u32) -> Result<bool> {
        let index = self.armature.require(bone)?;
        Ok(self.timelines.timeline_mut(index).remove(frame_id).is_some())
    }

    pub fn timelines(&self) -> &TimelineSet {
        &self.timelines
    }

    /// The live displaced local transform of a bone, for hosts that read
    /// the pose directly instead of going through keyframe capture.
    pub fn live_local_transform(&self, bone: &str) -> Result<Transform> {
        let index = self.armature.require(bone)?;
        Ok(*self.pose.local_of(index))
    }
}
