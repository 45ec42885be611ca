/// Posekit Web - WASM bridge between the pose engine and the browser host
///
/// The JS side owns the render loop, the WebGL resources and the UI store.
/// It records DOM events into this bridge as they arrive, calls `tick`
/// once per animation frame, and reads the resulting flat buffers
/// (skinning matrices, marker instances, camera matrices) by pointer.
use posekit_core::{ArmatureDescriptor, FrameEnv, GizmoKind, Keyframe, KeyframeData, Scene};
use wasm_bindgen::prelude::*;

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Debug
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let line = format!("[{}] {}", record.level(), record.args());
            web_sys::console::log_1(&line.into());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

#[wasm_bindgen(start)]
pub fn init() {
    // Route panics and log records to the browser console.
    console_error_panic_hook::set_once();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

fn parse_gizmo_kind(name: &str) -> Result<GizmoKind, String> {
    match name {
        "move" => Ok(GizmoKind::Move),
        "rotate" => Ok(GizmoKind::Rotate),
        "scale" => Ok(GizmoKind::Scale),
        other => Err(format!("unknown gizmo kind '{other}'")),
    }
}

fn js_err(message: String) -> JsValue {
    JsValue::from_str(&message)
}

/// Number of floats per marker instance:
/// `[ndc_x, ndc_y, radius, visible, r, g, b, a]`.
pub const MARKER_STRIDE: usize = 8;

#[wasm_bindgen]
pub struct WebEditor {
    scene: Scene,
    env: FrameEnv,
    skinning: Vec<f32>,
    marker_instances: Vec<f32>,
    camera_data: Vec<f32>,
    selection_request: Option<String>,
}

// Internals shared by the exported bindings and the native test suite;
// everything fallible reports plain strings and only the wasm boundary
// converts them to JsValue.
impl WebEditor {
    fn from_json(armature_json: &str) -> Result<WebEditor, String> {
        let descriptor: ArmatureDescriptor =
            serde_json::from_str(armature_json).map_err(|e| e.to_string())?;
        let scene = Scene::new(&descriptor).map_err(|e| e.to_string())?;
        Ok(WebEditor {
            scene,
            env: FrameEnv::default(),
            skinning: Vec::new(),
            marker_instances: Vec::new(),
            camera_data: Vec::new(),
            selection_request: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_env(
        &mut self,
        selected_bone: Option<String>,
        gizmo_kind: &str,
        gizmo_size: f32,
        marker_radius: f32,
        move_speed: f32,
        rotate_speed: f32,
        show_debug_markers: bool,
        playing: bool,
        current_frame: u32,
        preview_range: (u32, u32),
        use_slerp: bool,
    ) -> Result<(), String> {
        self.env = FrameEnv {
            selected_bone,
            gizmo_kind: parse_gizmo_kind(gizmo_kind)?,
            gizmo_size,
            marker_radius,
            move_speed,
            rotate_speed,
            show_debug_markers,
            playing,
            current_frame,
            preview_range,
            use_slerp,
        };
        Ok(())
    }

    fn record_keyframe_impl(&mut self, bone: &str, frame_id: u32) -> Result<String, String> {
        let keyframe = self
            .scene
            .capture_keyframe(bone, frame_id)
            .map_err(|e| e.to_string())?;
        self.scene
            .store_keyframe(bone, keyframe)
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&KeyframeData::from(&keyframe)).map_err(|e| e.to_string())
    }

    fn load_keyframe_impl(&mut self, bone: &str, keyframe_json: &str) -> Result<(), String> {
        let data: KeyframeData =
            serde_json::from_str(keyframe_json).map_err(|e| e.to_string())?;
        self.scene
            .store_keyframe(bone, Keyframe::from(&data))
            .map_err(|e| e.to_string())
    }

    fn remove_keyframe_impl(&mut self, bone: &str, frame_id: u32) -> Result<bool, String> {
        self.scene
            .remove_keyframe(bone, frame_id)
            .map_err(|e| e.to_string())
    }

    fn timeline_json_impl(&self, bone: &str) -> Result<String, String> {
        let index = self
            .scene
            .armature()
            .index_of(bone)
            .ok_or_else(|| format!("unknown bone '{bone}'"))?;
        let keys: Vec<KeyframeData> = self
            .scene
            .timelines()
            .timeline(index)
            .keys()
            .iter()
            .map(KeyframeData::from)
            .collect();
        serde_json::to_string(&keys).map_err(|e| e.to_string())
    }

    fn refresh_buffers(&mut self) {
        self.skinning.clear();
        for matrix in self.scene.skinning_matrices() {
            self.skinning.extend_from_slice(matrix.as_slice());
        }

        self.marker_instances.clear();
        for marker in self.scene.markers().markers() {
            self.marker_instances.extend_from_slice(&[
                marker.position_ndc.x,
                marker.position_ndc.y,
                marker.radius,
                if marker.visible { 1.0 } else { 0.0 },
                marker.color[0],
                marker.color[1],
                marker.color[2],
                marker.color[3],
            ]);
        }

        self.camera_data.clear();
        self.camera_data
            .extend_from_slice(self.scene.view_matrix().as_slice());
        self.camera_data
            .extend_from_slice(self.scene.projection_matrix().as_slice());
    }
}

#[wasm_bindgen]
impl WebEditor {
    /// Build an editor from an armature descriptor in JSON form (named
    /// bones forming a tree, optional TRS, optional inverse bind matrix
    /// per joint). A malformed armature fails here, before the first
    /// frame, with a readable message.
    #[wasm_bindgen(constructor)]
    pub fn new(armature_json: &str) -> Result<WebEditor, JsValue> {
        Self::from_json(armature_json).map_err(js_err)
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.scene.set_viewport(width, height);
        }
    }

    /// Replace the per-frame UI snapshot. Called whenever the host store
    /// changes; the values are only read during `tick`.
    #[allow(clippy::too_many_arguments)]
    pub fn set_env(
        &mut self,
        selected_bone: Option<String>,
        gizmo_kind: &str,
        gizmo_size: f32,
        marker_radius: f32,
        move_speed: f32,
        rotate_speed: f32,
        show_debug_markers: bool,
        playing: bool,
        current_frame: u32,
        preview_start: u32,
        preview_end: u32,
        use_slerp: bool,
    ) -> Result<(), JsValue> {
        self.apply_env(
            selected_bone,
            gizmo_kind,
            gizmo_size,
            marker_radius,
            move_speed,
            rotate_speed,
            show_debug_markers,
            playing,
            current_frame,
            (preview_start, preview_end),
            use_slerp,
        )
        .map_err(js_err)
    }

    // --- Input recording (consumed at the next tick) ---

    pub fn key_event(&mut self, code: &str, down: bool) {
        self.scene.input_mut().key_event(code, down);
    }

    pub fn mouse_move(&mut self, x: f32, y: f32, dx: f32, dy: f32) {
        self.scene.input_mut().mouse_moved(x, y, dx, dy);
    }

    pub fn mouse_down(&mut self, x: f32, y: f32) {
        self.scene.input_mut().mouse_pressed(x, y);
    }

    pub fn mouse_up(&mut self) {
        self.scene.input_mut().mouse_released();
    }

    pub fn mouse_leave(&mut self) {
        self.scene.input_mut().mouse_left_canvas();
    }

    // --- Frame tick ---

    /// Run one frame and refresh the output buffers. `dt` is in seconds.
    pub fn tick(&mut self, dt: f32) {
        let events = self.scene.advance(dt, &self.env);
        if events.selection_request.is_some() {
            self.selection_request = events.selection_request;
        }
        self.refresh_buffers();
    }

    /// A bone name the user clicked since the last call, if any. The host
    /// reads this after `tick` and updates its selection store.
    pub fn take_selection_request(&mut self) -> Option<String> {
        self.selection_request.take()
    }

    // --- Output buffers (read zero-copy from the wasm heap) ---

    /// Bone-index-aligned skinning matrices, 16 floats each, column-major.
    pub fn skinning_ptr(&self) -> *const f32 {
        self.skinning.as_ptr()
    }
    pub fn skinning_len(&self) -> usize {
        self.skinning.len()
    }

    /// Marker instances for instanced drawing, [`MARKER_STRIDE`] floats each.
    pub fn markers_ptr(&self) -> *const f32 {
        self.marker_instances.as_ptr()
    }
    pub fn markers_len(&self) -> usize {
        self.marker_instances.len()
    }

    /// View matrix followed by projection matrix, 32 floats.
    pub fn camera_ptr(&self) -> *const f32 {
        self.camera_data.as_ptr()
    }
    pub fn camera_len(&self) -> usize {
        self.camera_data.len()
    }

    // --- Keyframe bridge ---

    /// Snapshot a bone's live local transform (drag displacement included)
    /// into its timeline at `frame_id`, returning the stored keyframe as
    /// JSON for the host's own timeline store.
    pub fn record_keyframe(&mut self, bone: &str, frame_id: u32) -> Result<String, JsValue> {
        self.record_keyframe_impl(bone, frame_id).map_err(js_err)
    }

    /// Insert a keyframe the host already owns (e.g. from persistence).
    pub fn load_keyframe(&mut self, bone: &str, keyframe_json: &str) -> Result<(), JsValue> {
        self.load_keyframe_impl(bone, keyframe_json).map_err(js_err)
    }

    pub fn remove_keyframe(&mut self, bone: &str, frame_id: u32) -> Result<bool, JsValue> {
        self.remove_keyframe_impl(bone, frame_id).map_err(js_err)
    }

    /// All keyframes of one bone as a JSON array, ascending by frame id.
    pub fn timeline_json(&self, bone: &str) -> Result<String, JsValue> {
        self.timeline_json_impl(bone).map_err(js_err)
    }
}
