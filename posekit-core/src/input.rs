/// Input recording, decoupled from the frame tick
use nalgebra::Vector2;

/// Navigation keys of the fixed camera keymap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl NavKey {
    /// Map a browser `KeyboardEvent.code` onto the keymap.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "KeyW" => Some(NavKey::Forward),
            "KeyS" => Some(NavKey::Back),
            "KeyA" => Some(NavKey::Left),
            "KeyD" => Some(NavKey::Right),
            "KeyE" => Some(NavKey::Up),
            "KeyQ" => Some(NavKey::Down),
            _ => None,
        }
    }

    fn index(&self) -> usize {
        match self {
            NavKey::Forward => 0,
            NavKey::Back => 1,
            NavKey::Left => 2,
            NavKey::Right => 3,
            NavKey::Up => 4,
            NavKey::Down => 5,
        }
    }
}

/// Snapshot of which navigation keys are held.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyState {
    down: [bool; 6],
}

impl KeyState {
    pub fn is_down(&self, key: NavKey) -> bool {
        self.down[key.index()]
    }
}

/// Everything one frame tick consumes. Deltas and one-shot events are
/// drained out of the recorder; held state is copied.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub keys: KeyState,
    pub mouse_pos: Vector2<f32>,
    pub mouse_delta: Vector2<f32>,
    pub primary_down: bool,
    /// Pixel of a mouse-down that arrived since the last tick.
    pub pressed_at: Option<Vector2<f32>>,
    pub released: bool,
    pub left_canvas: bool,
}

/// Records host input events as they arrive; the frame tick drains it.
///
/// Handlers only ever write flags and deltas here, so event arrival rate
/// is decoupled from the simulation rate and no event can mutate scene
/// state mid-frame.
#[derive(Debug, Default)]
pub struct InputState {
    keys: KeyState,
    mouse_pos: Vector2<f32>,
    mouse_delta: Vector2<f32>,
    primary_down: bool,
    pressed_at: Option<Vector2<f32>>,
    released: bool,
    left_canvas: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_event(&mut self, code: &str, down: bool) {
        if let Some(key) = NavKey::from_code(code) {
            self.keys.down[key.index()] = down;
        }
    }

    pub fn mouse_moved(&mut self, x: f32, y: f32, dx: f32, dy: f32) {
        self.mouse_pos = Vector2::new(x, y);
        self.mouse_delta += Vector2::new(dx, dy);
    }

    pub fn mouse_pressed(&mut self, x: f32, y: f32) {
        self.mouse_pos = Vector2::new(x, y);
        self.primary_down = true;
        self.pressed_at = Some(self.mouse_pos);
    }

    pub fn mouse_released(&mut self) {
        self.primary_down = false;
        self.released = true;
    }

    pub fn mouse_left_canvas(&mut self) {
        self.primary_down = false;
        self.left_canvas = true;
    }

    /// Drain one tick's worth of input.
    pub fn take_frame(&mut self) -> FrameInput {
        let frame = FrameInput {
            keys: self.keys,
            mouse_pos: self.mouse_pos,
            mouse_delta: self.mouse_delta,
            primary_down: self.primary_down,
            pressed_at: self.pressed_at.take(),
            released: self.released,
            left_canvas: self.left_canvas,
        };
        self.mouse_delta = Vector2::zeros();
        self.released = false;
        self.left_canvas = false;
        frame
    }
}
