use glam::{Vec2, Vec3};

/// Radians of rotation per pixel of pointer travel.
pub const DRAG_ROTATION_SCALE: f32 = 0.01;

/// Tracks a press-drag-release gesture and converts pointer travel into
/// crystal rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragRotation {
    anchor: Option<Vec2>,
}

impl DragRotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn press(&mut self, position: Vec2) {
        self.anchor = Some(position);
    }

    /// Moves the pointer to `position` and returns the Euler rotation delta
    /// to apply, or `None` when no button or touch is held.
    ///
    /// Horizontal travel turns the crystal around Y, vertical travel around X.
    pub fn drag_to(&mut self, position: Vec2) -> Option<Vec3> {
        let anchor = self.anchor.as_mut()?;
        let delta = position - *anchor;
        *anchor = position;
        Some(Vec3::new(
            delta.y * DRAG_ROTATION_SCALE,
            delta.x * DRAG_ROTATION_SCALE,
            0.0,
        ))
    }

    pub fn release(&mut self) {
        self.anchor = None;
    }

    /// Starts a drag from a touch gesture; multi-touch gestures are ignored.
    pub fn touch_start(&mut self, touches: &[Vec2]) {
        if let [touch] = touches {
            self.press(*touch);
        }
    }

    pub fn touch_move(&mut self, touches: &[Vec2]) -> Option<Vec3> {
        match touches {
            [touch] => self.drag_to(*touch),
            _ => None,
        }
    }
}
