//! Picking the pet up with the mouse and throwing it.

use bevy::prelude::*;

use crate::config::DragConfig;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Grip {
    /// Pointer position relative to the pet's top-left corner.
    offset: Vec2,
    last_delta: Vec2,
}

#[derive(Debug, Default)]
pub struct DragController {
    inertia: f32,
    grip: Option<Grip>,
}

impl DragController {
    pub fn new(cfg: &DragConfig) -> Self {
        Self {
            inertia: cfg.inertia,
            grip: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.grip.is_some()
    }

    pub fn last_delta(&self) -> Vec2 {
        self.grip.map(|g| g.last_delta).unwrap_or(Vec2::ZERO)
    }

    /// Start a drag if `pointer` is over the pet.
    pub fn press(&mut self, pointer: Vec2, position: Vec2, size: Vec2) -> bool {
        let offset = pointer - position;
        let inside = offset.x >= 0.0 && offset.y >= 0.0 && offset.x < size.x && offset.y < size.y;
        if inside {
            self.grip = Some(Grip {
                offset,
                last_delta: Vec2::ZERO,
            });
        }
        inside
    }

    /// Where the pet should be for this pointer position, remembering how far
    /// it moved since the previous frame.
    pub fn follow(&mut self, pointer: Vec2, position: Vec2) -> Option<Vec2> {
        let grip = self.grip.as_mut()?;
        let next = pointer - grip.offset;
        grip.last_delta = next - position;
        Some(next)
    }

    /// Let go. Returns the throw velocity: the last frame's movement, damped.
    pub fn release(&mut self) -> Option<Vec2> {
        let grip = self.grip.take()?;
        Some(grip.last_delta * self.inertia)
    }
}
