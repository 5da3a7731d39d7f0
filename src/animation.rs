use bevy::prelude::*;
use serde::Serialize;
use std::time::Duration;

use crate::config::AnimationConfig;
use crate::error::PetError;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimState {
    #[default]
    Idle,
    Walk,
    Sit,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    /// Facing implied by horizontal motion, or `None` when barely moving.
    pub fn from_motion(dx: f32) -> Option<Self> {
        if dx > 0.1 {
            Some(Facing::Right)
        } else if dx < -0.1 {
            Some(Facing::Left)
        } else {
            None
        }
    }
}

/// Grid sprite sheet: one row per state, frames laid out left to right.
/// Sprites face right; left is drawn mirrored.
#[derive(Clone, Debug, PartialEq)]
pub struct SheetLayout {
    pub columns: usize,
    rows: [(usize, usize); 3],
}

impl SheetLayout {
    pub fn from_config(cfg: &AnimationConfig) -> Result<Self, PetError> {
        let rows = [
            (cfg.idle_row, cfg.idle_frames),
            (cfg.walk_row, cfg.walk_frames),
            (cfg.sit_row, cfg.sit_frames),
        ];
        for (state, (_, frames)) in [AnimState::Idle, AnimState::Walk, AnimState::Sit]
            .into_iter()
            .zip(rows)
        {
            if frames == 0 || frames > cfg.columns {
                return Err(PetError::NoFrames { state });
            }
        }
        Ok(Self {
            columns: cfg.columns,
            rows,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.iter().map(|(row, _)| row + 1).max().unwrap_or(0)
    }

    fn row(&self, state: AnimState) -> (usize, usize) {
        match state {
            AnimState::Idle => self.rows[0],
            AnimState::Walk => self.rows[1],
            AnimState::Sit => self.rows[2],
        }
    }

    pub fn frames(&self, state: AnimState) -> usize {
        self.row(state).1
    }

    pub fn atlas_index(&self, state: AnimState, frame: usize) -> usize {
        let (row, len) = self.row(state);
        row * self.columns + frame % len
    }
}

/// The sprite to show this frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Frame {
    pub atlas_index: usize,
    pub flip_x: bool,
}

/// Steps through the frames of the current state on a fixed interval,
/// independent of physics.
pub struct Animator {
    sheet: SheetLayout,
    state: AnimState,
    frame: usize,
    timer: Timer,
}

impl Animator {
    pub fn new(sheet: SheetLayout, interval: f32) -> Self {
        Self {
            sheet,
            state: AnimState::Idle,
            frame: 0,
            timer: Timer::from_seconds(interval, TimerMode::Repeating),
        }
    }

    pub fn update(&mut self, delta: Duration, state: AnimState, facing: Facing) -> Frame {
        if state != self.state {
            self.state = state;
            self.frame = 0;
            self.timer.reset();
        }
        self.timer.tick(delta);
        let len = self.sheet.frames(state);
        self.frame = (self.frame + self.timer.times_finished_this_tick() as usize) % len;
        Frame {
            atlas_index: self.sheet.atlas_index(state, self.frame),
            flip_x: facing == Facing::Left,
        }
    }
}
