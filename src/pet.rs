//! The pet as a whole: runs platform refresh, decisions, physics and
//! animation in a fixed order once per frame.

use bevy::prelude::*;
use std::time::Duration;

use crate::ai::{AiMode, DecisionController};
use crate::animation::{AnimState, Animator, Facing, Frame, SheetLayout};
use crate::config::PetConfig;
use crate::error::PetError;
use crate::interaction::DragController;
use crate::physics::{Body, PhysicsEngine};
use crate::platform::{PlatformManager, PlatformSet};
use crate::source::PlatformSource;
use crate::telemetry::{StatusEvent, TelemetrySink};

#[derive(Resource)]
pub struct Pet {
    platforms: PlatformManager,
    physics: PhysicsEngine,
    ai: DecisionController,
    drag: DragController,
    animator: Animator,
    sink: Box<dyn TelemetrySink>,
    recovery_margin: f32,
    state: AnimState,
    facing: Facing,
    frame: Frame,
}

impl Pet {
    pub fn new(
        cfg: &PetConfig,
        source: Box<dyn PlatformSource>,
        sink: Box<dyn TelemetrySink>,
    ) -> Result<Self, PetError> {
        let ai = DecisionController::new(cfg.ai.clone(), cfg.jump_physics());
        Self::with_controller(cfg, source, sink, ai)
    }

    /// Same as [`Pet::new`] with a reproducible decision sequence.
    pub fn seeded(
        cfg: &PetConfig,
        source: Box<dyn PlatformSource>,
        sink: Box<dyn TelemetrySink>,
        seed: u64,
    ) -> Result<Self, PetError> {
        let ai = DecisionController::seeded(cfg.ai.clone(), cfg.jump_physics(), seed);
        Self::with_controller(cfg, source, sink, ai)
    }

    fn with_controller(
        cfg: &PetConfig,
        source: Box<dyn PlatformSource>,
        sink: Box<dyn TelemetrySink>,
        ai: DecisionController,
    ) -> Result<Self, PetError> {
        cfg.validate()?;
        let sheet = SheetLayout::from_config(&cfg.animation)?;
        let spawn = Vec2::new(cfg.spawn.0, cfg.spawn.1);
        let size = Vec2::new(cfg.width, cfg.height);

        let platforms = PlatformManager::new(source, cfg.refresh.platform_interval, spawn);
        let mut animator = Animator::new(sheet, cfg.animation.frame_interval);
        let frame = animator.update(Duration::ZERO, AnimState::Idle, Facing::Right);

        Ok(Self {
            platforms,
            physics: PhysicsEngine::new(cfg.physics.clone(), Body::new(spawn, size)),
            ai,
            drag: DragController::new(&cfg.drag),
            animator,
            sink,
            recovery_margin: cfg.refresh.recovery_margin,
            state: AnimState::Idle,
            facing: Facing::Right,
            frame,
        })
    }

    pub fn position(&self) -> Vec2 {
        self.physics.body().position
    }

    pub fn body(&self) -> &Body {
        self.physics.body()
    }

    pub fn ai(&self) -> &DecisionController {
        &self.ai
    }

    pub fn platforms(&self) -> &PlatformManager {
        &self.platforms
    }

    pub fn state(&self) -> AnimState {
        self.state
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Advance one frame. Returns where the host window should be.
    pub fn tick(&mut self, dt: f32) -> Vec2 {
        if self.platforms.update(dt) {
            self.revalidate();
        }
        let platforms: PlatformSet = self.platforms.platforms().clone();

        if self.drag.is_dragging() {
            if let Some(facing) = Facing::from_motion(self.drag.last_delta().x) {
                self.facing = facing;
            }
        } else {
            let intent = self.ai.update(dt, self.physics.body(), &platforms);
            self.physics.apply(&intent);
            if let Some(facing) = Facing::from_motion(self.physics.body().velocity.x) {
                self.facing = facing;
            }
            self.physics.step(&platforms);
            if let Some(edge) = self.platforms.lowest_known_edge() {
                self.check_bounds_recovery(edge);
            }
            self.set_state(self.logical_state());
        }

        self.frame = self
            .animator
            .update(Duration::from_secs_f32(dt.max(0.0)), self.state, self.facing);
        self.position()
    }

    /// Rescan platforms right away instead of waiting for the interval.
    pub fn refresh_platforms(&mut self) {
        if self.platforms.refresh() {
            self.revalidate();
        }
    }

    fn revalidate(&mut self) {
        let platforms = self.platforms.platforms().clone();
        self.physics.revalidate(&platforms);
        self.ai.revalidate(&platforms);
    }

    fn logical_state(&self) -> AnimState {
        match self.ai.mode() {
            AiMode::Sitting => AnimState::Sit,
            AiMode::WalkingToPoint | AiMode::Airborne => AnimState::Walk,
            AiMode::Idle if self.physics.body().on_ground => AnimState::Idle,
            AiMode::Idle => AnimState::Walk,
        }
    }

    fn set_state(&mut self, state: AnimState) {
        if state == self.state {
            return;
        }
        self.state = state;
        self.sink.record(StatusEvent::now(state, self.position()));
    }

    /// Pointer pressed at `pointer` (screen coordinates). Grabs the pet if
    /// the pointer is over it.
    pub fn press(&mut self, pointer: Vec2) -> bool {
        let body = self.physics.body();
        if !self.drag.press(pointer, body.position, body.size) {
            return false;
        }
        self.physics.grab();
        self.ai.cancel();
        true
    }

    pub fn drag_to(&mut self, pointer: Vec2) {
        if let Some(position) = self.drag.follow(pointer, self.position()) {
            self.physics.drag_to(position);
        }
    }

    pub fn release(&mut self) {
        if let Some(velocity) = self.drag.release() {
            self.physics.fling(velocity);
        }
    }

    pub fn teleport(&mut self, position: Vec2) {
        self.physics.teleport(position);
        self.ai.cancel();
    }

    /// Teleport back on screen when the pet has fallen too far below
    /// `lowest_edge`. Returns whether it fired.
    pub fn check_bounds_recovery(&mut self, lowest_edge: f32) -> bool {
        let respawn = self.platforms.respawn_point();
        let fired = self
            .physics
            .check_bounds_recovery(lowest_edge, self.recovery_margin, respawn);
        if fired {
            self.ai.cancel();
        }
        fired
    }
}
