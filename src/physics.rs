//! Per-frame integration and collision against the platform snapshot.
//!
//! Screen coordinates: `+y` points down, `position` is the top-left corner
//! of the character's box, velocities are in pixels per frame.

use bevy::prelude::*;

use crate::config::PhysicsConfig;
use crate::platform::Platform;

/// Kinematic state of the character.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub on_ground: bool,
    pub current_platform: Option<Platform>,
    /// Platform stood on before the last time the body went airborne.
    pub last_platform: Option<Platform>,
    /// Replaces world gravity while a scripted jump arc is in flight.
    pub gravity_override: Option<f32>,
    /// Platform a jump started from; ignored until the body lands again.
    pub ignore_platform: Option<Platform>,
    /// Platform a jump is arcing toward; never treated as a ceiling.
    pub jump_target: Option<Platform>,
}

impl Body {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            size,
            on_ground: false,
            current_platform: None,
            last_platform: None,
            gravity_override: None,
            ignore_platform: None,
            jump_target: None,
        }
    }

    fn feet(&self) -> f32 {
        self.position.y + self.size.y
    }
}

/// A scripted jump, fully solved at takeoff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JumpLaunch {
    pub velocity: Vec2,
    pub gravity: f32,
    pub from: Option<Platform>,
    pub to: Platform,
}

/// What the decision controller wants the body to do this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Intent {
    /// Horizontal velocity to hold while walking; `Some(0.0)` halts.
    pub walk: Option<f32>,
    /// Exact x the body has arrived at.
    pub snap_x: Option<f32>,
    pub jump: Option<JumpLaunch>,
}

pub struct PhysicsEngine {
    cfg: PhysicsConfig,
    body: Body,
}

impl PhysicsEngine {
    pub fn new(cfg: PhysicsConfig, body: Body) -> Self {
        Self { cfg, body }
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn apply(&mut self, intent: &Intent) {
        if let Some(x) = intent.snap_x {
            self.body.position.x = x;
        }
        if let Some(dx) = intent.walk {
            self.body.velocity.x = dx;
        }
        if let Some(jump) = intent.jump {
            self.launch(jump);
        }
    }

    pub fn launch(&mut self, jump: JumpLaunch) {
        let body = &mut self.body;
        body.velocity = jump.velocity;
        body.gravity_override = Some(jump.gravity);
        body.on_ground = false;
        body.ignore_platform = jump.from;
        body.jump_target = Some(jump.to);
    }

    /// Advance one frame against `platforms`.
    pub fn step(&mut self, platforms: &[Platform]) {
        let cfg = &self.cfg;
        let body = &mut self.body;
        let was_on_ground = body.on_ground;

        // Exclusions live for the whole arc and only end once we stand again.
        if was_on_ground {
            body.ignore_platform = None;
            body.jump_target = None;
        }

        body.velocity.y += body.gravity_override.unwrap_or(cfg.gravity);
        body.velocity.y = body.velocity.y.min(cfg.max_fall_speed);
        body.velocity.x = body
            .velocity
            .x
            .clamp(-cfg.max_horizontal_speed, cfg.max_horizontal_speed);

        let next = body.position + body.velocity;
        let (next_left, next_right) = (next.x, next.x + body.size.x);

        let mut landing: Option<Platform> = None;
        let mut ceiling: Option<Platform> = None;

        if body.velocity.y >= 0.0 {
            let feet = body.feet();
            let next_feet = next.y + body.size.y;
            landing = platforms
                .iter()
                .filter(|p| body.ignore_platform.as_ref() != Some(*p))
                .filter(|p| p.overlaps_x(next_left, next_right))
                .filter(|p| feet <= p.top + cfg.landing_tolerance && next_feet >= p.top)
                .min_by(|a, b| a.top.total_cmp(&b.top))
                .copied();
        } else {
            let head = body.position.y;
            ceiling = platforms
                .iter()
                .filter(|p| body.ignore_platform.as_ref() != Some(*p))
                .filter(|p| body.jump_target.as_ref() != Some(*p))
                .filter(|p| p.overlaps_x(next_left, next_right))
                .filter(|p| head >= p.bottom && next.y <= p.bottom)
                .max_by(|a, b| a.bottom.total_cmp(&b.bottom))
                .copied();
        }

        if let Some(platform) = landing {
            body.position.y = platform.top - body.size.y;
            body.velocity.y = 0.0;
            body.on_ground = true;
            body.current_platform = Some(platform);
            body.gravity_override = None;
            body.position.x = platform.clamp_x(next.x, body.size.x);
            body.velocity.x = 0.0;
            if !was_on_ground {
                debug!("Landed on platform at y={}", platform.top);
            }
        } else if let Some(platform) = ceiling {
            body.position = Vec2::new(next.x, platform.bottom);
            body.velocity.y = 0.0;
            // The takeoff platform stays ignored or we would land right back on it.
            body.jump_target = None;
            self.leave_ground();
        } else {
            body.position = next;
            if was_on_ground {
                debug!("Walked off a platform edge");
            }
            self.leave_ground();
        }
    }

    fn leave_ground(&mut self) {
        let body = &mut self.body;
        if body.current_platform.is_some() {
            body.last_platform = body.current_platform.take();
        }
        body.on_ground = false;
    }

    /// Pick the body up: it stops standing on anything.
    pub fn grab(&mut self) {
        self.leave_ground();
    }

    /// Move the body directly, bypassing integration and collision.
    pub fn drag_to(&mut self, position: Vec2) {
        self.body.position = position;
        self.body.velocity = Vec2::ZERO;
    }

    pub fn fling(&mut self, velocity: Vec2) {
        self.body.velocity = velocity;
        self.body.gravity_override = None;
    }

    pub fn teleport(&mut self, position: Vec2) {
        self.body.position = position;
        self.body.velocity = Vec2::ZERO;
        self.body.gravity_override = None;
        self.body.ignore_platform = None;
        self.body.jump_target = None;
        self.leave_ground();
    }

    /// Forget the platform we stand on if it vanished from the latest scan.
    pub fn revalidate(&mut self, platforms: &[Platform]) {
        let body = &mut self.body;
        if let Some(current) = body.current_platform {
            if !platforms.contains(&current) {
                body.current_platform = None;
                body.on_ground = false;
            }
        }
    }

    /// Teleport to `respawn` when the body has fallen more than `margin`
    /// below `lowest_edge`. Returns whether it fired.
    pub fn check_bounds_recovery(&mut self, lowest_edge: f32, margin: f32, respawn: Vec2) -> bool {
        if self.body.position.y > lowest_edge + margin {
            warn!(
                "Pet fell off screen (y={}), teleporting to {respawn}",
                self.body.position.y
            );
            self.teleport(respawn);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: Vec2 = Vec2::new(150.0, 200.0);

    fn engine_at(x: f32, y: f32) -> PhysicsEngine {
        PhysicsEngine::new(PhysicsConfig::default(), Body::new(Vec2::new(x, y), SIZE))
    }

    fn grounded_on(platform: Platform, x: f32) -> PhysicsEngine {
        let mut engine = engine_at(x, platform.top - SIZE.y);
        engine.step(&[platform]);
        assert!(engine.body().on_ground);
        engine
    }

    #[test]
    fn free_fall_accelerates_and_caps() {
        let mut engine = engine_at(0.0, 0.0);
        engine.step(&[]);
        assert_eq!(engine.body().velocity.y, 0.98);
        for _ in 0..100 {
            engine.step(&[]);
        }
        assert_eq!(engine.body().velocity.y, 25.0);
        assert!(!engine.body().on_ground);
    }

    #[test]
    fn horizontal_speed_is_clamped() {
        let mut engine = engine_at(0.0, 0.0);
        engine.fling(Vec2::new(-90.0, 0.0));
        engine.step(&[]);
        assert_eq!(engine.body().velocity.x, -25.0);
        assert_eq!(engine.body().position.x, -25.0);
    }

    #[test]
    fn lands_on_highest_of_overlapping_platforms() {
        let high = Platform::new(0.0, 300.0, 400.0, 302.0);
        let low = Platform::new(0.0, 320.0, 400.0, 322.0);
        // Feet at 290, falling 40 px this frame crosses both tops.
        let mut engine = engine_at(100.0, 90.0);
        engine.fling(Vec2::new(0.0, 39.0));
        engine.cfg.max_fall_speed = 100.0;
        engine.step(&[low, high]);

        let body = engine.body();
        assert!(body.on_ground);
        assert_eq!(body.current_platform, Some(high));
        assert_eq!(body.position.y, 100.0);
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn landing_clamps_x_inside_platform() {
        let platform = Platform::new(0.0, 500.0, 400.0, 502.0);
        for (x, dx) in [(-100.0, -25.0), (300.0, 25.0), (240.0, 10.0), (-140.0, 0.0)] {
            let mut engine = engine_at(x, 297.0);
            engine.fling(Vec2::new(dx, 4.0));
            engine.step(&[platform]);
            let body = engine.body();
            assert!(body.on_ground, "x={x} dx={dx}");
            assert!(body.position.x >= 0.0 && body.position.x <= 250.0);
        }
    }

    #[test]
    fn walking_stays_grounded() {
        let platform = Platform::new(0.0, 500.0, 400.0, 502.0);
        let mut engine = grounded_on(platform, 100.0);
        for _ in 0..10 {
            engine.apply(&Intent {
                walk: Some(2.0),
                ..default()
            });
            engine.step(&[platform]);
        }
        assert!(engine.body().on_ground);
        assert_eq!(engine.body().position, Vec2::new(120.0, 300.0));
    }

    #[test]
    fn walking_off_the_edge_falls() {
        let platform = Platform::new(0.0, 500.0, 400.0, 502.0);
        let mut engine = engine_at(500.0, 300.0);
        engine.step(&[platform]);
        assert!(!engine.body().on_ground);
        assert_eq!(engine.body().current_platform, None);
    }

    #[test]
    fn ceiling_stops_ascent_but_keeps_takeoff_ignored() {
        let floor = Platform::new(0.0, 800.0, 400.0, 802.0);
        let shelf = Platform::new(0.0, 400.0, 400.0, 402.0);
        let goal = Platform::new(0.0, 100.0, 400.0, 102.0);
        let mut engine = grounded_on(floor, 100.0);
        engine.launch(JumpLaunch {
            velocity: Vec2::new(0.0, -20.0),
            gravity: 0.5,
            from: Some(floor),
            to: goal,
        });
        // Head at 600 climbs to just under the shelf.
        for _ in 0..30 {
            engine.step(&[floor, shelf, goal]);
            if engine.body().velocity.y == 0.0 {
                break;
            }
        }
        let body = engine.body();
        assert_eq!(body.position.y, 402.0);
        assert_eq!(body.velocity.y, 0.0);
        assert_eq!(body.jump_target, None);
        assert_eq!(body.ignore_platform, Some(floor));
    }

    #[test]
    fn jump_target_is_not_a_ceiling() {
        // Arcing up toward a platform from underneath passes through it.
        let floor = Platform::new(0.0, 800.0, 400.0, 802.0);
        let goal = Platform::new(0.0, 500.0, 400.0, 502.0);
        let mut engine = grounded_on(floor, 100.0);
        engine.launch(JumpLaunch {
            velocity: Vec2::new(0.0, -25.0),
            gravity: 0.5,
            from: Some(floor),
            to: goal,
        });
        let mut min_y = f32::MAX;
        for _ in 0..200 {
            engine.step(&[floor, goal]);
            min_y = min_y.min(engine.body().position.y);
            if engine.body().on_ground {
                break;
            }
        }
        assert!(min_y < 502.0);
        assert_eq!(engine.body().current_platform, Some(goal));
        assert_eq!(engine.body().position.y, 300.0);
    }

    #[test]
    fn launch_from_platform_ignores_it_until_landing() {
        let floor = Platform::new(0.0, 800.0, 400.0, 802.0);
        let mut engine = grounded_on(floor, 100.0);
        engine.launch(JumpLaunch {
            velocity: Vec2::new(0.0, -5.0),
            gravity: 1.0,
            from: Some(floor),
            to: floor,
        });
        engine.step(&[floor]);
        assert!(!engine.body().on_ground);
        assert_eq!(engine.body().ignore_platform, Some(floor));
        assert_eq!(engine.body().last_platform, Some(floor));
        assert_eq!(engine.body().gravity_override, Some(1.0));
    }

    #[test]
    fn revalidation_drops_vanished_platform() {
        let platform = Platform::new(0.0, 500.0, 400.0, 502.0);
        let mut engine = grounded_on(platform, 100.0);
        engine.revalidate(&[platform]);
        assert!(engine.body().on_ground);
        engine.revalidate(&[Platform::new(0.0, 510.0, 400.0, 512.0)]);
        assert!(!engine.body().on_ground);
        assert_eq!(engine.body().current_platform, None);
    }

    #[test]
    fn recovery_fires_only_past_margin() {
        let mut engine = engine_at(10.0, 1280.0);
        assert!(!engine.check_bounds_recovery(1080.0, 200.0, Vec2::new(960.0, 540.0)));
        engine.drag_to(Vec2::new(10.0, 1281.0));
        engine.fling(Vec2::new(3.0, 20.0));
        assert!(engine.check_bounds_recovery(1080.0, 200.0, Vec2::new(960.0, 540.0)));
        assert_eq!(engine.body().position, Vec2::new(960.0, 540.0));
        assert_eq!(engine.body().velocity, Vec2::ZERO);
    }
}
