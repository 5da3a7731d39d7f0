//! Autonomous behavior: wander, walk to a takeoff point, jump between
//! platforms, sit on target windows.
//!
//! The controller never touches the physics state directly. It reads the
//! [`Body`] and answers each frame with an [`Intent`].

use bevy::prelude::*;
use rand::distr::Open01;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::config::{AiConfig, JumpPhysics};
use crate::physics::{Body, Intent, JumpLaunch};
use crate::platform::Platform;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum AiMode {
    #[default]
    Idle,
    WalkingToPoint,
    Airborne,
    Sitting,
}

/// A feasible jump found while scanning candidates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JumpCandidate {
    pub walk_distance: f32,
    pub target: Platform,
    pub landing_x: f32,
    pub takeoff_x: f32,
}

pub struct DecisionController {
    cfg: AiConfig,
    jump: JumpPhysics,
    rng: StdRng,
    timer: f32,
    mode: AiMode,
    walk_target: Option<f32>,
    // Only ever set together with `walk_target` (the takeoff point).
    pending_jump: Option<(Platform, f32)>,
}

impl DecisionController {
    pub fn new(cfg: AiConfig, jump: JumpPhysics) -> Self {
        Self::with_rng(cfg, jump, StdRng::from_os_rng())
    }

    pub fn seeded(cfg: AiConfig, jump: JumpPhysics, seed: u64) -> Self {
        Self::with_rng(cfg, jump, StdRng::seed_from_u64(seed))
    }

    fn with_rng(cfg: AiConfig, jump: JumpPhysics, rng: StdRng) -> Self {
        Self {
            cfg,
            jump,
            rng,
            timer: 0.0,
            mode: AiMode::Idle,
            walk_target: None,
            pending_jump: None,
        }
    }

    pub fn mode(&self) -> AiMode {
        self.mode
    }

    pub fn walk_target(&self) -> Option<f32> {
        self.walk_target
    }

    pub fn pending_jump(&self) -> Option<(Platform, f32)> {
        self.pending_jump
    }

    /// Drop every plan, e.g. when the user grabs the pet.
    pub fn cancel(&mut self) {
        self.timer = 0.0;
        self.walk_target = None;
        self.pending_jump = None;
        self.mode = AiMode::Airborne;
    }

    /// Cancel a deferred jump whose destination disappeared in the last
    /// platform refresh. Returns whether anything changed.
    pub fn revalidate(&mut self, platforms: &[Platform]) -> bool {
        match self.pending_jump {
            Some((target, _)) if !platforms.contains(&target) => {
                debug!("Jump target vanished, cancelling");
                self.walk_target = None;
                self.pending_jump = None;
                true
            }
            _ => false,
        }
    }

    pub fn update(&mut self, dt: f32, body: &Body, platforms: &[Platform]) -> Intent {
        self.timer += dt;

        if !body.on_ground && self.walk_target.is_none() {
            self.mode = AiMode::Airborne;
            return Intent::default();
        }
        if body.on_ground && self.mode == AiMode::Airborne {
            // Decision cooldown restarts on touchdown.
            self.mode = AiMode::Idle;
            self.timer = 0.0;
        }

        if body.on_ground
            && self.walk_target.is_none()
            && self.pending_jump.is_none()
            && self.timer > self.cfg.decision_interval
        {
            self.timer = 0.0;
            if let Some(launch) = self.choose_action(body, platforms) {
                self.mode = AiMode::Airborne;
                return Intent {
                    jump: Some(launch),
                    ..default()
                };
            }
        }

        let Some(target) = self.walk_target else {
            if self.mode != AiMode::Sitting {
                self.mode = AiMode::Idle;
            }
            return Intent {
                walk: Some(0.0),
                ..default()
            };
        };

        self.mode = AiMode::WalkingToPoint;
        let x = body.position.x;
        if (target - x).abs() >= self.cfg.walk_speed {
            let dir = if target > x { 1.0 } else { -1.0 };
            return Intent {
                walk: Some(self.cfg.walk_speed * dir),
                ..default()
            };
        }

        self.walk_target = None;
        let mut intent = Intent {
            walk: Some(0.0),
            snap_x: Some(target),
            jump: None,
        };
        match self.pending_jump {
            Some((platform, landing_x)) => {
                intent.jump = self.jump_to_platform(body, target, platform, landing_x);
                self.mode = if intent.jump.is_some() {
                    AiMode::Airborne
                } else {
                    AiMode::Idle
                };
            }
            None => self.mode = AiMode::Idle,
        }
        intent
    }

    fn choose_action(&mut self, body: &Body, platforms: &[Platform]) -> Option<JumpLaunch> {
        let current = body.current_platform?;

        let targets: Vec<&Platform> = platforms.iter().filter(|p| p.is_target).collect();
        if targets.iter().any(|t| **t == current) {
            self.mode = AiMode::Sitting;
            return None;
        }
        if self.mode == AiMode::Sitting {
            self.mode = AiMode::Idle;
        }
        if let Some(goal) = self.nearest(body, &targets) {
            let launch = self.head_for_target(body, current, goal, platforms);
            if launch.is_some() || self.walk_target.is_some() {
                return launch;
            }
            // Stuck at the closest point to an unreachable target.
        }

        let jumps = self.find_possible_jumps(body, current, platforms);
        if self.rng.random::<f32>() < self.cfg.jump_probability {
            if let Some(jump) = best_jump(&jumps, body.last_platform) {
                return self.commit(body, jump);
            }
        }

        self.wander(body, current);
        None
    }

    fn nearest(&self, body: &Body, targets: &[&Platform]) -> Option<Platform> {
        let center = body.position.x + body.size.x / 2.0;
        targets
            .iter()
            .min_by(|a, b| {
                let da = ((a.left + a.right) / 2.0 - center).abs();
                let db = ((b.left + b.right) / 2.0 - center).abs();
                da.total_cmp(&db)
            })
            .map(|p| **p)
    }

    /// Jump to a target window when possible, otherwise walk along the
    /// current platform toward it.
    fn head_for_target(
        &mut self,
        body: &Body,
        current: Platform,
        goal: Platform,
        platforms: &[Platform],
    ) -> Option<JumpLaunch> {
        let landing_x = goal.clamp_x((goal.left + goal.right - body.size.x) / 2.0, body.size.x);
        if let Some(candidate) = self.evaluate(body, current, goal, landing_x, platforms) {
            return self.commit(body, candidate);
        }
        let toward = current.clamp_x(landing_x, body.size.x);
        if (toward - body.position.x).abs() >= self.cfg.walk_speed {
            self.walk_target = Some(toward);
        }
        None
    }

    pub fn find_possible_jumps(
        &mut self,
        body: &Body,
        current: Platform,
        platforms: &[Platform],
    ) -> Vec<JumpCandidate> {
        let others: Vec<Platform> = platforms
            .iter()
            .filter(|p| **p != current && p.top > self.cfg.screen_top_guard)
            .copied()
            .collect();

        let mut found = Vec::new();
        for _ in 0..self.cfg.jump_attempts {
            let Some(target) = others.choose(&mut self.rng).copied() else {
                break;
            };
            let landing_x = if target.width() > body.size.x {
                self.rng
                    .random_range(target.left..=target.right - body.size.x)
            } else {
                target.left
            };
            if let Some(candidate) = self.evaluate(body, current, target, landing_x, platforms) {
                found.push(candidate);
            }
        }
        found
    }

    fn evaluate(
        &self,
        body: &Body,
        current: Platform,
        target: Platform,
        landing_x: f32,
        platforms: &[Platform],
    ) -> Option<JumpCandidate> {
        let takeoff_x = current.clamp_x(landing_x, body.size.x);
        let jumping_down = target.top > current.top;
        let clear = jumping_down
            || is_path_clear(current, target, takeoff_x, landing_x, body.size.x, platforms);
        let reachable = target.top >= current.top || current.top - target.top <= self.jump.max_height;
        (clear && reachable).then(|| JumpCandidate {
            walk_distance: (body.position.x - takeoff_x).abs(),
            target,
            landing_x,
            takeoff_x,
        })
    }

    fn commit(&mut self, body: &Body, jump: JumpCandidate) -> Option<JumpLaunch> {
        debug!(
            "Decided to jump from x={:.0} to platform y={} at x={:.0}",
            jump.takeoff_x, jump.target.top, jump.landing_x
        );
        if (body.position.x - jump.takeoff_x).abs() > self.cfg.walk_to_jump_threshold {
            self.walk_target = Some(jump.takeoff_x);
            self.pending_jump = Some((jump.target, jump.landing_x));
            return None;
        }
        self.jump_to_platform(body, body.position.x, jump.target, jump.landing_x)
    }

    fn wander(&mut self, body: &Body, current: Platform) {
        let width = body.size.x;
        if current.width() <= width * self.cfg.wander_min_width_factor {
            return;
        }
        let x = body.position.x;
        let min = current.left.max(x - self.cfg.max_walk_distance);
        let max = (current.right - width).min(x + self.cfg.max_walk_distance);
        let u: f32 = self.rng.sample(Open01);
        let target = min + (max - min) * u;
        if target > min && target < max {
            debug!("Decided to stroll to x={target:.0}");
            self.walk_target = Some(target);
        }
    }

    /// Solve the arc from `(from_x, body.y)` onto `target` at `landing_x`.
    /// Pending plans are cleared either way; `None` means the arc has no
    /// solution and the pet stays put.
    pub fn jump_to_platform(
        &mut self,
        body: &Body,
        from_x: f32,
        target: Platform,
        landing_x: f32,
    ) -> Option<JumpLaunch> {
        self.walk_target = None;
        self.pending_jump = None;
        if !body.on_ground {
            return None;
        }

        let landing_x = target.clamp_x(landing_x, body.size.x);
        let delta = Vec2::new(
            landing_x - from_x,
            (target.top - body.size.y) - body.position.y,
        );
        let Some((vy0, time)) = solve_arc(delta.y, self.jump) else {
            debug!("No arc reaches platform y={}, staying put", target.top);
            return None;
        };

        debug!(
            "Jumping to ({landing_x:.0}, {:.0}), t~{time:.0} frames",
            target.top
        );
        Some(JumpLaunch {
            velocity: Vec2::new(delta.x / time, vy0),
            gravity: self.jump.gravity,
            from: body.current_platform,
            to: target,
        })
    }
}

/// Shortest walk to takeoff wins, but jumping straight back to the platform
/// we just came from only happens when nothing else is on offer.
pub fn best_jump(jumps: &[JumpCandidate], came_from: Option<Platform>) -> Option<JumpCandidate> {
    let back = |c: &JumpCandidate| Some(c.target) == came_from;
    jumps.iter().copied().min_by(|a, b| {
        back(a)
            .cmp(&back(b))
            .then(a.walk_distance.total_cmp(&b.walk_distance))
    })
}

/// Takeoff vertical speed and flight time (frames) for a vertical offset
/// `dy` (positive is downward). Upward and level arcs launch at full jump
/// speed and are caught on the way down; downward arcs just drop.
pub fn solve_arc(dy: f32, jump: JumpPhysics) -> Option<(f32, f32)> {
    let g = jump.gravity;
    let (vy0, time) = if dy <= 0.0 {
        let vy0 = -jump.velocity;
        let discriminant = vy0 * vy0 + 2.0 * g * dy;
        if discriminant < 0.0 {
            return None;
        }
        (vy0, (-vy0 + discriminant.sqrt()) / g)
    } else {
        (0.0, (2.0 * dy / g).sqrt())
    };
    (time > 0.0).then_some((vy0, time))
}

/// Coarse check that nothing sits in the box spanned by the takeoff point
/// and the landing point.
pub fn is_path_clear(
    current: Platform,
    target: Platform,
    takeoff_x: f32,
    landing_x: f32,
    width: f32,
    platforms: &[Platform],
) -> bool {
    let left = takeoff_x.min(landing_x);
    let right = takeoff_x.max(landing_x) + width;
    !platforms
        .iter()
        .filter(|p| **p != current && **p != target)
        .any(|p| p.overlaps_x(left, right) && p.overlaps_y(target.top, current.top))
}
