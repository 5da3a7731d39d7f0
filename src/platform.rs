//! Platforms are plain values rebuilt on every scan. Nothing ties a platform
//! to the window it came from, so a window that moves between scans simply
//! turns into a different platform, and two windows with identical top
//! edges are indistinguishable.

use bevy::prelude::*;
use std::sync::Arc;

use crate::config::RefreshConfig;
use crate::source::PlatformSource;

/// Thickness of the strip generated for window tops and monitor bottoms.
pub const STRIP_THICKNESS: f32 = 2.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PlatformKind {
    /// Top edge of an application window.
    #[default]
    Window,
    /// Bottom edge of a monitor.
    Floor,
}

#[derive(Clone, Copy, Debug)]
pub struct Platform {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub kind: PlatformKind,
    pub is_target: bool,
}

impl Platform {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            kind: PlatformKind::Window,
            is_target: false,
        }
    }

    pub fn floor(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            kind: PlatformKind::Floor,
            ..Self::new(left, top, right, bottom)
        }
    }

    pub fn target(mut self) -> Self {
        self.is_target = true;
        self
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Half-open horizontal overlap with `[left, right)`.
    pub fn overlaps_x(&self, left: f32, right: f32) -> bool {
        left.max(self.left) < right.min(self.right)
    }

    /// Half-open vertical overlap with `[top, bottom)`.
    pub fn overlaps_y(&self, top: f32, bottom: f32) -> bool {
        top.max(self.top) < bottom.min(self.bottom)
    }

    /// Clamp a character's left edge so the whole body stays on this platform.
    pub fn clamp_x(&self, x: f32, width: f32) -> f32 {
        x.min(self.right - width).max(self.left)
    }
}

// The target flag is derived from window metadata and is not part of the
// platform's geometry.
impl PartialEq for Platform {
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left
            && self.top == other.top
            && self.right == other.right
            && self.bottom == other.bottom
            && self.kind == other.kind
    }
}

/// Immutable snapshot of every platform known at one point in time.
pub type PlatformSet = Arc<[Platform]>;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Monitor {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub is_primary: bool,
}

impl Monitor {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A visible top-level window as reported by the desktop.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub title: String,
}

/// Build the platform list for one desktop scan: a strip along the top of
/// every sizeable window followed by a strip under every monitor. `own`
/// is the pet's own window, which must never become a platform.
pub fn platforms_from_desktop(
    windows: &[WindowRect],
    monitors: &[Monitor],
    own: Option<&WindowRect>,
    cfg: &RefreshConfig,
) -> Vec<Platform> {
    let mut out: Vec<Platform> = Vec::new();

    for w in windows {
        if own == Some(w) {
            continue;
        }
        if w.right - w.left <= cfg.min_window_width || w.bottom - w.top <= cfg.min_window_height {
            continue;
        }
        let mut p = Platform::new(w.left, w.top, w.right, w.top + STRIP_THICKNESS);
        p.is_target = cfg
            .target_titles
            .iter()
            .any(|t| w.title.contains(t.as_str()));
        merge(&mut out, p);
    }

    for m in monitors {
        merge(
            &mut out,
            Platform::floor(m.x, m.bottom(), m.x + m.width, m.bottom() + STRIP_THICKNESS),
        );
    }

    out
}

/// Windows sharing a top edge (maximized ones, typically) collapse into one
/// strip, which is a target if any of them is.
fn merge(out: &mut Vec<Platform>, p: Platform) {
    match out.iter_mut().find(|q| **q == p) {
        Some(existing) => existing.is_target |= p.is_target,
        None => out.push(p),
    }
}

/// Snapshot equality including the target flags, which `Platform`'s own
/// equality leaves out.
fn same_snapshot(a: &[Platform], b: &[Platform]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(p, q)| p == q && p.is_target == q.is_target)
}

/// Owns the current platform snapshot and refreshes it from a source on a
/// fixed interval.
pub struct PlatformManager {
    source: Box<dyn PlatformSource>,
    platforms: PlatformSet,
    monitors: Vec<Monitor>,
    interval: f32,
    timer: f32,
    spawn: Vec2,
}

impl PlatformManager {
    pub fn new(mut source: Box<dyn PlatformSource>, interval: f32, spawn: Vec2) -> Self {
        let platforms: PlatformSet = source.scan().into();
        let monitors = source.monitors();
        Self {
            source,
            platforms,
            monitors,
            interval,
            timer: 0.0,
            spawn,
        }
    }

    pub fn platforms(&self) -> &PlatformSet {
        &self.platforms
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    /// Advance the refresh timer. Returns `true` when a rescan produced a
    /// snapshot that differs from the previous one.
    pub fn update(&mut self, dt: f32) -> bool {
        self.timer += dt;
        if self.timer <= self.interval {
            return false;
        }
        self.timer = 0.0;
        self.refresh()
    }

    /// Rescan immediately. An identical snapshot is dropped so the current
    /// `Arc` stays shared with whoever already holds it.
    pub fn refresh(&mut self) -> bool {
        let scanned = self.source.scan();
        self.monitors = self.source.monitors();
        if same_snapshot(&scanned, &self.platforms) {
            return false;
        }
        debug!("Platforms refreshed ({} total)", scanned.len());
        self.platforms = scanned.into();
        true
    }

    /// The lowest edge anything can stand on: the lowest monitor bottom, or
    /// the lowest platform when no monitor is known.
    pub fn lowest_known_edge(&self) -> Option<f32> {
        let from_monitors = self.monitors.iter().map(Monitor::bottom).reduce(f32::max);
        from_monitors.or_else(|| self.platforms.iter().map(|p| p.bottom).reduce(f32::max))
    }

    pub fn respawn_point(&self) -> Vec2 {
        self.monitors
            .iter()
            .find(|m| m.is_primary)
            .or_else(|| self.monitors.first())
            .map(Monitor::center)
            .unwrap_or(self.spawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;

    fn window(left: f32, top: f32, right: f32, bottom: f32, title: &str) -> WindowRect {
        WindowRect {
            left,
            top,
            right,
            bottom,
            title: title.into(),
        }
    }

    fn monitor(x: f32, y: f32, is_primary: bool) -> Monitor {
        Monitor {
            x,
            y,
            width: 1920.0,
            height: 1080.0,
            is_primary,
        }
    }

    #[test]
    fn equality_ignores_target_flag() {
        let a = Platform::new(0.0, 500.0, 400.0, 502.0);
        assert_eq!(a, a.target());
        assert_ne!(a, Platform::floor(0.0, 500.0, 400.0, 502.0));
    }

    #[test]
    fn clamp_keeps_body_on_platform() {
        let p = Platform::new(100.0, 0.0, 400.0, 2.0);
        assert_eq!(p.clamp_x(-50.0, 150.0), 100.0);
        assert_eq!(p.clamp_x(390.0, 150.0), 250.0);
        assert_eq!(p.clamp_x(200.0, 150.0), 200.0);
    }

    #[test]
    fn desktop_scan_filters_small_and_own_windows() {
        let cfg = RefreshConfig::default();
        let own = window(10.0, 10.0, 160.0, 210.0, "pet");
        let windows = vec![
            window(0.0, 100.0, 800.0, 600.0, "notes"),
            window(0.0, 100.0, 100.0, 600.0, "narrow"),
            window(0.0, 300.0, 800.0, 330.0, "flat"),
            own.clone(),
            window(900.0, 50.0, 1800.0, 900.0, "main.rs - Visual Studio Code"),
            window(0.0, 100.0, 800.0, 400.0, "duplicate top edge"),
        ];
        let platforms = platforms_from_desktop(&windows, &[monitor(0.0, 0.0, true)], Some(&own), &cfg);

        assert_eq!(platforms.len(), 3);
        assert_eq!(platforms[0], Platform::new(0.0, 100.0, 800.0, 102.0));
        assert!(!platforms[0].is_target);
        assert!(platforms[1].is_target);
        assert_eq!(platforms[2], Platform::floor(0.0, 1080.0, 1920.0, 1082.0));
    }

    #[test]
    fn identical_rescan_is_not_a_change() {
        let source = StaticSource::new(vec![Platform::new(0.0, 500.0, 400.0, 502.0)]);
        let mut mgr = PlatformManager::new(Box::new(source), 2.0, Vec2::ZERO);
        let before = mgr.platforms().clone();
        assert!(!mgr.refresh());
        assert!(Arc::ptr_eq(&before, mgr.platforms()));
    }

    #[test]
    fn shared_top_edge_is_a_target_if_any_window_is() {
        let cfg = RefreshConfig::default();
        let browser = window(0.0, 0.0, 1920.0, 1040.0, "Firefox");
        let editor = window(0.0, 0.0, 1920.0, 1040.0, "lib.rs - Visual Studio Code");

        for windows in [
            vec![browser.clone(), editor.clone()],
            vec![editor.clone(), browser.clone()],
        ] {
            let platforms = platforms_from_desktop(&windows, &[], None, &cfg);
            assert_eq!(platforms.len(), 1);
            assert!(platforms[0].is_target);
        }
    }

    /// Replays one snapshot per scan, repeating the last.
    struct Replay(Vec<Vec<Platform>>);

    impl PlatformSource for Replay {
        fn scan(&mut self) -> Vec<Platform> {
            if self.0.len() > 1 {
                self.0.remove(0)
            } else {
                self.0.first().cloned().unwrap_or_default()
            }
        }
    }

    #[test]
    fn rescan_that_only_flips_target_flag_is_a_change() {
        let cfg = RefreshConfig::default();
        let browser = window(0.0, 0.0, 1920.0, 1040.0, "Firefox");
        let editor = window(0.0, 0.0, 1920.0, 1040.0, "lib.rs - Visual Studio Code");
        let source = Replay(vec![
            platforms_from_desktop(&[browser.clone()], &[], None, &cfg),
            platforms_from_desktop(&[editor, browser], &[], None, &cfg),
        ]);
        let mut mgr = PlatformManager::new(Box::new(source), 2.0, Vec2::ZERO);
        assert!(!mgr.platforms()[0].is_target);

        assert!(mgr.refresh());
        assert!(mgr.platforms()[0].is_target);
        assert!(!mgr.refresh());
    }

    #[test]
    fn update_waits_for_interval() {
        let source = StaticSource::new(vec![]);
        let mut mgr = PlatformManager::new(Box::new(source), 2.0, Vec2::ZERO);
        assert!(!mgr.update(1.0));
        assert!(!mgr.update(1.5));
        assert_eq!(mgr.timer, 0.0);
    }

    #[test]
    fn respawn_prefers_primary_monitor() {
        let source = StaticSource::new(vec![])
            .with_monitors(vec![monitor(-1920.0, 0.0, false), monitor(0.0, 0.0, true)]);
        let mgr = PlatformManager::new(Box::new(source), 2.0, Vec2::new(1.0, 2.0));
        assert_eq!(mgr.respawn_point(), Vec2::new(960.0, 540.0));
        assert_eq!(mgr.lowest_known_edge(), Some(1080.0));
    }

    #[test]
    fn respawn_falls_back_to_spawn_point() {
        let source = StaticSource::new(vec![Platform::new(0.0, 700.0, 400.0, 702.0)]);
        let mgr = PlatformManager::new(Box::new(source), 2.0, Vec2::new(1.0, 2.0));
        assert_eq!(mgr.respawn_point(), Vec2::new(1.0, 2.0));
        assert_eq!(mgr.lowest_known_edge(), Some(702.0));
    }
}
