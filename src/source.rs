//! Where platforms come from. Window enumeration lives outside this crate;
//! anything that can list rectangles implements [`PlatformSource`].

use bevy::prelude::*;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::platform::{Monitor, Platform};

pub trait PlatformSource: Send + Sync {
    /// Fresh, unordered snapshot of every platform. Called repeatedly.
    fn scan(&mut self) -> Vec<Platform>;

    fn monitors(&self) -> Vec<Monitor> {
        Vec::new()
    }
}

/// A fixed desktop: monitors only, or a hand-built layout.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    platforms: Vec<Platform>,
    monitors: Vec<Monitor>,
}

impl StaticSource {
    pub fn new(platforms: Vec<Platform>) -> Self {
        Self {
            platforms,
            monitors: Vec::new(),
        }
    }

    /// Monitor-only desktop: one floor strip under every monitor.
    pub fn from_monitors(monitors: Vec<Monitor>) -> Self {
        let platforms = crate::platform::platforms_from_desktop(
            &[],
            &monitors,
            None,
            &crate::config::RefreshConfig::default(),
        );
        Self {
            platforms,
            monitors,
        }
    }

    pub fn with_monitors(mut self, monitors: Vec<Monitor>) -> Self {
        self.monitors = monitors;
        self
    }
}

impl PlatformSource for StaticSource {
    fn scan(&mut self) -> Vec<Platform> {
        self.platforms.clone()
    }

    fn monitors(&self) -> Vec<Monitor> {
        self.monitors.clone()
    }
}

#[derive(Default)]
struct Published {
    platforms: Option<Vec<Platform>>,
    monitors: Vec<Monitor>,
}

/// Runs a slow source on its own thread so the tick never waits on a
/// desktop scan. The worker publishes whole snapshots into a shared slot;
/// `scan` takes the newest one, or repeats the last one when nothing new
/// has arrived.
pub struct BackgroundSource {
    slot: Arc<Mutex<Published>>,
    last: Vec<Platform>,
    monitors: Vec<Monitor>,
}

impl BackgroundSource {
    pub fn spawn<S>(mut inner: S, interval: Duration) -> Self
    where
        S: PlatformSource + 'static,
    {
        let slot = Arc::new(Mutex::new(Published::default()));
        let worker_slot = Arc::downgrade(&slot);

        thread::spawn(move || loop {
            let platforms = inner.scan();
            let monitors = inner.monitors();
            // The pet is gone once the last strong reference drops.
            let Some(slot) = worker_slot.upgrade() else {
                break;
            };
            if let Ok(mut published) = slot.lock() {
                published.platforms = Some(platforms);
                published.monitors = monitors;
            }
            drop(slot);
            thread::sleep(interval);
        });

        Self {
            slot,
            last: Vec::new(),
            monitors: Vec::new(),
        }
    }
}

impl PlatformSource for BackgroundSource {
    fn scan(&mut self) -> Vec<Platform> {
        match self.slot.lock() {
            Ok(mut published) => {
                if let Some(fresh) = published.platforms.take() {
                    self.last = fresh;
                    self.monitors = std::mem::take(&mut published.monitors);
                }
            }
            Err(_) => warn!("Platform scanner thread panicked, keeping last snapshot"),
        }
        self.last.clone()
    }

    fn monitors(&self) -> Vec<Monitor> {
        self.monitors.clone()
    }
}
