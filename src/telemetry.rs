//! Best-effort reporting of what the pet is doing. Sinks must never block
//! the tick and never fail it.

use bevy::prelude::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::mpsc::Sender;

use crate::animation::AnimState;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusEvent {
    pub timestamp: DateTime<Utc>,
    pub action: AnimState,
    pub x: i32,
    pub y: i32,
}

impl StatusEvent {
    pub fn now(action: AnimState, position: Vec2) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            x: position.x as i32,
            y: position.y as i32,
        }
    }
}

pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: StatusEvent);
}

pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&self, _event: StatusEvent) {}
}

/// Hands events to another thread, e.g. an uploader. A closed channel
/// silently drops events.
pub struct ChannelSink(pub Sender<StatusEvent>);

impl TelemetrySink for ChannelSink {
    fn record(&self, event: StatusEvent) {
        let _ = self.0.send(event);
    }
}

pub struct LogSink;

impl TelemetrySink for LogSink {
    fn record(&self, event: StatusEvent) {
        info!("{:?} at ({}, {})", event.action, event.x, event.y);
    }
}
