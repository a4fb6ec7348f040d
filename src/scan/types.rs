// SPDX-License-Identifier: GPL-3.0-only

//! Core types for scan results and consumer events
//!
//! [`DetectedCode`] identity is the payload alone; geometry is informational
//! and never part of equality. The consumer receives read-only snapshots of
//! registry state, never anything it could mutate under the worker.

use crate::errors::WatchError;
use image::RgbImage;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A rectangular region in frame pixel coordinates
///
/// Bounds are half-open: `x0 <= x < x1`, `y0 <= y < y1`. A rectangle with
/// zero width or height is valid and simply contains no pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        debug_assert!(x0 <= x1 && y0 <= y1);
        Self { x0, y0, x1, y1 }
    }

    /// The full extent of a frame with the given dimensions
    pub fn full(width: u32, height: u32) -> Self {
        Self { x0: 0, y0: 0, x1: width, y1: height }
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// An optical code observed in a single frame
///
/// Two values are equal iff their payloads are equal.
#[derive(Debug, Clone)]
pub struct DetectedCode {
    /// Decoded text content
    pub payload: String,
    /// Bounding geometry in frame coordinates (informational only)
    pub geometry: PixelRect,
}

impl DetectedCode {
    pub fn new(payload: String, geometry: PixelRect) -> Self {
        Self { payload, geometry }
    }
}

impl PartialEq for DetectedCode {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Eq for DetectedCode {}

impl Hash for DetectedCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.hash(state);
    }
}

/// Derived presence classification of a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// Seen recently enough to count as in front of the camera
    Present,
    /// Missed more consecutive frames than the absence threshold allows
    Absent,
}

impl std::fmt::Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresenceState::Present => write!(f, "present"),
            PresenceState::Absent => write!(f, "absent"),
        }
    }
}

/// Read-only copy of one registry entry for consumers
#[derive(Debug, Clone)]
pub struct RegistrySnapshotEntry {
    pub payload: String,
    /// Annotated frame captured at first sighting (write-once)
    pub first_seen: Arc<RgbImage>,
    pub absent_frames: u32,
    pub presence: PresenceState,
}

/// A registry entry that crossed between present and absent this frame
#[derive(Debug, Clone)]
pub struct PresenceTransition {
    pub payload: String,
    pub from: PresenceState,
    pub to: PresenceState,
}

/// Display surface a frame event is destined for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameChannel {
    /// Annotated live view
    Live,
    /// Candidate/detection view (full-frame scan mode)
    Detection,
}

impl FrameChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameChannel::Live => "live",
            FrameChannel::Detection => "detection",
        }
    }
}

/// An annotated frame ready for a display surface
#[derive(Debug, Clone)]
pub struct FrameEvent {
    pub frame: RgbImage,
    pub channel: FrameChannel,
}

/// Detection and presence update for one frame
#[derive(Debug, Clone)]
pub struct DetectionUpdate {
    /// The frame's deduplicated detection set
    pub detections: Vec<DetectedCode>,
    /// Full registry snapshot after this frame's update
    pub registry: Vec<RegistrySnapshotEntry>,
    /// Entries that crossed the presence threshold this frame
    pub transitions: Vec<PresenceTransition>,
    /// Whether the payload set differs from the previous frame's
    pub set_changed: bool,
}

/// Events published by the scan loop, in strict capture order
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Frame(FrameEvent),
    Detections(DetectionUpdate),
    Error(WatchError),
}

/// Sender half of the consumer channel
pub type EventSender = futures::channel::mpsc::UnboundedSender<WatchEvent>;

/// Receiver half of the consumer channel
pub type EventReceiver = futures::channel::mpsc::UnboundedReceiver<WatchEvent>;

/// Create the consumer event channel.
///
/// Unbounded so the worker never blocks on a slow consumer and never drops
/// or reorders events.
pub fn event_channel() -> (EventSender, EventReceiver) {
    futures::channel::mpsc::unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_equality_ignores_geometry() {
        let a = DetectedCode::new("X".to_string(), PixelRect::new(0, 0, 10, 10));
        let b = DetectedCode::new("X".to_string(), PixelRect::new(5, 5, 20, 20));
        let c = DetectedCode::new("Y".to_string(), PixelRect::new(0, 0, 10, 10));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_degenerate_rect_is_valid() {
        let rect = PixelRect::new(10, 10, 10, 20);
        assert!(rect.is_empty());
        assert_eq!(rect.width(), 0);
        assert_eq!(rect.height(), 10);
    }

    #[test]
    fn test_channel_tags() {
        assert_eq!(FrameChannel::Live.as_str(), "live");
        assert_eq!(FrameChannel::Detection.as_str(), "detection");
    }
}
