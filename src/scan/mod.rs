// SPDX-License-Identifier: GPL-3.0-only

//! Scanning core: region mapping, decoding, presence tracking and the
//! worker loop that drives them

pub mod decoder;
pub mod overlay;
pub mod registry;
pub mod roi;
pub mod types;
pub mod watcher;

pub use registry::CodeRegistry;
pub use types::{
    DetectedCode, DetectionUpdate, EventReceiver, EventSender, FrameChannel, PixelRect,
    PresenceState, WatchEvent, event_channel,
};
pub use watcher::{ScanStrategy, WatchControls, Watcher};
