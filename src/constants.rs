// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Consecutive missed frames tolerated before a registered code is reported absent.
///
/// A code that reappears within this many frames never flickers in the
/// presence table; a single dropped or blurred frame costs nothing.
pub const ABSENCE_THRESHOLD: u32 = 10;

/// Default half-width of the pointer-selected region of interest (pixels).
pub const DEFAULT_ROI_RADIUS: u32 = 100;

/// Default display surface dimensions used to map pointer coordinates
/// into frame space when no display size is configured.
pub const DEFAULT_DISPLAY_WIDTH: u32 = 1280;
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 600;

/// Dimensions of the blank placeholder frame published on shutdown so
/// downstream views clear.
pub const BLANK_FRAME_WIDTH: u32 = 1920;
pub const BLANK_FRAME_HEIGHT: u32 = 1080;

/// Crosshair side length as a fraction of the shorter frame dimension.
pub const CROSSHAIR_FRACTION: f32 = 0.15;

/// Maximum dimension for decoding; larger regions are downscaled first.
/// QR codes are typically large enough to be detected at this resolution.
pub const DECODER_MAX_DIMENSION: u32 = 640;

/// Overlay line thickness in pixels.
pub const OVERLAY_LINE_THICKNESS: u32 = 2;

/// ROI rectangle color when the frame's detection set is non-empty (green).
pub const ROI_ACTIVE_COLOR: [u8; 3] = [0, 255, 0];

/// ROI rectangle color when the frame's detection set is empty (red).
pub const ROI_IDLE_COLOR: [u8; 3] = [255, 0, 0];

/// Highlight color for detected code geometry (red).
pub const DETECTION_COLOR: [u8; 3] = [255, 0, 0];

/// Crosshair color (blue).
pub const CROSSHAIR_COLOR: [u8; 3] = [0, 0, 255];

/// Settle time between moving the dropper to a side position and
/// returning it to center.
pub const DROPPER_SETTLE: Duration = Duration::from_secs(1);

/// Timeout for a single dropper transport operation (serial read or HTTP GET).
pub const DROPPER_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial line rate for the dropper link.
pub const DROPPER_BAUD: u32 = 115_200;
