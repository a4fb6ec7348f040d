// SPDX-License-Identifier: GPL-3.0-only
// Shared types for capture source abstraction

//! Shared types for capture sources

use image::RgbImage;
use std::fmt;
use std::time::Instant;

/// A single frame pulled from a capture source.
///
/// Pixel data is normalized to 8-bit RGB at capture time regardless of the
/// device's native format, so everything downstream (decoder, overlay,
/// consumer) works on one representation.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Monotonic per-source frame counter
    pub sequence: u64,
    /// Timestamp when the frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Where a capture loop reads its frames from.
///
/// Resolved once at loop start; an open failure is terminal for that loop
/// instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Local device by index (resolves to /dev/video{N})
    Index(usize),
    /// Local device by path (e.g. /dev/video0)
    DevicePath(String),
    /// HTTP MJPEG stream or JPEG snapshot URL
    Url(String),
    /// Deterministic synthetic source, "stub://WIDTHxHEIGHT"
    Stub(String),
}

impl SourceSpec {
    /// Classify a raw source string.
    ///
    /// A bare integer is a device index; `stub://` selects the synthetic
    /// source; an http(s) URL selects the network source; anything else is
    /// treated as a device path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(index) = trimmed.parse::<usize>() {
            return SourceSpec::Index(index);
        }
        if trimmed.starts_with("stub://") {
            return SourceSpec::Stub(trimmed.to_string());
        }
        if let Ok(parsed) = url::Url::parse(trimmed) {
            if matches!(parsed.scheme(), "http" | "https") {
                return SourceSpec::Url(trimmed.to_string());
            }
        }
        SourceSpec::DevicePath(trimmed.to_string())
    }
}

impl std::str::FromStr for SourceSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SourceSpec::parse(s))
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Index(index) => write!(f, "/dev/video{}", index),
            SourceSpec::DevicePath(path) => write!(f, "{}", path),
            SourceSpec::Url(url) => write!(f, "{}", url),
            SourceSpec::Stub(spec) => write!(f, "{}", spec),
        }
    }
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error types for capture operations
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// The source could not be opened (terminal for the loop instance)
    OpenFailed(String),
    /// A single read produced no usable frame (skip-and-continue)
    FrameUnavailable(String),
    /// No pixel format supported by both the device and this crate
    FormatNotSupported(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::OpenFailed(msg) => write!(f, "failed to open source: {}", msg),
            CaptureError::FrameUnavailable(msg) => write!(f, "frame unavailable: {}", msg),
            CaptureError::FormatNotSupported(msg) => {
                write!(f, "pixel format not supported: {}", msg)
            }
        }
    }
}

impl std::error::Error for CaptureError {}
