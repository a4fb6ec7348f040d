// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic capture source
//!
//! Produces deterministic frames for tests and demos without touching
//! hardware, paced at roughly camera rate so consumers see realistic
//! blocking-read behavior. Selected with a `stub://WIDTHxHEIGHT` spec.

use super::CaptureSource;
use super::types::{CaptureError, CaptureResult, Frame};
use image::{Rgb, RgbImage};
use std::time::Duration;
use tracing::info;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

/// Simulated inter-frame interval (~100 fps)
const FRAME_INTERVAL: Duration = Duration::from_millis(10);

/// Deterministic synthetic frame source
pub struct SyntheticSource {
    spec: String,
    width: u32,
    height: u32,
    sequence: u64,
}

impl SyntheticSource {
    /// Parse a `stub://WIDTHxHEIGHT` spec; dimensions default to 640x480.
    pub fn open(spec: &str) -> CaptureResult<Self> {
        let dims = spec.strip_prefix("stub://").ok_or_else(|| {
            CaptureError::OpenFailed(format!("not a stub spec: {}", spec))
        })?;

        let (width, height) = match dims.split_once('x') {
            Some((w, h)) => {
                let width = w
                    .parse::<u32>()
                    .map_err(|_| CaptureError::OpenFailed(format!("bad stub width: {}", w)))?;
                let height = h
                    .parse::<u32>()
                    .map_err(|_| CaptureError::OpenFailed(format!("bad stub height: {}", h)))?;
                (width.max(1), height.max(1))
            }
            None => (DEFAULT_WIDTH, DEFAULT_HEIGHT),
        };

        info!(spec, width, height, "Opened synthetic capture source");

        Ok(Self {
            spec: spec.to_string(),
            width,
            height,
            sequence: 0,
        })
    }
}

impl CaptureSource for SyntheticSource {
    fn read_frame(&mut self) -> CaptureResult<Frame> {
        std::thread::sleep(FRAME_INTERVAL);
        self.sequence += 1;

        // Flat gray scene whose shade drifts slowly with the sequence, so
        // consecutive frames are distinguishable in tests
        let shade = 64u8.wrapping_add((self.sequence % 64) as u8);
        let image = RgbImage::from_pixel(self.width, self.height, Rgb([shade, shade, shade]));

        Ok(Frame::new(image, self.sequence))
    }

    fn describe(&self) -> String {
        self.spec.clone()
    }
}
