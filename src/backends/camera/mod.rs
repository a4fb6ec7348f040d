// SPDX-License-Identifier: GPL-3.0-only

//! Capture source abstraction
//!
//! A [`CaptureSource`] is opened exactly once per scan-loop instance and
//! read with blocking calls from the worker thread. Open failures are
//! terminal for that instance; per-read failures are skip-and-continue.

pub mod frame_loop;
pub mod http;
pub mod synthetic;
pub mod types;
pub mod v4l2;

pub use frame_loop::{LoopAction, ScanLoopController};
pub use types::{CaptureError, CaptureResult, Frame, SourceSpec};

/// A blocking source of frames
pub trait CaptureSource: Send {
    /// Pull the next frame. Blocks until one is available or the read fails.
    fn read_frame(&mut self) -> CaptureResult<Frame>;

    /// Short identifier for logging
    fn describe(&self) -> String;
}

/// Resolve a source spec into a concrete capture source.
///
/// Called once at loop start; the loop does not retry a failed open.
pub fn open_source(spec: &SourceSpec) -> CaptureResult<Box<dyn CaptureSource>> {
    match spec {
        SourceSpec::Index(index) => {
            let path = format!("/dev/video{}", index);
            Ok(Box::new(v4l2::V4l2Source::open(&path)?))
        }
        SourceSpec::DevicePath(path) => Ok(Box::new(v4l2::V4l2Source::open(path)?)),
        SourceSpec::Url(url) => Ok(Box::new(http::HttpSource::open(url)?)),
        SourceSpec::Stub(stub) => Ok(Box::new(synthetic::SyntheticSource::open(stub)?)),
    }
}
