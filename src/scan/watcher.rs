// SPDX-License-Identifier: GPL-3.0-only

//! The scan loop driver
//!
//! Pulls frames from a capture source on a dedicated worker thread, maps the
//! operator pointer to a region of interest, decodes, deduplicates, folds the
//! result into the code registry, renders the overlay, and publishes events
//! to the consumer channel in strict capture order.
//!
//! The worker exclusively owns the registry for the lifetime of one run.
//! Pointer position, ROI radius, the clear request and the stop request are
//! the only values written from the consumer side; each lives in its own
//! atomic cell so the handoff is data-race-free and no lock is ever held
//! across a decode call.

use crate::backends::camera::{
    self, CaptureError, CaptureSource, LoopAction, ScanLoopController, SourceSpec,
};
use crate::constants::{BLANK_FRAME_HEIGHT, BLANK_FRAME_WIDTH};
use crate::errors::WatchError;
use crate::scan::decoder::{CodeDecoder, dedup_detections};
use crate::scan::overlay::{blank_frame, render_overlay};
use crate::scan::registry::CodeRegistry;
use crate::scan::roi::{self, map_pointer_roi};
use crate::scan::types::{
    DetectionUpdate, EventSender, FrameChannel, FrameEvent, PixelRect, WatchEvent,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tracing::{info, trace, warn};

/// How a frame is searched for codes. Selected at construction; the two
/// modes are mutually exclusive operating strategies, not a per-frame switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanStrategy {
    /// Decode only the pointer-selected region of interest
    #[default]
    PointerRoi,
    /// Candidate search and decode over the whole frame
    FullFrame,
}

/// Control cells written by the owning side and read by the worker.
///
/// Pointer x/y are packed into a single atomic so the worker always reads
/// the pair from one load; every cell is last-write-wins.
#[derive(Debug)]
pub struct WatchControls {
    pointer: AtomicU64,
    radius: AtomicU32,
    clear: AtomicBool,
    stop: AtomicBool,
}

impl WatchControls {
    fn new(radius: u32) -> Self {
        Self {
            pointer: AtomicU64::new(0),
            radius: AtomicU32::new(radius.max(1)),
            clear: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        }
    }

    /// Update the pointer position (display coordinates).
    pub fn set_pointer(&self, x: u32, y: u32) {
        let packed = ((x as u64) << 32) | y as u64;
        self.pointer.store(packed, Ordering::Release);
    }

    pub fn pointer(&self) -> (u32, u32) {
        let packed = self.pointer.load(Ordering::Acquire);
        ((packed >> 32) as u32, packed as u32)
    }

    /// Update the ROI half-width. Zero is clamped to one; the worker reads
    /// the latest value at the start of each frame's mapping.
    pub fn set_radius(&self, radius: u32) {
        self.radius.store(radius.max(1), Ordering::Release);
    }

    pub fn radius(&self) -> u32 {
        self.radius.load(Ordering::Acquire)
    }

    /// Request the registry be emptied at the start of the next iteration.
    pub fn request_clear(&self) {
        self.clear.store(true, Ordering::Release);
    }

    fn take_clear(&self) -> bool {
        self.clear.swap(false, Ordering::AcqRel)
    }

    /// Request cooperative loop shutdown. Polled once per iteration; the
    /// worker finishes its current frame first.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn reset_stop(&self) {
        self.stop.store(false, Ordering::Release);
    }
}

/// Worker-side state, created on the worker thread at loop start
struct ScanState {
    source: Box<dyn CaptureSource>,
    registry: CodeRegistry,
    decoder: CodeDecoder,
    controls: Arc<WatchControls>,
    events: EventSender,
    strategy: ScanStrategy,
    display_size: (u32, u32),
}

/// Owner-side handle for the scan loop
///
/// At most one loop runs per watcher; starting while one is active first
/// requests cancellation of the running loop and joins it, so two loops
/// never race for the same capture device.
pub struct Watcher {
    strategy: ScanStrategy,
    display_size: (u32, u32),
    absence_threshold: u32,
    controls: Arc<WatchControls>,
    controller: Option<ScanLoopController>,
}

impl Watcher {
    pub fn new(
        strategy: ScanStrategy,
        display_size: (u32, u32),
        roi_radius: u32,
        absence_threshold: u32,
    ) -> Self {
        Self {
            strategy,
            display_size,
            absence_threshold,
            controls: Arc::new(WatchControls::new(roi_radius)),
            controller: None,
        }
    }

    /// Shared control cells for pointer, radius, clear and stop requests.
    pub fn controls(&self) -> Arc<WatchControls> {
        Arc::clone(&self.controls)
    }

    pub fn is_running(&self) -> bool {
        self.controller
            .as_ref()
            .map(|c| c.is_running())
            .unwrap_or(false)
    }

    /// Start the scan loop against `spec`, publishing events to `events`.
    ///
    /// The source is resolved once on the worker thread; an open failure is
    /// surfaced as a single [`WatchEvent::Error`] and the loop never starts.
    /// If a loop is already running it is cancelled and joined first.
    pub fn start(&mut self, spec: SourceSpec, events: EventSender) {
        if let Some(mut old) = self.controller.take() {
            info!("Stopping previous scan loop before restart");
            old.stop();
        }
        self.controls.reset_stop();

        let controls = Arc::clone(&self.controls);
        let strategy = self.strategy;
        let display_size = self.display_size;
        let threshold = self.absence_threshold;

        let init = move || -> Result<ScanState, String> {
            match camera::open_source(&spec) {
                Ok(source) => {
                    info!(source = %source.describe(), "Capture source opened");
                    Ok(ScanState {
                        source,
                        registry: CodeRegistry::new(threshold),
                        decoder: CodeDecoder::new(),
                        controls,
                        events,
                        strategy,
                        display_size,
                    })
                }
                Err(e) => {
                    let error = WatchError::SourceUnavailable(e.to_string());
                    let _ = events.unbounded_send(WatchEvent::Error(error.clone()));
                    Err(error.to_string())
                }
            }
        };

        self.controller = Some(ScanLoopController::start_with_init(
            "scan-loop",
            init,
            run_iteration,
            publish_blank_frames,
        ));
    }

    /// Request cancellation without waiting.
    pub fn request_stop(&self) {
        self.controls.request_stop();
        if let Some(controller) = &self.controller {
            controller.request_stop();
        }
    }

    /// Stop the loop and block until the worker has fully exited. Required
    /// before reopening the same capture device.
    pub fn stop(&mut self) {
        self.controls.request_stop();
        if let Some(mut controller) = self.controller.take() {
            controller.stop();
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One scan-loop iteration: frame in, events out.
fn run_iteration(state: &mut ScanState) -> LoopAction {
    let frame = match state.source.read_frame() {
        Ok(frame) => frame,
        Err(CaptureError::FrameUnavailable(reason)) => {
            // Skip the tick without advancing any registry state
            trace!(reason = %reason, "Frame unavailable, skipping tick");
            return LoopAction::Continue;
        }
        Err(e) => {
            warn!(error = %e, "Capture read failed, skipping tick");
            return LoopAction::Continue;
        }
    };

    // Cancellation is polled here, after the frame read
    if state.controls.stop_requested() {
        return LoopAction::Stop;
    }

    if state.controls.take_clear() {
        state.registry.clear();
    }

    let pointer = state.controls.pointer();
    let radius = state.controls.radius();
    let frame_size = (frame.width(), frame.height());

    let (skip_decode, scan_rect) = match state.strategy {
        ScanStrategy::PointerRoi => (
            roi::is_sentinel(pointer),
            map_pointer_roi(pointer, state.display_size, frame_size, radius),
        ),
        ScanStrategy::FullFrame => (false, PixelRect::full(frame_size.0, frame_size.1)),
    };

    let detections = if skip_decode {
        Vec::new()
    } else {
        dedup_detections(state.decoder.decode_region(&frame.image, scan_rect))
    };

    let annotated = render_overlay(&frame.image, scan_rect, &detections);

    if !skip_decode {
        let first_seen = Arc::new(annotated.clone());
        let report = state.registry.observe(&detections, &first_seen);
        if report.set_changed || !report.transitions.is_empty() {
            let update = DetectionUpdate {
                detections: detections.clone(),
                registry: state.registry.snapshot(),
                transitions: report.transitions,
                set_changed: report.set_changed,
            };
            if publish(&state.events, WatchEvent::Detections(update)).is_err() {
                return LoopAction::Stop;
            }
        }
    }

    let frame_events = match state.strategy {
        ScanStrategy::PointerRoi => vec![FrameEvent {
            frame: annotated,
            channel: FrameChannel::Live,
        }],
        ScanStrategy::FullFrame => vec![
            FrameEvent {
                frame: frame.image,
                channel: FrameChannel::Live,
            },
            FrameEvent {
                frame: annotated,
                channel: FrameChannel::Detection,
            },
        ],
    };

    for event in frame_events {
        if publish(&state.events, WatchEvent::Frame(event)).is_err() {
            return LoopAction::Stop;
        }
    }

    LoopAction::Continue
}

/// Final publish on shutdown: one blank frame per display surface so
/// downstream views clear.
fn publish_blank_frames(state: ScanState) {
    for channel in [FrameChannel::Detection, FrameChannel::Live] {
        let event = WatchEvent::Frame(FrameEvent {
            frame: blank_frame(BLANK_FRAME_WIDTH, BLANK_FRAME_HEIGHT),
            channel,
        });
        let _ = publish(&state.events, event);
    }
}

fn publish(events: &EventSender, event: WatchEvent) -> Result<(), ()> {
    events.unbounded_send(event).map_err(|_| {
        trace!("Consumer channel closed");
    })
}
