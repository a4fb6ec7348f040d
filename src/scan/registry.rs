// SPDX-License-Identifier: GPL-3.0-only

//! Code registry and presence tracking
//!
//! The registry is the append-only superset of every distinct payload ever
//! seen. Each entry carries the annotated frame captured at first sighting
//! (write-once) and a consecutive-absence counter. Presence is derived from
//! that counter against a threshold, so a single dropped or blurred frame
//! never flips an entry's reported state.
//!
//! The registry is owned and mutated exclusively by the scan-loop worker;
//! consumers only ever see [`RegistrySnapshotEntry`] copies.

use crate::scan::types::{
    DetectedCode, PresenceState, PresenceTransition, RegistrySnapshotEntry,
};
use image::RgbImage;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Persistent record for one payload
#[derive(Debug, Clone)]
struct RegistryEntry {
    payload: String,
    /// Annotated frame at the moment of first detection; never overwritten
    first_seen: Arc<RgbImage>,
    /// Consecutive frames this payload has been missing from
    absent_frames: u32,
}

/// Outcome of folding one frame's detection set into the registry
#[derive(Debug, Clone, Default)]
pub struct ObserveReport {
    /// Entries that crossed between present and absent this frame
    pub transitions: Vec<PresenceTransition>,
    /// Whether this frame's payload set differs from the previous frame's
    pub set_changed: bool,
}

/// Append-only registry with debounced presence tracking
#[derive(Debug)]
pub struct CodeRegistry {
    entries: Vec<RegistryEntry>,
    /// Payload set of the immediately preceding observed frame
    previous: BTreeSet<String>,
    threshold: u32,
}

impl CodeRegistry {
    /// Create a registry with the given absence threshold: an entry stays
    /// present while its absence counter is `<= threshold` and flips absent
    /// once the counter exceeds it.
    pub fn new(threshold: u32) -> Self {
        Self {
            entries: Vec::new(),
            previous: BTreeSet::new(),
            threshold,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold one frame's deduplicated detection set into the registry.
    ///
    /// Runs every non-sentinel frame, including frames with an empty set:
    /// absence counters advance and thresholds are re-evaluated regardless
    /// of whether the payload set changed, since an entry can flip absent
    /// purely from counter accumulation while the set stays empty.
    pub fn observe(&mut self, frame_set: &[DetectedCode], annotated: &Arc<RgbImage>) -> ObserveReport {
        let current: BTreeSet<String> =
            frame_set.iter().map(|code| code.payload.clone()).collect();
        let set_changed = current != self.previous;

        for code in frame_set {
            if !self.entries.iter().any(|e| e.payload == code.payload) {
                info!(payload = %code.payload, "Registering new code");
                self.entries.push(RegistryEntry {
                    payload: code.payload.clone(),
                    first_seen: Arc::clone(annotated),
                    absent_frames: 0,
                });
            }
        }

        let mut transitions = Vec::new();
        for entry in &mut self.entries {
            let before = presence(entry.absent_frames, self.threshold);
            if current.contains(&entry.payload) {
                entry.absent_frames = 0;
            } else {
                entry.absent_frames = entry.absent_frames.saturating_add(1);
            }
            let after = presence(entry.absent_frames, self.threshold);

            if before != after {
                debug!(payload = %entry.payload, from = %before, to = %after,
                    absent_frames = entry.absent_frames, "Presence changed");
                transitions.push(PresenceTransition {
                    payload: entry.payload.clone(),
                    from: before,
                    to: after,
                });
            }
        }

        self.previous = current;
        ObserveReport {
            transitions,
            set_changed,
        }
    }

    /// Read-only snapshot of every entry, in first-seen order.
    pub fn snapshot(&self) -> Vec<RegistrySnapshotEntry> {
        self.entries
            .iter()
            .map(|entry| RegistrySnapshotEntry {
                payload: entry.payload.clone(),
                first_seen: Arc::clone(&entry.first_seen),
                absent_frames: entry.absent_frames,
                presence: presence(entry.absent_frames, self.threshold),
            })
            .collect()
    }

    /// Drop every entry. The only way registry size ever decreases.
    pub fn clear(&mut self) {
        info!(entries = self.entries.len(), "Clearing code registry");
        self.entries.clear();
        self.previous.clear();
    }
}

fn presence(absent_frames: u32, threshold: u32) -> PresenceState {
    if absent_frames <= threshold {
        PresenceState::Present
    } else {
        PresenceState::Absent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::types::PixelRect;

    fn blank() -> Arc<RgbImage> {
        Arc::new(RgbImage::new(4, 4))
    }

    fn set(payloads: &[&str]) -> Vec<DetectedCode> {
        payloads
            .iter()
            .map(|p| DetectedCode::new(p.to_string(), PixelRect::new(0, 0, 1, 1)))
            .collect()
    }

    #[test]
    fn test_new_payload_registers_present() {
        let mut registry = CodeRegistry::new(10);
        let report = registry.observe(&set(&["https://example.com"]), &blank());
        assert!(report.set_changed);
        assert!(report.transitions.is_empty());

        let snap = registry.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].absent_frames, 0);
        assert_eq!(snap[0].presence, PresenceState::Present);
    }

    #[test]
    fn test_debounce_threshold_exact() {
        let mut registry = CodeRegistry::new(10);
        registry.observe(&set(&["https://example.com"]), &blank());

        // Absent for 10 frames: counter climbs 1..10, state stays present
        for expected in 1..=10 {
            let report = registry.observe(&set(&[]), &blank());
            assert!(report.transitions.is_empty(), "flipped at {}", expected);
            assert_eq!(registry.snapshot()[0].absent_frames, expected);
            assert_eq!(registry.snapshot()[0].presence, PresenceState::Present);
        }

        // Frame 11: counter = 11, state becomes absent exactly now
        let report = registry.observe(&set(&[]), &blank());
        assert_eq!(report.transitions.len(), 1);
        assert_eq!(report.transitions[0].to, PresenceState::Absent);
        assert_eq!(registry.snapshot()[0].absent_frames, 11);
    }

    #[test]
    fn test_reappearance_resets_counter() {
        let mut registry = CodeRegistry::new(10);
        registry.observe(&set(&["X"]), &blank());
        for _ in 0..5 {
            registry.observe(&set(&[]), &blank());
        }
        assert_eq!(registry.snapshot()[0].absent_frames, 5);

        let report = registry.observe(&set(&["X"]), &blank());
        assert!(report.transitions.is_empty());
        assert_eq!(registry.snapshot()[0].absent_frames, 0);
        assert_eq!(registry.snapshot()[0].presence, PresenceState::Present);
    }

    #[test]
    fn test_absent_entry_returns_present() {
        let mut registry = CodeRegistry::new(2);
        registry.observe(&set(&["X"]), &blank());
        for _ in 0..3 {
            registry.observe(&set(&[]), &blank());
        }
        assert_eq!(registry.snapshot()[0].presence, PresenceState::Absent);

        let report = registry.observe(&set(&["X"]), &blank());
        assert_eq!(report.transitions.len(), 1);
        assert_eq!(report.transitions[0].from, PresenceState::Absent);
        assert_eq!(report.transitions[0].to, PresenceState::Present);
    }

    #[test]
    fn test_registry_monotonic() {
        let mut registry = CodeRegistry::new(10);
        let sequences: [&[&str]; 6] = [&["A"], &["A", "B"], &[], &["C"], &[], &["A"]];
        let mut last_len = 0;
        for frame in sequences {
            registry.observe(&set(frame), &blank());
            assert!(registry.len() >= last_len);
            last_len = registry.len();
        }
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_set_change_detection() {
        let mut registry = CodeRegistry::new(10);
        assert!(!registry.observe(&set(&[]), &blank()).set_changed);
        assert!(registry.observe(&set(&["A"]), &blank()).set_changed);
        assert!(!registry.observe(&set(&["A"]), &blank()).set_changed);
        assert!(registry.observe(&set(&["A", "B"]), &blank()).set_changed);
        assert!(registry.observe(&set(&[]), &blank()).set_changed);
        assert!(!registry.observe(&set(&[]), &blank()).set_changed);
    }

    #[test]
    fn test_counters_advance_on_unchanged_frames() {
        let mut registry = CodeRegistry::new(10);
        registry.observe(&set(&["A"]), &blank());
        // The set stays identical (empty) for many frames; counters must
        // still accumulate and the threshold must still fire
        let mut flipped = false;
        for _ in 0..12 {
            let report = registry.observe(&set(&[]), &blank());
            flipped |= !report.transitions.is_empty();
        }
        assert!(flipped);
        assert_eq!(registry.snapshot()[0].presence, PresenceState::Absent);
    }

    #[test]
    fn test_first_seen_is_write_once() {
        let mut registry = CodeRegistry::new(10);
        let first = blank();
        registry.observe(&set(&["X"]), &first);
        let later = Arc::new(RgbImage::new(8, 8));
        registry.observe(&set(&["X"]), &later);

        let snap = registry.snapshot();
        assert!(Arc::ptr_eq(&snap[0].first_seen, &first));
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut registry = CodeRegistry::new(10);
        registry.observe(&set(&["A", "B"]), &blank());
        registry.clear();
        assert!(registry.is_empty());
        // Same codes after a clear count as a changed set again
        assert!(registry.observe(&set(&["A", "B"]), &blank()).set_changed);
        assert_eq!(registry.len(), 2);
    }
}
