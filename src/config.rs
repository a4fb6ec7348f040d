// SPDX-License-Identifier: GPL-3.0-only

//! User configuration handling
//!
//! Settings persist as JSON under the platform config directory. A missing
//! or unreadable file falls back to defaults; corrupt content is logged and
//! ignored rather than failing startup.

use crate::constants::{
    ABSENCE_THRESHOLD, DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH, DEFAULT_ROI_RADIUS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Width of the display surface pointer coordinates are expressed in
    pub display_width: u32,
    /// Height of the display surface pointer coordinates are expressed in
    pub display_height: u32,
    /// Half-width of the pointer-selected region of interest (pixels)
    pub roi_radius: u32,
    /// Missed frames tolerated before a code is reported absent
    pub absence_threshold: u32,
    /// Dropper HTTP base URL (e.g. "http://10.0.1.9")
    pub dropper_url: Option<String>,
    /// Dropper serial device path (e.g. "/dev/ttyUSB0")
    pub dropper_port: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_width: DEFAULT_DISPLAY_WIDTH,
            display_height: DEFAULT_DISPLAY_HEIGHT,
            roi_radius: DEFAULT_ROI_RADIUS,
            absence_threshold: ABSENCE_THRESHOLD,
            dropper_url: None,
            dropper_port: None,
        }
    }
}

impl Config {
    /// Path of the config file, if a config directory exists on this system.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("codewatch").join("config.json"))
    }

    /// Load the configuration, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring corrupt config file");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist the configuration, creating the config directory if needed.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Err(std::io::Error::other("no config directory available"));
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(path, contents)
    }
}
