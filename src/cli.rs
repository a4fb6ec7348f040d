// SPDX-License-Identifier: GPL-3.0-only

//! CLI command handlers
//!
//! The watch command is a reference consumer of the scan loop: it drains the
//! event channel synchronously and prints presence changes, leaving frame
//! events to debug logging.

use codewatch::actuator::{DropPosition, Dropper, HttpTransport, SerialTransport};
use codewatch::backends::camera::SourceSpec;
use codewatch::scan::{ScanStrategy, WatchEvent, Watcher, event_channel};
use codewatch::{Config, PresenceState};
use futures::StreamExt;
use tracing::debug;

pub fn watch(
    source: &str,
    full_frame: bool,
    pointer: Option<&str>,
    radius: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let spec = SourceSpec::parse(source);
    let strategy = if full_frame {
        ScanStrategy::FullFrame
    } else {
        ScanStrategy::PointerRoi
    };

    let mut watcher = Watcher::new(
        strategy,
        (config.display_width, config.display_height),
        radius.unwrap_or(config.roi_radius),
        config.absence_threshold,
    );

    let controls = watcher.controls();
    match pointer {
        Some(raw) => {
            let (x, y) = parse_pointer(raw)?;
            controls.set_pointer(x, y);
        }
        // No pointer device on the CLI; aim at the display center
        None => controls.set_pointer(config.display_width / 2, config.display_height / 2),
    }

    let (events_tx, mut events_rx) = event_channel();
    watcher.start(spec, events_tx);

    let stop_controls = watcher.controls();
    ctrlc::set_handler(move || {
        eprintln!("stopping...");
        stop_controls.request_stop();
    })?;

    println!("watching {} (Ctrl-C to stop)", source);

    let mut failed = false;
    while let Some(event) = pollster::block_on(events_rx.next()) {
        match event {
            WatchEvent::Frame(frame) => {
                debug!(
                    channel = frame.channel.as_str(),
                    width = frame.frame.width(),
                    height = frame.frame.height(),
                    "Frame published"
                );
            }
            WatchEvent::Detections(update) => {
                for transition in &update.transitions {
                    println!("code {:?} is now {}", transition.payload, transition.to);
                }
                if update.set_changed {
                    print_registry(&update.registry);
                }
            }
            WatchEvent::Error(e) => {
                eprintln!("error: {}", e);
                failed = true;
                break;
            }
        }
    }

    watcher.stop();
    if failed {
        Err("watch loop failed".into())
    } else {
        Ok(())
    }
}

fn print_registry(registry: &[codewatch::scan::types::RegistrySnapshotEntry]) {
    println!("-- {} codes seen --", registry.len());
    for entry in registry {
        let marker = match entry.presence {
            PresenceState::Present => "yes",
            PresenceState::Absent => "no ",
        };
        println!("  [{}] {}", marker, entry.payload);
    }
}

fn parse_pointer(raw: &str) -> Result<(u32, u32), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("bad pointer '{}'; expected x,y", raw))?;
    let x = x
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("bad pointer x '{}'", x))?;
    let y = y
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("bad pointer y '{}'", y))?;
    Ok((x, y))
}

pub fn drop_position(
    position: &str,
    url: Option<String>,
    port: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let position: DropPosition = position.parse()?;
    let config = Config::load();

    if let Some(port) = port.or(config.dropper_port) {
        let transport = SerialTransport::open(&port)?;
        let mut dropper = Dropper::new(transport);
        let status = dropper.status();
        if status.connected && !status.ready {
            return Err("dropper is busy, try again".into());
        }
        dropper.drop_to(position)?;
    } else if let Some(url) = url.or(config.dropper_url) {
        let mut dropper = Dropper::new(HttpTransport::new(url));
        dropper.drop_to(position)?;
    } else {
        return Err("no dropper endpoint: pass --url/--port or set one in the config".into());
    }

    println!("dropped {}", position);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pointer() {
        assert_eq!(parse_pointer("640,300").unwrap(), (640, 300));
        assert_eq!(parse_pointer(" 10 , 20 ").unwrap(), (10, 20));
        assert!(parse_pointer("640").is_err());
        assert!(parse_pointer("a,b").is_err());
    }
}
