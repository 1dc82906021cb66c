//! GRBL status report parsing
//!
//! Demultiplexes `<State|Field:...|Field:...>` frames into sparse typed
//! updates. Only the fields present in a frame appear in the update; the
//! controller copies them over its authoritative state in receive order.

use routerkit_core::{MachineStatus, Position, WorkOffset};
use serde::{Deserialize, Serialize};

/// Sparse state update parsed from one status frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Reported machine status
    pub status: Option<MachineStatus>,
    /// `MPos:` machine position
    pub machine_pos: Option<Position>,
    /// `WCO:` work coordinate offset
    pub work_offset: Option<WorkOffset>,
    /// First value of `FS:` feed and speed
    pub feed_rate: Option<f64>,
    /// Second value of `FS:` feed and speed
    pub spindle_rpm: Option<f64>,
}

/// Map a GRBL state word to a machine status
///
/// GRBL suffixes some words with a sub-state (`Hold:0`), so matching is by
/// prefix. Unknown words report Idle.
fn map_state_word(word: &str) -> MachineStatus {
    if word.starts_with("Idle") {
        MachineStatus::Idle
    } else if word.starts_with("Run") {
        MachineStatus::Running
    } else if word.starts_with("Hold") {
        MachineStatus::Paused
    } else if word.starts_with("Home") {
        MachineStatus::Homing
    } else if word.starts_with("Alarm") {
        MachineStatus::Alarm
    } else {
        MachineStatus::Idle
    }
}

/// Parse `x,y,z` into three floats; `None` unless at least three parse
fn parse_coords(value: &str) -> Option<(f64, f64, f64)> {
    let mut parts = value.split(',').map(|p| p.trim().parse::<f64>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => Some((x, y, z)),
        _ => None,
    }
}

/// Parse one received line into a status update
///
/// Returns `None` for anything that is not a `<...>` frame (`ok`, `error:`,
/// the welcome banner); those are dropped by the ingress worker. Malformed
/// fields inside a frame are skipped, not errors.
pub fn parse_status_frame(line: &str) -> Option<StatusUpdate> {
    let line = line.trim();
    if !line.starts_with('<') {
        return None;
    }
    let body = line.trim_start_matches('<').trim_end_matches('>');

    let mut fields = body.split('|');
    let state_word = fields.next().unwrap_or_default();

    let mut update = StatusUpdate {
        status: Some(map_state_word(state_word)),
        ..Default::default()
    };

    for field in fields {
        if let Some(value) = field.strip_prefix("MPos:") {
            if let Some((x, y, z)) = parse_coords(value) {
                update.machine_pos = Some(Position::new(x, y, z));
            }
        } else if let Some(value) = field.strip_prefix("WCO:") {
            if let Some((x, y, z)) = parse_coords(value) {
                update.work_offset = Some(WorkOffset::new(x, y, z));
            }
        } else if let Some(value) = field.strip_prefix("FS:") {
            let mut parts = value.split(',');
            if let Some(Ok(feed)) = parts.next().map(|p| p.trim().parse()) {
                update.feed_rate = Some(feed);
            }
            if let Some(Ok(rpm)) = parts.next().map(|p| p.trim().parse()) {
                update.spindle_rpm = Some(rpm);
            }
        }
        // Ov: and any other fields are ignored.
    }

    Some(update)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_idle_frame() {
        let update =
            parse_status_frame("<Idle|MPos:0.000,0.000,0.000|FS:0,0|WCO:0.000,0.000,0.000>")
                .unwrap();
        assert_eq!(update.status, Some(MachineStatus::Idle));
        assert_eq!(update.machine_pos, Some(Position::ZERO));
        assert_eq!(update.work_offset, Some(WorkOffset::default()));
        assert_eq!(update.feed_rate, Some(0.0));
        assert_eq!(update.spindle_rpm, Some(0.0));
    }

    #[test]
    fn parses_run_frame_with_position() {
        let update = parse_status_frame("<Run|MPos:10.000,5.000,-2.500|FS:600,12000>").unwrap();
        assert_eq!(update.status, Some(MachineStatus::Running));
        assert_eq!(update.machine_pos, Some(Position::new(10.0, 5.0, -2.5)));
        assert_eq!(update.feed_rate, Some(600.0));
        assert_eq!(update.spindle_rpm, Some(12000.0));
        assert!(update.work_offset.is_none());
    }

    #[test]
    fn maps_state_words() {
        for (word, status) in [
            ("Idle", MachineStatus::Idle),
            ("Run", MachineStatus::Running),
            ("Hold", MachineStatus::Paused),
            ("Hold:0", MachineStatus::Paused),
            ("Home", MachineStatus::Homing),
            ("Alarm", MachineStatus::Alarm),
            ("Door:1", MachineStatus::Idle),
            ("Sleep", MachineStatus::Idle),
        ] {
            let update = parse_status_frame(&format!("<{}>", word)).unwrap();
            assert_eq!(update.status, Some(status), "word {:?}", word);
        }
    }

    #[test]
    fn overrides_field_is_ignored() {
        let update = parse_status_frame("<Idle|Ov:100,100,100>").unwrap();
        assert_eq!(update.status, Some(MachineStatus::Idle));
        assert_eq!(update, StatusUpdate {
            status: Some(MachineStatus::Idle),
            ..Default::default()
        });
    }

    #[test]
    fn malformed_fields_are_skipped_not_fatal() {
        let update = parse_status_frame("<Run|MPos:1.0,oops,3.0|FS:500,9000>").unwrap();
        assert!(update.machine_pos.is_none());
        assert_eq!(update.feed_rate, Some(500.0));
    }

    #[test]
    fn non_frames_are_dropped() {
        assert!(parse_status_frame("ok").is_none());
        assert!(parse_status_frame("error:20").is_none());
        assert!(parse_status_frame("Grbl 1.1h ['$' for help]").is_none());
        assert!(parse_status_frame("").is_none());
    }
}
