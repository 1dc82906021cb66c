//! Data models for machine state, positions, and toolpath previews
//!
//! This module provides:
//! - The authoritative machine state snapshot shared with the operator surface
//! - Position and work-offset vectors (millimeters, 3-axis)
//! - Spindle direction and machine status enumerations
//! - Toolpath preview geometry (segments and bounding box)
//! - Program file metadata

pub mod tools;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use tools::{Tool, ToolCreate, ToolUpdate};

/// Machine status enumeration
///
/// The single authoritative status of the router. `Stopped` and `Complete`
/// are terminal job outcomes; `Alarm` is only ever reported by the motion
/// controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MachineStatus {
    /// Machine is idle and ready
    #[default]
    Idle,
    /// A job is streaming
    Running,
    /// A job is held at the pause gate
    Paused,
    /// Machine is homing
    Homing,
    /// Motion controller raised an alarm
    Alarm,
    /// Job was stopped by the operator
    Stopped,
    /// Job ran to completion
    Complete,
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineStatus::Idle => write!(f, "Idle"),
            MachineStatus::Running => write!(f, "Running"),
            MachineStatus::Paused => write!(f, "Paused"),
            MachineStatus::Homing => write!(f, "Homing"),
            MachineStatus::Alarm => write!(f, "Alarm"),
            MachineStatus::Stopped => write!(f, "Stopped"),
            MachineStatus::Complete => write!(f, "Complete"),
        }
    }
}

/// Spindle rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpindleDirection {
    /// Clockwise (M3)
    Cw,
    /// Counter-clockwise (M4)
    Ccw,
    /// Spindle off (M5)
    #[default]
    Off,
}

impl fmt::Display for SpindleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpindleDirection::Cw => write!(f, "CW"),
            SpindleDirection::Ccw => write!(f, "CCW"),
            SpindleDirection::Off => write!(f, "OFF"),
        }
    }
}

impl std::str::FromStr for SpindleDirection {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CW" => Ok(SpindleDirection::Cw),
            "CCW" => Ok(SpindleDirection::Ccw),
            "OFF" => Ok(SpindleDirection::Off),
            other => Err(crate::error::Error::invalid_argument(format!(
                "unknown spindle direction: {}",
                other
            ))),
        }
    }
}

/// Position in machine coordinates, millimeters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
    /// Z-axis position
    pub z: f64,
}

impl Position {
    /// Create a new position
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The machine origin
    pub const ZERO: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Componentwise minimum of two positions
    pub fn min(&self, other: &Position) -> Position {
        Position {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            z: self.z.min(other.z),
        }
    }

    /// Componentwise maximum of two positions
    pub fn max(&self, other: &Position) -> Position {
        Position {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
            z: self.z.max(other.z),
        }
    }

    /// Get a component by axis index (0 = X, 1 = Y, 2 = Z)
    pub fn component(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Get a mutable component by axis index (0 = X, 1 = Y, 2 = Z)
    pub fn component_mut(&mut self, axis: usize) -> &mut f64 {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X:{:.3} Y:{:.3} Z:{:.3}", self.x, self.y, self.z)
    }
}

/// Operator-chosen origin shift in machine coordinates
///
/// A reporting and command-generation quantity only; the core never
/// subtracts it from the machine position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkOffset {
    /// X-axis offset
    pub x: f64,
    /// Y-axis offset
    pub y: f64,
    /// Z-axis offset
    pub z: f64,
}

impl WorkOffset {
    /// Create a new work offset
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for WorkOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X:{:.3} Y:{:.3} Z:{:.3}", self.x, self.y, self.z)
    }
}

/// Authoritative machine state
///
/// One value per process, mutated under an exclusive lock and handed out
/// only as deep copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    /// Current status
    pub status: MachineStatus,
    /// Machine position in mm
    pub machine_pos: Position,
    /// Active work offset
    pub work_offset: WorkOffset,
    /// Reported feed rate, units/min
    pub feed_rate: f64,
    /// Commanded spindle speed, RPM (may exceed the drive's clamp range)
    pub spindle_rpm: f64,
    /// Commanded spindle direction
    pub spindle_dir: SpindleDirection,
    /// Tool selected for the current job, if any
    pub tool: Option<Tool>,
    /// 1-based index of the line most recently submitted to the controller
    pub current_line: u64,
    /// Physical line count of the running program
    pub total_lines: u64,
    /// Filename of the running program, if any
    pub job_file: Option<String>,
}

/// One straight move of a toolpath preview
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Position before the move
    pub start: Position,
    /// Position after the move
    pub end: Position,
    /// True for rapid traverse (G0), false for feed moves (G1)
    pub rapid: bool,
}

/// Toolpath preview: segment list plus axis-aligned bounding box
///
/// A program with no motion lines has both bounds at the origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    /// Segments in program order
    pub segments: Vec<PathSegment>,
    /// Componentwise lower bound over all segment endpoints
    pub bbox_min: Position,
    /// Componentwise upper bound over all segment endpoints
    pub bbox_max: Position,
}

/// Metadata for a stored program file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Filename (no directory components)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub mtime: chrono::DateTime<chrono::Utc>,
}
