//! Cutter definitions persisted in the tool store
//!
//! Tools carry the geometry and cutting parameters the controller applies
//! when a job names a tool: target spindle RPM and direction, feed rate,
//! and the climb-cut flag.

use serde::{Deserialize, Serialize};

use super::SpindleDirection;
use crate::error::{Error, Result};

/// A persisted tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Row id assigned by the store
    pub id: i64,
    /// Human-readable name
    pub name: String,
    /// Cutting diameter in mm
    pub diameter_mm: f64,
    /// Flute/cutting length in mm
    pub length_mm: f64,
    /// Target spindle speed
    pub rpm: u32,
    /// Target feed rate in mm/min
    pub feed_mm_min: f64,
    /// Spindle rotation direction
    pub direction: SpindleDirection,
    /// Climb cutting rather than conventional
    pub climb: bool,
}

/// Payload for creating a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCreate {
    /// Human-readable name
    pub name: String,
    /// Cutting diameter in mm, must be positive
    pub diameter_mm: f64,
    /// Flute/cutting length in mm, must be positive
    pub length_mm: f64,
    /// Target spindle speed, must be positive
    pub rpm: u32,
    /// Target feed rate in mm/min, must be positive
    pub feed_mm_min: f64,
    /// Spindle rotation direction
    pub direction: SpindleDirection,
    /// Climb cutting rather than conventional
    #[serde(default)]
    pub climb: bool,
}

impl ToolCreate {
    /// Validate geometry and cutting parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.diameter_mm > 0.0) {
            return Err(Error::invalid_argument("diameter_mm must be positive"));
        }
        if !(self.length_mm > 0.0) {
            return Err(Error::invalid_argument("length_mm must be positive"));
        }
        if self.rpm == 0 {
            return Err(Error::invalid_argument("rpm must be positive"));
        }
        if !(self.feed_mm_min > 0.0) {
            return Err(Error::invalid_argument("feed_mm_min must be positive"));
        }
        Ok(())
    }

    /// Attach a store-assigned id
    pub fn into_tool(self, id: i64) -> Tool {
        Tool {
            id,
            name: self.name,
            diameter_mm: self.diameter_mm,
            length_mm: self.length_mm,
            rpm: self.rpm,
            feed_mm_min: self.feed_mm_min,
            direction: self.direction,
            climb: self.climb,
        }
    }
}

/// Partial update for a tool; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolUpdate {
    /// New name, if changing
    pub name: Option<String>,
    /// New diameter, if changing; must be positive
    pub diameter_mm: Option<f64>,
    /// New length, if changing; must be positive
    pub length_mm: Option<f64>,
    /// New spindle speed, if changing; must be positive
    pub rpm: Option<u32>,
    /// New feed rate, if changing; must be positive
    pub feed_mm_min: Option<f64>,
    /// New direction, if changing
    pub direction: Option<SpindleDirection>,
    /// New climb flag, if changing
    pub climb: Option<bool>,
}

impl ToolUpdate {
    /// Validate the fields that are present
    pub fn validate(&self) -> Result<()> {
        if matches!(self.diameter_mm, Some(d) if !(d > 0.0)) {
            return Err(Error::invalid_argument("diameter_mm must be positive"));
        }
        if matches!(self.length_mm, Some(l) if !(l > 0.0)) {
            return Err(Error::invalid_argument("length_mm must be positive"));
        }
        if matches!(self.rpm, Some(0)) {
            return Err(Error::invalid_argument("rpm must be positive"));
        }
        if matches!(self.feed_mm_min, Some(f) if !(f > 0.0)) {
            return Err(Error::invalid_argument("feed_mm_min must be positive"));
        }
        Ok(())
    }

    /// Apply this update to an existing tool, returning the merged result
    pub fn apply_to(&self, tool: &Tool) -> Tool {
        Tool {
            id: tool.id,
            name: self.name.clone().unwrap_or_else(|| tool.name.clone()),
            diameter_mm: self.diameter_mm.unwrap_or(tool.diameter_mm),
            length_mm: self.length_mm.unwrap_or(tool.length_mm),
            rpm: self.rpm.unwrap_or(tool.rpm),
            feed_mm_min: self.feed_mm_min.unwrap_or(tool.feed_mm_min),
            direction: self.direction.unwrap_or(tool.direction),
            climb: self.climb.unwrap_or(tool.climb),
        }
    }
}
