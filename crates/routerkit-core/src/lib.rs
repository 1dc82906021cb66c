//! # RouterKit Core
//!
//! Core types, errors, and configuration for RouterKit.
//! Provides the machine state data model shared by the controller, the
//! communication layer, and the operator surface.

pub mod config;
pub mod data;
pub mod error;

pub use config::{ensure_directories, Config};
pub use data::{
    FileInfo, MachineState, MachineStatus, PathSegment, Position, Preview, SpindleDirection, Tool,
    ToolCreate, ToolUpdate, WorkOffset,
};
pub use error::{Error, Result};
