//! # RouterKit
//!
//! A headless control daemon for small 3-axis CNC routers:
//! - GRBL motion controller over serial with a prioritized real-time channel
//! - Toolpath streaming under operator control (start/pause/resume/stop/home/jog)
//! - VFD spindle control (GPIO direction pair + I2C speed DAC) and a
//!   dust-extraction relay driven from the toolpath's own M/S words
//! - A continuously-updated machine state feed for live operator surfaces
//!
//! ## Architecture
//!
//! RouterKit is organized as a workspace with multiple crates:
//!
//! 1. **routerkit-core** - Types, errors, configuration
//! 2. **routerkit-toolpath** - Program parsing, preview geometry, motion simulation
//! 3. **routerkit-communication** - Serial link and GRBL status parsing
//! 4. **routerkit-machine** - Machine controller, executor, peripherals, broadcaster
//! 5. **routerkit-storage** - Program files and the tool database
//! 6. **routerkit** - This binary, wiring them into a daemon

pub use routerkit_core::{
    ensure_directories, Config, Error, FileInfo, MachineState, MachineStatus, PathSegment,
    Position, Preview, Result, SpindleDirection, Tool, ToolCreate, ToolUpdate, WorkOffset,
};

pub use routerkit_communication::{GrblLink, LinkConfig, StatusUpdate};
pub use routerkit_machine::{
    MachineController, NoopSpindle, NoopVacuum, SpindleShim, SpindleSink, StateBroadcaster,
    StateSubscriber, SubscriberHandle, VacuumSink,
};
pub use routerkit_storage::{FileStore, ToolStore};
pub use routerkit_toolpath::{MoveTracker, ToolpathParser};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Structured console logging with `RUST_LOG` support and an INFO default.
/// Thread names are included; the serial workers and the job executor are
/// named threads.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
