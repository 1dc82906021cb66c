//! # RouterKit Machine
//!
//! The supervised core of RouterKit: the machine controller that owns the
//! authoritative state and streams jobs, the spindle shim and peripheral
//! sinks it fans side-effects out to, and the broadcaster feeding live
//! state to subscribers.

pub mod broadcast;
pub mod controller;
pub mod peripherals;
pub mod spindle;

pub use broadcast::{StateBroadcaster, StateSubscriber, SubscriberHandle};
pub use controller::MachineController;
pub use peripherals::{NoopSpindle, NoopVacuum, SpindleSink, VacuumSink};
pub use spindle::SpindleShim;

#[cfg(feature = "hardware")]
pub use peripherals::{VacuumRelay, VfdOutput};
