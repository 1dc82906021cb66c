//! # RouterKit Communication
//!
//! Serial transport and GRBL protocol plumbing for RouterKit: the duplex
//! framed link with its prioritized real-time channel and queued line
//! channel, and the status report parser that turns `<...>` frames into
//! typed state updates.

pub mod constants;
pub mod link;
pub mod status;

pub use constants::{CMD_CYCLE_START, CMD_FEED_HOLD, CMD_HOME, CMD_QUERY_STATUS, CMD_SOFT_RESET};
pub use link::{GrblLink, LinkConfig, StatusCallback};
pub use status::{parse_status_frame, StatusUpdate};
