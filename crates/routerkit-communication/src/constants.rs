//! GRBL protocol constants
//!
//! Real-time command bytes are parsed by the motion controller out-of-band
//! from the line stream; the rest of the wire format is ASCII
//! newline-terminated lines and `<...>` status frames.

// Real-time commands
/// Query status command (?)
pub const CMD_QUERY_STATUS: u8 = b'?';

/// Feed hold command (!)
pub const CMD_FEED_HOLD: u8 = b'!';

/// Cycle start/resume command (~)
pub const CMD_CYCLE_START: u8 = b'~';

/// Soft reset command (Ctrl+X = 0x18)
pub const CMD_SOFT_RESET: u8 = 0x18;

// Line commands
/// Run the homing cycle
pub const CMD_HOME: &str = "$H";

/// Default serial communication speed (baud rate)
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
