//! Environment-driven daemon configuration
//!
//! Every option has a default suitable for a bench setup (GRBL on
//! `/dev/ttyUSB0`, VFD pins on BCM 17/27/22, MCP4725-style DAC at 0x60).
//! Malformed values fall back to the default with a warning rather than
//! aborting startup.

use std::path::PathBuf;

/// Daemon configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Skip opening the serial port; run against the internal move tracker
    pub simulation: bool,
    /// Serial device path for the motion controller
    pub serial_port: String,
    /// Serial baud rate
    pub serial_baud: u32,
    /// BCM pin driving the VFD forward input
    pub gpio_forward: u8,
    /// BCM pin driving the VFD reverse input
    pub gpio_reverse: u8,
    /// BCM pin driving the dust-extraction relay
    pub gpio_vacuum: u8,
    /// I2C bus index for the speed DAC
    pub i2c_bus: u8,
    /// I2C slave address of the speed DAC
    pub dac_address: u16,
    /// DAC full-scale output voltage
    pub dac_vref: f64,
    /// Lower clamp for the spindle drive, RPM
    pub spindle_min_rpm: f64,
    /// Upper clamp for the spindle drive, RPM
    pub spindle_max_rpm: f64,
    /// Root directory for program files and the tool database
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: false,
            serial_port: "/dev/ttyUSB0".to_string(),
            serial_baud: 115_200,
            gpio_forward: 17,
            gpio_reverse: 27,
            gpio_vacuum: 22,
            i2c_bus: 1,
            dac_address: 0x60,
            dac_vref: 5.0,
            spindle_min_rpm: 0.0,
            spindle_max_rpm: 24_000.0,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Build a configuration from the process environment
    ///
    /// Recognized variables: `SIMULATION`, `GRBL_PORT`, `GRBL_BAUD`,
    /// `GPIO_FORWARD`, `GPIO_REVERSE`, `GPIO_VACUUM`, `I2C_BUS`,
    /// `DAC_ADDRESS` (hex), `DAC_VREF`, `SPINDLE_MIN_RPM`,
    /// `SPINDLE_MAX_RPM`, `ROUTERKIT_DATA_DIR`.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            simulation: env_flag("SIMULATION", defaults.simulation),
            serial_port: std::env::var("GRBL_PORT").unwrap_or(defaults.serial_port),
            serial_baud: env_parse("GRBL_BAUD", defaults.serial_baud),
            gpio_forward: env_parse("GPIO_FORWARD", defaults.gpio_forward),
            gpio_reverse: env_parse("GPIO_REVERSE", defaults.gpio_reverse),
            gpio_vacuum: env_parse("GPIO_VACUUM", defaults.gpio_vacuum),
            i2c_bus: env_parse("I2C_BUS", defaults.i2c_bus),
            dac_address: env_hex("DAC_ADDRESS", defaults.dac_address),
            dac_vref: env_parse("DAC_VREF", defaults.dac_vref),
            spindle_min_rpm: env_parse("SPINDLE_MIN_RPM", defaults.spindle_min_rpm),
            spindle_max_rpm: env_parse("SPINDLE_MAX_RPM", defaults.spindle_max_rpm),
            data_dir: std::env::var_os("ROUTERKIT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }

    /// Directory holding uploaded program files
    pub fn gcode_dir(&self) -> PathBuf {
        self.data_dir.join("gcode")
    }

    /// Path of the tool database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("tools.db")
    }
}

/// Parse a boolean flag; accepts 1/0, true/false, yes/no, on/off
fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                tracing::warn!("ignoring {}={:?}: not a boolean flag", name, other);
                default
            }
        },
        Err(_) => default,
    }
}

/// Parse a value with `FromStr`, falling back to the default on error
fn env_parse<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(
                "ignoring {}={:?}: not parseable, using {}",
                name,
                raw,
                default
            );
            default
        }),
        Err(_) => default,
    }
}

/// Parse a hex value, tolerating an optional `0x` prefix
fn env_hex(name: &str, default: u16) -> u16 {
    match std::env::var(name) {
        Ok(raw) => {
            let digits = raw.trim().trim_start_matches("0x").trim_start_matches("0X");
            u16::from_str_radix(digits, 16).unwrap_or_else(|_| {
                tracing::warn!(
                    "ignoring {}={:?}: not a hex address, using {:#x}",
                    name,
                    raw,
                    default
                );
                default
            })
        }
        Err(_) => default,
    }
}

/// Create the data and program directories if they are missing
pub fn ensure_directories(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::create_dir_all(config.gcode_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_bench_setup() {
        let config = Config::default();
        assert_eq!(config.serial_port, "/dev/ttyUSB0");
        assert_eq!(config.serial_baud, 115_200);
        assert_eq!(config.dac_address, 0x60);
        assert_eq!(config.spindle_max_rpm, 24_000.0);
        assert!(!config.simulation);
    }

    #[test]
    fn derived_paths_hang_off_data_dir() {
        let config = Config {
            data_dir: PathBuf::from("/var/lib/routerkit"),
            ..Default::default()
        };
        assert_eq!(config.gcode_dir(), PathBuf::from("/var/lib/routerkit/gcode"));
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/routerkit/tools.db"));
    }

    #[test]
    fn ensure_directories_creates_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: tmp.path().join("data"),
            ..Default::default()
        };
        ensure_directories(&config).unwrap();
        assert!(config.gcode_dir().is_dir());
    }
}
