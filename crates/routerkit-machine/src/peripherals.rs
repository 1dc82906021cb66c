//! Peripheral sinks: spindle drive and dust-extraction relay
//!
//! The controller only ever talks to the two narrow traits here. No-op
//! implementations are always available for simulation and hostless tests;
//! the `hardware` feature adds Raspberry Pi implementations over GPIO and
//! I2C. Hardware handles are opened once at construction and kept for the
//! process lifetime.

use routerkit_core::SpindleDirection;

/// Resolution of the speed DAC
const DAC_FULL_SCALE: u16 = 4095;

/// Output side of the variable-frequency spindle drive
pub trait SpindleSink: Send + Sync {
    /// Drive the forward/reverse input pair
    fn set_direction(&self, direction: SpindleDirection);

    /// Drive the analog speed input
    fn set_voltage(&self, volts: f64);
}

/// Dust-extraction relay
pub trait VacuumSink: Send + Sync {
    /// Switch the relay
    fn set_state(&self, on: bool);
}

/// Spindle sink that discards writes
#[derive(Debug, Default)]
pub struct NoopSpindle;

impl SpindleSink for NoopSpindle {
    fn set_direction(&self, direction: SpindleDirection) {
        tracing::trace!("noop spindle direction {}", direction);
    }

    fn set_voltage(&self, volts: f64) {
        tracing::trace!("noop spindle voltage {:.3}", volts);
    }
}

/// Vacuum sink that discards writes
#[derive(Debug, Default)]
pub struct NoopVacuum;

impl VacuumSink for NoopVacuum {
    fn set_state(&self, on: bool) {
        tracing::trace!("noop vacuum {}", if on { "on" } else { "off" });
    }
}

/// Encode a voltage as the DAC's 12-bit code
///
/// Clamps to `[0, vref]` and scales to full range.
pub fn dac_code(volts: f64, vref: f64) -> u16 {
    let clamped = volts.clamp(0.0, vref);
    ((clamped / vref) * f64::from(DAC_FULL_SCALE)) as u16
}

/// Pack a 12-bit DAC code big-endian for the two-byte register write
pub fn dac_bytes(code: u16) -> [u8; 2] {
    [(code >> 8) as u8, (code & 0xff) as u8]
}

#[cfg(feature = "hardware")]
pub use hw::{VacuumRelay, VfdOutput};

#[cfg(feature = "hardware")]
mod hw {
    use super::{dac_bytes, dac_code, SpindleSink, VacuumSink};
    use parking_lot::Mutex;
    use routerkit_core::{Config, Error, Result, SpindleDirection};
    use rppal::gpio::{Gpio, OutputPin};
    use rppal::i2c::I2c;

    /// DAC register for the output value
    const DAC_OUTPUT_REGISTER: u8 = 0x00;

    /// VFD control: forward/reverse GPIO pair plus an I2C DAC for speed
    pub struct VfdOutput {
        forward: Mutex<OutputPin>,
        reverse: Mutex<OutputPin>,
        bus: Mutex<I2c>,
        vref: f64,
    }

    impl VfdOutput {
        /// Open the GPIO pins and I2C bus named in the configuration
        ///
        /// Fails with `PeripheralUnavailable` when the hardware is absent;
        /// callers fall back to the no-op sink.
        pub fn new(config: &Config) -> Result<Self> {
            let gpio = Gpio::new()
                .map_err(|e| Error::peripheral(format!("GPIO unavailable: {}", e)))?;
            let forward = gpio
                .get(config.gpio_forward)
                .map_err(|e| Error::peripheral(format!("forward pin: {}", e)))?
                .into_output_low();
            let reverse = gpio
                .get(config.gpio_reverse)
                .map_err(|e| Error::peripheral(format!("reverse pin: {}", e)))?
                .into_output_low();
            let mut bus = I2c::with_bus(config.i2c_bus)
                .map_err(|e| Error::peripheral(format!("I2C bus {}: {}", config.i2c_bus, e)))?;
            bus.set_slave_address(config.dac_address)
                .map_err(|e| Error::peripheral(format!("DAC address: {}", e)))?;

            Ok(Self {
                forward: Mutex::new(forward),
                reverse: Mutex::new(reverse),
                bus: Mutex::new(bus),
                vref: config.dac_vref,
            })
        }
    }

    impl SpindleSink for VfdOutput {
        fn set_direction(&self, direction: SpindleDirection) {
            let mut forward = self.forward.lock();
            let mut reverse = self.reverse.lock();
            match direction {
                SpindleDirection::Cw => {
                    forward.set_high();
                    reverse.set_low();
                }
                SpindleDirection::Ccw => {
                    forward.set_low();
                    reverse.set_high();
                }
                SpindleDirection::Off => {
                    forward.set_low();
                    reverse.set_low();
                }
            }
        }

        fn set_voltage(&self, volts: f64) {
            let code = dac_code(volts, self.vref);
            if let Err(e) = self
                .bus
                .lock()
                .block_write(DAC_OUTPUT_REGISTER, &dac_bytes(code))
            {
                tracing::warn!("DAC write failed: {}", e);
            }
        }
    }

    /// Dust-extraction relay on one GPIO pin
    pub struct VacuumRelay {
        pin: Mutex<OutputPin>,
    }

    impl VacuumRelay {
        /// Open the relay pin named in the configuration
        pub fn new(config: &Config) -> Result<Self> {
            let gpio = Gpio::new()
                .map_err(|e| Error::peripheral(format!("GPIO unavailable: {}", e)))?;
            let pin = gpio
                .get(config.gpio_vacuum)
                .map_err(|e| Error::peripheral(format!("vacuum pin: {}", e)))?
                .into_output_low();
            Ok(Self {
                pin: Mutex::new(pin),
            })
        }
    }

    impl VacuumSink for VacuumRelay {
        fn set_state(&self, on: bool) {
            let mut pin = self.pin.lock();
            if on {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dac_code_spans_full_range() {
        assert_eq!(dac_code(0.0, 5.0), 0);
        assert_eq!(dac_code(5.0, 5.0), 4095);
        assert_eq!(dac_code(2.5, 5.0), 2047);
    }

    #[test]
    fn dac_code_clamps_out_of_range_voltages() {
        assert_eq!(dac_code(-1.0, 5.0), 0);
        assert_eq!(dac_code(7.2, 5.0), 4095);
    }

    #[test]
    fn dac_bytes_pack_big_endian() {
        assert_eq!(dac_bytes(0x0abc), [0x0a, 0xbc]);
        assert_eq!(dac_bytes(4095), [0x0f, 0xff]);
        assert_eq!(dac_bytes(0), [0x00, 0x00]);
    }
}
