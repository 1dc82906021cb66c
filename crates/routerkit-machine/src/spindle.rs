//! Spindle shim: commanded (rpm, direction) to drive outputs
//!
//! Translates what the toolpath commands into what the drive accepts: the
//! rpm is clamped to the drive's working range and mapped linearly onto the
//! DAC reference voltage. Direction is written before voltage so the drive
//! never sees a speed with a stale rotation sense.

use crate::peripherals::SpindleSink;
use routerkit_core::{Config, SpindleDirection};
use std::sync::Arc;

/// Clamped linear map from spindle commands to sink writes
#[derive(Clone)]
pub struct SpindleShim {
    sink: Arc<dyn SpindleSink>,
    min_rpm: f64,
    max_rpm: f64,
    vref: f64,
}

impl SpindleShim {
    /// Create a shim over the given sink using the configured clamp range
    pub fn new(sink: Arc<dyn SpindleSink>, config: &Config) -> Self {
        Self {
            sink,
            min_rpm: config.spindle_min_rpm,
            max_rpm: config.spindle_max_rpm,
            vref: config.dac_vref,
        }
    }

    /// The control voltage a given rpm command produces
    pub fn voltage_for(&self, rpm: f64) -> f64 {
        let clamped = rpm.clamp(self.min_rpm, self.max_rpm);
        clamped / self.max_rpm * self.vref
    }

    /// Apply a commanded (rpm, direction) pair to the drive
    ///
    /// `Off` drives the speed input to zero even though the commanded rpm
    /// is retained in state; a stopped spindle must not hold a live speed
    /// voltage.
    pub fn apply(&self, rpm: f64, direction: SpindleDirection) {
        let volts = match direction {
            SpindleDirection::Off => 0.0,
            SpindleDirection::Cw | SpindleDirection::Ccw => self.voltage_for(rpm),
        };
        self.sink.set_direction(direction);
        self.sink.set_voltage(volts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records every write, in order
    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<String>>,
    }

    impl SpindleSink for RecordingSink {
        fn set_direction(&self, direction: SpindleDirection) {
            self.writes.lock().push(format!("dir:{}", direction));
        }

        fn set_voltage(&self, volts: f64) {
            self.writes.lock().push(format!("volts:{:.3}", volts));
        }
    }

    fn shim_with_sink() -> (SpindleShim, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let shim = SpindleShim::new(sink.clone(), &Config::default());
        (shim, sink)
    }

    #[test]
    fn maps_rpm_linearly_onto_vref() {
        let (shim, _) = shim_with_sink();
        assert_eq!(shim.voltage_for(0.0), 0.0);
        assert_eq!(shim.voltage_for(12_000.0), 2.5);
        assert_eq!(shim.voltage_for(24_000.0), 5.0);
    }

    #[test]
    fn clamps_above_max_rpm() {
        let (shim, sink) = shim_with_sink();
        shim.apply(30_000.0, SpindleDirection::Cw);
        assert_eq!(
            sink.writes.lock().as_slice(),
            ["dir:CW".to_string(), "volts:5.000".to_string()]
        );
    }

    #[test]
    fn off_zeroes_the_speed_voltage_but_not_the_command() {
        let (shim, sink) = shim_with_sink();
        shim.apply(12_000.0, SpindleDirection::Off);
        assert_eq!(
            sink.writes.lock().as_slice(),
            ["dir:OFF".to_string(), "volts:0.000".to_string()]
        );
        // The map itself is unaffected by direction.
        assert_eq!(shim.voltage_for(12_000.0), 2.5);
    }

    #[test]
    fn direction_is_written_before_voltage() {
        let (shim, sink) = shim_with_sink();
        shim.apply(12_000.0, SpindleDirection::Ccw);
        shim.apply(0.0, SpindleDirection::Off);
        assert_eq!(
            sink.writes.lock().as_slice(),
            [
                "dir:CCW".to_string(),
                "volts:2.500".to_string(),
                "dir:OFF".to_string(),
                "volts:0.000".to_string(),
            ]
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// The map never leaves [0, vref] and matches the clamped
            /// linear formula for any command, sane or not.
            #[test]
            fn voltage_is_the_clamped_linear_map(rpm in -10_000.0f64..100_000.0) {
                let (shim, _) = shim_with_sink();
                let volts = shim.voltage_for(rpm);
                prop_assert!((0.0..=5.0).contains(&volts));
                let expected = rpm.clamp(0.0, 24_000.0) / 24_000.0 * 5.0;
                prop_assert!((volts - expected).abs() < 1e-9);
            }
        }
    }
}
