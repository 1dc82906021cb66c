//! Duplex serial link to the motion controller
//!
//! Two channels share one device: queued lines drain through an egress
//! worker in submission order, while single-byte real-time commands are
//! written directly from the caller's thread. The byte-level race between
//! the two is intentional; the controller parses real-time codes
//! out-of-band. An ingress worker reads status frames and hands each one
//! to a callback in receive order.
//!
//! The link never raises I/O errors to callers: any fault closes it
//! silently and the machine controller carries on in simulation.

use crate::constants::CMD_QUERY_STATUS;
use crate::status::{parse_status_frame, StatusUpdate};
use parking_lot::Mutex;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Read timeout for the serial device; bounds the ingress worker's blocking
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Delay after opening the device before the wake sequence
const SETTLE_DELAY: Duration = Duration::from_millis(200);

type SerialDevice = Box<dyn serialport::SerialPort>;

/// Callback receiving one sparse update per parsed status frame
pub type StatusCallback = Arc<dyn Fn(StatusUpdate) + Send + Sync>;

/// Connection parameters for the link
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Serial device path
    pub port: String,
    /// Baud rate
    pub baud: u32,
    /// Never open the device; all sends become no-ops
    pub simulation: bool,
}

impl From<&routerkit_core::Config> for LinkConfig {
    fn from(config: &routerkit_core::Config) -> Self {
        Self {
            port: config.serial_port.clone(),
            baud: config.serial_baud,
            simulation: config.simulation,
        }
    }
}

/// Framed serial transport to a GRBL motion controller
pub struct GrblLink {
    config: LinkConfig,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    writer: Arc<Mutex<Option<SerialDevice>>>,
    line_tx: Mutex<Option<mpsc::Sender<String>>>,
    on_status: StatusCallback,
}

impl GrblLink {
    /// Create a link; no device is opened until `connect`
    pub fn new(config: LinkConfig, on_status: StatusCallback) -> Self {
        Self {
            config,
            connected: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            writer: Arc::new(Mutex::new(None)),
            line_tx: Mutex::new(None),
            on_status,
        }
    }

    /// True while the device is open and the workers are alive
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Open the device and start the ingress and egress workers
    ///
    /// Idempotent: a no-op when already connected or in simulation. Open
    /// failures are logged and swallowed; the link simply stays
    /// disconnected.
    pub fn connect(&self) {
        if self.config.simulation {
            tracing::debug!("simulation mode, skipping serial open");
            return;
        }
        if self.is_connected() {
            return;
        }

        let device = match serialport::new(&self.config.port, self.config.baud)
            .timeout(READ_TIMEOUT)
            .open()
        {
            Ok(device) => device,
            Err(e) => {
                tracing::warn!("failed to open {}: {}", self.config.port, e);
                return;
            }
        };
        let reader = match device.try_clone() {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!("failed to clone {}: {}", self.config.port, e);
                return;
            }
        };

        *self.writer.lock() = Some(device);
        self.running.store(true, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);

        let (line_tx, line_rx) = mpsc::channel::<String>();
        *self.line_tx.lock() = Some(line_tx);

        self.spawn_egress(line_rx);
        self.spawn_ingress(reader);

        // Let the controller finish its reset chatter, then discard it and
        // wake the command prompt.
        thread::sleep(SETTLE_DELAY);
        {
            let mut guard = self.writer.lock();
            if let Some(port) = guard.as_mut() {
                let _ = port.clear(serialport::ClearBuffer::Input);
                let _ = port.write_all(b"\r\n").and_then(|_| port.flush());
            }
        }
        tracing::info!("connected to {} at {} baud", self.config.port, self.config.baud);
    }

    /// Stop the workers and close the device
    pub fn close(&self) {
        Self::shutdown(&self.running, &self.connected, &self.writer);
        *self.line_tx.lock() = None;
    }

    /// Enqueue one line for ordered transmission
    ///
    /// The line is trimmed and newline-terminated; the queue is unbounded
    /// and drains through the egress worker. A no-op when disconnected.
    pub fn send_line(&self, line: &str) {
        if !self.is_connected() {
            return;
        }
        let guard = self.line_tx.lock();
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(format!("{}\n", line.trim()));
        }
    }

    /// Write a real-time command byte immediately, bypassing the queue
    pub fn realtime_command(&self, code: u8) {
        if !self.is_connected() {
            return;
        }
        let mut guard = self.writer.lock();
        let Some(port) = guard.as_mut() else {
            return;
        };
        if let Err(e) = port.write_all(&[code]).and_then(|_| port.flush()) {
            tracing::warn!("real-time write failed, closing link: {}", e);
            drop(guard);
            self.close();
        }
    }

    /// Ask the controller for a status frame (`?`)
    pub fn request_status(&self) {
        self.realtime_command(CMD_QUERY_STATUS);
    }

    fn spawn_egress(&self, line_rx: mpsc::Receiver<String>) {
        let running = self.running.clone();
        let connected = self.connected.clone();
        let writer = self.writer.clone();
        thread::Builder::new()
            .name("grbl-egress".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    let line = match line_rx.recv_timeout(READ_TIMEOUT) {
                        Ok(line) => line,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    };
                    let mut guard = writer.lock();
                    let Some(port) = guard.as_mut() else {
                        break;
                    };
                    if let Err(e) = port.write_all(line.as_bytes()).and_then(|_| port.flush()) {
                        tracing::warn!("serial write failed, closing link: {}", e);
                        drop(guard);
                        Self::shutdown(&running, &connected, &writer);
                        break;
                    }
                }
                tracing::debug!("egress worker stopped");
            })
            .expect("failed to spawn egress worker");
    }

    fn spawn_ingress(&self, mut reader: SerialDevice) {
        let running = self.running.clone();
        let connected = self.connected.clone();
        let writer = self.writer.clone();
        let on_status = self.on_status.clone();
        thread::Builder::new()
            .name("grbl-ingress".to_string())
            .spawn(move || {
                let mut pending = String::new();
                let mut buf = [0u8; 512];
                while running.load(Ordering::SeqCst) {
                    match reader.read(&mut buf) {
                        Ok(0) => continue,
                        Ok(n) => {
                            pending.push_str(&String::from_utf8_lossy(&buf[..n]));
                            while let Some(pos) = pending.find('\n') {
                                let line: String = pending.drain(..=pos).collect();
                                if let Some(update) = parse_status_frame(&line) {
                                    on_status(update);
                                } else {
                                    tracing::trace!("dropped line: {:?}", line.trim());
                                }
                            }
                        }
                        Err(e)
                            if matches!(
                                e.kind(),
                                ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                            ) =>
                        {
                            continue
                        }
                        Err(e) => {
                            tracing::warn!("serial read failed, closing link: {}", e);
                            Self::shutdown(&running, &connected, &writer);
                            break;
                        }
                    }
                }
                tracing::debug!("ingress worker stopped");
            })
            .expect("failed to spawn ingress worker");
    }

    /// Flip the link to disconnected and drop the device handle
    fn shutdown(
        running: &AtomicBool,
        connected: &AtomicBool,
        writer: &Mutex<Option<SerialDevice>>,
    ) {
        running.store(false, Ordering::SeqCst);
        connected.store(false, Ordering::SeqCst);
        *writer.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_callback() -> StatusCallback {
        Arc::new(|_| {})
    }

    fn simulated_link() -> GrblLink {
        GrblLink::new(
            LinkConfig {
                port: "/dev/null".to_string(),
                baud: 115_200,
                simulation: true,
            },
            noop_callback(),
        )
    }

    #[test]
    fn simulation_connect_is_a_noop() {
        let link = simulated_link();
        link.connect();
        link.connect();
        assert!(!link.is_connected());
    }

    #[test]
    fn sends_are_noops_when_disconnected() {
        let link = simulated_link();
        link.send_line("G0 X1");
        link.realtime_command(CMD_QUERY_STATUS);
        link.close();
        assert!(!link.is_connected());
    }

    #[test]
    fn open_failure_leaves_link_disconnected() {
        let link = GrblLink::new(
            LinkConfig {
                port: "/definitely/not/a/device".to_string(),
                baud: 115_200,
                simulation: false,
            },
            noop_callback(),
        );
        link.connect();
        assert!(!link.is_connected());
        // connect is tolerant of repeated failures
        link.connect();
        assert!(!link.is_connected());
    }
}
