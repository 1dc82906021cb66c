//! Machine controller
//!
//! Owns the authoritative machine state and coordinates everything that
//! touches it: the streaming job executor, asynchronous operator commands,
//! status frames arriving from the motion controller, and the spindle and
//! vacuum side-effects a toolpath implies.
//!
//! The state sits behind a single lock. Critical sections are field
//! updates only; serial writes, file reads, and peripheral writes all
//! happen outside it.

use crate::peripherals::{SpindleSink, VacuumSink};
use crate::spindle::SpindleShim;
use parking_lot::Mutex;
use routerkit_communication::{
    GrblLink, LinkConfig, StatusUpdate, CMD_CYCLE_START, CMD_FEED_HOLD, CMD_HOME, CMD_SOFT_RESET,
};
use routerkit_core::{
    Config, Error, MachineState, MachineStatus, Result, SpindleDirection, Tool, WorkOffset,
};
use routerkit_storage::{FileStore, ToolStore};
use routerkit_toolpath::MoveTracker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Poll period of the executor's pause gate
const PAUSE_POLL: Duration = Duration::from_millis(50);

/// Inter-line dwell while streaming to the link; bounds throughput so the
/// controller's input buffer keeps up without ack tracking
const LINE_DWELL: Duration = Duration::from_millis(2);

/// Grace period between job end and vacuum off
const VACUUM_OFF_DELAY: Duration = Duration::from_millis(500);

/// Jog feed rate when the operator does not give one, mm/min
const DEFAULT_JOG_FEED: f64 = 500.0;

/// Supervisor of the router's authoritative state
pub struct MachineController {
    state: Arc<Mutex<MachineState>>,
    stop_flag: AtomicBool,
    link: GrblLink,
    spindle: SpindleShim,
    vacuum: Arc<dyn VacuumSink>,
    files: Arc<FileStore>,
    tools: Arc<ToolStore>,
    tracker: Mutex<MoveTracker>,
    job_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl MachineController {
    /// Wire up a controller over the given stores and peripheral sinks
    pub fn new(
        config: &Config,
        files: Arc<FileStore>,
        tools: Arc<ToolStore>,
        spindle_sink: Arc<dyn SpindleSink>,
        vacuum: Arc<dyn VacuumSink>,
    ) -> Arc<Self> {
        let state = Arc::new(Mutex::new(MachineState::default()));
        let ingest = state.clone();
        let link = GrblLink::new(
            LinkConfig::from(config),
            Arc::new(move |update| Self::ingest_status(&ingest, update)),
        );
        Arc::new(Self {
            state,
            stop_flag: AtomicBool::new(false),
            link,
            spindle: SpindleShim::new(spindle_sink, config),
            vacuum,
            files,
            tools,
            tracker: Mutex::new(MoveTracker::new()),
            job_thread: Mutex::new(None),
        })
    }

    /// Open the serial link (no-op in simulation or when already open)
    pub fn connect(&self) {
        self.link.connect();
    }

    /// True while the motion controller is attached
    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Ask the motion controller for a fresh status frame
    pub fn request_status(&self) {
        self.link.request_status();
    }

    /// Deep copy of the current state; never blocks on I/O
    pub fn snapshot(&self) -> MachineState {
        self.state.lock().clone()
    }

    /// True while an executor thread is alive (including its vacuum-off
    /// grace period)
    pub fn job_active(&self) -> bool {
        self.job_thread
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Apply one sparse update from the link
    ///
    /// Only the fields present in the frame are copied. The link's status
    /// word is authoritative over internally-set statuses: an Idle frame
    /// arriving after a job finishes overwrites Complete.
    fn ingest_status(state: &Mutex<MachineState>, update: StatusUpdate) {
        let mut st = state.lock();
        if let Some(status) = update.status {
            st.status = status;
        }
        if let Some(pos) = update.machine_pos {
            st.machine_pos = pos;
        }
        if let Some(offset) = update.work_offset {
            st.work_offset = offset;
        }
        if let Some(feed) = update.feed_rate {
            st.feed_rate = feed;
        }
        if let Some(rpm) = update.spindle_rpm {
            st.spindle_rpm = rpm;
        }
    }

    /// Record the tool selected for the next job
    ///
    /// An unknown id clears the selection rather than failing; only store
    /// faults propagate.
    pub fn set_tool(&self, tool_id: Option<i64>) -> Result<Option<Tool>> {
        let tool = match tool_id {
            Some(id) => self.tools.get_tool(id)?,
            None => None,
        };
        self.state.lock().tool = tool.clone();
        Ok(tool)
    }

    /// Start streaming a stored program
    ///
    /// Rejects with `InvalidState` while a job is running or paused and
    /// with `NotFound` when the file is absent. On accept the executor
    /// thread is spawned and the call returns immediately.
    pub fn start_job(self: &Arc<Self>, filename: &str, tool_id: Option<i64>) -> Result<()> {
        if !self.files.exists(filename) {
            return Err(Error::not_found("file", filename));
        }
        let text = self.files.read_text(filename)?;
        let total_lines = text.lines().count() as u64;

        {
            let mut st = self.state.lock();
            if matches!(st.status, MachineStatus::Running | MachineStatus::Paused) {
                return Err(Error::invalid_state("job already running"));
            }
            st.status = MachineStatus::Running;
            st.job_file = Some(filename.to_string());
            st.current_line = 0;
            st.total_lines = total_lines;
        }

        if let Some(tool) = self.set_tool(tool_id)? {
            {
                let mut st = self.state.lock();
                st.spindle_rpm = f64::from(tool.rpm);
                st.spindle_dir = tool.direction;
            }
            self.spindle.apply(f64::from(tool.rpm), tool.direction);
        }

        self.vacuum.set_state(true);
        self.stop_flag.store(false, Ordering::SeqCst);
        *self.tracker.lock() = MoveTracker::new();

        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let controller = self.clone();
        let handle = thread::Builder::new()
            .name("job-executor".to_string())
            .spawn(move || controller.run_job(lines))?;
        *self.job_thread.lock() = Some(handle);

        tracing::info!("started job {} ({} lines)", filename, total_lines);
        Ok(())
    }

    /// The streaming executor, one thread per job
    fn run_job(&self, lines: Vec<String>) {
        for (i, raw) in lines.iter().enumerate() {
            let idx = (i + 1) as u64;
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }
            // Pause gate. A pause never interrupts the line in flight; it
            // holds the next one.
            while !self.stop_flag.load(Ordering::SeqCst)
                && self.state.lock().status == MachineStatus::Paused
            {
                thread::sleep(PAUSE_POLL);
            }
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }

            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            self.apply_spindle_tokens(line);

            if self.link.is_connected() {
                self.link.send_line(line);
                self.state.lock().current_line = idx;
                thread::sleep(LINE_DWELL);
            } else {
                let pos = self.tracker.lock().consume(line);
                let mut st = self.state.lock();
                st.machine_pos = pos;
                st.current_line = idx;
            }
        }

        let stopped = self.stop_flag.load(Ordering::SeqCst);
        {
            let mut st = self.state.lock();
            st.status = if stopped {
                MachineStatus::Stopped
            } else {
                MachineStatus::Complete
            };
        }
        tracing::info!("job {}", if stopped { "stopped" } else { "complete" });

        thread::sleep(VACUUM_OFF_DELAY);
        self.vacuum.set_state(false);
    }

    /// Scan one line for spindle words and fan the result out to the drive
    ///
    /// `M3`/`M4`/`M5` pick the direction with first-match precedence in
    /// that order; an `S` word overrides the rpm (malformed numbers change
    /// nothing). The shim is applied with the now-current pair before the
    /// line itself is sent, so `S12000 M3` takes effect ahead of any motion
    /// the line commands.
    fn apply_spindle_tokens(&self, line: &str) {
        let code = line.to_ascii_uppercase();

        let direction = if code.contains("M3") {
            Some(SpindleDirection::Cw)
        } else if code.contains("M4") {
            Some(SpindleDirection::Ccw)
        } else if code.contains("M5") {
            Some(SpindleDirection::Off)
        } else {
            None
        };

        let rpm = code
            .split_whitespace()
            .find_map(|token| token.strip_prefix('S'))
            .and_then(|rest| rest.parse::<f64>().ok());

        let (current_rpm, current_dir) = {
            let mut st = self.state.lock();
            if let Some(rpm) = rpm {
                st.spindle_rpm = rpm;
            }
            if let Some(dir) = direction {
                st.spindle_dir = dir;
            }
            (st.spindle_rpm, st.spindle_dir)
        };
        self.spindle.apply(current_rpm, current_dir);
    }

    /// Hold the job at the next line boundary
    pub fn pause(&self) {
        if self.link.is_connected() {
            self.link.realtime_command(CMD_FEED_HOLD);
        }
        let mut st = self.state.lock();
        if st.status == MachineStatus::Running {
            st.status = MachineStatus::Paused;
        }
    }

    /// Release a held job
    pub fn resume(&self) {
        if self.link.is_connected() {
            self.link.realtime_command(CMD_CYCLE_START);
        }
        let mut st = self.state.lock();
        if st.status == MachineStatus::Paused {
            st.status = MachineStatus::Running;
        }
    }

    /// Abort the job; the executor terminates at its next checkpoint
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if self.link.is_connected() {
            self.link.realtime_command(CMD_SOFT_RESET);
        }
        self.state.lock().status = MachineStatus::Stopped;
    }

    /// Run the homing cycle
    pub fn home(&self) {
        if self.link.is_connected() {
            self.link.send_line(CMD_HOME);
        }
        self.state.lock().status = MachineStatus::Homing;
    }

    /// Store a work offset and program it into the motion controller
    pub fn set_work_offset(&self, offset: WorkOffset) {
        self.state.lock().work_offset = offset;
        if self.link.is_connected() {
            self.link.send_line(&format!(
                "G10 L20 P1 X{:.3} Y{:.3} Z{:.3}",
                offset.x, offset.y, offset.z
            ));
        }
    }

    /// Nudge one axis by `delta` millimeters
    ///
    /// Routed to the motion controller's jog protocol when attached,
    /// otherwise applied directly to the simulated position. Never changes
    /// the status.
    pub fn jog(&self, axis: &str, delta: f64, feed: Option<f64>) -> Result<()> {
        let feed = feed.unwrap_or(DEFAULT_JOG_FEED);
        let axis_idx = match axis.to_ascii_uppercase().as_str() {
            "X" => 0,
            "Y" => 1,
            "Z" => 2,
            _ => {
                return Err(Error::invalid_argument(format!(
                    "invalid jog axis: {:?}",
                    axis
                )))
            }
        };

        if self.link.is_connected() {
            let letter = ["X", "Y", "Z"][axis_idx];
            self.link
                .send_line(&format!("$J=G91 {}{:.3} F{:.1}", letter, delta, feed));
            return Ok(());
        }

        let mut st = self.state.lock();
        *st.machine_pos.component_mut(axis_idx) += delta;
        Ok(())
    }
}
