//! Host-side realtime driver: a background thread standing in for the
//! platform's periodic timer and message dispatch.
//!
//! Each iteration drains a bounded command channel (the host-message
//! path), fires the timer callback, and sleeps whatever remains of the
//! tick budget. Commands drained between ticks are visible to every
//! source from the next tick, the same weak-consistency model the
//! callback priorities give on hardware. The thread exits when the core
//! pauses at its run limit or when a stop command arrives, handing the
//! core and memory back through `join`.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender, TrySendError};

use volley_core::GlobalSourceId;

use crate::core::{SpikeCore, TickOutcome};
use crate::memory::CoreMemory;

// ── Error types ──────────────────────────────────────────────────

/// Error submitting a command to the runner thread.
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// The runner thread has stopped.
    Stopped,
    /// The command channel is full (back-pressure).
    ChannelFull,
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "runner thread has stopped"),
            Self::ChannelFull => write!(f, "command channel full"),
        }
    }
}

impl std::error::Error for SubmitError {}

// ── Commands ─────────────────────────────────────────────────────

enum HostCommand {
    SetRate { id: GlobalSourceId, rate_hz: f64 },
    Stop,
}

// ── RealtimeRunner ───────────────────────────────────────────────

/// Drives a [`SpikeCore`] at its configured tick period on a background
/// thread.
pub struct RealtimeRunner {
    cmd_tx: Sender<HostCommand>,
    thread: Option<JoinHandle<(SpikeCore, CoreMemory)>>,
}

impl RealtimeRunner {
    /// Move the core and its memory image onto a new runner thread.
    pub fn spawn(core: SpikeCore, mem: CoreMemory) -> Self {
        // Command channel: bounded(64), drained once per tick.
        let (cmd_tx, cmd_rx) = bounded::<HostCommand>(64);

        let thread = thread::Builder::new()
            .name("volley-tick".into())
            .spawn(move || {
                let mut core = core;
                let mut mem = mem;
                let budget = Duration::from_micros(u64::from(core.system().timer_period_us));

                loop {
                    let tick_start = Instant::now();

                    // 1. Drain pending host commands.
                    let mut stop = false;
                    while let Ok(cmd) = cmd_rx.try_recv() {
                        match cmd {
                            HostCommand::SetRate { id, rate_hz } => core.set_rate(id, rate_hz),
                            HostCommand::Stop => stop = true,
                        }
                    }
                    if stop {
                        break;
                    }

                    // 2. Fire the timer callback.
                    match core.on_timer_tick(&mut mem) {
                        Ok(TickOutcome::Ran(_)) => {}
                        Ok(TickOutcome::Paused) => break,
                        Err(e) => {
                            log::error!("state write-back failed, stopping runner: {e}");
                            break;
                        }
                    }

                    // 3. Sleep the remaining budget.
                    if let Some(remaining) = budget.checked_sub(tick_start.elapsed()) {
                        thread::sleep(remaining);
                    }
                }

                (core, mem)
            })
            .expect("failed to spawn tick thread");

        Self {
            cmd_tx,
            thread: Some(thread),
        }
    }

    /// Queue a rate update for the next inter-tick drain.
    pub fn set_rate(&self, id: GlobalSourceId, rate_hz: f64) -> Result<(), SubmitError> {
        self.cmd_tx
            .try_send(HostCommand::SetRate { id, rate_hz })
            .map_err(|e| match e {
                TrySendError::Full(_) => SubmitError::ChannelFull,
                TrySendError::Disconnected(_) => SubmitError::Stopped,
            })
    }

    /// Wait for the runner to finish on its own (run limit reached).
    pub fn join(mut self) -> (SpikeCore, CoreMemory) {
        self.take_and_join()
    }

    /// Stop at the next tick boundary and recover the core and memory.
    pub fn shutdown(mut self) -> (SpikeCore, CoreMemory) {
        // Best-effort: the thread may already have paused and exited.
        let _ = self.cmd_tx.try_send(HostCommand::Stop);
        self.take_and_join()
    }

    fn take_and_join(&mut self) -> (SpikeCore, CoreMemory) {
        self.thread
            .take()
            .expect("runner already joined")
            .join()
            .expect("tick thread panicked")
    }
}
