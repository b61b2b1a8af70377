//! The driver loop.

use std::io;

use tracing::debug;
use weft_engine::{Engine, EngineError, Instruction, Signal};
use weft_types::StateName;

use crate::host::HostIo;

const RUN_STARTED: &str = "State Machine Execution Started";
const RUN_FINISHED: &str = "State Machine Execution Finished";
const RUN_ABORTED: &str = "State Machine Execution Aborted due to Host Error";

/// What a completed (or aborted) run looked like from the outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// State changes observed between instruction deliveries. The engine
    /// exposes no transition instruction, so this undercounts states the
    /// machine passed through silently.
    pub transitions: usize,
    /// Instructions delivered to the host.
    pub delivered: usize,
    /// False when the run was halted without reaching termination.
    pub completed: bool,
}

/// Driver-side failures. Routine failures are not here: those arrive as
/// `error` instructions and are printed like any other.
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("host i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Pulls instructions from an engine and performs them against a
/// [`HostIo`].
pub struct Driver<H: HostIo> {
    host: H,
    debug_mode: bool,
    transition_banners: bool,
}

impl<H: HostIo> Driver<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            debug_mode: false,
            transition_banners: false,
        }
    }

    /// Show `debug` instructions (suppressed by default).
    pub fn with_debug(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Emit a visual separator when a state change is observed.
    pub fn with_transition_banners(mut self, enabled: bool) -> Self {
        self.transition_banners = enabled;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Runs the engine to termination.
    ///
    /// On a host I/O failure the abort banner is printed (best effort) and
    /// the error returned; the engine is not resumed.
    pub fn run(&mut self, engine: &mut Engine) -> Result<RunSummary, DriverError> {
        self.host.banner(RUN_STARTED)?;

        let mut summary = RunSummary {
            transitions: 0,
            delivered: 0,
            completed: false,
        };
        let mut last_seen: (usize, Option<StateName>) =
            (engine.depth(), engine.current_state().cloned());

        let outcome = loop {
            let signal = match engine.next() {
                Ok(signal) => signal,
                Err(err) => break Err(DriverError::Engine(err)),
            };

            match signal {
                Signal::Terminated => {
                    summary.completed = true;
                    break Ok(());
                }
                Signal::Instruction(instruction) => {
                    let now = (engine.depth(), engine.current_state().cloned());
                    if now != last_seen {
                        summary.transitions += 1;
                        last_seen = now;
                        if self.transition_banners {
                            if let Err(err) = self.host.transition_separator(summary.transitions)
                            {
                                break Err(DriverError::Io(err));
                            }
                        }
                    }

                    summary.delivered += 1;
                    if let Err(err) = self.perform(engine, instruction) {
                        break Err(err);
                    }
                }
            }
        };

        match outcome {
            Ok(()) => {
                self.host.banner(RUN_FINISHED)?;
                debug!(
                    transitions = summary.transitions,
                    delivered = summary.delivered,
                    "run finished"
                );
                Ok(summary)
            }
            Err(err) => {
                // Best effort: the banner must not mask the original error.
                let _ = self.host.banner(RUN_ABORTED);
                Err(err)
            }
        }
    }

    /// Performs one delivered instruction.
    fn perform(&mut self, engine: &mut Engine, instruction: Instruction) -> Result<(), DriverError> {
        match instruction {
            Instruction::Notify {
                message,
                level,
                payload,
            } => {
                self.host
                    .notify(level.as_deref().unwrap_or("info"), &message, payload.as_ref())?;
            }

            Instruction::Warning { message, payload } => {
                self.host.warning(&message, payload.as_ref())?;
            }

            Instruction::Error { message, payload } => {
                self.host.error(&message, payload.as_ref())?;
            }

            Instruction::Debug {
                message,
                level,
                payload,
            } => {
                if self.debug_mode {
                    self.host.debug(
                        level.as_deref().unwrap_or("debug"),
                        &message,
                        payload.as_ref(),
                    )?;
                }
            }

            Instruction::Custom { name, payload } => {
                self.host.custom(&name, payload.as_ref())?;
            }

            Instruction::RequestInput { query } => {
                let value = self.host.request_input(&query)?;
                engine.reply(value)?;
            }

            Instruction::Transition { .. } | Instruction::ParentTransition { .. } => {
                debug_assert!(false, "engine never delivers internal instructions");
            }
        }
        Ok(())
    }
}
