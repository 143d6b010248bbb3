//! Abstract service lifecycle
//!
//! One command maps to exactly one supervisor operation. The machine
//! does not second-guess preconditions: the native supervisor is
//! authoritative for the real state, and its refusals pass through
//! unchanged.

use std::str::FromStr;

use thiserror::Error;

use crate::error::{PayloadError, SupervisorError};
use crate::payload::Payload;
use crate::status::{self, StatusReport};
use crate::supervisor::Supervisor;

/// The abstract lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Register the service with the native supervisor
    Install,
    /// Remove the service registration
    Uninstall,
    /// Ask the supervisor to start the installed service
    Start,
    /// Ask the supervisor to stop the running service
    Stop,
    /// Query status and host capabilities
    Status,
    /// Run the payload in this process, foreground
    RunInPlace,
}

impl FromStr for LifecycleCommand {
    type Err = UnsupportedCommand;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "install-service" => Ok(LifecycleCommand::Install),
            "uninstall-service" => Ok(LifecycleCommand::Uninstall),
            "start" => Ok(LifecycleCommand::Start),
            "stop" => Ok(LifecycleCommand::Stop),
            "status" => Ok(LifecycleCommand::Status),
            "run" => Ok(LifecycleCommand::RunInPlace),
            other => Err(UnsupportedCommand(other.to_string())),
        }
    }
}

/// Command token outside the known lifecycle surface.
#[derive(Debug, Error)]
#[error("command not supported: {0}")]
pub struct UnsupportedCommand(pub String);

/// Failure of a lifecycle transition.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Result of a successfully applied command.
pub enum Applied {
    /// The transition completed
    Done,
    /// A status query produced a report
    Report(StatusReport),
}

/// Binds a supervisor adapter and a payload, and applies one command
/// at a time.
pub struct Lifecycle {
    supervisor: Box<dyn Supervisor>,
    payload: Box<dyn Payload>,
}

impl Lifecycle {
    pub fn new(supervisor: Box<dyn Supervisor>, payload: Box<dyn Payload>) -> Self {
        Self {
            supervisor,
            payload,
        }
    }

    pub fn supervisor(&self) -> &dyn Supervisor {
        self.supervisor.as_ref()
    }

    /// Apply one command as exactly one supervisor operation.
    pub fn apply(&mut self, command: LifecycleCommand) -> Result<Applied, LifecycleError> {
        match command {
            LifecycleCommand::Install => self.supervisor.install()?,
            LifecycleCommand::Uninstall => self.supervisor.uninstall()?,
            LifecycleCommand::Start => self.supervisor.start()?,
            LifecycleCommand::Stop => self.supervisor.stop()?,
            LifecycleCommand::Status => {
                return Ok(Applied::Report(status::report(self.supervisor.as_ref())));
            }
            LifecycleCommand::RunInPlace => {
                self.supervisor.run_payload(self.payload.as_mut())?;
            }
        }
        Ok(Applied::Done)
    }
}
