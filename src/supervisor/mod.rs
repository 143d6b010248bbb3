//! Native service supervisor boundary
//!
//! This module is the single seam between the abstract lifecycle
//! operations and whatever supervisor the host OS provides. One
//! concrete backend per target is compiled in and selected by
//! [`native`]; everything above this module speaks only the
//! [`Supervisor`] trait and the normalized status/error vocabulary.

use std::fmt;

use crate::error::{PayloadError, SupervisorError};
use crate::payload::{Payload, ShutdownSignal};

#[cfg(target_os = "linux")]
mod systemd;
#[cfg(target_os = "linux")]
pub use systemd::SystemdSupervisor;

#[cfg(target_os = "macos")]
mod launchd;
#[cfg(target_os = "macos")]
pub use launchd::LaunchdSupervisor;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use self::windows::WindowsSupervisor;

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
mod null;
#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
pub use null::NullSupervisor;

/// Immutable identity of the managed service.
///
/// Created once at process start from caller-supplied configuration and
/// owned by the supervisor adapter for its lifetime.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// Stable machine identifier, unique per host
    pub name: String,
    /// Human-readable label
    pub display_name: String,
    /// Free-text description
    pub description: String,
}

impl ServiceDescriptor {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
        }
    }
}

/// Normalized supervisor status.
///
/// Closed set: any native value the backend does not recognize maps to
/// `Unknown`, never to a guessed `Running` or `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStatus {
    Unknown,
    Running,
    Stopped,
}

impl fmt::Display for SupervisorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorStatus::Unknown => write!(f, "UNKNOWN"),
            SupervisorStatus::Running => write!(f, "RUNNING"),
            SupervisorStatus::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// A supervisor type the backend recognizes on this OS, with its live
/// availability on the current host.
#[derive(Debug, Clone)]
pub struct HostCapability {
    /// Supervisor type name, e.g. "systemd"
    pub system_name: &'static str,
    /// Whether that supervisor is actually present and usable here
    pub available: bool,
    /// Whether it can manage services inside an interactive user session
    pub interactive: bool,
}

/// Abstract lifecycle operations over the native supervisor.
///
/// All operations are synchronous. The native subsystem is
/// authoritative for preconditions; backends classify its refusals
/// (already installed, not installed, permission) into
/// [`SupervisorError`] instead of failing loudly or masking them.
pub trait Supervisor: Send {
    /// Identity this adapter was built around
    fn descriptor(&self) -> &ServiceDescriptor;

    /// Register the service with the native supervisor
    fn install(&self) -> Result<(), SupervisorError>;

    /// Remove the service registration
    fn uninstall(&self) -> Result<(), SupervisorError>;

    /// Ask the native supervisor to start the installed service.
    /// Does not run the payload in this process.
    fn start(&self) -> Result<(), SupervisorError>;

    /// Ask the native supervisor to stop the running service
    fn stop(&self) -> Result<(), SupervisorError>;

    /// Live status as the native supervisor reports it right now.
    /// Never cached.
    fn query_status(&self) -> Result<SupervisorStatus, SupervisorError>;

    /// Run the payload in this process, blocking until a stop signal
    /// or a fatal payload error. Used both for supervised instances
    /// and for foreground `run` during development.
    fn run_payload(&self, payload: &mut dyn Payload) -> Result<(), PayloadError>;

    /// Supervisor types recognized on this OS and their availability
    /// on this host. Always succeeds; may be empty on an unsupported
    /// target.
    fn host_capabilities(&self) -> Vec<HostCapability>;
}

/// Build the supervisor backend for the current target OS.
pub fn native(descriptor: ServiceDescriptor) -> Box<dyn Supervisor> {
    #[cfg(target_os = "linux")]
    {
        Box::new(SystemdSupervisor::new(descriptor))
    }
    #[cfg(target_os = "macos")]
    {
        Box::new(LaunchdSupervisor::new(descriptor))
    }
    #[cfg(windows)]
    {
        Box::new(WindowsSupervisor::new(descriptor))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
    {
        Box::new(NullSupervisor::new(descriptor))
    }
}

/// Run a payload on the calling thread with Ctrl-C/SIGTERM wired to its
/// shutdown signal. Shared by the unix backends and foreground runs.
pub(crate) fn run_foreground(payload: &mut dyn Payload) -> Result<(), PayloadError> {
    let (handle, signal) = ShutdownSignal::channel();

    // Handler registration fails if the process already installed one;
    // the payload then stops only on its own terms.
    let _ = ctrlc::set_handler(move || {
        tracing::info!("stop signal received");
        handle.shutdown();
    });

    payload.run(signal)
}
