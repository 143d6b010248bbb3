//! svckit - embed-and-go service lifecycle control
//!
//! Lets a host application install, start, stop and query itself as a
//! service under the native OS supervisor (systemd, launchd, the
//! Windows Service Control Manager), or run its payload in the
//! foreground for development. The embedding surface is one call:
//! hand [`run`] a [`ServiceDescriptor`] and a [`Payload`] and exit
//! with the returned outcome's code.

pub mod args;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod mode;
pub mod payload;
pub mod status;
pub mod supervisor;

pub use dispatch::{dispatch, run, ExitOutcome};
pub use error::{PayloadError, SupervisorError};
pub use lifecycle::{Lifecycle, LifecycleCommand};
pub use mode::ExecutionMode;
pub use payload::{Payload, ShutdownSignal};
pub use status::StatusReport;
pub use supervisor::{HostCapability, ServiceDescriptor, Supervisor, SupervisorStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
