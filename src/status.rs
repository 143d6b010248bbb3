//! Normalized status reporting
//!
//! Pulls the live supervisor status and the host capability snapshot
//! as two independent queries, then renders both. One failing query
//! never hides the other.

use std::fmt;

use crate::error::SupervisorError;
use crate::supervisor::{HostCapability, Supervisor, SupervisorStatus};

/// Snapshot of supervisor status plus host capabilities.
pub struct StatusReport {
    /// Human label used in the rendered status line
    pub display_name: String,
    /// Live status, or the classified failure of the query
    pub status: Result<SupervisorStatus, SupervisorError>,
    /// Supervisor types recognized on this OS with availability flags
    pub capabilities: Vec<HostCapability>,
}

/// Query status and capabilities and bundle them into a report.
pub fn report(supervisor: &dyn Supervisor) -> StatusReport {
    StatusReport {
        display_name: supervisor.descriptor().display_name.clone(),
        status: supervisor.query_status(),
        capabilities: supervisor.host_capabilities(),
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Ok(SupervisorStatus::Unknown) => writeln!(
                f,
                "{} is UNKNOWN. (Is it running as a service?)",
                self.display_name
            )?,
            Ok(status) => writeln!(f, "{} is {}.", self.display_name, status)?,
            Err(e) => writeln!(f, "{} status query failed: {}", self.display_name, e)?,
        }

        writeln!(f, "\nSYSTEM SERVICE INFORMATION:")?;
        if self.capabilities.is_empty() {
            writeln!(f, "  (no service supervisors recognized on this host)")?;
        }
        for (idx, capability) in self.capabilities.iter().enumerate() {
            writeln!(f, "{}:", idx)?;
            writeln!(f, "\tService system: {}", capability.system_name)?;
            writeln!(f, "\tAvailable: {}", capability.available)?;
            writeln!(f, "\tInteractive: {}", capability.interactive)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_capability() -> HostCapability {
        HostCapability {
            system_name: "systemd",
            available: true,
            interactive: false,
        }
    }

    #[test]
    fn running_report_renders_status_and_capabilities() {
        let report = StatusReport {
            display_name: "Demo Service".into(),
            status: Ok(SupervisorStatus::Running),
            capabilities: vec![sample_capability()],
        };
        let rendered = report.to_string();
        assert!(rendered.contains("Demo Service is RUNNING."));
        assert!(rendered.contains("Service system: systemd"));
        assert!(rendered.contains("Available: true"));
    }

    #[test]
    fn unknown_status_hints_at_service_context() {
        let report = StatusReport {
            display_name: "Demo Service".into(),
            status: Ok(SupervisorStatus::Unknown),
            capabilities: vec![],
        };
        let rendered = report.to_string();
        assert!(rendered.contains("is UNKNOWN. (Is it running as a service?)"));
        assert!(rendered.contains("no service supervisors recognized"));
    }

    #[test]
    fn failed_status_query_still_renders_capabilities() {
        let report = StatusReport {
            display_name: "Demo Service".into(),
            status: Err(SupervisorError::SupervisorUnavailable),
            capabilities: vec![sample_capability()],
        };
        let rendered = report.to_string();
        assert!(rendered.contains("status query failed"));
        assert!(rendered.contains("Service system: systemd"));
    }
}
