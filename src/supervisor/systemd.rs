//! systemd backend for Linux hosts
//!
//! Registration is a generated unit file under `/etc/systemd/system`
//! when running as root, or the per-user tree under
//! `~/.config/systemd/user` otherwise; control goes through
//! `systemctl` (with `--user` for the per-user tree).

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use super::{HostCapability, ServiceDescriptor, Supervisor, SupervisorStatus};
use crate::error::{PayloadError, SupervisorError};
use crate::payload::Payload;

pub struct SystemdSupervisor {
    descriptor: ServiceDescriptor,
    system_level: bool,
}

impl SystemdSupervisor {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        let system_level = unsafe { libc::getuid() } == 0;
        Self {
            descriptor,
            system_level,
        }
    }

    fn unit_name(&self) -> String {
        format!("{}.service", self.descriptor.name)
    }

    fn unit_path(&self) -> Result<PathBuf, SupervisorError> {
        if self.system_level {
            Ok(PathBuf::from("/etc/systemd/system").join(self.unit_name()))
        } else {
            let config_dir = dirs::config_dir().ok_or_else(|| {
                SupervisorError::Unknown("cannot locate user config directory".into())
            })?;
            Ok(config_dir.join("systemd/user").join(self.unit_name()))
        }
    }

    /// Run one systemctl verb against our unit and classify any refusal.
    fn systemctl(&self, args: &[&str]) -> Result<std::process::Output, SupervisorError> {
        let mut command = Command::new("systemctl");
        if !self.system_level {
            command.arg("--user");
        }
        command.args(args);
        debug!(?args, "invoking systemctl");

        command.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SupervisorError::SupervisorUnavailable
            } else {
                SupervisorError::Unknown(format!("failed to execute systemctl: {e}"))
            }
        })
    }

    fn systemctl_checked(&self, args: &[&str]) -> Result<(), SupervisorError> {
        let output = self.systemctl(args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(classify_systemctl_failure(&String::from_utf8_lossy(
                &output.stderr,
            )))
        }
    }
}

impl Supervisor for SystemdSupervisor {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn install(&self) -> Result<(), SupervisorError> {
        if !systemd_present() {
            return Err(SupervisorError::SupervisorUnavailable);
        }

        let unit_path = self.unit_path()?;
        if unit_path.exists() {
            return Err(SupervisorError::AlreadyInstalled);
        }

        let exe = std::env::current_exe()
            .map_err(|e| SupervisorError::Unknown(format!("cannot resolve executable: {e}")))?;
        let content = unit_content(&self.descriptor, &exe.display().to_string());

        if let Some(parent) = unit_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_to_supervisor)?;
        }
        std::fs::write(&unit_path, content).map_err(io_to_supervisor)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o644);
            std::fs::set_permissions(&unit_path, perms).map_err(io_to_supervisor)?;
        }

        self.systemctl_checked(&["daemon-reload"])?;
        self.systemctl_checked(&["enable", &self.unit_name()])
    }

    fn uninstall(&self) -> Result<(), SupervisorError> {
        let unit_path = self.unit_path()?;
        if !unit_path.exists() {
            return Err(SupervisorError::NotInstalled);
        }

        // Disable before removing; a refusal here still leaves the unit
        // file in place for a retry.
        self.systemctl_checked(&["disable", &self.unit_name()])?;
        std::fs::remove_file(&unit_path).map_err(io_to_supervisor)?;
        self.systemctl_checked(&["daemon-reload"])
    }

    fn start(&self) -> Result<(), SupervisorError> {
        let unit_path = self.unit_path()?;
        if !unit_path.exists() {
            return Err(SupervisorError::NotInstalled);
        }
        self.systemctl_checked(&["start", &self.unit_name()])
    }

    fn stop(&self) -> Result<(), SupervisorError> {
        let unit_path = self.unit_path()?;
        if !unit_path.exists() {
            return Err(SupervisorError::NotInstalled);
        }
        self.systemctl_checked(&["stop", &self.unit_name()])
    }

    fn query_status(&self) -> Result<SupervisorStatus, SupervisorError> {
        // `is-active` exits non-zero for inactive units; the word on
        // stdout is the answer either way.
        let output = self.systemctl(&["is-active", &self.unit_name()])?;
        let state = String::from_utf8_lossy(&output.stdout);
        Ok(parse_active_state(state.trim()))
    }

    fn run_payload(&self, payload: &mut dyn Payload) -> Result<(), PayloadError> {
        // systemd delivers SIGTERM on `systemctl stop`; the foreground
        // runner maps it onto the payload's shutdown signal.
        super::run_foreground(payload)
    }

    fn host_capabilities(&self) -> Vec<HostCapability> {
        vec![
            HostCapability {
                system_name: "systemd",
                available: systemd_present(),
                interactive: std::env::var_os("XDG_RUNTIME_DIR").is_some(),
            },
            HostCapability {
                system_name: "openrc",
                available: PathBuf::from("/run/openrc").exists(),
                interactive: false,
            },
            HostCapability {
                system_name: "sysvinit",
                available: PathBuf::from("/etc/init.d").exists(),
                interactive: false,
            },
        ]
    }
}

fn systemd_present() -> bool {
    PathBuf::from("/run/systemd/system").exists()
}

fn io_to_supervisor(e: std::io::Error) -> SupervisorError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        SupervisorError::PermissionDenied(e.to_string())
    } else {
        SupervisorError::Unknown(e.to_string())
    }
}

/// Map a systemctl stderr message onto the error taxonomy.
fn classify_systemctl_failure(stderr: &str) -> SupervisorError {
    let lower = stderr.to_lowercase();
    if lower.contains("could not be found")
        || lower.contains("not loaded")
        || lower.contains("no such file or directory")
    {
        SupervisorError::NotInstalled
    } else if lower.contains("failed to connect to bus")
        || lower.contains("failed to connect to the service manager")
    {
        SupervisorError::SupervisorUnavailable
    } else {
        SupervisorError::from_native(stderr.trim().to_string())
    }
}

/// Map `systemctl is-active` output onto the normalized status set.
/// Anything unrecognized stays `Unknown`.
fn parse_active_state(state: &str) -> SupervisorStatus {
    match state {
        "active" | "activating" | "reloading" => SupervisorStatus::Running,
        "inactive" | "deactivating" | "failed" => SupervisorStatus::Stopped,
        _ => SupervisorStatus::Unknown,
    }
}

fn unit_content(descriptor: &ServiceDescriptor, exe: &str) -> String {
    let mut content = String::with_capacity(256);
    content.push_str("[Unit]\n");
    content.push_str(&format!("Description={}\n", descriptor.description));
    content.push('\n');
    content.push_str("[Service]\n");
    content.push_str("Type=simple\n");
    // No arguments: a supervised launch is detected at startup and runs
    // the payload directly.
    content.push_str(&format!("ExecStart={exe}\n"));
    content.push_str("Restart=on-failure\n");
    content.push_str("RestartSec=5s\n");
    content.push_str(&format!("SyslogIdentifier={}\n", descriptor.name));
    content.push('\n');
    content.push_str("[Install]\n");
    content.push_str("WantedBy=default.target\n");
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_states_map_to_running() {
        assert_eq!(parse_active_state("active"), SupervisorStatus::Running);
        assert_eq!(parse_active_state("activating"), SupervisorStatus::Running);
    }

    #[test]
    fn inactive_states_map_to_stopped() {
        assert_eq!(parse_active_state("inactive"), SupervisorStatus::Stopped);
        assert_eq!(parse_active_state("failed"), SupervisorStatus::Stopped);
    }

    #[test]
    fn unrecognized_state_is_unknown_not_stopped() {
        assert_eq!(parse_active_state("maintenance"), SupervisorStatus::Unknown);
        assert_eq!(parse_active_state(""), SupervisorStatus::Unknown);
        assert_eq!(parse_active_state("ACTIVE"), SupervisorStatus::Unknown);
    }

    #[test]
    fn missing_unit_classifies_as_not_installed() {
        assert!(matches!(
            classify_systemctl_failure("Unit demo.service could not be found."),
            SupervisorError::NotInstalled
        ));
        assert!(matches!(
            classify_systemctl_failure("Unit demo.service not loaded."),
            SupervisorError::NotInstalled
        ));
    }

    #[test]
    fn bus_failure_classifies_as_unavailable() {
        assert!(matches!(
            classify_systemctl_failure("Failed to connect to bus: No medium found"),
            SupervisorError::SupervisorUnavailable
        ));
    }

    #[test]
    fn permission_refusal_classifies_as_permission_denied() {
        assert!(matches!(
            classify_systemctl_failure(
                "Failed to enable unit: Interactive authentication required."
            ),
            SupervisorError::PermissionDenied(_)
        ));
    }

    #[test]
    fn unit_file_carries_identity_and_exec() {
        let descriptor = ServiceDescriptor::new("demo", "Demo", "A demo service");
        let unit = unit_content(&descriptor, "/usr/local/bin/demo");
        assert!(unit.contains("Description=A demo service\n"));
        assert!(unit.contains("ExecStart=/usr/local/bin/demo\n"));
        assert!(unit.contains("SyslogIdentifier=demo\n"));
        assert!(unit.contains("WantedBy=default.target\n"));
    }
}
