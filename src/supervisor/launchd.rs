//! launchd backend for macOS hosts
//!
//! Registration is a generated property list under
//! `/Library/LaunchDaemons` when running as root, or
//! `~/Library/LaunchAgents` otherwise; control goes through
//! `launchctl`.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use super::{HostCapability, ServiceDescriptor, Supervisor, SupervisorStatus};
use crate::error::{PayloadError, SupervisorError};
use crate::payload::Payload;

pub struct LaunchdSupervisor {
    descriptor: ServiceDescriptor,
    system_level: bool,
}

impl LaunchdSupervisor {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        let system_level = unsafe { libc::getuid() } == 0;
        Self {
            descriptor,
            system_level,
        }
    }

    fn plist_path(&self) -> Result<PathBuf, SupervisorError> {
        let file = format!("{}.plist", self.descriptor.name);
        if self.system_level {
            Ok(PathBuf::from("/Library/LaunchDaemons").join(file))
        } else {
            let home = dirs::home_dir().ok_or_else(|| {
                SupervisorError::Unknown("cannot locate home directory".into())
            })?;
            Ok(home.join("Library/LaunchAgents").join(file))
        }
    }

    fn launchctl(&self, args: &[&str]) -> Result<std::process::Output, SupervisorError> {
        debug!(?args, "invoking launchctl");
        Command::new("launchctl").args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SupervisorError::SupervisorUnavailable
            } else {
                SupervisorError::Unknown(format!("failed to execute launchctl: {e}"))
            }
        })
    }

    fn launchctl_checked(&self, args: &[&str]) -> Result<(), SupervisorError> {
        let output = self.launchctl(args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(classify_launchctl_failure(&String::from_utf8_lossy(
                &output.stderr,
            )))
        }
    }

    fn plist_content(&self) -> Result<String, SupervisorError> {
        let exe = std::env::current_exe()
            .map_err(|e| SupervisorError::Unknown(format!("cannot resolve executable: {e}")))?;

        let mut dict = plist::Dictionary::new();
        dict.insert(
            "Label".into(),
            plist::Value::String(self.descriptor.name.clone()),
        );
        dict.insert(
            "ProgramArguments".into(),
            plist::Value::Array(vec![plist::Value::String(exe.display().to_string())]),
        );
        dict.insert("RunAtLoad".into(), plist::Value::Boolean(false));
        dict.insert("KeepAlive".into(), plist::Value::Boolean(false));

        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, &plist::Value::Dictionary(dict))
            .map_err(|e| SupervisorError::Unknown(format!("failed to generate plist: {e}")))?;
        String::from_utf8(buf)
            .map_err(|e| SupervisorError::Unknown(format!("plist is not valid UTF-8: {e}")))
    }
}

impl Supervisor for LaunchdSupervisor {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn install(&self) -> Result<(), SupervisorError> {
        let plist_path = self.plist_path()?;
        if plist_path.exists() {
            return Err(SupervisorError::AlreadyInstalled);
        }

        let content = self.plist_content()?;
        if let Some(parent) = plist_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_to_supervisor)?;
        }
        std::fs::write(&plist_path, content).map_err(io_to_supervisor)?;

        self.launchctl_checked(&["load", "-w", &plist_path.display().to_string()])
    }

    fn uninstall(&self) -> Result<(), SupervisorError> {
        let plist_path = self.plist_path()?;
        if !plist_path.exists() {
            return Err(SupervisorError::NotInstalled);
        }

        self.launchctl_checked(&["unload", "-w", &plist_path.display().to_string()])?;
        std::fs::remove_file(&plist_path).map_err(io_to_supervisor)
    }

    fn start(&self) -> Result<(), SupervisorError> {
        if !self.plist_path()?.exists() {
            return Err(SupervisorError::NotInstalled);
        }
        self.launchctl_checked(&["start", &self.descriptor.name])
    }

    fn stop(&self) -> Result<(), SupervisorError> {
        if !self.plist_path()?.exists() {
            return Err(SupervisorError::NotInstalled);
        }
        self.launchctl_checked(&["stop", &self.descriptor.name])
    }

    fn query_status(&self) -> Result<SupervisorStatus, SupervisorError> {
        let output = self.launchctl(&["list", &self.descriptor.name])?;
        if !output.status.success() {
            // Not loaded: launchd cannot distinguish "stopped" from
            // "never installed" here, so stay honest.
            return Ok(SupervisorStatus::Unknown);
        }
        Ok(parse_list_output(&String::from_utf8_lossy(&output.stdout)))
    }

    fn run_payload(&self, payload: &mut dyn Payload) -> Result<(), PayloadError> {
        // launchd delivers SIGTERM on `launchctl stop`
        super::run_foreground(payload)
    }

    fn host_capabilities(&self) -> Vec<HostCapability> {
        vec![HostCapability {
            system_name: "launchd",
            // pid 1 is always launchd on macOS
            available: true,
            interactive: !self.system_level,
        }]
    }
}

fn io_to_supervisor(e: std::io::Error) -> SupervisorError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        SupervisorError::PermissionDenied(e.to_string())
    } else {
        SupervisorError::Unknown(e.to_string())
    }
}

fn classify_launchctl_failure(stderr: &str) -> SupervisorError {
    let lower = stderr.to_lowercase();
    if lower.contains("could not find") || lower.contains("no such process") {
        SupervisorError::NotInstalled
    } else if lower.contains("already loaded") {
        SupervisorError::AlreadyInstalled
    } else {
        SupervisorError::from_native(stderr.trim().to_string())
    }
}

/// Interpret `launchctl list <label>` output: a loaded job with a PID
/// entry is running, loaded without one is stopped.
fn parse_list_output(stdout: &str) -> SupervisorStatus {
    if stdout.trim().is_empty() {
        return SupervisorStatus::Unknown;
    }
    if stdout.contains("\"PID\"") {
        SupervisorStatus::Running
    } else {
        SupervisorStatus::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_output_with_pid_is_running() {
        let out = "{\n\t\"PID\" = 4711;\n\t\"Label\" = \"demo\";\n};\n";
        assert_eq!(parse_list_output(out), SupervisorStatus::Running);
    }

    #[test]
    fn list_output_without_pid_is_stopped() {
        let out = "{\n\t\"Label\" = \"demo\";\n\t\"LastExitStatus\" = 0;\n};\n";
        assert_eq!(parse_list_output(out), SupervisorStatus::Stopped);
    }

    #[test]
    fn empty_list_output_is_unknown() {
        assert_eq!(parse_list_output("  "), SupervisorStatus::Unknown);
    }

    #[test]
    fn missing_job_classifies_as_not_installed() {
        assert!(matches!(
            classify_launchctl_failure("Could not find service \"demo\" in domain"),
            SupervisorError::NotInstalled
        ));
    }
}
