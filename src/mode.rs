//! Supervised vs. interactive launch detection
//!
//! A process managed by the native supervisor (systemd, launchd, the
//! Windows Service Control Manager) is launched without an interactive
//! session. Detection is a pure query of the launch context, made once
//! at startup and held for the life of the process.

use std::io::IsTerminal;

/// How the current process was launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Launched by the native service supervisor
    Supervised,
    /// Launched directly by an operator or script
    Interactive,
}

impl ExecutionMode {
    /// Detect the execution mode from the process launch context.
    ///
    /// Best-effort: when the platform gives no definite signal this
    /// returns `Interactive`, so an operator always keeps a command
    /// surface.
    pub fn detect() -> Self {
        if launched_by_supervisor() {
            ExecutionMode::Supervised
        } else {
            ExecutionMode::Interactive
        }
    }

    /// True when the process runs under the native supervisor
    pub fn is_supervised(self) -> bool {
        self == ExecutionMode::Supervised
    }
}

#[cfg(target_os = "linux")]
fn launched_by_supervisor() -> bool {
    // systemd sets these for units it spawns, but children inherit
    // them: a shell inside a terminal emulator running as a user unit
    // carries INVOCATION_ID too
    let unit_markers = std::env::var_os("INVOCATION_ID").is_some()
        || std::env::var_os("JOURNAL_STREAM").is_some();
    let parent_is_init = unsafe { libc::getppid() } == 1;
    supervised_launch(
        unit_markers,
        parent_is_init,
        std::io::stderr().is_terminal(),
    )
}

#[cfg(target_os = "macos")]
fn launched_by_supervisor() -> bool {
    // launchd sets XPC_SERVICE_NAME for jobs it manages ("0" means
    // none); GUI terminal shells inherit an application label here
    let unit_markers = match std::env::var_os("XPC_SERVICE_NAME") {
        Some(name) => name != "0" && !name.is_empty(),
        None => false,
    };
    let parent_is_init = unsafe { libc::getppid() } == 1;
    supervised_launch(
        unit_markers,
        parent_is_init,
        std::io::stderr().is_terminal(),
    )
}

/// Supervisor-launch decision from the observed launch context.
///
/// A live terminal always wins: environment markers are inherited
/// through interactive sessions, and an operator at a prompt must keep
/// the command surface.
#[cfg(any(target_os = "linux", target_os = "macos", test))]
fn supervised_launch(unit_markers: bool, parent_is_init: bool, has_terminal: bool) -> bool {
    !has_terminal && (unit_markers || parent_is_init)
}

#[cfg(windows)]
fn launched_by_supervisor() -> bool {
    // Services run in session 0 where no SESSIONNAME is set; interactive
    // logons get "Console" or an RDP session name.
    std::env::var_os("SESSIONNAME").is_none() && !std::io::stdin().is_terminal()
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
fn launched_by_supervisor() -> bool {
    // No supervisor backend exists here, so never claim supervised
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_returns_a_definite_mode() {
        // Whatever the environment, detection must not be ambiguous.
        let mode = ExecutionMode::detect();
        assert!(matches!(
            mode,
            ExecutionMode::Supervised | ExecutionMode::Interactive
        ));
    }

    #[test]
    fn is_supervised_matches_variant() {
        assert!(ExecutionMode::Supervised.is_supervised());
        assert!(!ExecutionMode::Interactive.is_supervised());
    }

    #[test]
    fn terminal_session_is_interactive_despite_unit_markers() {
        // A shell under a terminal emulator that itself runs as a user
        // unit inherits the supervisor's environment; the terminal
        // must still get the command surface.
        assert!(!supervised_launch(true, false, true));
        assert!(!supervised_launch(true, true, true));
    }

    #[test]
    fn unit_markers_without_terminal_mean_supervised() {
        assert!(supervised_launch(true, false, false));
        assert!(supervised_launch(true, true, false));
    }

    #[test]
    fn init_orphan_without_terminal_means_supervised() {
        assert!(supervised_launch(false, true, false));
    }

    #[test]
    fn bare_launch_is_interactive() {
        // No marker, no init parent: interactive regardless of terminal
        assert!(!supervised_launch(false, false, false));
        assert!(!supervised_launch(false, false, true));
    }
}
