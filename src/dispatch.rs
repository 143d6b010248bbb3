//! Command dispatch and the embedding entry point
//!
//! The dispatcher turns one parsed command into one lifecycle
//! transition and one structured log event. [`run`] is the whole
//! library in one call for embedding hosts: detect the launch mode,
//! set up logging, parse the command line when there is one, dispatch.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::args::Cli;
use crate::config::RunConfig;
use crate::lifecycle::{Applied, Lifecycle, LifecycleCommand};
use crate::mode::ExecutionMode;
use crate::payload::Payload;
use crate::supervisor::{self, ServiceDescriptor};

/// Outcome of one dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The command completed
    Success,
    /// The command was recognized but failed
    Failure,
    /// The command token is outside the lifecycle surface
    UnsupportedCommand,
}

impl ExitOutcome {
    /// Process exit code for this outcome
    pub fn code(self) -> i32 {
        match self {
            ExitOutcome::Success => 0,
            ExitOutcome::Failure | ExitOutcome::UnsupportedCommand => 1,
        }
    }

    pub fn is_success(self) -> bool {
        self == ExitOutcome::Success
    }
}

/// Execute one command against the lifecycle.
///
/// In supervised mode the command is ignored: the process was started
/// by the native supervisor and its only job is to run the payload. A
/// failure there is fatal to the process. In interactive mode exactly
/// one command runs; failures are logged and reported through the
/// outcome without tearing the process down mid-command.
///
/// A `None` command yields [`ExitOutcome::UnsupportedCommand`]. The
/// [`run`] entry never produces it (clap rejects unknown tokens at
/// parse time); it covers hosts that call `dispatch` directly with
/// their own command source.
pub fn dispatch(
    mode: ExecutionMode,
    command: Option<LifecycleCommand>,
    lifecycle: &mut Lifecycle,
) -> ExitOutcome {
    if mode.is_supervised() {
        return match lifecycle.apply(LifecycleCommand::RunInPlace) {
            Ok(_) => {
                info!("supervised run finished");
                ExitOutcome::Success
            }
            Err(e) => {
                error!("supervised run failed: {e}");
                ExitOutcome::Failure
            }
        };
    }

    let Some(command) = command else {
        error!("command not supported");
        return ExitOutcome::UnsupportedCommand;
    };

    match lifecycle.apply(command) {
        Ok(Applied::Report(report)) => {
            let failed = report.status.is_err();
            println!("{report}");
            if failed {
                ExitOutcome::Failure
            } else {
                ExitOutcome::Success
            }
        }
        Ok(Applied::Done) => {
            info!("{}", completion_message(command));
            ExitOutcome::Success
        }
        Err(e) => {
            error!("{}", e);
            ExitOutcome::Failure
        }
    }
}

fn completion_message(command: LifecycleCommand) -> &'static str {
    match command {
        LifecycleCommand::Install => "service installed",
        LifecycleCommand::Uninstall => "service uninstalled",
        LifecycleCommand::Start => "service started",
        LifecycleCommand::Stop => "service stopped",
        LifecycleCommand::RunInPlace => "payload finished",
        // Status produces a report, never a bare completion
        LifecycleCommand::Status => "status reported",
    }
}

/// Full embedding entry point.
///
/// The caller supplies the service identity and the payload; this
/// detects the execution mode, initializes logging accordingly, parses
/// the command line in interactive mode, and dispatches. The caller is
/// expected to exit the process with [`ExitOutcome::code`].
pub fn run(descriptor: ServiceDescriptor, payload: impl Payload + 'static) -> ExitOutcome {
    match ExecutionMode::detect() {
        ExecutionMode::Supervised => {
            let config = RunConfig::load_default(&descriptor.name).unwrap_or_default();
            init_supervised_logging(&config);
            let mut lifecycle =
                Lifecycle::new(supervisor::native(descriptor), Box::new(payload));
            dispatch(ExecutionMode::Supervised, None, &mut lifecycle)
        }
        ExecutionMode::Interactive => {
            let cli = match Cli::try_parse() {
                Ok(cli) => cli,
                Err(e) => {
                    // Help and version displays are successful exits;
                    // anything else is a parse failure.
                    use clap::error::ErrorKind;
                    let _ = e.print();
                    return if matches!(
                        e.kind(),
                        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
                    ) {
                        ExitOutcome::Success
                    } else {
                        ExitOutcome::Failure
                    };
                }
            };
            init_interactive_logging(&cli);
            let mut lifecycle =
                Lifecycle::new(supervisor::native(descriptor), Box::new(payload));
            dispatch(
                ExecutionMode::Interactive,
                Some(cli.command.lifecycle()),
                &mut lifecycle,
            )
        }
    }
}

fn init_interactive_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // try_init: the embedding host may have installed its own
    // subscriber already
    if let Some(log_file) = &cli.log {
        match std::fs::File::create(log_file) {
            Ok(file) => {
                let _ = subscriber
                    .with_writer(std::sync::Arc::new(file))
                    .with_ansi(false)
                    .try_init();
            }
            Err(e) => {
                eprintln!("warning: failed to open log file '{log_file}': {e}");
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(EnvFilter::new(cli.log_level().to_string()))
                    .with_target(false)
                    .try_init();
            }
        }
    } else {
        let _ = subscriber.try_init();
    }
}

fn init_supervised_logging(config: &RunConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if !config.log_file.is_empty() {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file);

        if let Ok(file) = file {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Arc::new(file))
                .with_ansi(false)
                .try_init();
            return;
        }
    }

    // No console exists under a supervisor; without a usable log file
    // events are dropped.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::sink)
        .try_init();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::{PayloadError, SupervisorError};
    use crate::payload::ShutdownSignal;
    use crate::supervisor::testing::{Call, RecordingSupervisor};

    fn lifecycle_with(
        supervisor: RecordingSupervisor,
    ) -> (Lifecycle, Arc<parking_lot::Mutex<Vec<Call>>>) {
        let calls = supervisor.calls.clone();
        let payload =
            Box::new(|_signal: ShutdownSignal| -> Result<(), PayloadError> { Ok(()) });
        (Lifecycle::new(Box::new(supervisor), payload), calls)
    }

    #[test]
    fn is_success_tracks_exit_codes() {
        assert!(ExitOutcome::Success.is_success());
        assert_eq!(ExitOutcome::Success.code(), 0);
        assert!(!ExitOutcome::Failure.is_success());
        assert!(!ExitOutcome::UnsupportedCommand.is_success());
    }

    #[test]
    fn supervised_mode_always_runs_the_payload() {
        // Command-line content must not matter under a supervisor
        for command in [
            None,
            Some(LifecycleCommand::Install),
            Some(LifecycleCommand::Uninstall),
            Some(LifecycleCommand::Stop),
        ] {
            let (mut lifecycle, calls) = lifecycle_with(RecordingSupervisor::new());
            let outcome = dispatch(ExecutionMode::Supervised, command, &mut lifecycle);
            assert_eq!(outcome, ExitOutcome::Success);
            assert_eq!(*calls.lock(), vec![Call::RunPayload]);
        }
    }

    #[test]
    fn supervised_payload_failure_is_fatal() {
        let supervisor = RecordingSupervisor::new();
        let calls = supervisor.calls.clone();
        let payload = Box::new(|_signal: ShutdownSignal| -> Result<(), PayloadError> {
            Err(PayloadError::msg("boom"))
        });
        let mut lifecycle = Lifecycle::new(Box::new(supervisor), payload);

        let outcome = dispatch(ExecutionMode::Supervised, None, &mut lifecycle);
        assert_eq!(outcome, ExitOutcome::Failure);
        assert_eq!(outcome.code(), 1);
        assert_eq!(*calls.lock(), vec![Call::RunPayload]);
    }

    #[test]
    fn interactive_commands_trigger_one_operation_each() {
        let cases = [
            (LifecycleCommand::Install, Call::Install),
            (LifecycleCommand::Uninstall, Call::Uninstall),
            (LifecycleCommand::Start, Call::Start),
            (LifecycleCommand::Stop, Call::Stop),
            (LifecycleCommand::RunInPlace, Call::RunPayload),
        ];
        for (command, expected) in cases {
            let (mut lifecycle, calls) = lifecycle_with(RecordingSupervisor::new());
            let outcome = dispatch(ExecutionMode::Interactive, Some(command), &mut lifecycle);
            assert_eq!(outcome, ExitOutcome::Success, "command {command:?}");
            assert_eq!(*calls.lock(), vec![expected], "command {command:?}");
        }
    }

    #[test]
    fn interactive_failure_reports_without_crashing() {
        let (mut lifecycle, _calls) =
            lifecycle_with(RecordingSupervisor::failing(|| SupervisorError::NotInstalled));
        let outcome = dispatch(
            ExecutionMode::Interactive,
            Some(LifecycleCommand::Uninstall),
            &mut lifecycle,
        );
        assert_eq!(outcome, ExitOutcome::Failure);
        assert_eq!(outcome.code(), 1);
    }

    #[test]
    fn missing_command_is_unsupported_not_status() {
        let (mut lifecycle, calls) = lifecycle_with(RecordingSupervisor::new());
        let outcome = dispatch(ExecutionMode::Interactive, None, &mut lifecycle);
        assert_eq!(outcome, ExitOutcome::UnsupportedCommand);
        assert_eq!(outcome.code(), 1);
        // No cross-talk: nothing was invoked on the supervisor
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn status_command_succeeds_and_queries_both_facets() {
        let (mut lifecycle, calls) = lifecycle_with(RecordingSupervisor::new());
        let outcome = dispatch(
            ExecutionMode::Interactive,
            Some(LifecycleCommand::Status),
            &mut lifecycle,
        );
        assert_eq!(outcome, ExitOutcome::Success);
        assert_eq!(
            *calls.lock(),
            vec![Call::QueryStatus, Call::HostCapabilities]
        );
    }

    #[test]
    fn failed_status_query_yields_failure_outcome() {
        let (mut lifecycle, _calls) = lifecycle_with(RecordingSupervisor::failing(|| {
            SupervisorError::SupervisorUnavailable
        }));
        let outcome = dispatch(
            ExecutionMode::Interactive,
            Some(LifecycleCommand::Status),
            &mut lifecycle,
        );
        assert_eq!(outcome, ExitOutcome::Failure);
    }
}
