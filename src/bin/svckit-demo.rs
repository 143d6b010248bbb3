//! Demo host for svckit
//!
//! A minimal daemon that logs a heartbeat until it is told to stop.
//! Shows the full embedding surface:
//!
//!   svckit-demo install-service
//!   svckit-demo start
//!   svckit-demo status
//!   svckit-demo stop
//!   svckit-demo uninstall-service
//!   svckit-demo run            (foreground, Ctrl+C to stop)

use std::time::Duration;

use tracing::info;

use svckit::{PayloadError, ServiceDescriptor, ShutdownSignal};

fn heartbeat(shutdown: ShutdownSignal) -> Result<(), PayloadError> {
    info!("heartbeat daemon started (svckit {})", svckit::VERSION);
    while !shutdown.wait_timeout(Duration::from_secs(5)) {
        info!("still alive");
    }
    info!("heartbeat daemon stopping");
    Ok(())
}

fn main() {
    let descriptor = ServiceDescriptor::new(
        "svckit-demo",
        "Svckit Demo Daemon",
        "Logs a heartbeat every few seconds until stopped",
    );

    let outcome = svckit::run(descriptor, heartbeat);
    if !outcome.is_success() {
        info!("exiting with failure");
    }
    std::process::exit(outcome.code());
}
