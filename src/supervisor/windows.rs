//! Service Control Manager backend for Windows hosts
//!
//! Registration and control go through the SCM via the
//! `windows-service` crate; a supervised run registers with the
//! service dispatcher and reports state transitions around the
//! payload.

use std::ffi::OsString;
use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{error, info};
use windows_service::{
    define_windows_service,
    service::{
        ServiceAccess, ServiceControl, ServiceControlAccept, ServiceErrorControl, ServiceExitCode,
        ServiceInfo, ServiceStartType, ServiceState, ServiceStatus, ServiceType,
    },
    service_control_handler::{self, ServiceControlHandlerResult},
    service_dispatcher,
    service_manager::{ServiceManager, ServiceManagerAccess},
};

use super::{HostCapability, ServiceDescriptor, Supervisor, SupervisorStatus};
use crate::error::{PayloadError, SupervisorError};
use crate::mode::ExecutionMode;
use crate::payload::{Payload, ShutdownSignal};

const SERVICE_TYPE: ServiceType = ServiceType::OWN_PROCESS;

pub struct WindowsSupervisor {
    descriptor: ServiceDescriptor,
}

impl WindowsSupervisor {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self { descriptor }
    }

    fn open_manager(&self, access: ServiceManagerAccess) -> Result<ServiceManager, SupervisorError> {
        ServiceManager::local_computer(None::<&str>, access).map_err(classify_scm_error)
    }

    fn open_service(
        &self,
        access: ServiceAccess,
    ) -> Result<windows_service::service::Service, SupervisorError> {
        let manager = self.open_manager(ServiceManagerAccess::CONNECT)?;
        manager
            .open_service(&self.descriptor.name, access)
            .map_err(classify_scm_error)
    }
}

impl Supervisor for WindowsSupervisor {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn install(&self) -> Result<(), SupervisorError> {
        let manager =
            self.open_manager(ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE)?;

        let exe = std::env::current_exe()
            .map_err(|e| SupervisorError::Unknown(format!("cannot resolve executable: {e}")))?;

        let info = ServiceInfo {
            name: OsString::from(&self.descriptor.name),
            display_name: OsString::from(&self.descriptor.display_name),
            service_type: SERVICE_TYPE,
            start_type: ServiceStartType::OnDemand,
            error_control: ServiceErrorControl::Normal,
            executable_path: exe,
            launch_arguments: vec![],
            dependencies: vec![],
            account_name: None,
            account_password: None,
        };

        let service = manager
            .create_service(&info, ServiceAccess::CHANGE_CONFIG)
            .map_err(classify_scm_error)?;
        service
            .set_description(&self.descriptor.description)
            .map_err(classify_scm_error)
    }

    fn uninstall(&self) -> Result<(), SupervisorError> {
        let service = self.open_service(ServiceAccess::DELETE)?;
        service.delete().map_err(classify_scm_error)
    }

    fn start(&self) -> Result<(), SupervisorError> {
        let service = self.open_service(ServiceAccess::START)?;
        service.start::<&str>(&[]).map_err(classify_scm_error)
    }

    fn stop(&self) -> Result<(), SupervisorError> {
        let service = self.open_service(ServiceAccess::STOP)?;
        service.stop().map_err(classify_scm_error)?;
        Ok(())
    }

    fn query_status(&self) -> Result<SupervisorStatus, SupervisorError> {
        let service = self.open_service(ServiceAccess::QUERY_STATUS)?;
        let status = service.query_status().map_err(classify_scm_error)?;
        Ok(normalize_state(status.current_state))
    }

    fn run_payload(&self, payload: &mut dyn Payload) -> Result<(), PayloadError> {
        if !ExecutionMode::detect().is_supervised() {
            // Foreground development run, no SCM involvement
            return super::run_foreground(payload);
        }

        let context = ServiceContext {
            name: self.descriptor.name.clone(),
            payload: Mutex::new(None),
            result: Mutex::new(None),
        };
        // SAFETY: service_dispatcher::start blocks this thread until
        // service_main has returned, so the payload borrow stays live
        // for the whole dispatch.
        let payload: &'static mut dyn Payload = unsafe { std::mem::transmute(payload) };
        *context.payload.lock() = Some(payload);

        if CONTEXT.set(context).is_err() {
            return Err(PayloadError::msg("service dispatcher already running"));
        }

        let name = CONTEXT.get().map(|c| c.name.clone()).unwrap_or_default();
        if let Err(e) = service_dispatcher::start(name, ffi_service_main) {
            // The parked borrow must not outlive this call
            if let Some(context) = CONTEXT.get() {
                context.payload.lock().take();
            }
            return Err(PayloadError::msg(format!("service dispatcher failed: {e}")));
        }

        CONTEXT
            .get()
            .and_then(|c| c.result.lock().take())
            .unwrap_or(Ok(()))
    }

    fn host_capabilities(&self) -> Vec<HostCapability> {
        vec![HostCapability {
            system_name: "windows-service",
            // The SCM is part of every supported Windows install
            available: true,
            interactive: std::env::var_os("SESSIONNAME").is_some(),
        }]
    }
}

struct ServiceContext {
    name: String,
    payload: Mutex<Option<&'static mut dyn Payload>>,
    result: Mutex<Option<Result<(), PayloadError>>>,
}

static CONTEXT: OnceLock<ServiceContext> = OnceLock::new();

define_windows_service!(ffi_service_main, service_main);

fn service_main(_arguments: Vec<OsString>) {
    if let Err(e) = run_service_main() {
        error!("service run failed: {e}");
    }
}

fn run_service_main() -> Result<(), Box<dyn std::error::Error>> {
    let context = CONTEXT.get().ok_or("service context missing")?;

    let (shutdown, signal) = ShutdownSignal::channel();
    let status_handle = service_control_handler::register(
        &context.name,
        move |control_event| -> ServiceControlHandlerResult {
            match control_event {
                ServiceControl::Stop | ServiceControl::Shutdown => {
                    info!("received stop/shutdown control");
                    shutdown.shutdown();
                    ServiceControlHandlerResult::NoError
                }
                ServiceControl::Interrogate => ServiceControlHandlerResult::NoError,
                _ => ServiceControlHandlerResult::NotImplemented,
            }
        },
    )?;

    status_handle.set_service_status(ServiceStatus {
        service_type: SERVICE_TYPE,
        current_state: ServiceState::Running,
        controls_accepted: ServiceControlAccept::STOP | ServiceControlAccept::SHUTDOWN,
        exit_code: ServiceExitCode::Win32(0),
        checkpoint: 0,
        wait_hint: Duration::default(),
        process_id: None,
    })?;

    let outcome = match context.payload.lock().take() {
        Some(payload) => payload.run(signal),
        None => Err(PayloadError::msg("payload missing from service context")),
    };

    let exit_code = if outcome.is_ok() { 0 } else { 1 };
    *context.result.lock() = Some(outcome);

    status_handle.set_service_status(ServiceStatus {
        service_type: SERVICE_TYPE,
        current_state: ServiceState::Stopped,
        controls_accepted: ServiceControlAccept::empty(),
        exit_code: ServiceExitCode::Win32(exit_code),
        checkpoint: 0,
        wait_hint: Duration::default(),
        process_id: None,
    })?;

    Ok(())
}

/// Map an SCM service state onto the normalized status set.
fn normalize_state(state: ServiceState) -> SupervisorStatus {
    match state {
        ServiceState::Running | ServiceState::StartPending => SupervisorStatus::Running,
        ServiceState::Stopped | ServiceState::StopPending => SupervisorStatus::Stopped,
        // Paused and continue-pending have no place in the normalized
        // vocabulary
        _ => SupervisorStatus::Unknown,
    }
}

/// Map a `windows-service` failure onto the error taxonomy using the
/// underlying Win32 codes.
fn classify_scm_error(err: windows_service::Error) -> SupervisorError {
    const ERROR_ACCESS_DENIED: i32 = 5;
    const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;
    const ERROR_SERVICE_EXISTS: i32 = 1073;

    if let windows_service::Error::Winapi(io) = &err {
        match io.raw_os_error() {
            Some(ERROR_ACCESS_DENIED) => {
                return SupervisorError::PermissionDenied(io.to_string())
            }
            Some(ERROR_SERVICE_DOES_NOT_EXIST) => return SupervisorError::NotInstalled,
            Some(ERROR_SERVICE_EXISTS) => return SupervisorError::AlreadyInstalled,
            _ => {}
        }
    }
    SupervisorError::from_native(err.to_string())
}
