//! Fallback backend for targets with no supported supervisor
//!
//! Every control operation reports `SupervisorUnavailable`; the
//! foreground run still works so development on such hosts is
//! possible.

use super::{HostCapability, ServiceDescriptor, Supervisor, SupervisorStatus};
use crate::error::{PayloadError, SupervisorError};
use crate::payload::Payload;

pub struct NullSupervisor {
    descriptor: ServiceDescriptor,
}

impl NullSupervisor {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self { descriptor }
    }
}

impl Supervisor for NullSupervisor {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn install(&self) -> Result<(), SupervisorError> {
        Err(SupervisorError::SupervisorUnavailable)
    }

    fn uninstall(&self) -> Result<(), SupervisorError> {
        Err(SupervisorError::SupervisorUnavailable)
    }

    fn start(&self) -> Result<(), SupervisorError> {
        Err(SupervisorError::SupervisorUnavailable)
    }

    fn stop(&self) -> Result<(), SupervisorError> {
        Err(SupervisorError::SupervisorUnavailable)
    }

    fn query_status(&self) -> Result<SupervisorStatus, SupervisorError> {
        Err(SupervisorError::SupervisorUnavailable)
    }

    fn run_payload(&self, payload: &mut dyn Payload) -> Result<(), PayloadError> {
        super::run_foreground(payload)
    }

    fn host_capabilities(&self) -> Vec<HostCapability> {
        Vec::new()
    }
}
