//! Unified error types for svckit

use thiserror::Error;

/// Errors surfaced by the native service supervisor.
///
/// Every native failure is classified into one of these variants;
/// `Unknown` is the only one allowed to carry a raw message from the
/// underlying subsystem.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The caller lacks the privileges the native supervisor requires
    #[error("permission denied by service supervisor: {0}")]
    PermissionDenied(String),

    /// The service is not registered with the native supervisor
    #[error("service is not installed")]
    NotInstalled,

    /// The service is already registered with the native supervisor
    #[error("service is already installed")]
    AlreadyInstalled,

    /// No native service supervisor is usable on this host
    #[error("no service supervisor is available on this host")]
    SupervisorUnavailable,

    /// Unclassified native failure, raw detail preserved
    #[error("supervisor error: {0}")]
    Unknown(String),
}

impl SupervisorError {
    /// Classify a raw native message, recognizing the common
    /// permission-denial phrasings across supervisors.
    pub fn from_native(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let lower = detail.to_lowercase();
        if lower.contains("permission denied")
            || lower.contains("access denied")
            || lower.contains("access is denied")
            || lower.contains("authentication required")
            || lower.contains("operation not permitted")
        {
            SupervisorError::PermissionDenied(detail)
        } else {
            SupervisorError::Unknown(detail)
        }
    }
}

/// Failure of the embedded payload during a supervised or foreground run.
#[derive(Error, Debug)]
#[error("payload failed: {0}")]
pub struct PayloadError(pub anyhow::Error);

impl PayloadError {
    /// Wrap an arbitrary message as a payload failure
    pub fn msg(message: impl Into<String>) -> Self {
        PayloadError(anyhow::anyhow!(message.into()))
    }
}

impl From<anyhow::Error> for PayloadError {
    fn from(err: anyhow::Error) -> Self {
        PayloadError(err)
    }
}

/// Result type alias for supervisor operations
pub type Result<T> = std::result::Result<T, SupervisorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_phrases_classify_as_permission_denied() {
        for raw in [
            "Access denied while creating service",
            "Failed to start unit: Permission denied",
            "Interactive authentication required.",
        ] {
            assert!(matches!(
                SupervisorError::from_native(raw),
                SupervisorError::PermissionDenied(_)
            ));
        }
    }

    #[test]
    fn unrecognized_detail_stays_unknown() {
        let err = SupervisorError::from_native("something exploded");
        match err {
            SupervisorError::Unknown(detail) => assert_eq!(detail, "something exploded"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }
}
