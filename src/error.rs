use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Invalid camera event: {0}")]
    Validation(String),

    #[error("Camera not found: {0}")]
    CameraUnknown(String),

    #[error("Camera is not attached to an auditorium: {0}")]
    CameraUnattached(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether redelivering the same input could succeed on a later attempt.
    ///
    /// Malformed payloads and unknown/unattached cameras stay broken no matter
    /// how often the broker redelivers them; storage and transport failures
    /// are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Service(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_and_transport_failures_are_retryable() {
        assert!(Error::Database("connection reset".into()).is_retryable());
        assert!(Error::Service("channel closed".into()).is_retryable());
    }

    #[test]
    fn rejections_are_not_retryable() {
        assert!(!Error::Validation("person_count missing".into()).is_retryable());
        assert!(!Error::CameraUnknown("AA:BB:CC:DD:EE:FF".into()).is_retryable());
        assert!(!Error::CameraUnattached("AA:BB:CC:DD:EE:FF".into()).is_retryable());
    }
}
