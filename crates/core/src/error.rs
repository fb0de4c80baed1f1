use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// The person detector is not configured or could not be reached.
    /// Fatal for the request; callers should not retry automatically.
    #[error("Detector unavailable: {0}")]
    DetectorUnavailable(String),

    /// A capture source is not open, a frame read failed, or a read timed
    /// out. Transient: the same request may succeed when retried.
    #[error("Capture failed: {0}")]
    Capture(String),
}
