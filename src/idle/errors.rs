use thiserror::Error;

/// Errors raised by the idle engine and its save store.
///
/// Player-facing refusals (missing tool, no energy, not enough materials) are
/// not errors; they come back as [`crate::idle::commands::Outcome::Rejected`].
#[derive(Debug, Error)]
pub enum IdleError {
    /// A caller passed a value outside the accepted domain (chance outside
    /// 0..=100, zero item amount, and so on).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An action, item, location, recipe, quest or path id that the catalog
    /// does not define.
    #[error("missing {kind} definition: {id}")]
    MissingDefinition { kind: &'static str, id: String },

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around serde_json serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, catalog files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IdleError {
    pub fn missing(kind: &'static str, id: impl Into<String>) -> Self {
        Self::MissingDefinition {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }
}
