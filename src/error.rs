#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("Detection attempt {attempt} failed: {reason}")]
    DetectionFailed { attempt: u32, reason: String },

    #[error("Detection exhausted after {attempts} attempts: {reason}")]
    DetectionExhausted { attempts: u32, reason: String },

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Feature not available: {0}")]
    NotAvailable(String),

    #[error("Already closed: {0}")]
    Closed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("System error: {0}")]
    System(String),
}

impl Error {
    pub(crate) fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn duplicate_identifier<S: Into<String>>(id: S) -> Self {
        Error::DuplicateIdentifier(id.into())
    }

    pub(crate) fn detection_failed<S: Into<String>>(attempt: u32, reason: S) -> Self {
        Error::DetectionFailed { attempt, reason: reason.into() }
    }

    pub(crate) fn detection_exhausted<S: Into<String>>(attempts: u32, reason: S) -> Self {
        Error::DetectionExhausted { attempts, reason: reason.into() }
    }

    /// Convenience for capability implementations outside the crate.
    pub fn driver<S: Into<String>>(msg: S) -> Self {
        Error::Driver(msg.into())
    }

    pub(crate) fn not_available<S: Into<String>>(msg: S) -> Self {
        Error::NotAvailable(msg.into())
    }

    pub(crate) fn closed<S: Into<String>>(what: S) -> Self {
        Error::Closed(what.into())
    }

    pub(crate) fn system<S: Into<String>>(msg: S) -> Self {
        Error::System(msg.into())
    }
}

/// Result type for hwsense operations
pub type Result<T> = std::result::Result<T, Error>;
