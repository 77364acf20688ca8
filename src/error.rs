use thiserror::Error;

/// Error types for the simfit-rs library.
#[derive(Error, Debug)]
pub enum SimFitError {
    /// Error indicating a mismatch in buffer or vector dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid search, worker or image configuration. Detected before any work starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Unknown model, position, shader or feature id.
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    /// Malformed or missing observational data. Isolated to the failing call.
    #[error("Data error: {0}")]
    Data(String),

    /// Device or context failure. The worker cannot continue after one of these.
    #[error("Device error: {0}")]
    Device(String),

    /// The worker has stopped and can no longer service requests.
    #[error("Device worker is not running")]
    WorkerStopped,

    /// Invalid state in the worker or a data structure.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SimFitError {
    /// Whether the worker must halt after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimFitError::Device(_))
    }
}

impl From<crate::parameters::parameter::ParameterError> for SimFitError {
    fn from(err: crate::parameters::parameter::ParameterError) -> Self {
        match err {
            crate::parameters::parameter::ParameterError::ParameterNotFound { id } => {
                SimFitError::ParameterNotFound(id)
            }
            other => SimFitError::ParameterError(format!("{}", other)),
        }
    }
}

impl From<crate::parameters::bounds::BoundsError> for SimFitError {
    fn from(err: crate::parameters::bounds::BoundsError) -> Self {
        SimFitError::ParameterError(format!("{}", err))
    }
}

/// Result type alias for simfit-rs operations.
pub type Result<T> = std::result::Result<T, SimFitError>;
