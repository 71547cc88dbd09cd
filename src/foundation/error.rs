/// Crate-wide result alias.
pub type LarmResult<T> = Result<T, LarmError>;

/// Failure taxonomy shared by the workspace, coordinator, session store and server.
#[derive(thiserror::Error, Debug)]
pub enum LarmError {
    /// Image bytes could not be parsed.
    #[error("decode error: {0}")]
    Decode(String),

    /// A byte buffer does not match the `width * height * 3` contract.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Byte count required by the dimensions.
        expected: usize,
        /// Byte count actually supplied.
        actual: usize,
    },

    /// No session is registered under the given id.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The native engine could not be bound.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine (or the work around it) failed for one request.
    #[error("processing error: {0}")]
    Processing(String),

    /// Caller-supplied values are outside their documented contract.
    #[error("validation error: {0}")]
    Validation(String),

    /// Output image bytes could not be produced.
    #[error("encode error: {0}")]
    Encode(String),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else, with its source chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LarmError {
    /// Build a [`LarmError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`LarmError::SizeMismatch`].
    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        Self::SizeMismatch { expected, actual }
    }

    /// Build a [`LarmError::SessionNotFound`].
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound(id.into())
    }

    /// Build a [`LarmError::EngineUnavailable`].
    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Self::EngineUnavailable(msg.into())
    }

    /// Build a [`LarmError::Processing`].
    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    /// Build a [`LarmError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LarmError::Encode`].
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Contract violations that callers must not try to recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SizeMismatch { .. } | Self::EngineUnavailable(_))
    }
}
