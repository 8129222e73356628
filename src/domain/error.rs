//! Domain error types.

/// Why a price series could not be retrieved for a symbol.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("symbol {symbol} not found")]
    NotFound { symbol: String },

    #[error("temporary failure fetching {symbol}: {reason}")]
    Transient { symbol: String, reason: String },

    #[error("provider error for {symbol}: {reason}")]
    Provider { symbol: String, reason: String },
}

impl FetchError {
    /// Transient failures may succeed if the same request is retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }

    pub fn symbol(&self) -> &str {
        match self {
            FetchError::NotFound { symbol }
            | FetchError::Transient { symbol, .. }
            | FetchError::Provider { symbol, .. } => symbol,
        }
    }
}

/// Top-level error type for dipbuyer.
#[derive(Debug, thiserror::Error)]
pub enum DipbuyerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("sheet name {sheet:?} is shared by {first} and {second}")]
    SheetNameCollision {
        sheet: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DipbuyerError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        DipbuyerError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&DipbuyerError> for std::process::ExitCode {
    fn from(err: &DipbuyerError) -> Self {
        let code: u8 = match err {
            DipbuyerError::Io(_)
            | DipbuyerError::Report { .. }
            | DipbuyerError::SheetNameCollision { .. } => 1,
            DipbuyerError::ConfigParse { .. }
            | DipbuyerError::ConfigMissing { .. }
            | DipbuyerError::ConfigInvalid { .. } => 2,
            DipbuyerError::Fetch(_) => 3,
        };
        std::process::ExitCode::from(code)
    }
}
