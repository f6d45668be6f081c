//! Domain error types.

/// Top-level error type for tradedesk.
#[derive(Debug, thiserror::Error)]
pub enum TradedeskError {
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

    #[error("API credentials missing for {mode} mode (need {missing})")]
    MissingCredentials { mode: String, missing: String },

    #[error("order rejected: {reason}")]
    Validation { reason: String },

    #[error("unsupported signal value {value} at {timestamp}: only 0 (flat) and 1 (long) are supported")]
    UnsupportedSignal { timestamp: String, value: f64 },

    #[error("ledger error in {artifact}: {reason}")]
    Persistence { artifact: String, reason: String },

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradedeskError {
    pub(crate) fn persistence(artifact: &str, reason: impl ToString) -> Self {
        TradedeskError::Persistence {
            artifact: artifact.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn network(reason: impl ToString) -> Self {
        TradedeskError::Network {
            reason: reason.to_string(),
        }
    }
}

impl From<&TradedeskError> for std::process::ExitCode {
    fn from(err: &TradedeskError) -> Self {
        let code: u8 = match err {
            TradedeskError::Io(_) => 1,
            TradedeskError::ConfigParse { .. }
            | TradedeskError::ConfigMissing { .. }
            | TradedeskError::ConfigInvalid { .. }
            | TradedeskError::MissingCredentials { .. } => 2,
            TradedeskError::Persistence { .. } => 3,
            TradedeskError::UnsupportedSignal { .. } | TradedeskError::Data { .. } => 4,
            TradedeskError::Validation { .. } => 5,
            TradedeskError::Network { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
