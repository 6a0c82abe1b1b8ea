use thiserror::Error;

/// Problems with user-supplied magnitude, mode or unit text.
///
/// The lenient entry points never surface these; they fall back to zero.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("not a non-negative integer: {0:?}")]
    InvalidValue(String),

    #[error("negative magnitude: {0:?}")]
    Negative(String),

    #[error("unknown mode: {0:?} (expected \"bitcount\" or \"binary\")")]
    InvalidMode(String),

    #[error("unknown unit: {0:?}")]
    InvalidUnit(String),
}

impl InputError {
    pub fn code(&self) -> &'static str {
        match self {
            InputError::InvalidValue(_) | InputError::Negative(_) => "invalid_value",
            InputError::InvalidMode(_) => "invalid_mode",
            InputError::InvalidUnit(_) => "invalid_unit",
        }
    }
}

/// Failures of the group summary service or of talking to it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SummaryError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("value is not a non-negative integer: {0}")]
    InvalidValue(String),

    #[error("mode not supported: {0}")]
    ModeNotSupported(String),

    #[error("summary of {group_count} KB groups exceeds cap of {cap}")]
    TooLarge { group_count: String, cap: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("summary service answered with status {0}")]
    Status(u16),

    #[error("malformed summary response: {0}")]
    Malformed(String),
}

impl SummaryError {
    pub fn code(&self) -> &'static str {
        match self {
            SummaryError::InvalidJson(_) => "invalid_json",
            SummaryError::InvalidValue(_) => "invalid_value",
            SummaryError::ModeNotSupported(_) => "mode_not_supported",
            SummaryError::TooLarge { .. } => "too_large",
            SummaryError::Transport(_) => "transport",
            SummaryError::Status(_) => "status",
            SummaryError::Malformed(_) => "malformed",
        }
    }
}

impl From<serde_json::Error> for SummaryError {
    fn from(err: serde_json::Error) -> Self { SummaryError::Malformed(err.to_string()) }
}

#[cfg(feature = "remote-summary")]
impl From<reqwest::Error> for SummaryError {
    fn from(err: reqwest::Error) -> Self { SummaryError::Transport(err.to_string()) }
}
