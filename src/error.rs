use thiserror::Error;

/// Rejections raised before any probe is issued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("target must not be empty")]
    EmptyTarget,

    #[error("invalid port range {start}-{end} (start > end)")]
    InvalidRange { start: u32, end: u32 },

    #[error("port out of range: {value} (expected 1-65535)")]
    PortOutOfRange { value: u32 },

    #[error("invalid port specification: {spec:?}")]
    InvalidPortSpec { spec: String },
}

/// Errors that abort a whole scan. Per-port failures never end up here.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid scan request: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to resolve target {target}: {source}")]
    Resolve {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("target {target} resolved to no addresses")]
    NoAddress { target: String },
}

impl ScanError {
    /// True when the request itself was malformed.
    pub fn is_validation(&self) -> bool {
        matches!(self, ScanError::Validation(_))
    }
}
