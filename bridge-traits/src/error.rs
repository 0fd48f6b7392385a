use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Host callback raised an exception: {0}")]
    HostException(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns true when the host side raised the failure itself (for example
    /// a Java exception thrown from a callback) rather than the bridge.
    pub fn is_host_raised(&self) -> bool {
        matches!(self, BridgeError::HostException(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
