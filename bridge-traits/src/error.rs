use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Timeout, refused connection or any other failure of the exchange itself.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Certificate validation or TLS handshake failure.
    #[error("Security failure: {0}")]
    Security(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Security faults are fatal for a request and must never be retried.
    pub fn is_security_fault(&self) -> bool {
        matches!(self, BridgeError::Security(_))
    }

    /// Everything that is not a security fault counts against a retry budget.
    pub fn is_transport_fault(&self) -> bool {
        !self.is_security_fault()
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
