use thiserror::Error;

pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";
pub const AUTH_REQUIRED_MESSAGE: &str = "Authentication required";

/// Failure of a single backend call, classified by where it broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request never completed: DNS, refused connection, timeout.
    #[error("network error: {0}")]
    Network(String),
    /// The response does not honour the envelope contract.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The backend answered `success: false` with a message.
    #[error("{0}")]
    Domain(String),
    /// 401/403 class answer.
    #[error("authentication required")]
    AuthRequired(Option<String>),
}

impl GatewayError {
    /// Network and protocol failures are internal detail; they collapse into
    /// one generic message instead of leaking transport text to the UI.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, GatewayError::Network(_) | GatewayError::Protocol(_))
    }

    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Network(_) | GatewayError::Protocol(_) => {
                UNEXPECTED_ERROR_MESSAGE.to_string()
            }
            GatewayError::Domain(message) => message.clone(),
            GatewayError::AuthRequired(message) => message
                .clone()
                .unwrap_or_else(|| AUTH_REQUIRED_MESSAGE.to_string()),
        }
    }
}
