use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Gateway configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Gateway returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed gateway response: {message}")]
    MalformedResponse { message: String },

    #[error("Payment rejected by gateway: code={code}")]
    Rejected {
        code: String,
        message: Option<String>,
    },
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Configuration { .. } => false,
            GatewayError::Validation { .. } => false,
            GatewayError::Network { .. } => true,
            GatewayError::Http { status, .. } => *status >= 500 || *status == 429,
            GatewayError::MalformedResponse { .. } => false,
            GatewayError::Rejected { .. } => false,
        }
    }
}

impl From<GatewayError> for crate::error::AppError {
    fn from(err: GatewayError) -> Self {
        use crate::error::{AppError, AppErrorKind, ExternalError, InfrastructureError};

        match &err {
            GatewayError::Configuration { message } => AppError::new(AppErrorKind::Infrastructure(
                InfrastructureError::Configuration {
                    message: message.clone(),
                },
            )),
            GatewayError::Validation { message, .. } => {
                AppError::new(AppErrorKind::Validation(
                    crate::error::ValidationError::MalformedPayload {
                        reason: message.clone(),
                    },
                ))
            }
            _ => AppError::new(AppErrorKind::External(ExternalError::Gateway {
                gateway: "PhonePe".to_string(),
                message: err.to_string(),
                is_retryable: err.is_retryable(),
            })),
        }
    }
}
