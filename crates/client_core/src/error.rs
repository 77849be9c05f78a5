use shared::error::ApiError;
use thiserror::Error;

use crate::transport::TransportPhase;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("stream transport failed while {phase}: {message}")]
    Transport {
        phase: TransportPhase,
        message: String,
    },
    #[error("credential renewal rejected: {0}")]
    RenewalRejected(#[from] ApiError),
    #[error("credential renewal failed: {0}")]
    Renewal(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("stream loop is not running")]
    HubClosed,
}

impl ClientError {
    pub fn transport(phase: TransportPhase, message: impl Into<String>) -> Self {
        ClientError::Transport {
            phase,
            message: message.into(),
        }
    }

    /// Transport failures observed while the stream was connecting or
    /// closing are recovered by renewing credentials.
    pub fn triggers_renewal(&self) -> bool {
        matches!(
            self,
            ClientError::Transport {
                phase: TransportPhase::Connecting | TransportPhase::Closed,
                ..
            }
        )
    }
}
