use thiserror::Error;

pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[derive(Error, Debug)]
pub enum ConnectorError {
    /// The event failed the pre-mapping validation gate. Never retried.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Routing error: {0}")]
    Routing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
