use thiserror::Error;

/// Failures inside a client call; converted to error markers before leaving the client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status: {0}")]
    Status(u16),
    #[error("Response error: {0}")]
    Decode(String),
    #[error("{0}")]
    Upstream(String),
    #[error("No RPC endpoint for network {0}")]
    UnknownNetwork(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        ClientError::Decode(error.to_string())
    }
}
