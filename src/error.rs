use thiserror::Error;

/// Errors that can occur anywhere in the client.
///
/// Each variant carries enough context to diagnose the failure without
/// needing to inspect the originating error directly.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend replied with a non-2xx HTTP status code. `message` holds
    /// the server-provided message when one could be extracted.
    #[error("HTTP {status} from {url}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Http {
        status: u16,
        url: String,
        message: Option<String>,
    },

    /// A TCP-level connection could not be established.
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// Response body could not be parsed as the expected JSON structure.
    #[error("malformed response from {url}: {detail}")]
    Decode { url: String, detail: String },

    /// Caught client-side before any request was issued.
    #[error("{0}")]
    Validation(String),

    /// The persisted player record could not be read or written.
    #[error("session store error at {path}: {detail}")]
    SessionStore { path: String, detail: String },

    /// The config file was present but unusable.
    #[error("config error: {0}")]
    Config(String),
}

impl ClientError {
    /// True when the error was raised by client-side validation, i.e. no
    /// request was ever sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}
