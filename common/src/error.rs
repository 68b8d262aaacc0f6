//! Error types shared by every cluster provider

use thiserror::Error;

/// Main error type for cluster provisioning operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or missing request fields, raised before any vendor call
    #[error("validation error: {0}")]
    Validation(String),

    /// A requested value did not match any vendor-provided candidate
    #[error("{}", lookup_message(.what, .candidates))]
    Lookup {
        what: String,
        candidates: Vec<String>,
    },

    /// An addressed entity does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Transport, authorization or rejection from a vendor API
    #[error("{operation} failed: {message}")]
    Api {
        operation: String,
        status: Option<u16>,
        message: String,
    },

    /// The resource exists but is still being provisioned
    #[error("not ready yet: {0}")]
    NotReady(String),

    /// A status poll ran out of attempts
    #[error("gave up waiting for {what} after {attempts} attempts")]
    Timeout { what: String, attempts: u32 },

    /// A status poll was cancelled by the caller
    #[error("cancelled while waiting for {0}")]
    Cancelled(String),

    /// A cluster was created but a later step failed and a delete was issued.
    /// `deleted` is false when the vendor refused that delete.
    #[error("creation of cluster {cluster_id} failed, delete issued (deleted: {deleted}): {source}")]
    RolledBack {
        cluster_id: String,
        deleted: bool,
        #[source]
        source: Box<Error>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Provider configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

fn lookup_message(what: &str, candidates: &[String]) -> String {
    if candidates.is_empty() {
        what.to_owned()
    } else {
        format!("{what} (available: {})", candidates.join(", "))
    }
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a lookup error listing the candidates that were searched
    pub fn lookup(what: impl Into<String>, candidates: Vec<String>) -> Self {
        Self::Lookup {
            what: what.into(),
            candidates,
        }
    }

    /// Create a not-found error for the given kind of resource
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a vendor API error without an HTTP status
    pub fn api(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Api {
            operation: operation.into(),
            status: None,
            message: message.to_string(),
        }
    }

    pub fn serialization(msg: impl ToString) -> Self {
        Self::Serialization(msg.to_string())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether polling again later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady(_) | Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
