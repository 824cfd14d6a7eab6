//! Error types shared by the gateway, the entity services and the query cache.
//!
//! Both enums are `Clone`: a single settled fetch is handed to every
//! subscriber that was coalesced onto it.

/// Failure of one remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
  /// The request never produced a response (connect, TLS, timeout).
  #[error("network error: {message}")]
  Network { message: String },

  /// The gateway answered with a non-2xx status.
  #[error("{message} (HTTP {status})")]
  Status { status: u16, message: String },

  /// A 2xx response whose envelope carried `success: false`.
  #[error("request rejected: {message}")]
  Envelope { message: String },

  /// The body did not match the expected shape.
  #[error("invalid response: {message}")]
  InvalidResponse { message: String },

  /// The request could not be built (bad base URL or path).
  #[error("invalid request: {message}")]
  InvalidRequest { message: String },
}

impl ServiceError {
  /// Transport failures are retried by the query cache; everything else
  /// is surfaced on the first occurrence.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Network { .. } | Self::Status { .. })
  }

  /// HTTP status, when the gateway produced one.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// Message suitable for showing to a user.
  pub fn message(&self) -> &str {
    match self {
      Self::Network { message }
      | Self::Status { message, .. }
      | Self::Envelope { message }
      | Self::InvalidResponse { message }
      | Self::InvalidRequest { message } => message,
    }
  }
}

impl From<reqwest::Error> for ServiceError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_builder() {
      Self::InvalidRequest {
        message: err.to_string(),
      }
    } else if err.is_decode() {
      Self::InvalidResponse {
        message: err.to_string(),
      }
    } else if let Some(status) = err.status() {
      Self::Status {
        status: status.as_u16(),
        message: err.to_string(),
      }
    } else {
      Self::Network {
        message: err.to_string(),
      }
    }
  }
}

/// Failure surfaced by a query hook or the query client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
  #[error(transparent)]
  Service(#[from] ServiceError),

  /// Search parameters could not be serialized into a cache key.
  #[error("invalid query parameters: {0}")]
  InvalidParams(String),

  #[error("page size must be at least 1")]
  InvalidPageSize,

  /// The entry under this key holds a value of another type.
  #[error("cached value for {key} has an unexpected type")]
  TypeMismatch { key: String },

  /// The shared fetch task ended without producing a result.
  #[error("fetch for {key} was cancelled")]
  Cancelled { key: String },
}

impl QueryError {
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Service(err) => err.is_retryable(),
      _ => false,
    }
  }
}
