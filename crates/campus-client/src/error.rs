//! Error types for `campus-client`.

use reqwest::{StatusCode, Url};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("invalid base url {0:?}")]
  BaseUrl(String),

  #[error("http request failed: {0}")]
  Http(#[from] reqwest::Error),

  /// A failure response without a decodable error body.
  #[error("{url} returned {status}")]
  Status { url: Url, status: StatusCode },
}

impl From<ClientError> for campus_core::Error {
  fn from(e: ClientError) -> Self { campus_core::Error::Transport(e.to_string()) }
}
