//! [`HttpStore`]: every entity's repository over one `reqwest` client.

use std::time::Duration;

use campus_core::{Entity, Error, ListParams, Repository, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};

use crate::error::ClientError;

/// Connection settings for the Campus API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  /// Server root; requests go to `{base_url}/api/...`.
  pub base_url:     String,
  pub timeout_secs: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self { base_url: "http://127.0.0.1:8080".to_owned(), timeout_secs: 30 }
  }
}

/// Error body written by `campus-api`.
#[derive(Deserialize)]
struct ErrorBody {
  error: String,
  code:  String,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HttpStore {
  client: Client,
  base:   Url,
}

impl HttpStore {
  pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Self::with_client(client, &config.base_url)
  }

  pub fn with_client(client: Client, base_url: &str) -> Result<Self, ClientError> {
    let base = Url::parse(base_url)
      .ok()
      .filter(|url| !url.cannot_be_a_base())
      .ok_or_else(|| ClientError::BaseUrl(base_url.to_owned()))?;
    Ok(Self { client, base })
  }

  /// `{base}/api/{segments...}`, each segment percent-encoded.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().push("api").extend(segments);
    }
    url
  }

  /// Send `req` and decode a JSON success body. A 404 maps to `not_found`
  /// when the request addressed a single entity.
  async fn json<T: DeserializeOwned>(
    &self,
    req: RequestBuilder,
    not_found: Option<Error>,
  ) -> Result<T> {
    let resp = checked(req, not_found).await?;
    Ok(resp.json().await.map_err(ClientError::from)?)
  }
}

async fn checked(req: RequestBuilder, not_found: Option<Error>) -> Result<Response> {
  let resp = req.send().await.map_err(ClientError::from)?;
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }

  let url = resp.url().clone();
  tracing::debug!(%url, %status, "request rejected");
  let body = resp.json::<ErrorBody>().await.ok();

  Err(match (status, body, not_found) {
    (StatusCode::NOT_FOUND, _, Some(not_found)) => not_found,
    (_, Some(ErrorBody { error, code }), not_found) => match code.as_str() {
      "validation" => Error::Validation(error),
      "conflict" => Error::Conflict(error),
      "not_found" => not_found.unwrap_or(Error::Transport(error)),
      _ => Error::Transport(error),
    },
    (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, None, _) => {
      Error::Validation(format!("{url} rejected the request ({status})"))
    }
    (StatusCode::CONFLICT, None, _) => {
      Error::Conflict(format!("{url} reported a conflict"))
    }
    _ => ClientError::Status { url, status }.into(),
  })
}

impl<E: Entity> Repository<E> for HttpStore {
  async fn fetch_by_id(&self, id: E::Id) -> Result<E> {
    let url = self.url(&[E::COLLECTION, id.as_ref()]);
    self
      .json(self.client.get(url), Some(Error::not_found(E::KIND, &id)))
      .await
  }

  async fn fetch_by_parent(
    &self,
    parent: E::Parent,
    params: ListParams,
  ) -> Result<Vec<E>> {
    if params.is_empty_page() {
      return Ok(Vec::new());
    }
    let url = self.url(&[E::PARENT_COLLECTION, parent.as_ref(), E::COLLECTION]);
    self.json(self.client.get(url).query(&params), None).await
  }

  async fn create(&self, draft: E::Draft) -> Result<E> {
    let url = self.url(&[E::COLLECTION]);
    self.json(self.client.post(url).json(&draft), None).await
  }

  async fn update(&self, id: E::Id, patch: E::Patch) -> Result<E> {
    let url = self.url(&[E::COLLECTION, id.as_ref()]);
    self
      .json(
        self.client.patch(url).json(&patch),
        Some(Error::not_found(E::KIND, &id)),
      )
      .await
  }

  async fn delete(&self, id: E::Id) -> Result<()> {
    let url = self.url(&[E::COLLECTION, id.as_ref()]);
    checked(self.client.delete(url), Some(Error::not_found(E::KIND, &id))).await?;
    Ok(())
  }
}

#[cfg(test)]
mod url_tests {
  use super::*;

  #[test]
  fn segments_are_appended_under_api() {
    let store = HttpStore::with_client(Client::new(), "http://host:1/root/").unwrap();
    assert_eq!(
      store.url(&["schools", "a b"]).as_str(),
      "http://host:1/root/api/schools/a%20b"
    );
  }

  #[test]
  fn unusable_base_is_rejected() {
    assert!(matches!(
      HttpStore::with_client(Client::new(), "mailto:x@y"),
      Err(ClientError::BaseUrl(_))
    ));
  }
}
