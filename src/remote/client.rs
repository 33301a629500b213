use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::cache::{Document, ResourceIdentifier};
use crate::config::{Config, RemoteConfig};

const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// JSON:API HTTP client used as the remote side of a fetching cache
#[derive(Clone, Debug)]
pub struct RemoteSource {
  http: reqwest::Client,
  base_url: Url,
}

impl RemoteSource {
  /// Build a client, taking the bearer token from the environment.
  pub fn new(config: &RemoteConfig) -> Result<Self> {
    Self::with_token(config, Config::get_api_token().as_deref())
  }

  pub fn with_token(config: &RemoteConfig, token: Option<&str>) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid remote base_url '{}': {}", config.base_url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Remote base_url '{}' cannot be a base", config.base_url));
    }

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_API_MEDIA_TYPE));
    if let Some(token) = token {
      let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| eyre!("Invalid API token: {}", e))?;
      value.set_sensitive(true);
      headers.insert(AUTHORIZATION, value);
    }

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(config.timeout())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// Fetch a single resource: `GET {base}/{type}/{id}`.
  ///
  /// A 404 yields an empty document.
  pub async fn fetch_object(&self, identifier: &ResourceIdentifier) -> Result<Document> {
    let url = resource_url(&self.base_url, identifier)?;
    self.get_document(url).await
  }

  /// Fetch several resources, one collection request per type.
  ///
  /// `GET {base}/{type}?filter[id]=a,b`. Requests run concurrently and
  /// results are concatenated in first-seen type order. Any failed request
  /// fails the whole batch.
  pub async fn fetch_objects(&self, identifiers: &[ResourceIdentifier]) -> Result<Document> {
    let urls = group_by_type(identifiers)
      .into_iter()
      .map(|(kind, ids)| collection_url(&self.base_url, &kind, &ids))
      .collect::<Result<Vec<_>>>()?;

    let documents = try_join_all(urls.into_iter().map(|url| self.get_document(url))).await?;

    Ok(Document::many(
      documents.into_iter().flat_map(Document::into_objects).collect(),
    ))
  }

  async fn get_document(&self, url: Url) -> Result<Document> {
    debug!(%url, "GET");

    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    if response.status() == StatusCode::NOT_FOUND {
      return Ok(Document::empty());
    }

    let response = response
      .error_for_status()
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    response
      .json::<Document>()
      .await
      .map_err(|e| eyre!("Failed to parse document from {}: {}", url, e))
  }
}

/// `{base}/{type}/{id}` with each segment percent-encoded.
pub(crate) fn resource_url(base: &Url, identifier: &ResourceIdentifier) -> Result<Url> {
  let mut url = base.clone();
  url
    .path_segments_mut()
    .map_err(|_| eyre!("Base URL {} cannot be a base", base))?
    .pop_if_empty()
    .push(&identifier.kind)
    .push(&identifier.id);
  Ok(url)
}

/// `{base}/{type}?filter[id]=a,b`
pub(crate) fn collection_url(base: &Url, kind: &str, ids: &[String]) -> Result<Url> {
  let mut url = base.clone();
  url
    .path_segments_mut()
    .map_err(|_| eyre!("Base URL {} cannot be a base", base))?
    .pop_if_empty()
    .push(kind);
  url
    .query_pairs_mut()
    .append_pair("filter[id]", &ids.join(","));
  Ok(url)
}

/// Group ids by type, keeping first-seen type order and request order within a type.
pub(crate) fn group_by_type(identifiers: &[ResourceIdentifier]) -> Vec<(String, Vec<String>)> {
  let mut groups: Vec<(String, Vec<String>)> = Vec::new();

  for identifier in identifiers {
    match groups.iter_mut().find(|(kind, _)| *kind == identifier.kind) {
      Some((_, ids)) => ids.push(identifier.id.clone()),
      None => groups.push((identifier.kind.clone(), vec![identifier.id.clone()])),
    }
  }

  groups
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheError, LocalCache};
  use mockito::{Matcher, Server, ServerGuard};
  use serde_json::json;
  use std::sync::Arc;

  fn source_for(server: &ServerGuard, token: Option<&str>) -> RemoteSource {
    let config = RemoteConfig {
      base_url: server.url(),
      timeout_secs: 5,
    };
    RemoteSource::with_token(&config, token).unwrap()
  }

  fn collection_path(kind: &str) -> Matcher {
    Matcher::Regex(format!(r"^/{}(\?|$)", kind))
  }

  fn base() -> Url {
    Url::parse("https://api.example.com/v1/").unwrap()
  }

  #[test]
  fn test_resource_url() {
    let url = resource_url(&base(), &ResourceIdentifier::new("person", "123")).unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/person/123");
  }

  #[test]
  fn test_resource_url_without_trailing_slash() {
    let base = Url::parse("https://api.example.com/v1").unwrap();
    let url = resource_url(&base, &ResourceIdentifier::new("person", "123")).unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/person/123");
  }

  #[test]
  fn test_resource_url_escapes_segments() {
    let url = resource_url(&base(), &ResourceIdentifier::new("person", "a/b c")).unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/person/a%2Fb%20c");
  }

  #[test]
  fn test_collection_url() {
    let ids = vec!["abc".to_string(), "def".to_string()];
    let url = collection_url(&base(), "person", &ids).unwrap();

    assert_eq!(url.path(), "/v1/person");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs, vec![("filter[id]".to_string(), "abc,def".to_string())]);
  }

  #[test]
  fn test_group_by_type_keeps_order() {
    let identifiers = vec![
      ResourceIdentifier::new("person", "1"),
      ResourceIdentifier::new("donkey", "a"),
      ResourceIdentifier::new("person", "2"),
    ];

    let groups = group_by_type(&identifiers);
    assert_eq!(
      groups,
      vec![
        ("person".to_string(), vec!["1".to_string(), "2".to_string()]),
        ("donkey".to_string(), vec!["a".to_string()]),
      ]
    );
  }

  #[test]
  fn test_rejects_invalid_base_url() {
    let config = RemoteConfig {
      base_url: "not a url".to_string(),
      timeout_secs: 1,
    };
    assert!(RemoteSource::new(&config).is_err());

    let config = RemoteConfig {
      base_url: "mailto:someone@example.com".to_string(),
      timeout_secs: 1,
    };
    assert!(RemoteSource::new(&config).is_err());
  }

  #[tokio::test]
  async fn test_fetch_object_sends_headers_and_parses_document() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("GET", "/person/123")
      .match_header("accept", JSON_API_MEDIA_TYPE)
      .match_header("authorization", "Bearer secret")
      .with_status(200)
      .with_header("content-type", JSON_API_MEDIA_TYPE)
      .with_body(
        json!({
          "data": { "type": "person", "id": "123", "attributes": { "name": "Bryan" } }
        })
        .to_string(),
      )
      .create_async()
      .await;

    let source = source_for(&server, Some("secret"));
    let document = source
      .fetch_object(&ResourceIdentifier::new("person", "123"))
      .await
      .unwrap();

    let objects = document.into_objects();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].attribute("name"), Some(&json!("Bryan")));
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_no_authorization_header_without_token() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("GET", "/person/1")
      .match_header("authorization", Matcher::Missing)
      .with_status(200)
      .with_body(r#"{"data": null}"#)
      .create_async()
      .await;

    let document = source_for(&server, None)
      .fetch_object(&ResourceIdentifier::new("person", "1"))
      .await
      .unwrap();

    assert!(document.is_empty());
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_not_found_is_an_empty_document() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("GET", "/person/404")
      .with_status(404)
      .with_body(r#"{"errors": [{"status": "404"}]}"#)
      .create_async()
      .await;

    let document = source_for(&server, None)
      .fetch_object(&ResourceIdentifier::new("person", "404"))
      .await
      .unwrap();

    assert!(document.is_empty());
  }

  #[tokio::test]
  async fn test_server_error_and_bad_body_are_errors() {
    let mut server = Server::new_async().await;
    let _broken = server
      .mock("GET", "/person/1")
      .with_status(500)
      .create_async()
      .await;
    let _garbled = server
      .mock("GET", "/person/2")
      .with_status(200)
      .with_body("not json")
      .create_async()
      .await;

    let source = source_for(&server, None);

    let err = source
      .fetch_object(&ResourceIdentifier::new("person", "1"))
      .await
      .unwrap_err();
    assert!(err.to_string().contains("500"));

    let err = source
      .fetch_object(&ResourceIdentifier::new("person", "2"))
      .await
      .unwrap_err();
    assert!(err.to_string().contains("Failed to parse document"));
  }

  #[tokio::test]
  async fn test_fetch_objects_joins_types_in_first_seen_order() {
    let mut server = Server::new_async().await;
    let people = server
      .mock("GET", collection_path("person"))
      .match_query(Matcher::UrlEncoded("filter[id]".into(), "1,2".into()))
      .with_status(200)
      .with_body(
        json!({ "data": [{ "type": "person", "id": "1" }, { "type": "person", "id": "2" }] })
          .to_string(),
      )
      .create_async()
      .await;
    let donkeys = server
      .mock("GET", collection_path("donkey"))
      .match_query(Matcher::UrlEncoded("filter[id]".into(), "a".into()))
      .with_status(200)
      .with_body(json!({ "data": [{ "type": "donkey", "id": "a" }] }).to_string())
      .create_async()
      .await;

    let document = source_for(&server, None)
      .fetch_objects(&[
        ResourceIdentifier::new("person", "1"),
        ResourceIdentifier::new("donkey", "a"),
        ResourceIdentifier::new("person", "2"),
      ])
      .await
      .unwrap();

    let ids: Vec<String> = document
      .into_objects()
      .iter()
      .map(|o| o.identifier().to_string())
      .collect();
    assert_eq!(ids, vec!["person:1", "person:2", "donkey:a"]);
    people.assert_async().await;
    donkeys.assert_async().await;
  }

  #[tokio::test]
  async fn test_fetch_objects_fails_when_any_type_fails() {
    let mut server = Server::new_async().await;
    let _people = server
      .mock("GET", collection_path("person"))
      .match_query(Matcher::Any)
      .with_status(200)
      .with_body(json!({ "data": [{ "type": "person", "id": "1" }] }).to_string())
      .create_async()
      .await;
    let _donkeys = server
      .mock("GET", collection_path("donkey"))
      .match_query(Matcher::Any)
      .with_status(503)
      .create_async()
      .await;

    let result = source_for(&server, None)
      .fetch_objects(&[
        ResourceIdentifier::new("person", "1"),
        ResourceIdentifier::new("donkey", "a"),
      ])
      .await;

    assert!(result.unwrap_err().to_string().contains("503"));
  }

  #[tokio::test]
  async fn test_not_found_stays_a_miss_and_refetches() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("GET", "/person/123")
      .with_status(404)
      .expect(2)
      .create_async()
      .await;

    let cache = source_for(&server, None).into_fetching_cache(Arc::new(LocalCache::new()));
    let identifier = ResourceIdentifier::new("person", "123");

    assert!(cache.get_one(identifier.clone()).await.is_none());
    assert!(cache.get_one(identifier).await.is_none());

    assert!(cache.take_failures().is_empty());
    assert!(cache.store().is_empty());
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_server_error_is_recorded_as_fetch_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("GET", "/person/123")
      .with_status(500)
      .create_async()
      .await;

    let cache = source_for(&server, None).into_fetching_cache(Arc::new(LocalCache::new()));
    assert!(cache
      .get_one(ResourceIdentifier::new("person", "123"))
      .await
      .is_none());

    let failures = cache.take_failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
      &failures[0],
      CacheError::FetchFailure { identifiers, message }
        if identifiers == &vec![ResourceIdentifier::new("person", "123")]
          && message.contains("500")
    ));
  }
}
