//! Thin Firestore REST client.
//!
//! Covers the three calls the chat store needs: `:commit` (writes with
//! server timestamps), `:runQuery` (ordered, limited collection reads) and
//! document `DELETE`.

use std::path::Path;

use reqwest::{StatusCode, Url};
use secrecy::ExposeSecret;
use tracing::debug;

use codesensei_types::config::{FirebaseConfig, StoreConfig};
use codesensei_types::error::RepositoryError;

use super::credentials::{ServiceAccountKey, ServiceAccountTokenSource, TokenSource};
use super::query::{
    CommitRequest, CommitResponse, RunQueryRequest, RunQueryResponse, StructuredQuery, Write,
};
use super::value::Document;

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1/";

/// Project used against the emulator when none is configured.
const EMULATOR_PROJECT: &str = "demo-codesensei";

/// Authorized client for one Firestore database.
pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: Url,
    project_id: String,
    tokens: TokenSource,
}

impl FirestoreClient {
    pub fn new(
        http: reqwest::Client,
        project_id: impl Into<String>,
        tokens: TokenSource,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            http,
            base_url: parse_base_url(FIRESTORE_BASE_URL)?,
            project_id: project_id.into(),
            tokens,
        })
    }

    /// Point the client at a different host, e.g. `http://localhost:8080/v1`.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, RepositoryError> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    /// Build a client from the `[store]` and `[firebase]` config tables.
    ///
    /// An emulator host wins over credentials. Otherwise a service-account
    /// key file is required, and the project id falls back to the key's.
    pub async fn from_config(
        store: &StoreConfig,
        firebase: &FirebaseConfig,
    ) -> Result<Self, RepositoryError> {
        let http = reqwest::Client::new();

        if let Some(host) = store.emulator_host.as_deref() {
            let project = firebase.project_id.as_deref().unwrap_or(EMULATOR_PROJECT);
            debug!(host, project, "using firestore emulator");
            return Self::new(http, project, TokenSource::emulator())?
                .with_base_url(&format!("http://{host}/v1"));
        }

        let path = store.credentials_path.as_deref().ok_or_else(|| {
            RepositoryError::Credentials(
                "no service account key configured (set GOOGLE_APPLICATION_CREDENTIALS)"
                    .to_string(),
            )
        })?;
        let key = ServiceAccountKey::from_file(Path::new(path)).await?;
        let project = firebase
            .project_id
            .clone()
            .or_else(|| key.project_id.clone())
            .ok_or_else(|| {
                RepositoryError::Credentials("no Firebase project id configured".to_string())
            })?;

        let tokens = TokenSource::ServiceAccount(ServiceAccountTokenSource::new(key, http.clone()));
        Self::new(http, project, tokens)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Full resource name for a document path relative to the database root.
    pub fn document_name(&self, path: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{path}",
            self.project_id
        )
    }

    /// URL for `documents/{path}`, with an optional `:verb` suffix.
    fn url(&self, path: &str, verb: Option<&str>) -> Result<Url, RepositoryError> {
        let mut segments: Vec<String> = [
            "projects",
            self.project_id.as_str(),
            "databases",
            "(default)",
            "documents",
        ]
        .into_iter()
        .chain(path.split('/').filter(|s| !s.is_empty()))
        .map(str::to_string)
        .collect();

        if let (Some(verb), Some(last)) = (verb, segments.last_mut()) {
            last.push(':');
            last.push_str(verb);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RepositoryError::Connection("firestore base url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn bearer(&self) -> Result<String, RepositoryError> {
        Ok(self.tokens.token().await?.expose_secret().to_string())
    }

    /// Apply writes atomically.
    pub async fn commit(&self, writes: &[Write]) -> Result<CommitResponse, RepositoryError> {
        let url = self.url("", Some("commit"))?;
        let response = self
            .http
            .post(url)
            .bearer_auth(self.bearer().await?)
            .json(&CommitRequest { writes })
            .send()
            .await
            .map_err(|e| RepositoryError::Connection(format!("firestore commit failed: {e}")))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RepositoryError::Query(format!("invalid commit response: {e}")))
    }

    /// Run `query` against the collection under `parent` (a document path,
    /// or empty for the database root).
    pub async fn run_query(
        &self,
        parent: &str,
        query: &StructuredQuery,
    ) -> Result<Vec<Document>, RepositoryError> {
        let url = self.url(parent, Some("runQuery"))?;
        let response = self
            .http
            .post(url)
            .bearer_auth(self.bearer().await?)
            .json(&RunQueryRequest {
                structured_query: query,
            })
            .send()
            .await
            .map_err(|e| RepositoryError::Connection(format!("firestore query failed: {e}")))?;

        let response = check_status(response).await?;
        let results: Vec<RunQueryResponse> = response
            .json()
            .await
            .map_err(|e| RepositoryError::Query(format!("invalid query response: {e}")))?;

        // Entries without a document only carry read progress.
        Ok(results.into_iter().filter_map(|r| r.document).collect())
    }

    /// Delete one document. Deleting a missing document succeeds.
    pub async fn delete(&self, path: &str) -> Result<(), RepositoryError> {
        let url = self.url(path, None)?;
        let response = self
            .http
            .delete(url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(|e| RepositoryError::Connection(format!("firestore delete failed: {e}")))?;

        check_status(response).await?;
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, RepositoryError> {
    Url::parse(&format!("{}/", raw.trim_end_matches('/')))
        .map_err(|e| RepositoryError::Connection(format!("invalid firestore url {raw}: {e}")))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RepositoryError::Credentials(format!("firestore rejected credentials: {body}"))
        }
        StatusCode::NOT_FOUND => RepositoryError::NotFound,
        _ => RepositoryError::Query(format!("firestore returned HTTP {status}: {body}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::query::Direction;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> FirestoreClient {
        FirestoreClient::new(
            reqwest::Client::new(),
            "proj",
            TokenSource::Static(SecretString::from("tok")),
        )
        .unwrap()
        .with_base_url(&format!("{}/v1", server.uri()))
        .unwrap()
    }

    #[tokio::test]
    async fn test_url_encodes_session_ids() {
        let server = MockServer::start().await;
        let url = client(&server)
            .url("users/u1/sessions/Loops & Lists?", None)
            .unwrap();
        assert!(
            url.path()
                .ends_with("/v1/projects/proj/databases/(default)/documents/users/u1/sessions/Loops%20&%20Lists%3F")
        );
    }

    #[tokio::test]
    async fn test_run_query_posts_structured_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/proj/databases/(default)/documents/users/u1:runQuery",
            ))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(json!({"structuredQuery": {"from": [{"collectionId": "sessions"}]}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"readTime": "2025-01-01T00:00:00Z"},
                {"document": {"name": "projects/proj/databases/(default)/documents/users/u1/sessions/a", "fields": {}}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let query = StructuredQuery::collection("sessions").order_by("created_at", Direction::Descending);
        let docs = client(&server).run_query("users/u1", &query).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id(), "a");
    }

    #[tokio::test]
    async fn test_commit_path_and_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/proj/databases/(default)/documents:commit"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let err = client(&server).commit(&[]).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Credentials(_)));
    }

    #[tokio::test]
    async fn test_from_config_prefers_emulator() {
        let store = StoreConfig {
            emulator_host: Some("localhost:8080".to_string()),
            credentials_path: Some("/does/not/matter.json".to_string()),
            ..StoreConfig::default()
        };
        let client = FirestoreClient::from_config(&store, &FirebaseConfig::default())
            .await
            .unwrap();
        assert_eq!(client.project_id(), "demo-codesensei");
        assert_eq!(client.base_url.as_str(), "http://localhost:8080/v1/");
    }

    #[tokio::test]
    async fn test_from_config_without_credentials_fails() {
        let err = match FirestoreClient::from_config(&StoreConfig::default(), &FirebaseConfig::default()).await {
            Ok(_) => panic!("expected missing credentials"),
            Err(err) => err,
        };
        assert!(matches!(err, RepositoryError::Credentials(_)));
    }
}
