//! Access tokens for the Firestore REST API.
//!
//! Production uses a Google service-account key: a self-signed RS256
//! assertion is exchanged at the key's `token_uri` for a short-lived OAuth
//! access token, which is cached until shortly before it expires. The
//! emulator accepts the fixed bearer token `owner`.

use std::path::Path;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use codesensei_types::error::RepositoryError;

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Tokens are renewed this long before their reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The fields of a service-account JSON key that token minting needs.
#[derive(Deserialize)]
#[serde(from = "RawServiceAccountKey")]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: SecretString,
    pub private_key_id: Option<String>,
    pub token_uri: String,
    pub project_id: Option<String>,
}

#[derive(Deserialize)]
struct RawServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
    #[serde(default)]
    project_id: Option<String>,
}

impl From<RawServiceAccountKey> for ServiceAccountKey {
    fn from(raw: RawServiceAccountKey) -> Self {
        Self {
            client_email: raw.client_email,
            private_key: SecretString::from(raw.private_key),
            private_key_id: raw.private_key_id,
            token_uri: raw.token_uri,
            project_id: raw.project_id,
        }
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Read a key file downloaded from the Google Cloud console.
    pub async fn from_file(path: &Path) -> Result<Self, RepositoryError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            RepositoryError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            RepositoryError::Credentials(format!("invalid service account key {}: {e}", path.display()))
        })
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: SecretString,
    renew_at: Instant,
}

/// Mints and caches OAuth access tokens for a service account.
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    http: reqwest::Client,
    cache: RwLock<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Self {
        Self {
            key,
            http,
            cache: RwLock::new(None),
        }
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    fn cached(&self) -> Option<SecretString> {
        self.cache
            .read()
            .as_ref()
            .filter(|cached| cached.renew_at > Instant::now())
            .map(|cached| SecretString::from(cached.token.expose_secret()))
    }

    fn assertion(&self) -> Result<String, RepositoryError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| RepositoryError::Credentials(format!("system clock error: {e}")))?
            .as_secs();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.expose_secret().as_bytes())
            .map_err(|e| RepositoryError::Credentials(format!("invalid private key: {e}")))?;

        jsonwebtoken::encode(&header, &claims, &signing_key)
            .map_err(|e| RepositoryError::Credentials(format!("failed to sign assertion: {e}")))
    }

    /// A valid access token, minting a new one when the cache is stale.
    pub async fn token(&self) -> Result<SecretString, RepositoryError> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| RepositoryError::Connection(format!("token exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Credentials(format!(
                "token exchange returned HTTP {status}: {body}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| RepositoryError::Credentials(format!("invalid token response: {e}")))?;

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
        let renew_at = Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN);
        debug!(client_email = %self.key.client_email, "minted firestore access token");

        let token = SecretString::from(body.access_token.as_str());
        *self.cache.write() = Some(CachedToken {
            token: SecretString::from(body.access_token),
            renew_at,
        });
        Ok(token)
    }
}

/// How requests to Firestore are authorized.
pub enum TokenSource {
    /// A fixed bearer token, e.g. `owner` for the local emulator.
    Static(SecretString),
    ServiceAccount(ServiceAccountTokenSource),
}

impl TokenSource {
    /// Token accepted by the Firestore emulator for unrestricted access.
    pub fn emulator() -> Self {
        TokenSource::Static(SecretString::from("owner"))
    }

    pub async fn token(&self) -> Result<SecretString, RepositoryError> {
        match self {
            TokenSource::Static(token) => Ok(SecretString::from(token.expose_secret())),
            TokenSource::ServiceAccount(source) => source.token().await,
        }
    }
}
