//! FirebaseTokenVerifier -- concrete [`TokenVerifier`] for Firebase ID tokens.
//!
//! Tokens are RS256 JWTs signed by Google's `securetoken` service account.
//! Public keys come from a JWK set that is fetched over HTTP and cached for a
//! fixed TTL; a static key set can be supplied instead (emulators, tests).
//! Only key material is cached. Every token is fully verified on every call.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use codesensei_core::auth::verifier::TokenVerifier;
use codesensei_types::config::FirebaseConfig;
use codesensei_types::error::AuthError;
use codesensei_types::identity::UserIdentity;

/// Clock skew tolerated on `exp`, `nbf` and `iat`.
const LEEWAY_SECS: u64 = 60;

/// Minimum gap between forced refreshes triggered by an unknown `kid`.
const MIN_FORCED_REFRESH: Duration = Duration::from_secs(30);

/// One entry of a JSON Web Key Set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Jwk {
    pub kid: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub kty: String,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    #[serde(default)]
    pub k: Option<String>,
}

#[derive(Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Where signing keys come from.
#[derive(Clone, Debug)]
pub enum JwkSource {
    Static(Vec<Jwk>),
    Http { uri: String, cache_ttl: Duration },
}

/// Verification settings for one Firebase project.
#[derive(Clone, Debug)]
pub struct FirebaseVerifierConfig {
    pub issuer: String,
    pub audience: String,
    pub key_source: JwkSource,
    pub algorithms: Vec<Algorithm>,
}

impl FirebaseVerifierConfig {
    /// Settings for `project_id` using Google's published key set.
    pub fn for_project(project_id: &str) -> Self {
        let defaults = FirebaseConfig::default();
        Self {
            issuer: format!("https://securetoken.google.com/{project_id}"),
            audience: project_id.to_string(),
            key_source: JwkSource::Http {
                uri: defaults.jwks_uri,
                cache_ttl: Duration::from_secs(defaults.jwks_cache_ttl_secs),
            },
            algorithms: vec![Algorithm::RS256],
        }
    }

    /// Settings from the `[firebase]` config table.
    pub fn from_config(config: &FirebaseConfig) -> Result<Self, AuthError> {
        let project_id = config.project_id.as_deref().ok_or_else(|| {
            AuthError::KeySource("firebase.project_id is not configured".to_string())
        })?;
        Ok(Self::for_project(project_id)
            .jwks_uri_with_ttl(&config.jwks_uri, Duration::from_secs(config.jwks_cache_ttl_secs)))
    }

    pub fn static_keys(mut self, keys: Vec<Jwk>) -> Self {
        self.key_source = JwkSource::Static(keys);
        self
    }

    pub fn jwks_uri_with_ttl(mut self, uri: impl Into<String>, ttl: Duration) -> Self {
        self.key_source = JwkSource::Http {
            uri: uri.into(),
            cache_ttl: ttl,
        };
        self
    }

    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }
}

struct CachedKeys {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
    expires_at: Option<Instant>,
}

/// Verifies Firebase ID tokens against a cached JWK set.
pub struct FirebaseTokenVerifier {
    config: FirebaseVerifierConfig,
    client: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseTokenVerifier {
    pub fn new(config: FirebaseVerifierConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::KeySource(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            cache: RwLock::new(None),
        })
    }

    fn cached_key(&self, kid: &str) -> Option<Jwk> {
        self.cache
            .read()
            .as_ref()
            .and_then(|cache| cache.keys.get(kid).cloned())
    }

    fn cache_expired(&self) -> bool {
        match self.cache.read().as_ref() {
            Some(cache) => cache.expires_at.is_some_and(|expiry| expiry <= Instant::now()),
            None => true,
        }
    }

    fn may_force_refresh(&self) -> bool {
        if !matches!(self.config.key_source, JwkSource::Http { .. }) {
            return false;
        }
        match self.cache.read().as_ref() {
            Some(cache) => cache.fetched_at.elapsed() >= MIN_FORCED_REFRESH,
            None => true,
        }
    }

    async fn refresh(&self) -> Result<(), AuthError> {
        let fresh = match &self.config.key_source {
            JwkSource::Static(keys) => CachedKeys {
                keys: keys.iter().map(|k| (k.kid.clone(), k.clone())).collect(),
                fetched_at: Instant::now(),
                expires_at: None,
            },
            JwkSource::Http { uri, cache_ttl } => {
                let response = self
                    .client
                    .get(uri)
                    .send()
                    .await
                    .map_err(|e| AuthError::KeySource(format!("jwks fetch error: {e}")))?;
                if response.status() != StatusCode::OK {
                    return Err(AuthError::KeySource(format!(
                        "jwks fetch status: {}",
                        response.status()
                    )));
                }
                let body: JwkSet = response
                    .json()
                    .await
                    .map_err(|e| AuthError::KeySource(format!("jwks decode error: {e}")))?;
                debug!(uri = %uri, keys = body.keys.len(), "refreshed signing keys");
                CachedKeys {
                    keys: body.keys.into_iter().map(|k| (k.kid.clone(), k)).collect(),
                    fetched_at: Instant::now(),
                    expires_at: Some(Instant::now() + *cache_ttl),
                }
            }
        };

        *self.cache.write() = Some(fresh);
        Ok(())
    }

    /// Find the key for `kid`, refreshing on expiry and once on a miss.
    async fn signing_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        if self.cache_expired() {
            self.refresh().await?;
        }
        if let Some(jwk) = self.cached_key(kid) {
            return Ok(jwk);
        }
        // Keys rotate; an unknown kid may be newer than the cached set.
        if self.may_force_refresh() {
            self.refresh().await?;
            if let Some(jwk) = self.cached_key(kid) {
                return Ok(jwk);
            }
        }
        Err(AuthError::InvalidToken(format!("no signing key matches kid {kid}")))
    }

    fn check_algorithm(&self, header_alg: Algorithm, jwk: &Jwk) -> Result<(), AuthError> {
        if !self.config.algorithms.contains(&header_alg) {
            return Err(AuthError::InvalidToken(format!(
                "algorithm {header_alg:?} not allowed"
            )));
        }
        if let Some(alg) = jwk.alg.as_deref() {
            let key_alg = Algorithm::from_str(alg)
                .map_err(|_| AuthError::KeySource(format!("unsupported jwk algorithm: {alg}")))?;
            if key_alg != header_alg {
                return Err(AuthError::InvalidToken(format!(
                    "token algorithm {header_alg:?} does not match key algorithm {alg}"
                )));
            }
        }
        Ok(())
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = LEEWAY_SECS;
        validation.set_issuer(std::slice::from_ref(&self.config.issuer));
        validation.set_audience(std::slice::from_ref(&self.config.audience));
        validation
    }
}

fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    match jwk.kty.as_str() {
        "RSA" => {
            let n = jwk
                .n
                .as_deref()
                .ok_or_else(|| AuthError::KeySource("jwk rsa modulus missing".to_string()))?;
            let e = jwk
                .e
                .as_deref()
                .ok_or_else(|| AuthError::KeySource("jwk rsa exponent missing".to_string()))?;
            DecodingKey::from_rsa_components(n, e)
                .map_err(|err| AuthError::KeySource(format!("failed to build rsa key: {err}")))
        }
        "oct" => {
            let secret = jwk
                .k
                .as_deref()
                .ok_or_else(|| AuthError::KeySource("jwk secret missing".to_string()))?;
            let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
                .decode(secret.trim_end_matches('='))
                .map_err(|err| AuthError::KeySource(format!("secret decode error: {err}")))?;
            Ok(DecodingKey::from_secret(&bytes))
        }
        other => Err(AuthError::KeySource(format!("unsupported jwk key type: {other}"))),
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("invalid token header: {e}")))?;
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AuthError::InvalidToken("token missing kid header".to_string()))?;

        let jwk = self.signing_key(kid).await?;
        self.check_algorithm(header.alg, &jwk)?;
        let key = decoding_key(&jwk)?;

        let data = jsonwebtoken::decode::<Value>(token, &key, &self.validation(header.alg))
            .map_err(|e| AuthError::InvalidToken(format!("verification failed: {e}")))?;

        let mut claims = match data.claims {
            Value::Object(map) => map,
            _ => return Err(AuthError::InvalidToken("claims must be an object".to_string())),
        };

        // jsonwebtoken only enforces presence for exp/nbf/sub/iss/aud.
        let iat = claims
            .get("iat")
            .and_then(Value::as_u64)
            .ok_or_else(|| AuthError::InvalidToken("token missing iat claim".to_string()))?;
        if iat > unix_now() + LEEWAY_SECS {
            return Err(AuthError::InvalidToken("token issued in the future".to_string()));
        }

        let uid = match claims.remove("sub") {
            Some(Value::String(sub)) if !sub.is_empty() => sub,
            _ => return Err(AuthError::InvalidToken("subject must be a non-empty string".to_string())),
        };
        let email = claims
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(UserIdentity { uid, email, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "super-secret";
    const PROJECT: &str = "codesensei-test";

    fn oct_key(kid: &str) -> Jwk {
        Jwk {
            kid: kid.into(),
            alg: Some("HS256".into()),
            kty: "oct".into(),
            n: None,
            e: None,
            k: Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(SECRET)),
        }
    }

    fn static_verifier() -> FirebaseTokenVerifier {
        let config = FirebaseVerifierConfig::for_project(PROJECT)
            .static_keys(vec![oct_key("k1")])
            .algorithms(vec![Algorithm::HS256]);
        FirebaseTokenVerifier::new(config).unwrap()
    }

    fn sign(kid: Option<&str>, claims: Value) -> String {
        let header = Header {
            alg: Algorithm::HS256,
            kid: kid.map(str::to_string),
            ..Header::default()
        };
        encode(&header, &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    fn claims(sub: &str) -> Value {
        let now = unix_now();
        json!({
            "sub": sub,
            "iss": format!("https://securetoken.google.com/{PROJECT}"),
            "aud": PROJECT,
            "iat": now,
            "exp": now + 3600,
            "email": "learner@example.com",
        })
    }

    #[tokio::test]
    async fn test_valid_token_yields_uid_and_email() {
        let verifier = static_verifier();
        let identity = verifier.verify(&sign(Some("k1"), claims("uid-123"))).await.unwrap();

        assert_eq!(identity.uid, "uid-123");
        assert_eq!(identity.email.as_deref(), Some("learner@example.com"));
        assert!(!identity.claims.contains_key("sub"));
        assert!(identity.claims.contains_key("aud"));
    }

    #[tokio::test]
    async fn test_wrong_audience_is_rejected() {
        let mut body = claims("uid-123");
        body["aud"] = json!("someone-else");
        let err = static_verifier().verify(&sign(Some("k1"), body)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_wrong_issuer_is_rejected() {
        let mut body = claims("uid-123");
        body["iss"] = json!("https://accounts.example.com");
        let err = static_verifier().verify(&sign(Some("k1"), body)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let mut body = claims("uid-123");
        let past = unix_now() - 7200;
        body["iat"] = json!(past);
        body["exp"] = json!(past + 60);
        let err = static_verifier().verify(&sign(Some("k1"), body)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_missing_or_future_iat_is_rejected() {
        let mut body = claims("uid-123");
        body.as_object_mut().unwrap().remove("iat");
        let err = static_verifier().verify(&sign(Some("k1"), body)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(msg) if msg.contains("iat")));

        let mut body = claims("uid-123");
        body["iat"] = json!(unix_now() + 600);
        let err = static_verifier().verify(&sign(Some("k1"), body)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(msg) if msg.contains("future")));
    }

    #[tokio::test]
    async fn test_empty_subject_is_rejected() {
        let err = static_verifier()
            .verify(&sign(Some("k1"), claims("")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("subject"));
    }

    #[tokio::test]
    async fn test_missing_or_unknown_kid_is_rejected() {
        let verifier = static_verifier();
        assert!(verifier.verify(&sign(None, claims("u"))).await.is_err());
        let err = verifier.verify(&sign(Some("other"), claims("u"))).await.unwrap_err();
        assert!(err.to_string().contains("no signing key"));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let err = static_verifier().verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_disallowed_algorithm_is_rejected() {
        let config = FirebaseVerifierConfig::for_project(PROJECT).static_keys(vec![oct_key("k1")]);
        let verifier = FirebaseTokenVerifier::new(config).unwrap();
        let err = verifier.verify(&sign(Some("k1"), claims("u"))).await.unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }

    #[tokio::test]
    async fn test_http_keys_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": [oct_key("k1")]})))
            .expect(1)
            .mount(&server)
            .await;

        let config = FirebaseVerifierConfig::for_project(PROJECT)
            .jwks_uri_with_ttl(format!("{}/jwks", server.uri()), Duration::from_secs(300))
            .algorithms(vec![Algorithm::HS256]);
        let verifier = FirebaseTokenVerifier::new(config).unwrap();

        for uid in ["a", "b", "c"] {
            let identity = verifier.verify(&sign(Some("k1"), claims(uid))).await.unwrap();
            assert_eq!(identity.uid, uid);
        }
    }

    #[tokio::test]
    async fn test_jwks_outage_is_key_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = FirebaseVerifierConfig::for_project(PROJECT)
            .jwks_uri_with_ttl(server.uri(), Duration::from_secs(300))
            .algorithms(vec![Algorithm::HS256]);
        let verifier = FirebaseTokenVerifier::new(config).unwrap();

        let err = verifier.verify(&sign(Some("k1"), claims("u"))).await.unwrap_err();
        assert!(matches!(err, AuthError::KeySource(_)));
    }

    #[test]
    fn test_from_config_requires_project() {
        assert!(FirebaseVerifierConfig::from_config(&FirebaseConfig::default()).is_err());

        let config = FirebaseConfig {
            project_id: Some("demo".to_string()),
            ..FirebaseConfig::default()
        };
        let settings = FirebaseVerifierConfig::from_config(&config).unwrap();
        assert_eq!(settings.issuer, "https://securetoken.google.com/demo");
        assert_eq!(settings.audience, "demo");
        assert!(matches!(settings.key_source, JwkSource::Http { .. }));
    }
}
