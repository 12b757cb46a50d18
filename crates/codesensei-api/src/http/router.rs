//! Axum router configuration with middleware.
//!
//! Routes live under `/api/`; `/health` is unauthenticated.
//! Middleware: CORS restricted to the configured frontend origins, tracing.

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);

    let api_routes = Router::new()
        .route("/get_chat_sessions", get(handlers::session::list_sessions))
        .route("/create_session", post(handlers::session::create_session))
        .route(
            "/get_session_messages/{session_id}",
            get(handlers::session::get_session_messages),
        )
        .route(
            "/delete_session/{session_id}",
            delete(handlers::session::delete_session),
        )
        .route("/chat", post(handlers::chat::chat));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for an explicit origin list. Unparseable origins are
/// skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use codesensei_core::auth::verifier::{BoxTokenVerifier, TokenVerifier};
    use codesensei_core::chat::box_repository::BoxChatRepository;
    use codesensei_core::chat::service::ChatService;
    use codesensei_core::llm::box_provider::BoxLlmProvider;
    use codesensei_core::llm::provider::LlmProvider;
    use codesensei_core::prompt::instructions::system_instruction;
    use codesensei_infra::sqlite::chat::SqliteChatRepository;
    use codesensei_infra::sqlite::pool::{DatabasePool, database_url};
    use codesensei_types::config::SenseiConfig;
    use codesensei_types::error::AuthError;
    use codesensei_types::identity::UserIdentity;
    use codesensei_types::llm::{GenerateRequest, GenerateResponse, LlmError, Usage};
    use codesensei_types::mode::ChatMode;

    /// Accepts two fixed tokens, one per test user.
    struct FixedVerifier;

    impl TokenVerifier for FixedVerifier {
        async fn verify(&self, token: &str) -> Result<UserIdentity, AuthError> {
            match token {
                "alice-token" => Ok(UserIdentity::new("alice")),
                "bob-token" => Ok(UserIdentity::new("bob")),
                _ => Err(AuthError::InvalidToken("unknown token".to_string())),
            }
        }
    }

    /// Answers every prompt with a question about the last turn and keeps
    /// the requests it saw.
    struct QuestioningLlm {
        fail: bool,
        seen: Arc<Mutex<Vec<GenerateRequest>>>,
    }

    impl LlmProvider for QuestioningLlm {
        fn name(&self) -> &str {
            "questioning"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(LlmError::RateLimited);
            }
            let last = request.turns.last().map(|t| t.text.as_str()).unwrap_or("");
            Ok(GenerateResponse {
                text: format!("What do you already know about \"{last}\"?"),
                model: request.model.clone(),
                finish_reason: Some("STOP".to_string()),
                usage: Usage {
                    input_tokens: 12,
                    output_tokens: 8,
                },
            })
        }
    }

    struct TestApp {
        router: Router,
        seen: Arc<Mutex<Vec<GenerateRequest>>>,
        _dir: tempfile::TempDir,
    }

    async fn test_app(fail: bool) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::new(&database_url(&dir.path().join("test.db")))
            .await
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let llm = QuestioningLlm {
            fail,
            seen: seen.clone(),
        };
        let service = ChatService::new(
            BoxChatRepository::new(SqliteChatRepository::new(pool)),
            BoxLlmProvider::new(llm),
            "gemini-test".to_string(),
        );
        let state = AppState::new(
            service,
            BoxTokenVerifier::new(FixedVerifier),
            SenseiConfig::default(),
        );
        TestApp {
            router: build_router(state),
            seen,
            _dir: dir,
        }
    }

    async fn send(
        app: &TestApp,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let app = test_app(false).await;
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_every_route_rejects_missing_or_bad_token() {
        let app = test_app(false).await;
        let routes = [
            (Method::GET, "/api/get_chat_sessions"),
            (Method::POST, "/api/create_session"),
            (Method::GET, "/api/get_session_messages/s1"),
            (Method::DELETE, "/api/delete_session/s1"),
            (Method::POST, "/api/chat"),
        ];

        for (method, uri) in routes {
            for token in [None, Some("forged-token")] {
                let (status, body) = send(&app, method.clone(), uri, token, None).await;
                assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri} {token:?}");
                assert_eq!(body, json!({ "error": "Unauthorized" }));
            }
        }
        assert!(app.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_named_session_is_its_own_key() {
        let app = test_app(false).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/create_session",
            Some("alice-token"),
            Some(json!({ "session_name": "Recursion" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "session_id": "Recursion", "name": "Recursion" }));

        // Same name again overwrites rather than duplicating.
        send(
            &app,
            Method::POST,
            "/api/create_session",
            Some("alice-token"),
            Some(json!({ "session_name": "Recursion" })),
        )
        .await;

        let (status, body) =
            send(&app, Method::GET, "/api/get_chat_sessions", Some("alice-token"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{ "id": "Recursion", "name": "Recursion" }]));
    }

    #[tokio::test]
    async fn test_unnamed_session_gets_generated_id_and_label() {
        let app = test_app(false).await;

        for body in [None, Some(json!({})), Some(json!({ "session_name": "" }))] {
            let (status, created) = send(
                &app,
                Method::POST,
                "/api/create_session",
                Some("alice-token"),
                body,
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            let id = created["session_id"].as_str().unwrap();
            assert_eq!(id.len(), 32);
            assert!(created["name"].as_str().unwrap().starts_with("Chat - "));
        }

        let (_, sessions) =
            send(&app, Method::GET, "/api/get_chat_sessions", Some("alice-token"), None).await;
        assert_eq!(sessions.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_sessions_are_scoped_per_user() {
        let app = test_app(false).await;
        send(
            &app,
            Method::POST,
            "/api/create_session",
            Some("alice-token"),
            Some(json!({ "session_name": "Private" })),
        )
        .await;

        let (_, sessions) =
            send(&app, Method::GET, "/api/get_chat_sessions", Some("bob-token"), None).await;
        assert_eq!(sessions, json!([]));
    }

    #[tokio::test]
    async fn test_chat_stores_user_then_assistant_message() {
        let app = test_app(false).await;
        send(
            &app,
            Method::POST,
            "/api/create_session",
            Some("alice-token"),
            Some(json!({ "session_name": "Loops" })),
        )
        .await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chat",
            Some("alice-token"),
            Some(json!({ "message": "How do loops work?", "session_id": "Loops", "mode": "coding_coach" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["response"],
            "What do you already know about \"How do loops work?\"?"
        );

        let (status, messages) = send(
            &app,
            Method::GET,
            "/api/get_session_messages/Loops",
            Some("alice-token"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let messages = messages.as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "How do loops work?");
        assert_eq!(messages[1]["role"], "assistant");
        let stamp = |m: &Value| {
            chrono::DateTime::parse_from_rfc3339(m["timestamp"].as_str().unwrap()).unwrap()
        };
        assert!(stamp(&messages[0]) <= stamp(&messages[1]));

        let seen = app.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "gemini-test");
        assert_eq!(seen[0].turns[0].text, system_instruction(ChatMode::CodingCoach));
        assert_eq!(seen[0].turns.last().unwrap().text, "How do loops work?");
    }

    #[tokio::test]
    async fn test_unknown_mode_uses_general_instruction() {
        let app = test_app(false).await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/chat",
            Some("alice-token"),
            Some(json!({ "message": "hello", "session_id": "s1", "mode": "pirate" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let seen = app.seen.lock().unwrap();
        assert_eq!(seen[0].turns[0].text, system_instruction(ChatMode::General));
    }

    #[tokio::test]
    async fn test_chat_requires_message_and_session() {
        let app = test_app(false).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chat",
            Some("alice-token"),
            Some(json!({ "message": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Message and session_id are required" }));
        assert!(app.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_generation_keeps_only_user_message() {
        let app = test_app(true).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chat",
            Some("alice-token"),
            Some(json!({ "message": "hello", "session_id": "s1" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An error occurred.");
        assert_eq!(body["details"], "rate limited");

        let (_, messages) = send(
            &app,
            Method::GET,
            "/api/get_session_messages/s1",
            Some("alice-token"),
            None,
        )
        .await;
        let messages = messages.as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[tokio::test]
    async fn test_delete_keeps_messages() {
        let app = test_app(false).await;
        send(
            &app,
            Method::POST,
            "/api/create_session",
            Some("alice-token"),
            Some(json!({ "session_name": "Temp" })),
        )
        .await;
        send(
            &app,
            Method::POST,
            "/api/chat",
            Some("alice-token"),
            Some(json!({ "message": "hi", "session_id": "Temp" })),
        )
        .await;

        let (status, body) = send(
            &app,
            Method::DELETE,
            "/api/delete_session/Temp",
            Some("alice-token"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        let (_, sessions) =
            send(&app, Method::GET, "/api/get_chat_sessions", Some("alice-token"), None).await;
        assert_eq!(sessions, json!([]));

        let (_, messages) = send(
            &app,
            Method::GET,
            "/api/get_session_messages/Temp",
            Some("alice-token"),
            None,
        )
        .await;
        assert_eq!(messages.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let app = test_app(false).await;
        let request = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/chat")
                .header("origin", origin)
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "authorization,content-type")
                .body(Body::empty())
                .unwrap()
        };

        let response = app
            .router
            .clone()
            .oneshot(request("http://localhost:3000"))
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            headers.get("access-control-allow-credentials").unwrap(),
            "true"
        );

        let response = app
            .router
            .clone()
            .oneshot(request("http://evil.example"))
            .await
            .unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }
}
