//! Webhook HTTP server wiring the provider adapters to the shared resolver.
//!
//! Both providers run through the exact same resolution rules; the handlers
//! only differ in payload parsing and reply transport. The serving path
//! never returns an HTTP error for resolver-side problems: a broken store
//! degrades to the empty default and answer-service failures are swallowed
//! inside the resolver.

use axum::extract::{Form, Json, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::resolver::{Answerer, Resolver, SMS_ANSWER_CAP, TELEGRAM_ANSWER_CAP};
use crate::store::{self, InfoStore};
use crate::telegram::{TelegramApi, TelegramUpdate};
use crate::twilio::{twiml_reply, TwilioInbound};

pub struct AppState {
    pub config: Config,
    pub resolver: Resolver,
    pub telegram: Option<TelegramApi>,
}

/// Build the shared state from config: the Gemini answerer and the Telegram
/// sender are both optional capabilities, gated on their credentials.
pub fn build_state(config: Config) -> Arc<AppState> {
    let answerer: Option<Arc<dyn Answerer>> = config
        .gemini_api_key
        .clone()
        .map(|key| Arc::new(GeminiClient::new(key)) as Arc<dyn Answerer>);

    let telegram = config.telegram_bot_token.clone().map(TelegramApi::new);

    Arc::new(AppState { resolver: Resolver::new(answerer), telegram, config })
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/webhook/whatsapp", post(whatsapp_handler))
        .route("/webhook/telegram", post(telegram_handler))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>) -> Result<(), std::io::Error> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");
    axum::serve(listener, build_router(state)).await
}

async fn index_handler() -> &'static str {
    "University of Lucknow Info Bot is running! 🎓"
}

/// The store is re-read per request so admin merges show up immediately.
/// A load failure must not take down the reply path.
fn load_store_or_default(state: &AppState) -> InfoStore {
    match store::load_store(&state.config.data_path) {
        Ok(store) => store,
        Err(e) => {
            warn!("Falling back to empty store: {e}");
            InfoStore::default()
        }
    }
}

async fn whatsapp_handler(
    State(state): State<Arc<AppState>>,
    Form(inbound): Form<TwilioInbound>,
) -> Response {
    info!("WhatsApp message from {}", inbound.from);

    let store = load_store_or_default(&state);
    let reply = state.resolver.resolve(&inbound.body, &store, SMS_ANSWER_CAP).await;

    ([(header::CONTENT_TYPE, "application/xml")], twiml_reply(&reply)).into_response()
}

async fn telegram_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<TelegramUpdate>,
) -> &'static str {
    // Telegram expects a 200 for every update, including ones we ignore.
    let Some(message) = update.message else {
        return "ok";
    };
    let Some(text) = message.text else {
        return "ok";
    };
    let Some(ref api) = state.telegram else {
        warn!("Telegram update received but no bot token is configured");
        return "ok";
    };

    info!("Telegram message in chat {}", message.chat.id);

    let store = load_store_or_default(&state);
    let reply = state.resolver.resolve(&text, &store, TELEGRAM_ANSWER_CAP).await;

    if let Err(e) = api.send_message(message.chat.id, &reply).await {
        warn!("{e}");
    }

    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn test_state(data_path: PathBuf) -> Arc<AppState> {
        build_state(Config {
            data_path,
            host: "127.0.0.1".into(),
            port: 0,
            admin_token: None,
            gemini_api_key: None,
            telegram_bot_token: None,
            log_dir: None,
        })
    }

    fn sample_store_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("college_info.json");
        std::fs::write(
            &path,
            r#"{
                "notices": [{"date": "2024-01-10", "title": "Exam Schedule", "content": "Midterm exam dates released"}],
                "events": [],
                "contacts": {},
                "timetable": {}
            }"#,
        )
        .unwrap();
        path
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_banner() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path().join("missing.json")));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("running"));
    }

    #[tokio::test]
    async fn test_whatsapp_webhook_replies_twiml() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(sample_store_file(&dir)));

        let request = Request::builder()
            .method("POST")
            .uri("/webhook/whatsapp")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("Body=latest+exam&From=whatsapp%3A%2B15550100"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/xml"
        );

        let body = body_string(response).await;
        assert!(body.starts_with("<?xml"));
        assert!(body.contains("Notices matching &apos;exam&apos;:"));
        assert!(body.contains("2024-01-10 - Exam Schedule"));
    }

    #[tokio::test]
    async fn test_whatsapp_webhook_with_missing_store_still_replies() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path().join("missing.json")));

        let request = Request::builder()
            .method("POST")
            .uri("/webhook/whatsapp")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("Body=notices&From=test"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("No notices found."));
    }

    #[tokio::test]
    async fn test_telegram_webhook_acknowledges_textless_update() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(sample_store_file(&dir)));

        let request = Request::builder()
            .method("POST")
            .uri("/webhook/telegram")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message": {"chat": {"id": 42}, "photo": []}}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn test_telegram_webhook_without_token_acknowledges() {
        // No bot token configured: the update is accepted and dropped
        // rather than erroring back at Telegram.
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(sample_store_file(&dir)));

        let request = Request::builder()
            .method("POST")
            .uri("/webhook/telegram")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message": {"chat": {"id": 42}, "text": "notices"}}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }
}
