use crate::agent::ProxyAgent;
use crate::models::api::{
    ChatRequest,
    ChatResponse,
    DocumentQuery,
    DocumentResponse,
    ImageQuery,
    ImageResponse,
    SpeechParams,
    SpeechResponse,
    TranslateRequest,
    TranslateResponse,
};
use crate::speech::AUDIO_ROUTE;
use super::error::ApiError;
use axum::{
    body::Bytes,
    extract::{ DefaultBodyLimit, Multipart, Query, State },
    extract::multipart::MultipartRejection,
    extract::rejection::JsonRejection,
    http::HeaderValue,
    routing::{ get, post },
    Json,
    Router,
};
use log::info;
use serde_json::{ json, Value };
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tower_http::cors::{ AllowOrigin, Any, CorsLayer };
use tower_http::services::ServeDir;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    agent: Arc<ProxyAgent>,
}

fn build_cors(origins: &[String]) -> Result<CorsLayer, Box<dyn Error + Send + Sync>> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return Ok(cors.allow_origin(Any));
    }
    let list = origins
        .iter()
        .map(|o| HeaderValue::from_str(o.trim()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Invalid CORS origin: {}", e))?;
    Ok(cors.allow_origin(AllowOrigin::list(list)))
}

pub fn create_router(
    agent: Arc<ProxyAgent>,
    cors_origins: &[String]
) -> Result<Router, Box<dyn Error + Send + Sync>> {
    let audio_dir = agent.speech().audio_dir().to_path_buf();
    let app_state = AppState { agent };

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/chat", post(chat_handler))
        .route("/chat/", post(chat_handler))
        .route("/image-search", post(image_search_handler))
        .route("/image-search/", post(image_search_handler))
        .route("/upload-pdf", post(upload_pdf_handler))
        .route("/upload-pdf/", post(upload_pdf_handler))
        .route("/text-to-speech", post(text_to_speech_handler))
        .route("/text-to-speech/", post(text_to_speech_handler))
        .route("/speak-translated", post(speak_translated_handler))
        .route("/speak-translated/", post(speak_translated_handler))
        .nest_service(AUDIO_ROUTE, ServeDir::new(audio_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(build_cors(cors_origins)?)
        .with_state(app_state);

    Ok(router)
}

async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "voxrelay is running" }))
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    info!("POST /chat user={} conversation={}", req.user_id, req.conversation_id);
    Ok(Json(state.agent.chat(req).await?))
}

struct UploadedFile {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, ApiError> {
        let mut multipart = multipart.map_err(|e|
            ApiError::bad_request(format!("Invalid multipart payload: {}", e.body_text()))
        )?;
        let mut form = UploadForm::default();

        while
            let Some(field) = multipart
                .next_field().await
                .map_err(|e| ApiError::bad_request(format!("Failed reading multipart field: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes().await
                    .map_err(|e| ApiError::bad_request(format!("Failed reading multipart 'file' field: {e}")))?;
                form.file = Some(UploadedFile { bytes: bytes.to_vec(), content_type });
            } else {
                let text = field
                    .text().await
                    .map_err(|e| ApiError::bad_request(format!("Failed reading multipart '{name}' field: {e}")))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    fn take_file(&mut self) -> Result<UploadedFile, ApiError> {
        self.file.take().ok_or_else(|| ApiError::unprocessable("Missing multipart field 'file'"))
    }

    fn take(&mut self, name: &str) -> Result<String, ApiError> {
        self.fields
            .remove(name)
            .ok_or_else(|| ApiError::unprocessable(format!("Missing multipart field '{}'", name)))
    }
}

async fn image_search_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>
) -> Result<Json<ImageResponse>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let query = ImageQuery {
        bytes: file.bytes,
        mime_type: file.content_type,
        message: form.take("message")?,
        conversation_id: form.take("conversation_id")?,
        user_id: form.take("user_id").ok(),
    };
    info!("POST /image-search conversation={}", query.conversation_id);
    Ok(Json(state.agent.image_query(query).await?))
}

async fn upload_pdf_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>
) -> Result<Json<DocumentResponse>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let query = DocumentQuery {
        bytes: file.bytes,
        user_id: form.take("user_id")?,
        conversation_id: form.take("conversation_id")?,
        prompt: form.take("prompt")?,
    };
    info!("POST /upload-pdf user={} conversation={}", query.user_id, query.conversation_id);
    Ok(Json(state.agent.document_query(query).await?))
}

async fn text_to_speech_handler(
    State(state): State<AppState>,
    Query(query): Query<SpeechParams>,
    body: Bytes
) -> Result<Json<SpeechResponse>, ApiError> {
    let mut params = query;
    if !body.is_empty() {
        let from_body: SpeechParams = serde_json
            ::from_slice(&body)
            .map_err(|e| ApiError::unprocessable(format!("Invalid JSON body: {}", e)))?;
        params.text = from_body.text.or(params.text);
        params.language = from_body.language.or(params.language);
    }
    info!("POST /text-to-speech language={:?}", params.language);
    Ok(Json(state.agent.text_to_speech(params).await?))
}

async fn speak_translated_handler(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>
) -> Result<Json<TranslateResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    info!("POST /speak-translated target={}", req.target_language);
    Ok(Json(state.agent.speak_translated(req).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{ test_agent, FailingChatClient, StubChatClient };
    use crate::cleanup::CleanupStatus;
    use axum::body::Body;
    use axum::http::{ Request, StatusCode };
    use axum::response::Response;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "voxrelay-test-boundary";

    fn app_with(reply: &str, dir: &tempfile::TempDir) -> (Router, Arc<ProxyAgent>) {
        let agent = Arc::new(test_agent(Arc::new(StubChatClient::new(reply)), dir.path()));
        let router = create_router(agent.clone(), &["*".to_string()]).unwrap();
        (router, agent)
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(
        uri: &str,
        file: (&str, &str, &[u8]),
        fields: &[(&str, &str)]
    ) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                ).as_bytes()
            );
        }
        let (file_name, content_type, bytes) = file;
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            ).as_bytes()
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn audio_path(dir: &tempfile::TempDir, url: &str) -> std::path::PathBuf {
        dir.path().join(url.trim_start_matches("/audio/"))
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with("", &dir);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn chat_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with("Hi there", &dir);

        let response = app
            .oneshot(
                json_request(
                    "/chat/",
                    json!({ "message": "Hello", "conversation_id": "c1", "user_id": "u1" })
                )
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["response"], "Hi there");
        assert_eq!(body["conversation_id"], "c1");
        let url = body["audio_url"].as_str().unwrap();
        assert!(audio_path(&dir, url).exists());
    }

    #[tokio::test]
    async fn chat_without_trailing_slash_and_unknown_role() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with("ok", &dir);

        let response = app
            .oneshot(
                json_request(
                    "/chat",
                    json!({ "message": "Hello", "role": "tool", "conversation_id": "c1", "user_id": "u1" })
                )
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await["detail"].is_string());
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_500_with_detail() {
        let dir = tempfile::tempdir().unwrap();
        let agent = Arc::new(test_agent(Arc::new(FailingChatClient), dir.path()));
        let app = create_router(agent, &[]).unwrap();

        let response = app
            .oneshot(
                json_request(
                    "/chat/",
                    json!({ "message": "Hello", "conversation_id": "c1", "user_id": "u1" })
                )
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("Error with Groq API"));
    }

    #[tokio::test(start_paused = true)]
    async fn speak_translated_file_is_removed_after_delay() {
        let dir = tempfile::tempdir().unwrap();
        let (app, agent) = app_with("Bonjour", &dir);

        let response = app
            .oneshot(
                json_request("/speak-translated/", json!({ "text": "Hello", "target_language": "fr" }))
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["translated_text"], "Bonjour");
        assert_eq!(body["language"], "fr");
        let path = audio_path(&dir, body["audio_url"].as_str().unwrap());
        assert!(path.exists());

        let handles = agent.cleanup().handles();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].path(), path.as_path());

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(handles[0].wait().await, CleanupStatus::Deleted);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn speak_translated_rejects_unknown_language() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with("Bonjour", &dir);

        let response = app
            .oneshot(
                json_request("/speak-translated/", json!({ "text": "Hello", "target_language": "xx" }))
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("Supported codes"));
        assert!(detail.contains("fr"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn text_to_speech_accepts_query_and_serves_audio() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with("", &dir);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/text-to-speech/?text=Hallo&language=de")
                    .body(Body::empty())
                    .unwrap()
            ).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let url = body_json(response).await["audio_url"].as_str().unwrap().to_string();

        let response = app
            .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap()).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"de-DE-KatjaNeural:Hallo");
    }

    #[tokio::test]
    async fn text_to_speech_accepts_json_body() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with("", &dir);

        let response = app
            .oneshot(json_request("/text-to-speech", json!({ "text": "Hello" }))).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let url = body_json(response).await["audio_url"].as_str().unwrap().to_string();
        assert!(std::fs::read(audio_path(&dir, &url)).unwrap().starts_with(b"en-US-AriaNeural:"));
    }

    #[tokio::test]
    async fn image_search_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with("A red square", &dir);

        let response = app
            .oneshot(
                multipart_request(
                    "/image-search/",
                    ("square.png", "image/png", &[0x89, b'P', b'N', b'G']),
                    &[
                        ("message", "What is this?"),
                        ("conversation_id", "c1"),
                        ("user_id", "u1"),
                    ]
                )
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["response"], "A red square");
        assert!(body["audio_url"].is_string());
    }

    #[tokio::test]
    async fn image_search_missing_message_is_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with("x", &dir);

        let response = app
            .oneshot(
                multipart_request(
                    "/image-search/",
                    ("square.png", "image/png", &[1, 2, 3]),
                    &[("conversation_id", "c1")]
                )
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn upload_pdf_answers_from_document() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with("Revenue is up.", &dir);
        let pdf = crate::extract::testing::one_page_pdf("Quarterly revenue grew");

        let response = app
            .oneshot(
                multipart_request(
                    "/upload-pdf/",
                    ("report.pdf", "application/pdf", &pdf),
                    &[
                        ("user_id", "u1"),
                        ("conversation_id", "c1"),
                        ("prompt", "Summarize"),
                    ]
                )
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "response": "Revenue is up." }));
    }

    #[tokio::test]
    async fn upload_pdf_without_text_is_a_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with("summary", &dir);

        let response = app
            .oneshot(
                multipart_request(
                    "/upload-pdf/",
                    ("broken.pdf", "application/pdf", b"%PDF-1.4 truncated"),
                    &[
                        ("user_id", "u1"),
                        ("conversation_id", "c1"),
                        ("prompt", "Summarize this document"),
                    ]
                )
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("No extractable text"));
    }

    #[test]
    fn cors_rejects_malformed_origin() {
        assert!(build_cors(&["http://ok.example".to_string()]).is_ok());
        assert!(build_cors(&["bad\norigin".to_string()]).is_err());
    }
}
