//! HTTP routes and request handling

use crate::emit;
use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response, Sse},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use sigil_ai::InferenceBackend;
use sigil_relay::{ChatRequest, Error, ImageResolver};
use std::sync::Arc;

/// Shared per-process state; each request builds its own stream state
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn InferenceBackend>,
    pub resolver: Arc<dyn ImageResolver>,
    pub model: String,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat).options(preflight))
        .layer(axum::middleware::map_response(allow_origin))
        .with_state(state)
}

async fn allow_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        "access-control-allow-origin",
        HeaderValue::from_static("*"),
    );
    response
}

/// CORS preflight: fixed headers, empty body, no backend work
async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            ("access-control-allow-origin", "*"),
            ("access-control-allow-methods", "POST"),
            ("access-control-allow-headers", "Content-Type"),
            ("access-control-max-age", "3600"),
        ],
    )
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = payload else {
        return missing_messages();
    };
    if body.get("messages").is_none() {
        return missing_messages();
    }

    let request = match ChatRequest::from_value(body) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };
    let live = request.stream;

    let output = match sigil_relay::run_chat(
        state.backend.as_ref(),
        state.resolver.as_ref(),
        &state.model,
        request,
    )
    .await
    {
        Ok(output) => output,
        Err(e) => return error_response(&e),
    };

    if live {
        // The caller disconnecting drops this response, which drops the
        // output stream and the backend event source with it.
        (
            [
                ("cache-control", "no-cache"),
                ("x-accel-buffering", "no"),
            ],
            Sse::new(emit::sse_frames(output)),
        )
            .into_response()
    } else {
        match emit::collect_buffered(output).await {
            Ok(response) => Json(response).into_response(),
            Err(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response(),
        }
    }
}

fn missing_messages() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Messages are required" })),
    )
        .into_response()
}

fn error_response(error: &Error) -> Response {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    tracing::warn!(%status, "request failed: {}", error);
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
