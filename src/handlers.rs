use crate::app::AppState;
use crate::error::AppResult;
use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response, Sse};
use futures_util::StreamExt;
use serde_json::Value;

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.render()
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn stream_chat_completion(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Response {
    let events = state
        .completions
        .stream(body)
        .map(|event| Ok::<_, std::convert::Infallible>(event.into_sse()));
    Sse::new(events).into_response()
}

pub async fn sync_chat_completion(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    let value = state.completions.complete(body).await?;
    Ok(Json(value).into_response())
}
