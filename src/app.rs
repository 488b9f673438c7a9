use crate::completion::CompletionService;
use crate::config::{FlowiseConfig, optional_env};
use crate::error::{AppError, AppResult};
use crate::upstream::{FlowiseClient, build_http_client};
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::{Arc, Once, OnceLock};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeConfig>,
    pub completions: CompletionService,
    pub metrics: PrometheusHandle,
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static METRICS_ERROR: OnceLock<AppError> = OnceLock::new();
static METRICS_INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub listen: String,
    pub metrics_path: String,
    pub flowise: FlowiseConfig,
}

impl RuntimeConfig {
    pub fn from_env() -> AppResult<Self> {
        let listen = optional_env("GATEWAY_LISTEN").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let metrics_path =
            optional_env("GATEWAY_METRICS_PATH").unwrap_or_else(|| "/metrics".to_string());
        let flowise = FlowiseConfig::from_env()?;
        Ok(Self {
            listen,
            metrics_path,
            flowise,
        })
    }
}

pub fn load_state() -> AppResult<AppState> {
    load_state_with_runtime(RuntimeConfig::from_env()?)
}

pub fn load_state_with_runtime(runtime: RuntimeConfig) -> AppResult<AppState> {
    let http = build_http_client(&runtime.flowise).map_err(|err| {
        AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "http_client_init_failed",
            err.to_string(),
        )
    })?;
    let metrics = init_metrics()?;
    let completions = CompletionService::new(FlowiseClient::new(http, &runtime.flowise));
    tracing::info!(
        prediction_url = %runtime.flowise.prediction_url(),
        timeout_ms = runtime.flowise.timeout_ms,
        "flowise upstream configured"
    );
    Ok(AppState {
        runtime: Arc::new(runtime),
        completions,
        metrics,
    })
}

fn init_metrics() -> AppResult<PrometheusHandle> {
    METRICS_INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                let _ = METRICS_HANDLE.set(handle);
            }
            Err(err) => {
                let _ = METRICS_ERROR.set(AppError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "metrics_init_failed",
                    err.to_string(),
                ));
            }
        }
    });

    if let Some(err) = METRICS_ERROR.get() {
        return Err(err.clone());
    }
    METRICS_HANDLE.get().cloned().ok_or_else(|| {
        AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "metrics_init_failed",
            "metrics recorder not available",
        )
    })
}

pub fn build_app(state: AppState) -> Router {
    let metrics_path = state.runtime.metrics_path.clone();
    Router::<AppState>::new()
        .route(
            "/api/v1/chat/completions",
            post(crate::handlers::stream_chat_completion),
        )
        .route(
            "/api/v1/chat/completions/sync",
            post(crate::handlers::sync_chat_completion),
        )
        .route("/health", get(crate::handlers::health))
        .route(&metrics_path, get(crate::handlers::metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Outermost layer runs first: the id must exist before it is propagated.
        .layer(PropagateRequestIdLayer::new(
            axum::http::header::HeaderName::from_static("x-request-id"),
        ))
        .layer(SetRequestIdLayer::new(
            axum::http::header::HeaderName::from_static("x-request-id"),
            MakeRequestUuid,
        ))
}
