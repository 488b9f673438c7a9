use crate::chat;
use crate::error::{AppError, ChatError};
use crate::relay::StreamEvent;
use crate::upstream::FlowiseClient;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Stream,
    Sync,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Stream => "stream",
            Mode::Sync => "sync",
        }
    }
}

/// Turns caller bodies into Flowise predictions.
#[derive(Clone)]
pub struct CompletionService {
    upstream: FlowiseClient,
}

impl CompletionService {
    pub fn new(upstream: FlowiseClient) -> Self {
        Self { upstream }
    }

    /// Streaming completion. Never fails: every problem becomes a single
    /// terminal error event.
    pub fn stream(&self, body: Value) -> BoxStream<'static, StreamEvent> {
        record_request(Mode::Stream);
        let payload = match chat::normalize(body) {
            Ok(payload) => payload,
            Err(err) => {
                log_failure(Mode::Stream, &err);
                record_error(Mode::Stream, &err);
                return futures_util::stream::once(async move { StreamEvent::Error(err) })
                    .boxed();
            }
        };
        tracing::debug!(question_len = payload.question.len(), "forwarding stream to flowise");
        // Transport failures were logged where they happened.
        tokio_stream::wrappers::ReceiverStream::new(self.upstream.predict_stream(payload))
            .inspect(|event| {
                if let StreamEvent::Error(err) = event {
                    record_error(Mode::Stream, err);
                }
            })
            .boxed()
    }

    /// Sync completion. Unexpected faults are logged with their details but
    /// reach the caller only as a generic server error.
    pub async fn complete(&self, body: Value) -> Result<Value, AppError> {
        record_request(Mode::Sync);
        let result = match chat::normalize(body) {
            Ok(payload) => self.upstream.predict(&payload).await,
            Err(err) => Err(err),
        };
        result.map_err(|err| {
            log_failure(Mode::Sync, &err);
            record_error(Mode::Sync, &err);
            AppError::from(err)
        })
    }
}

fn log_failure(mode: Mode, err: &ChatError) {
    let mode = mode.as_str();
    let kind = err.kind();
    match err {
        ChatError::Validation(message) => {
            tracing::error!(mode, kind, "validation error: {message}");
        }
        _ => {
            tracing::error!(mode, kind, error = %err, "completion failed");
        }
    }
}

fn record_request(mode: Mode) {
    metrics::counter!("gateway_requests_total", "mode" => mode.as_str()).increment(1);
}

fn record_error(mode: Mode, err: &ChatError) {
    metrics::counter!(
        "gateway_errors_total",
        "mode" => mode.as_str(),
        "kind" => err.kind()
    )
    .increment(1);
}
