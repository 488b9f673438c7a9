use crate::chat::UpstreamPayload;
use crate::config::FlowiseConfig;
use crate::error::ChatError;
use crate::relay::{LineAction, LineBuffer, StreamEvent, classify_line};
use futures_util::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const STREAM_CHANNEL_CAPACITY: usize = 64;

/// HTTP client bound to one Flowise prediction endpoint.
#[derive(Clone)]
pub struct FlowiseClient {
    http: reqwest::Client,
    prediction_url: Arc<str>,
    timeout: Duration,
}

impl FlowiseClient {
    pub fn new(http: reqwest::Client, config: &FlowiseConfig) -> Self {
        Self {
            http,
            prediction_url: Arc::from(config.prediction_url()),
            timeout: config.timeout(),
        }
    }

    pub fn prediction_url(&self) -> &str {
        &self.prediction_url
    }

    /// Single-shot prediction. Returns Flowise's JSON body untouched.
    pub async fn predict(&self, payload: &UpstreamPayload) -> Result<Value, ChatError> {
        let resp = self.send(payload, Some(self.timeout)).await?;
        let text = resp
            .text()
            .await
            .map_err(|err| ChatError::UpstreamTransport(describe(&err)))?;
        serde_json::from_str(&text).map_err(|err| ChatError::UpstreamParse(err.to_string()))
    }

    /// Streaming prediction.
    ///
    /// The upstream body is consumed by a spawned task and reframed into
    /// events on a bounded channel. Dropping the receiver stops the task and
    /// releases the upstream connection, even while it is waiting for bytes.
    pub fn predict_stream(&self, payload: UpstreamPayload) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel::<StreamEvent>(STREAM_CHANNEL_CAPACITY);
        let client = self.clone();
        tokio::spawn(async move {
            let tx_err = tx.clone();
            if let Err(err) = client.relay(&payload, tx).await {
                tracing::error!(
                    kind = err.kind(),
                    url = %client.prediction_url,
                    error = %err,
                    "flowise stream failed"
                );
                let _ = tx_err.send(StreamEvent::Error(err)).await;
            }
        });
        rx
    }

    async fn relay(
        &self,
        payload: &UpstreamPayload,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ChatError> {
        // Streaming responses are bounded by the client's connect and read
        // timeouts instead of a whole-request deadline.
        let resp = tokio::select! {
            _ = tx.closed() => return Ok(()),
            resp = self.send(payload, None) => resp?,
        };
        let mut body = resp.bytes_stream();
        let mut lines = LineBuffer::new();
        loop {
            let chunk = tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!("client went away, dropping flowise stream");
                    return Ok(());
                }
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk.map_err(|err| ChatError::UpstreamTransport(describe(&err)))?;
            lines.push(&chunk);
            while let Some(line) = lines.next_line() {
                if !forward_line(&line?, &tx).await {
                    return Ok(());
                }
            }
        }
        if let Some(line) = lines.finish() {
            forward_line(&line?, &tx).await;
        }
        Ok(())
    }

    async fn send(
        &self,
        payload: &UpstreamPayload,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, ChatError> {
        let mut req = self.http.post(self.prediction_url.as_ref()).json(payload);
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }
        let resp = req
            .send()
            .await
            .map_err(|err| ChatError::UpstreamTransport(describe(&err)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::UpstreamTransport(status_error(status, resp.text().await)));
        }
        Ok(resp)
    }
}

fn status_error(status: reqwest::StatusCode, body: reqwest::Result<String>) -> String {
    match body {
        Ok(text) => format!("upstream status {status}: {text}"),
        Err(err) => format!("upstream status {status}: <body unavailable: {}>", describe(&err)),
    }
}

/// Returns false once the relay must stop, either on the sentinel or
/// because the client hung up.
async fn forward_line(line: &str, tx: &mpsc::Sender<StreamEvent>) -> bool {
    match classify_line(line) {
        LineAction::Skip => true,
        LineAction::Done => false,
        LineAction::Forward(data) => tx.send(StreamEvent::Data(data)).await.is_ok(),
    }
}

/// Error text plus its full source chain, e.g. the refused connection
/// behind "error sending request".
fn describe(err: &reqwest::Error) -> String {
    let mut out = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

/// Shared HTTP client. Connect and per-read waits are bounded by the Flowise
/// timeout so a stalled stream ends as a transport failure.
pub fn build_http_client(config: &FlowiseConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("flowise-gateway/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(config.timeout())
        .read_timeout(config.timeout())
        .build()
}
