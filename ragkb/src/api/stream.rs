//! Streaming chat replies over server-sent events.
//!
//! A [`ChatStream`] owns one background task reading the response body. The
//! task decodes frames with [`SseDecoder`] and forwards them as
//! [`StreamEvent`]s over a bounded channel. Dropping the subscription aborts
//! the task.

use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use reqwest::header::ACCEPT;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use super::chat;
use super::sse::{SseDecoder, SseFrame};
use crate::error::ApiError;
use crate::http::{error_message, ApiRequest, HttpClient};
use crate::models::{null_as_default, RagSource};

const EVENT_STREAM: &str = "text/event-stream";
const CHANNEL_CAPACITY: usize = 64;

/// Lifecycle of a streaming subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    Closed,
    Errored,
}

impl StreamState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Errored => "errored",
        }
    }

    /// Closed and errored subscriptions never change state again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An incremental piece of an assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Passages retrieved for the question, sent before any content.
    Sources(Vec<RagSource>),
    /// The next fragment of the reply text.
    Content(String),
    Done,
    Error(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireEvent {
    Sources {
        #[serde(default, deserialize_with = "null_as_default")]
        sources: Vec<RagSource>,
    },
    Content {
        #[serde(default)]
        content: String,
    },
    Done,
    Error {
        #[serde(default)]
        error: String,
    },
}

impl From<WireEvent> for StreamEvent {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::Sources { sources } => Self::Sources(sources),
            WireEvent::Content { content } => Self::Content(content),
            WireEvent::Done => Self::Done,
            WireEvent::Error { error } => Self::Error(error),
        }
    }
}

/// Move to `next` if the transition is legal. Returns whether it happened.
fn advance(state: &watch::Sender<StreamState>, next: StreamState) -> bool {
    state.send_if_modified(|current| {
        let allowed = match (*current, next) {
            (StreamState::Connecting, StreamState::Open) => true,
            (from, to) => !from.is_terminal() && to.is_terminal(),
        };
        if allowed {
            *current = next;
        }
        allowed
    })
}

/// A live streaming reply.
///
/// Yields events through [`next_event`](Self::next_event) or the
/// [`Stream`] impl. After `Done` the state is `Closed`; after an `Error`
/// event it is `Errored`. Either way the event sequence then ends.
pub struct ChatStream {
    events: ReceiverStream<StreamEvent>,
    state: Arc<watch::Sender<StreamState>>,
    task: Option<JoinHandle<()>>,
}

impl ChatStream {
    /// Ask `question` in a session and stream the reply.
    ///
    /// The stored access token is sent in the query string. Must be called
    /// from within a Tokio runtime.
    pub fn open(client: &Arc<HttpClient>, session_id: &str, question: &str) -> Self {
        let token = client.access_token();
        Self::from_request(
            client,
            chat::stream_message(session_id, question, token.as_deref()),
        )
    }

    pub fn from_request(client: &Arc<HttpClient>, request: ApiRequest) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (state, _) = watch::channel(StreamState::Connecting);
        let state = Arc::new(state);

        let pump = Pump {
            client: Arc::clone(client),
            events: tx,
            state: Arc::clone(&state),
        };
        let task = tokio::spawn(pump.run(request));

        Self {
            events: ReceiverStream::new(rx),
            state,
            task: Some(task),
        }
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Next event, or `None` once the stream has ended or been closed.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.next().await
    }

    /// Stop reading and release the connection. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if advance(&self.state, StreamState::Closed) {
                debug!("stream closed by client");
            }
        }
        self.events.close();
    }
}

impl Stream for ChatStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Background half of a subscription.
struct Pump {
    client: Arc<HttpClient>,
    events: mpsc::Sender<StreamEvent>,
    state: Arc<watch::Sender<StreamState>>,
}

impl Pump {
    async fn run(self, request: ApiRequest) {
        debug!(path = %request.path, "opening stream");
        let sent = self
            .client
            .stream_request(&request)
            .header(ACCEPT, EVENT_STREAM)
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let error = self.client.reject(ApiError::Network(e.to_string()));
                return self.fail(error.to_string()).await;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            let error = self.client.reject(ApiError::from_status(status, message));
            return self.fail(error.to_string()).await;
        }
        if !advance(&self.state, StreamState::Open) {
            return;
        }

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let error = self.client.reject(ApiError::Network(e.to_string()));
                    return self.fail(error.to_string()).await;
                }
            };
            let frames = match decoder.feed(&bytes) {
                Ok(frames) => frames,
                Err(e) => return self.fail(e.to_string()).await,
            };
            for frame in frames {
                if self.dispatch(frame).await.is_break() {
                    return;
                }
            }
        }
        if let Some(frame) = decoder.finish() {
            if self.dispatch(frame).await.is_break() {
                return;
            }
        }
        self.fail("stream ended before completion".to_string()).await;
    }

    async fn dispatch(&self, frame: SseFrame) -> ControlFlow<()> {
        let event = match serde_json::from_str::<WireEvent>(&frame.data) {
            Ok(event) => StreamEvent::from(event),
            Err(e) => {
                self.fail(format!("malformed stream event: {e}")).await;
                return ControlFlow::Break(());
            }
        };

        match event {
            StreamEvent::Done => {
                if advance(&self.state, StreamState::Closed) {
                    debug!("stream completed");
                    let _ = self.events.send(StreamEvent::Done).await;
                }
                ControlFlow::Break(())
            }
            StreamEvent::Error(message) => {
                self.fail(message).await;
                ControlFlow::Break(())
            }
            event => {
                if self.events.send(event).await.is_err() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
        }
    }

    /// Deliver exactly one error event, unless already finished.
    async fn fail(&self, message: String) {
        if advance(&self.state, StreamState::Errored) {
            warn!(error = %message, "stream failed");
            let _ = self.events.send(StreamEvent::Error(message)).await;
        }
    }
}
