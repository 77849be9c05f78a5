use std::{collections::VecDeque, fmt, pin::Pin, time::Duration};

use async_trait::async_trait;
use futures::{stream::BoxStream, Stream, StreamExt};
use reqwest::{header::ACCEPT, Client};
use tracing::debug;

use crate::{
    error::ClientError,
    sse::{SseDecoder, SseFrame, SseItem},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPhase {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for TransportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportPhase::Connecting => "connecting",
            TransportPhase::Open => "open",
            TransportPhase::Closed => "closing",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamParams {
    pub token: String,
    pub refresh_token: String,
    pub users_version: i64,
    pub after_mid: i64,
}

impl StreamParams {
    // Empty and zero values are left out.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(3);
        if !self.token.is_empty() {
            query.push(("api-key", self.token.clone()));
        }
        if self.users_version != 0 {
            query.push(("users_version", self.users_version.to_string()));
        }
        if self.after_mid != 0 {
            query.push(("after_mid", self.after_mid.to_string()));
        }
        query
    }

    pub fn same_credentials(&self, other: &StreamParams) -> bool {
        self.token == other.token && self.refresh_token == other.refresh_token
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Event(String),
    Retry(Duration),
}

pub type EventStream = BoxStream<'static, Result<StreamItem, ClientError>>;

#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn open(&self, params: &StreamParams) -> Result<EventStream, ClientError>;
}

pub struct SseTransport {
    http: Client,
    base_url: String,
}

impl SseTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn events_url(&self) -> String {
        format!("{}/user/events", self.base_url)
    }
}

#[async_trait]
impl EventTransport for SseTransport {
    async fn open(&self, params: &StreamParams) -> Result<EventStream, ClientError> {
        let response = self
            .http
            .get(self.events_url())
            .query(&params.query())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|err| ClientError::transport(TransportPhase::Connecting, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::transport(
                TransportPhase::Connecting,
                format!("server responded {status}"),
            ));
        }

        debug!(%status, "stream: response accepted");
        Ok(decode_sse(response.bytes_stream()))
    }
}

// Only unnamed frames and `event: message` carry chat envelopes.
fn is_message_frame(frame: &SseFrame) -> bool {
    matches!(frame.event.as_deref(), None | Some("message"))
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<StreamItem>,
    finished: bool,
}

/// The end of the body is reported as a `Closed` transport error.
pub fn decode_sse<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((Ok(item), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for item in state.decoder.feed(chunk.as_ref()) {
                        match item {
                            SseItem::Frame(frame) if is_message_frame(&frame) => {
                                state.pending.push_back(StreamItem::Event(frame.data));
                            }
                            SseItem::Frame(frame) => {
                                debug!(event = ?frame.event, "stream: skipping named event");
                            }
                            SseItem::Retry(delay) => {
                                state.pending.push_back(StreamItem::Retry(delay));
                            }
                        }
                    }
                }
                Some(Err(err)) => {
                    state.finished = true;
                    let err = ClientError::transport(TransportPhase::Open, err.to_string());
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    let err = ClientError::transport(
                        TransportPhase::Closed,
                        "server closed the event stream",
                    );
                    return Some((Err(err), state));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
