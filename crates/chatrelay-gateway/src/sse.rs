// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events framing for the stream endpoint.
//!
//! Every frame has the shape
//! ```text
//! id: <send id>
//! event: append | replace | done
//! data: {"content": "<json-escaped text>"}
//! ```
//! Resolution failures carry `{"error": "<reason>"}` instead of `content`.
//!
//! The relay task writes [`SseFrame`]s into a bounded channel and the HTTP
//! response drains it, so a slow client slows the relay down instead of
//! growing a buffer.

use std::convert::Infallible;

use axum::http::header;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::Stream;
use tokio::sync::mpsc;

use chatrelay_core::SseKind;

/// Frames buffered between the relay task and the client connection.
pub const FRAME_BUFFER: usize = 32;

/// One SSE event as written to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub id: i64,
    pub kind: SseKind,
    pub data: String,
}

impl SseFrame {
    /// Frame with `{"content": text}` data.
    pub fn content(id: i64, kind: SseKind, text: &str) -> Self {
        Self {
            id,
            kind,
            data: format!("{{\"content\": {}}}", json_string(text)),
        }
    }

    /// Terminal frame with `{"error": reason}` data.
    pub fn error(id: i64, reason: &str) -> Self {
        Self {
            id,
            kind: SseKind::Done,
            data: format!("{{\"error\": {}}}", json_string(reason)),
        }
    }

    /// The `content` (or `error`) string carried by this frame.
    pub fn text(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.data).ok()?;
        value
            .get("content")
            .or_else(|| value.get("error"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    /// Wire encoding, identical to what axum writes for [`SseFrame::into_event`].
    pub fn encode(&self) -> String {
        format!("id: {}\nevent: {}\ndata: {}\n\n", self.id, self.kind, self.data)
    }

    pub fn into_event(self) -> Event {
        Event::default()
            .id(self.id.to_string())
            .event(self.kind.to_string())
            .data(self.data)
    }
}

fn json_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// Write half held by the relay task.
///
/// Each write reports whether the client is still there; `false` means the
/// stream is over and the caller should stop.
#[derive(Debug)]
pub struct SseWriter {
    tx: mpsc::Sender<SseFrame>,
    send_id: i64,
    done_sent: bool,
}

impl SseWriter {
    pub fn new(tx: mpsc::Sender<SseFrame>) -> Self {
        Self {
            tx,
            send_id: 0,
            done_sent: false,
        }
    }

    /// Id stamped on subsequent frames. Zero until the session record decodes.
    pub fn set_send_id(&mut self, send_id: i64) {
        self.send_id = send_id;
    }

    pub fn send_id(&self) -> i64 {
        self.send_id
    }

    /// Whether a `done` frame has been written.
    pub fn done_sent(&self) -> bool {
        self.done_sent
    }

    pub async fn emit(&mut self, kind: SseKind, text: &str) -> bool {
        self.write(SseFrame::content(self.send_id, kind, text)).await
    }

    /// Terminate with an inline error.
    pub async fn fail(&mut self, reason: &str) -> bool {
        self.write(SseFrame::error(self.send_id, reason)).await
    }

    async fn write(&mut self, frame: SseFrame) -> bool {
        let is_done = frame.kind == SseKind::Done;
        if self.tx.send(frame).await.is_err() {
            return false;
        }
        self.done_sent |= is_done;
        true
    }

    /// Resolves once the client side has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Turn the read half into the streaming HTTP response.
pub fn sse_response(rx: mpsc::Receiver<SseFrame>) -> Response {
    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
    ];
    (headers, Sse::new(frame_stream(rx))).into_response()
}

fn frame_stream(rx: mpsc::Receiver<SseFrame>) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(rx, |mut rx| async move {
        let frame = rx.recv().await?;
        Some((Ok(frame.into_event()), rx))
    })
}
