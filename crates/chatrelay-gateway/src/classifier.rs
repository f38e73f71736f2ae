// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend event classification and dispatch.
//!
//! Each [`StreamEvent`] maps to exactly one action:
//!
//! - `token`: emit an `append` frame (`replace` when flagged `is_first`).
//! - `message`: persist the final text and mirror it to the chat platform.
//! - `error`: emit a terminal `done` frame with the error message, then
//!   persist and mirror it like a final answer.
//! - anything else: logged and ignored.
//!
//! Decode failures are logged and the event dropped; the stream continues.

use serde::Deserialize;
use serde_json::Value;

use chatrelay_core::types::{EventKind, OutgoingMessage};
use chatrelay_core::{ChatPlatform, PendingRequest, SseKind, StreamEvent, TranscriptStore};

use crate::sse::SseWriter;
use crate::transcript::sync_transcript;

/// Collaborators and correlation fields for one stream.
pub struct RelayContext<'a> {
    pub platform: &'a dyn ChatPlatform,
    pub transcript: &'a dyn TranscriptStore,
    pub request: &'a PendingRequest,
}

/// What a single dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A text fragment went out to the client.
    Streamed { text: String, replace: bool },
    /// The answer was persisted and mirrored.
    Finalized,
    /// Dropped: unknown kind or undecodable content.
    Ignored,
    /// The client disconnected during the write.
    ClientGone,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Wrapped { error: ErrorDetail },
    Bare(ErrorDetail),
}

impl ErrorBody {
    fn into_message(self) -> String {
        match self {
            Self::Wrapped { error } | Self::Bare(error) => error.message,
        }
    }
}

/// Extract the message from a backend error text.
///
/// Accepts plain JSON as well as the `Error code: NNN - {...}` form whose
/// payload is a Python dict literal (single quotes, `None`).
pub fn parse_error_content(text: &str) -> Result<String, serde_json::Error> {
    let body = text
        .find("Error code:")
        .and_then(|start| {
            text[start..]
                .find(" - ")
                .map(|dash| &text[start + dash + 3..])
        })
        .unwrap_or(text);
    let normalized = body.replace('\'', "\"").replace("None", "null");
    serde_json::from_str::<ErrorBody>(&normalized).map(ErrorBody::into_message)
}

/// Drop exactly one trailing newline.
pub fn strip_trailing_newline(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}

/// Route one backend event.
pub async fn dispatch(
    ctx: &RelayContext<'_>,
    event: StreamEvent,
    writer: &mut SseWriter,
) -> Dispatched {
    let send_id = ctx.request.send_id;
    match event.event_kind() {
        Some(EventKind::Token) => {
            let Value::String(content) = &event.content else {
                tracing::warn!(send_id, kind = %event.kind, content = %event.content, "token content is not a string");
                return Dispatched::Ignored;
            };
            let text = strip_trailing_newline(content);
            let kind = if event.is_first {
                SseKind::Replace
            } else {
                SseKind::Append
            };
            if !writer.emit(kind, text).await {
                return Dispatched::ClientGone;
            }
            Dispatched::Streamed {
                text: text.to_string(),
                replace: event.is_first,
            }
        }
        Some(EventKind::Message) => match serde_json::from_value::<MessageBody>(event.content) {
            Ok(body) => {
                finalize(ctx, &body.content).await;
                Dispatched::Finalized
            }
            Err(e) => {
                tracing::warn!(send_id, kind = %event.kind, error = %e, "malformed message content");
                Dispatched::Ignored
            }
        },
        Some(EventKind::Error) => {
            let parsed = match event.content {
                Value::String(text) => parse_error_content(&text),
                other => serde_json::from_value::<ErrorBody>(other).map(ErrorBody::into_message),
            };
            let message = match parsed {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(send_id, kind = %event.kind, error = %e, "unparseable error content");
                    return Dispatched::Ignored;
                }
            };
            if !writer.emit(SseKind::Done, &message).await {
                return Dispatched::ClientGone;
            }
            finalize(ctx, &message).await;
            Dispatched::Finalized
        }
        None => {
            tracing::warn!(send_id, kind = %event.kind, "unknown backend event kind");
            Dispatched::Ignored
        }
    }
}

/// Persist `text` as the final answer and mirror it onto the placeholder.
pub async fn finalize(ctx: &RelayContext<'_>, text: &str) {
    let request = ctx.request;
    sync_transcript(ctx.transcript, request.send_id, text).await;

    let update = OutgoingMessage::update(request.dialog_id, request.send_id, text);
    if let Err(e) = ctx.platform.send_message(&request.bot_token, update).await {
        tracing::error!(
            send_id = request.send_id,
            dialog_id = request.dialog_id,
            error = %e,
            "failed to update placeholder message"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn python_style_error_is_normalized() {
        let text = "Error code: 429 - {'message': 'rate limited', 'type': None}";
        assert_eq!(parse_error_content(text).unwrap(), "rate limited");
    }

    #[test]
    fn wrapped_error_object_parses() {
        let text = r#"{"error": {"message": "quota exceeded", "code": 402}}"#;
        assert_eq!(parse_error_content(text).unwrap(), "quota exceeded");

        let text = "Error code: 400 - {'error': {'message': 'bad model', 'type': 'invalid_request_error'}}";
        assert_eq!(parse_error_content(text).unwrap(), "bad model");
    }

    #[test]
    fn free_text_error_is_rejected() {
        assert!(parse_error_content("connection reset by peer").is_err());
        assert!(parse_error_content("Error code: 500").is_err());
    }

    #[test]
    fn only_one_trailing_newline_is_stripped() {
        assert_eq!(strip_trailing_newline("hello\n"), "hello");
        assert_eq!(strip_trailing_newline("hello\n\n"), "hello\n");
        assert_eq!(strip_trailing_newline("a\nb"), "a\nb");
        assert_eq!(strip_trailing_newline(""), "");
    }

    proptest! {
        #[test]
        fn stripping_removes_exactly_the_appended_newline(s in "[^\n]*") {
            let with_newline = format!("{s}\n");
            prop_assert_eq!(strip_trailing_newline(&with_newline), s.as_str());
            prop_assert_eq!(strip_trailing_newline(&s), s.as_str());
        }
    }
}
