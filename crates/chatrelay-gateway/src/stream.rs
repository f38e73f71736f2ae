// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream relay: the second half of the two-phase handoff.
//!
//! The platform opens `GET /service/stream/{token}`. The response is always a
//! 200 event stream; resolution failures end it with a single `done` frame
//! carrying `{"error": ...}`. Once resolved, the backend's line stream is fed
//! through the classifier in order, and the relay writes the closing `done`.

use axum::{
    extract::{Path, State},
    response::Response,
};
use futures::StreamExt;
use tokio::sync::mpsc;

use chatrelay_core::types::GenerationRequest;
use chatrelay_core::{BackendLine, LineStream, PendingRequest, SseKind};

use crate::classifier::{Dispatched, RelayContext, dispatch, finalize};
use crate::server::GatewayState;
use crate::sse::{FRAME_BUFFER, SseWriter, sse_response};
use crate::webhook::{AGENT_DISABLED, AGENT_MISSING};

pub const STREAM_MISSING: &str = "stream does not exist";
pub const STREAM_ERROR: &str = "stream error";
pub const MODEL_MISSING: &str = "model does not exist";
pub const MODEL_DISABLED: &str = "model not enabled";
pub const BACKEND_FAILED: &str = "backend request failed";

/// GET /service/stream/{token}
pub async fn get_stream(State(state): State<GatewayState>, Path(token): Path<String>) -> Response {
    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    tokio::spawn(relay(state, token, SseWriter::new(tx)));
    sse_response(rx)
}

/// Drive one stream from token lookup to the closing frame.
pub async fn relay(state: GatewayState, token: String, mut writer: SseWriter) {
    let (request, lines) = match resolve(&state, &token, &mut writer).await {
        Ok(resolved) => resolved,
        Err(reason) => {
            writer.fail(reason).await;
            return;
        }
    };

    let ctx = RelayContext {
        platform: state.platform.as_ref(),
        transcript: state.transcript.as_ref(),
        request: &request,
    };
    let progress = pump(&ctx, lines, &mut writer).await;
    close(&ctx, progress, &mut writer).await;
}

/// Load the session, re-check agent and model, and open the backend stream.
async fn resolve(
    state: &GatewayState,
    token: &str,
    writer: &mut SseWriter,
) -> Result<(PendingRequest, LineStream), &'static str> {
    let raw = match state.sessions.get(&PendingRequest::store_key(token)).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!("unknown or expired session token");
            return Err(STREAM_MISSING);
        }
        Err(e) => {
            tracing::error!(error = %e, "session lookup failed");
            return Err(STREAM_MISSING);
        }
    };

    let request: PendingRequest = serde_json::from_str(&raw).map_err(|e| {
        tracing::warn!(error = %e, "undecodable pending request");
        STREAM_ERROR
    })?;
    writer.set_send_id(request.send_id);
    let send_id = request.send_id;

    let agent = match state.catalog.agent_by_bot(request.bot_uid).await {
        Ok(Some(agent)) => agent,
        Ok(None) => return Err(AGENT_MISSING),
        Err(e) => {
            tracing::error!(send_id, bot_id = request.bot_uid, error = %e, "agent lookup failed");
            return Err(AGENT_MISSING);
        }
    };
    if !agent.is_active {
        return Err(AGENT_DISABLED);
    }

    let Some(model_id) = agent.ai_model_id else {
        return Err(MODEL_MISSING);
    };
    let model = match state.catalog.model_by_id(model_id).await {
        Ok(Some(model)) => model,
        Ok(None) => return Err(MODEL_MISSING),
        Err(e) => {
            tracing::error!(send_id, model_id, error = %e, "model lookup failed");
            return Err(MODEL_MISSING);
        }
    };
    if !model.enabled() {
        return Err(MODEL_DISABLED);
    }

    let generation = GenerationRequest::assemble(
        &request,
        &agent,
        &model,
        state.settings.proxy_url.as_deref(),
    );
    let lines = state.backend.generate(generation).await.map_err(|e| {
        tracing::error!(send_id, model = %model.model_name, error = %e, "backend request failed");
        BACKEND_FAILED
    })?;

    tracing::info!(send_id, model = %model.model_name, "relaying backend stream");
    Ok((request, lines))
}

#[derive(Debug, Default)]
struct RelayProgress {
    /// Text the client has seen so far.
    streamed: String,
    finalized: bool,
    client_gone: bool,
}

async fn pump(ctx: &RelayContext<'_>, mut lines: LineStream, writer: &mut SseWriter) -> RelayProgress {
    let send_id = ctx.request.send_id;
    let mut progress = RelayProgress::default();

    loop {
        let next = tokio::select! {
            next = lines.next() => next,
            _ = writer.closed() => {
                progress.client_gone = true;
                break;
            }
        };

        let raw = match next {
            None => break,
            Some(Ok(raw)) => raw,
            Some(Err(e)) => {
                tracing::warn!(send_id, error = %e, "backend stream read failed");
                break;
            }
        };

        let event = match BackendLine::parse(&raw) {
            BackendLine::Done => break,
            BackendLine::Blank => continue,
            BackendLine::Malformed { line, error } => {
                if line.len() > 1 {
                    tracing::warn!(send_id, %line, %error, "skipping malformed backend line");
                }
                continue;
            }
            BackendLine::Event(event) => event,
        };

        match dispatch(ctx, event, writer).await {
            Dispatched::Streamed { text, replace } => {
                if replace {
                    progress.streamed.clear();
                }
                progress.streamed.push_str(&text);
            }
            Dispatched::Finalized => progress.finalized = true,
            Dispatched::Ignored => {}
            Dispatched::ClientGone => {
                progress.client_gone = true;
                break;
            }
        }
    }

    progress
}

/// Closing write: finalize streamed-only answers, then the `done` frame.
async fn close(ctx: &RelayContext<'_>, progress: RelayProgress, writer: &mut SseWriter) {
    let send_id = ctx.request.send_id;
    if progress.client_gone {
        tracing::debug!(send_id, "client disconnected, backend stream dropped");
        return;
    }

    if !progress.finalized && !progress.streamed.is_empty() {
        finalize(ctx, &progress.streamed).await;
    }
    if !writer.done_sent() && !writer.emit(SseKind::Done, "").await {
        tracing::debug!(send_id, "client gone before closing frame");
    }
}
