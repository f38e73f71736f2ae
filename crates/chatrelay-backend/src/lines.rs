// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splits a streamed response body into lines.

use futures::TryStreamExt;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tokio_util::io::StreamReader;

use chatrelay_core::{LineStream, RelayError};

/// Longest accepted line. A backend sending more without a newline is broken.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Lines of `response`'s body in arrival order, `\r\n` or `\n` terminated.
/// A final unterminated line is still yielded.
///
/// Lines are split on raw bytes and decoded lossily, so invalid UTF-8 only
/// spoils the line carrying it.
pub fn body_lines(response: reqwest::Response) -> LineStream {
    let bytes = response.bytes_stream().map_err(std::io::Error::other);
    let lines = FramedRead::new(
        StreamReader::new(bytes),
        AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), MAX_LINE_BYTES),
    );
    Box::pin(
        lines
            .map_ok(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
                String::from_utf8_lossy(line).into_owned()
            })
            .map_err(|e| RelayError::Backend {
                message: format!("failed to read backend stream: {e}"),
                source: Some(Box::new(e)),
            }),
    )
}
