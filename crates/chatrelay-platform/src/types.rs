// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire shapes of the chat platform's REST API.

use chatrelay_core::types::{BotSpec, OutgoingMessage, TextType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every platform response: `ret == 1` is success, anything else an error
/// described by `msg`.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub ret: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Value,
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[derive(Debug, Serialize)]
pub struct SendTextBody<'a> {
    pub dialog_id: i64,
    pub text: &'a str,
    pub text_type: TextType,
    pub silence: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_check: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mark: Option<&'static str>,
}

impl<'a> From<&'a OutgoingMessage> for SendTextBody<'a> {
    fn from(msg: &'a OutgoingMessage) -> Self {
        Self {
            dialog_id: msg.dialog_id,
            text: &msg.text,
            text_type: msg.text_type,
            silence: yes_no(msg.silence),
            reply_id: msg.reply_id,
            reply_check: msg.reply_id.map(|_| yes_no(msg.reply_check)),
            update_id: msg.update_id,
            update_mark: msg.update_id.map(|_| yes_no(msg.update_mark)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendStreamBody<'a> {
    pub userid: i64,
    pub stream_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct BotBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: &'a str,
    pub webhook_url: &'a str,
    pub session: u8,
}

impl<'a> BotBody<'a> {
    pub fn new(id: Option<i64>, spec: &'a BotSpec) -> Self {
        Self {
            id,
            name: &spec.name,
            webhook_url: &spec.webhook_url,
            session: u8::from(spec.session),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteBotBody<'a> {
    pub id: i64,
    pub remark: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_body_carries_reply_check() {
        let msg = OutgoingMessage::placeholder(5, "...", 77);
        let body = serde_json::to_value(SendTextBody::from(&msg)).unwrap();
        assert_eq!(body["text_type"], "md");
        assert_eq!(body["silence"], "yes");
        assert_eq!(body["reply_id"], 77);
        assert_eq!(body["reply_check"], "yes");
        assert!(body.get("update_id").is_none());
    }

    #[test]
    fn update_body_is_unmarked() {
        let msg = OutgoingMessage::update(5, 900, "Hello");
        let body = serde_json::to_value(SendTextBody::from(&msg)).unwrap();
        assert_eq!(body["update_id"], 900);
        assert_eq!(body["update_mark"], "no");
        assert!(body.get("reply_id").is_none());
    }
}
