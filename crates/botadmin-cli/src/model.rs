/*
 * Copyright 2026 sukawasatoru
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

pub use crate::model::answer_content::AnswerContent;
use serde::{Deserialize, Serialize};

mod answer_content;

#[derive(Default, Deserialize, Serialize)]
pub struct Settings {
    pub base_url: Option<String>,
    pub default_bot: Option<String>,
    pub page_size: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

/// One stored question/answer interaction of a bot.
///
/// The server owns the authoritative copy; a fetched page is replaced
/// wholesale on every reload. `update_time == 0` means never updated.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub token: i64,
    #[serde(default)]
    pub is_deleted: i64,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub update_time: i64,
}

/// One question/answer pair of the chat history endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::System => "system:",
            MessageRole::User => "user:",
            MessageRole::Assistant => "assistant:",
        }
    }
}

/// One turn of a chat session transcript.
///
/// The content of the newest assistant turn grows while its reply
/// streams; every other turn is immutable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ToastKind {
    Error,
    Success,
}

/// At most one pending notification; the next one overwrites it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
        }
    }
}
