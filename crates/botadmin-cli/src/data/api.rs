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

use crate::model::{HistoryEntry, Record};
use botadmin::prelude::*;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

pub use reply_stream::ReplyStream;
#[cfg(test)]
pub(crate) use reply_stream::chunked_reply;

mod reply_stream;

/// Failure of a backend call.
///
/// `Failure` is the application-level case: HTTP 200 with a non-zero
/// envelope code; the flows surface its server-provided message as-is.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message} (code {code})")]
    Failure { code: i64, message: String },
    #[error("unexpected status code: {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

/// Response envelope shared by the management endpoints.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub list: Vec<Record>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Default, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    list: Vec<HistoryEntry>,
}

#[cfg_attr(test, mockall::automock)]
pub trait BotApi {
    /// Fetch one page of stored records. An empty `user_id` means no filter.
    fn list_records(
        &self,
        bot_id: &str,
        page: u64,
        page_size: u64,
        user_id: &str,
    ) -> Result<RecordPage, ApiError>;

    /// Submit a raw JSON batch document; the server validates the shape.
    fn insert_records(&self, bot_id: &str, raw_records: &str) -> Result<(), ApiError>;

    /// Fetch one page of chat history, newest-first. Empty list means exhausted.
    fn list_chat_history(&self, bot_id: &str, page: u64) -> Result<Vec<HistoryEntry>, ApiError>;

    /// Open a streaming completion. Fails before any chunk on a non-2xx status.
    fn communicate(&self, bot_id: &str, prompt: &str) -> Result<ReplyStream, ApiError>;
}

pub trait GetBotApi {
    type Api: BotApi;

    fn get_bot_api(&self) -> &Self::Api;
}

pub struct HttpBotApi {
    base_url: String,
    client: Client,
}

impl HttpBotApi {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Fallible<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
        })
    }

    fn parse_envelope<T>(response: reqwest::blocking::Response) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
    {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let envelope = response.json::<ApiEnvelope<T>>()?;
        if envelope.code != 0 {
            return Err(ApiError::Failure {
                code: envelope.code,
                message: envelope
                    .message
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| "request failed".to_owned()),
            });
        }

        Ok(envelope.data.unwrap_or_default())
    }
}

impl BotApi for HttpBotApi {
    fn list_records(
        &self,
        bot_id: &str,
        page: u64,
        page_size: u64,
        user_id: &str,
    ) -> Result<RecordPage, ApiError> {
        debug!(bot_id, page, page_size, "list records");

        let mut query = vec![
            ("id", bot_id.to_owned()),
            ("page", page.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        let user_id = user_id.trim();
        if !user_id.is_empty() {
            query.push(("userId", user_id.to_owned()));
        }

        let response = self
            .client
            .get(format!("{}/bot/record/list", self.base_url))
            .query(&query)
            .send()?;

        Self::parse_envelope::<RecordPage>(response)
    }

    fn insert_records(&self, bot_id: &str, raw_records: &str) -> Result<(), ApiError> {
        debug!(bot_id, len = raw_records.len(), "insert records");

        let response = self
            .client
            .post(format!("{}/bot/user/insert/records", self.base_url))
            .query(&[("id", bot_id)])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(raw_records.to_owned())
            .send()?;

        Self::parse_envelope::<serde_json::Value>(response)?;

        Ok(())
    }

    fn list_chat_history(&self, bot_id: &str, page: u64) -> Result<Vec<HistoryEntry>, ApiError> {
        debug!(bot_id, page, "list chat history");

        let response = self
            .client
            .get(format!("{}/bot/admin/chat", self.base_url))
            .query(&[("id", bot_id.to_owned()), ("page", page.to_string())])
            .send()?;

        Ok(Self::parse_envelope::<HistoryPage>(response)?.list)
    }

    fn communicate(&self, bot_id: &str, prompt: &str) -> Result<ReplyStream, ApiError> {
        debug!(bot_id, "communicate");

        let response = self
            .client
            .post(format!("{}/bot/communicate", self.base_url))
            .query(&[("id", bot_id), ("prompt", prompt)])
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        Ok(ReplyStream::new(Box::new(response)))
    }
}
