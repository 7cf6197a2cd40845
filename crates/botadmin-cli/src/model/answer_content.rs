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

/// How an answer/content payload should be presented.
///
/// Dispatches on a data-URI MIME prefix; anything else that is not blank
/// is rich text for the markdown renderer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnswerContent<'a> {
    Empty,
    Video(&'a str),
    Audio(&'a str),
    Image(&'a str),
    Markdown(&'a str),
}

impl<'a> AnswerContent<'a> {
    pub fn classify(value: &'a str) -> Self {
        if value.trim().is_empty() {
            return AnswerContent::Empty;
        }

        if value.starts_with("data:video/") {
            AnswerContent::Video(value)
        } else if value.starts_with("data:audio/") {
            AnswerContent::Audio(value)
        } else if value.starts_with("data:image/") {
            AnswerContent::Image(value)
        } else {
            AnswerContent::Markdown(value)
        }
    }

    /// Terminal stand-in for a media payload, e.g. `[video/mp4, 12.3 KiB]`.
    pub fn media_label(&self) -> Option<String> {
        let (uri, len) = match self {
            AnswerContent::Video(data) | AnswerContent::Audio(data) | AnswerContent::Image(data) => {
                (*data, data.len())
            }
            AnswerContent::Empty | AnswerContent::Markdown(_) => return None,
        };

        let mime = uri["data:".len()..]
            .split([';', ','])
            .next()
            .unwrap_or("application/octet-stream");

        Some(format!("[{mime}, {}]", format_payload_size(len)))
    }
}

fn format_payload_size(len: usize) -> String {
    if len < 1024 {
        format!("{len} B")
    } else {
        format!("{:.1} KiB", len as f64 / 1024.0)
    }
}
