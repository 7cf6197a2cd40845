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

use crate::data::api::{ApiError, BotApi, GetBotApi};
use crate::model::{ChatMessage, Toast};
use botadmin::prelude::*;

mod transcript_view;

pub use transcript_view::run_chat;

/// Transcript of the chat tester for one selected bot.
///
/// Older turns are pulled in on demand (history cursor grows, pairs are
/// prepended), live turns are appended; the whole session is rebuilt when
/// the bot changes. The `loading` flag serializes the history fetch and
/// the send flow, against themselves and against each other.
pub struct ChatSession {
    bot_id: Option<String>,
    messages: Vec<ChatMessage>,
    history_page: u64,
    has_more_history: bool,
    loading: bool,
    toast: Option<Toast>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            bot_id: None,
            messages: Vec::new(),
            history_page: 1,
            has_more_history: true,
            loading: false,
            toast: None,
        }
    }

    /// Switch to another bot: drop the transcript, reset the history
    /// cursor and pull the first history page.
    pub fn select_bot<C: GetBotApi>(&mut self, context: &C, bot_id: impl Into<String>) {
        self.bot_id = Some(bot_id.into());
        self.messages.clear();
        self.history_page = 1;
        self.has_more_history = true;
        self.fetch_older_history(context);
    }

    /// Pull the history page at the current cursor and prepend it.
    ///
    /// No-op while a fetch or send is in flight, or once the history is
    /// exhausted. Returns the number of prepended messages so the view
    /// can keep the previously-topmost content at the same offset.
    pub fn fetch_older_history<C: GetBotApi>(&mut self, context: &C) -> Option<usize> {
        if self.loading || !self.has_more_history {
            return None;
        }
        let Some(bot_id) = self.bot_id.clone() else {
            return None;
        };

        self.loading = true;
        let ret = context.get_bot_api().list_chat_history(&bot_id, self.history_page);
        self.loading = false;

        match ret {
            Ok(history) => {
                if history.is_empty() {
                    self.has_more_history = false;
                    return None;
                }

                // newest-first from the backend; reverse so the batch
                // reads chronologically, then expand to question/answer
                // turns in front of everything already shown.
                let mut turns = Vec::with_capacity(history.len() * 2);
                for entry in history.into_iter().rev() {
                    turns.push(ChatMessage::user(entry.question));
                    turns.push(ChatMessage::assistant(entry.answer));
                }

                let prepended = turns.len();
                turns.append(&mut self.messages);
                self.messages = turns;
                Some(prepended)
            }
            Err(ApiError::Failure { message, .. }) => {
                self.toast = Some(Toast::error(if message.is_empty() {
                    "Failed to fetch chat record".to_owned()
                } else {
                    message
                }));
                None
            }
            Err(e) => {
                warn!(%e, "fetch chat history");
                self.has_more_history = false;
                self.toast = Some(Toast::error("Error fetching chat history!"));
                None
            }
        }
    }

    /// The transcript viewport hit offset zero: advance the cursor and
    /// backfill, unless busy or exhausted.
    pub fn on_scroll_to_top<C: GetBotApi>(&mut self, context: &C) -> Option<usize> {
        if self.bot_id.is_none() || self.loading || !self.has_more_history {
            return None;
        }

        self.history_page += 1;
        self.fetch_older_history(context)
    }

    /// Send a prompt and stream the reply into the transcript.
    ///
    /// The user turn is appended before the request goes out; the
    /// assistant placeholder only once the stream has an OK status. Each
    /// decoded chunk grows the placeholder and `render` runs so partial
    /// replies are visible immediately. Failures append a system turn
    /// and toast; the caller scrolls to the bottom either way.
    pub fn send_prompt<C, F>(&mut self, context: &C, input: &str, mut render: F)
    where
        C: GetBotApi,
        F: FnMut(&ChatSession),
    {
        let prompt = input.trim();
        if prompt.is_empty() || self.loading {
            return;
        }
        let Some(bot_id) = self.bot_id.clone() else {
            return;
        };

        self.loading = true;
        self.messages.push(ChatMessage::user(prompt));
        render(self);

        if let Err(e) = self.stream_reply(context, &bot_id, prompt, &mut render) {
            warn!(%e, "communicate");
            self.messages
                .push(ChatMessage::system("Error: Could not get a response."));
            self.toast = Some(Toast::error("Failed to get bot response."));
        }

        self.loading = false;
        render(self);
    }

    fn stream_reply<C: GetBotApi>(
        &mut self,
        context: &C,
        bot_id: &str,
        prompt: &str,
        render: &mut dyn FnMut(&ChatSession),
    ) -> Fallible<()> {
        let stream = context.get_bot_api().communicate(bot_id, prompt)?;

        self.messages.push(ChatMessage::assistant(""));
        render(self);

        for chunk in stream {
            let chunk = chunk?;
            if let Some(reply) = self.messages.last_mut() {
                reply.content.push_str(&chunk);
            }
            render(self);
        }

        Ok(())
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    pub fn bot_id(&self) -> Option<&str> {
        self.bot_id.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn history_page(&self) -> u64 {
        self.history_page
    }

    pub fn has_more_history(&self) -> bool {
        self.has_more_history
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    /// Record the outcome of a copy-to-clipboard attempt.
    pub fn notify_copy(&mut self, copied: bool) {
        self.toast = Some(if copied {
            Toast::success("Copied to clipboard!")
        } else {
            Toast::error("Failed to copy!")
        });
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::api::{MockBotApi, chunked_reply};
    use crate::model::{HistoryEntry, MessageRole, ToastKind};
    use reqwest::StatusCode;

    struct MockContext {
        api: MockBotApi,
    }

    impl GetBotApi for MockContext {
        type Api = MockBotApi;

        fn get_bot_api(&self) -> &Self::Api {
            &self.api
        }
    }

    fn entry(question: &str, answer: &str) -> HistoryEntry {
        HistoryEntry {
            question: question.to_owned(),
            answer: answer.to_owned(),
        }
    }

    fn contents(session: &ChatSession) -> Vec<(&MessageRole, &str)> {
        session
            .messages()
            .iter()
            .map(|message| (&message.role, message.content.as_str()))
            .collect()
    }

    #[test]
    fn select_bot_pulls_first_history_page() {
        let mut api = MockBotApi::new();
        api.expect_list_chat_history()
            .withf(|bot_id, page| bot_id == "42" && *page == 1)
            .times(1)
            .returning(|_, _| Ok(vec![entry("newest q", "newest a"), entry("older q", "older a")]));
        let context = MockContext { api };

        let mut session = ChatSession::new();
        session.select_bot(&context, "42");

        // newest-first payload becomes a chronological transcript.
        assert_eq!(
            contents(&session),
            vec![
                (&MessageRole::User, "older q"),
                (&MessageRole::Assistant, "older a"),
                (&MessageRole::User, "newest q"),
                (&MessageRole::Assistant, "newest a"),
            ],
        );
        assert_eq!(session.history_page(), 1);
        assert!(session.has_more_history());
    }

    #[test]
    fn empty_history_page_marks_exhaustion() {
        let mut api = MockBotApi::new();
        api.expect_list_chat_history()
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let context = MockContext { api };

        let mut session = ChatSession::new();
        session.select_bot(&context, "42");

        assert!(!session.has_more_history());
        assert!(session.messages().is_empty());

        // exhausted: a later scroll-to-top issues no request at all.
        assert_eq!(session.on_scroll_to_top(&context), None);
        assert_eq!(session.history_page(), 1);
    }

    #[test]
    fn scroll_to_top_prepends_older_pairs() {
        let mut api = MockBotApi::new();
        api.expect_list_chat_history()
            .withf(|_, page| *page == 1)
            .times(1)
            .returning(|_, _| Ok(vec![entry("q2", "a2")]));
        api.expect_list_chat_history()
            .withf(|_, page| *page == 2)
            .times(1)
            .returning(|_, _| Ok(vec![entry("q1", "a1"), entry("q0", "a0")]));
        let context = MockContext { api };

        let mut session = ChatSession::new();
        session.select_bot(&context, "42");
        let prepended = session.on_scroll_to_top(&context);

        // one batch of N history items expands to exactly 2N turns.
        assert_eq!(prepended, Some(4));
        assert_eq!(session.history_page(), 2);
        assert_eq!(
            contents(&session),
            vec![
                (&MessageRole::User, "q0"),
                (&MessageRole::Assistant, "a0"),
                (&MessageRole::User, "q1"),
                (&MessageRole::Assistant, "a1"),
                (&MessageRole::User, "q2"),
                (&MessageRole::Assistant, "a2"),
            ],
        );
    }

    #[test]
    fn history_cursor_resets_only_on_bot_change() {
        let mut api = MockBotApi::new();
        api.expect_list_chat_history()
            .times(3)
            .returning(|_, _| Ok(vec![entry("q", "a")]));
        api.expect_list_chat_history()
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let context = MockContext { api };

        let mut session = ChatSession::new();
        session.select_bot(&context, "42");
        session.on_scroll_to_top(&context);
        assert_eq!(session.history_page(), 2);

        session.select_bot(&context, "7");
        assert_eq!(session.history_page(), 1);
        assert_eq!(session.messages().len(), 2);

        session.on_scroll_to_top(&context);
        assert!(!session.has_more_history());
    }

    #[test]
    fn history_application_failure_toasts_and_keeps_cursor_state() {
        let mut api = MockBotApi::new();
        api.expect_list_chat_history().times(1).returning(|_, _| {
            Err(ApiError::Failure {
                code: 3,
                message: "bot not found".to_owned(),
            })
        });
        let context = MockContext { api };

        let mut session = ChatSession::new();
        session.select_bot(&context, "42");

        assert_eq!(session.toast().unwrap().message, "bot not found");
        // retriable: the history is not marked exhausted.
        assert!(session.has_more_history());
    }

    #[test]
    fn history_transport_failure_marks_exhaustion() {
        let mut api = MockBotApi::new();
        api.expect_list_chat_history()
            .times(1)
            .returning(|_, _| Err(ApiError::Status(StatusCode::BAD_GATEWAY)));
        let context = MockContext { api };

        let mut session = ChatSession::new();
        session.select_bot(&context, "42");

        assert!(!session.has_more_history());
        assert_eq!(session.toast().unwrap().message, "Error fetching chat history!");
    }

    #[test]
    fn send_prompt_streams_reply_progressively() {
        let mut api = MockBotApi::new();
        api.expect_list_chat_history()
            .times(1)
            .returning(|_, _| Ok(vec![]));
        api.expect_communicate()
            .withf(|bot_id, prompt| bot_id == "42" && prompt == "hi")
            .times(1)
            .returning(|_, _| Ok(chunked_reply(&["Hel", "lo"])));
        let context = MockContext { api };

        let mut session = ChatSession::new();
        session.select_bot(&context, "42");

        let mut partials = Vec::new();
        session.send_prompt(&context, "hi", |session| {
            partials.push(
                session
                    .messages()
                    .last()
                    .map(|message| message.content.clone())
                    .unwrap_or_default(),
            );
        });

        assert_eq!(
            contents(&session),
            vec![(&MessageRole::User, "hi"), (&MessageRole::Assistant, "Hello")],
        );
        // partial reply was visible before the stream finished.
        assert!(partials.contains(&"Hel".to_owned()));
        assert!(!session.is_loading());
        assert!(session.toast().is_none());
    }

    #[test]
    fn send_prompt_ignores_blank_input() {
        let api = MockBotApi::new();
        let context = MockContext { api };

        let mut session = ChatSession::new();
        session.bot_id = Some("42".to_owned());
        session.send_prompt(&context, "   \n", |_| {});

        assert!(session.messages().is_empty());
    }

    #[test]
    fn send_prompt_failure_appends_system_turn() {
        let mut api = MockBotApi::new();
        api.expect_list_chat_history()
            .times(1)
            .returning(|_, _| Ok(vec![]));
        api.expect_communicate()
            .times(1)
            .returning(|_, _| Err(ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        let context = MockContext { api };

        let mut session = ChatSession::new();
        session.select_bot(&context, "42");
        session.send_prompt(&context, "hi", |_| {});

        // no placeholder on a pre-stream failure; user turn plus the error.
        assert_eq!(
            contents(&session),
            vec![
                (&MessageRole::User, "hi"),
                (&MessageRole::System, "Error: Could not get a response."),
            ],
        );
        let toast = session.toast().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.message, "Failed to get bot response.");
    }

    #[test]
    fn send_prompt_trims_input() {
        let mut api = MockBotApi::new();
        api.expect_list_chat_history()
            .times(1)
            .returning(|_, _| Ok(vec![]));
        api.expect_communicate()
            .withf(|_, prompt| prompt == "hi")
            .times(1)
            .returning(|_, _| Ok(chunked_reply(&["ok"])));
        let context = MockContext { api };

        let mut session = ChatSession::new();
        session.select_bot(&context, "42");
        session.send_prompt(&context, "  hi  ", |_| {});

        assert_eq!(session.messages()[0].content, "hi");
    }

    #[test]
    fn notify_copy_toasts_outcome() {
        let mut session = ChatSession::new();

        session.notify_copy(true);
        assert_eq!(session.toast().unwrap().kind, ToastKind::Success);
        assert_eq!(session.toast().unwrap().message, "Copied to clipboard!");

        session.notify_copy(false);
        assert_eq!(session.toast().unwrap().kind, ToastKind::Error);
        assert_eq!(session.toast().unwrap().message, "Failed to copy!");
    }
}
