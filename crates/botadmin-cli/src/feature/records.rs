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
use crate::model::{Record, Toast};
use botadmin::prelude::*;

mod browser_view;

pub use browser_view::run_records;

/// Seed document for the insert dialog.
pub const INSERT_TEMPLATE: &str = r#"{
  "user_id": "",
  "records": [
    {
      "question": "",
      "answer": ""
    }
  ]
}"#;

/// Paginated browser over a bot's stored records.
///
/// Owns the page window, the user-id filter, the insert dialog draft and
/// the toast channel. Fetch failures keep the previous page visible.
pub struct RecordBrowser {
    bot_id: Option<String>,
    page: u64,
    page_size: u64,
    total: u64,
    user_id_filter: String,
    records: Vec<Record>,
    toast: Option<Toast>,
    insert_text: String,
    insert_open: bool,
    loading: bool,
    inserting: bool,
}

impl RecordBrowser {
    pub fn new(page_size: u64) -> Self {
        Self {
            bot_id: None,
            page: 1,
            page_size,
            total: 0,
            user_id_filter: String::new(),
            records: Vec::new(),
            toast: None,
            insert_text: INSERT_TEMPLATE.to_owned(),
            insert_open: false,
            loading: false,
            inserting: false,
        }
    }

    /// Switch to another bot: page back to 1, filter cleared, reload.
    pub fn select_bot<C: GetBotApi>(&mut self, context: &C, bot_id: impl Into<String>) {
        self.bot_id = Some(bot_id.into());
        self.page = 1;
        self.user_id_filter.clear();
        self.reload(context);
    }

    /// Update the user-id filter; filtering always restarts from page 1.
    pub fn set_filter<C: GetBotApi>(&mut self, context: &C, filter: impl Into<String>) {
        self.user_id_filter = filter.into();
        self.page = 1;
        self.reload(context);
    }

    /// Jump to page `page` (1-based); the filter is kept.
    pub fn change_page<C: GetBotApi>(&mut self, context: &C, page: u64) {
        if page == 0 {
            return;
        }

        self.page = page;
        self.reload(context);
    }

    /// Fetch the current page and replace the window wholesale. On
    /// failure the previous records stay visible and a toast reports the
    /// error.
    pub fn reload<C: GetBotApi>(&mut self, context: &C) {
        let Some(bot_id) = self.bot_id.clone() else {
            return;
        };
        if self.loading {
            return;
        }

        self.loading = true;
        let ret = context.get_bot_api().list_records(
            &bot_id,
            self.page,
            self.page_size,
            &self.user_id_filter,
        );
        self.loading = false;

        match ret {
            Ok(page) => {
                self.records = page.list;
                self.total = page.total;
            }
            Err(e) => {
                warn!(%e, "list records");
                self.toast = Some(Toast::error(format!("Failed to fetch bot records: {e}")));
            }
        }
    }

    pub fn open_insert(&mut self) {
        self.insert_open = true;
    }

    pub fn close_insert(&mut self) {
        self.insert_open = false;
    }

    /// Replace the insert draft; the draft survives closing the dialog.
    pub fn edit_insert(&mut self, text: impl Into<String>) {
        self.insert_text = text.into();
    }

    /// Submit the draft verbatim. Success closes the dialog and reloads
    /// the page; any failure leaves the dialog open with the draft intact
    /// and does not reload.
    pub fn submit_insert<C: GetBotApi>(&mut self, context: &C) {
        let Some(bot_id) = self.bot_id.clone() else {
            return;
        };
        if self.inserting {
            return;
        }

        self.inserting = true;
        let ret = context.get_bot_api().insert_records(&bot_id, &self.insert_text);
        self.inserting = false;

        match ret {
            Ok(()) => {
                self.insert_open = false;
                self.toast = Some(Toast::success("Records inserted successfully"));
                self.reload(context);
            }
            Err(ApiError::Failure { message, .. }) => {
                self.toast = Some(Toast::error(message));
            }
            Err(e) => {
                warn!(%e, "insert records");
                self.toast = Some(Toast::error(format!("Failed to insert records: {e}")));
            }
        }
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    pub fn bot_id(&self) -> Option<&str> {
        self.bot_id.as_deref()
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(self.page_size).max(1)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn filter(&self) -> &str {
        &self.user_id_filter
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn insert_open(&self) -> bool {
        self.insert_open
    }

    pub fn insert_text(&self) -> &str {
        &self.insert_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::api::{MockBotApi, RecordPage};
    use crate::model::ToastKind;
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

    fn record(user_id: &str) -> Record {
        Record {
            user_id: user_id.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn select_bot_resets_window_and_reloads() {
        let mut api = MockBotApi::new();
        api.expect_list_records()
            .withf(|bot_id, page, page_size, user_id| {
                bot_id == "42" && *page == 1 && *page_size == 10 && user_id.is_empty()
            })
            .times(1)
            .returning(|_, _, _, _| {
                Ok(RecordPage {
                    list: vec![record("u-1"), record("u-2")],
                    total: 12,
                })
            });
        let context = MockContext { api };

        let mut browser = RecordBrowser::new(10);
        browser.select_bot(&context, "42");

        assert_eq!(browser.page(), 1);
        assert_eq!(browser.total(), 12);
        assert_eq!(browser.records().len(), 2);
        assert_eq!(browser.records()[0].user_id, "u-1");
        assert!(browser.toast().is_none());
    }

    #[test]
    fn reload_failure_keeps_stale_records() {
        let mut api = MockBotApi::new();
        api.expect_list_records()
            .times(1)
            .returning(|_, _, _, _| {
                Ok(RecordPage {
                    list: vec![record("u-1")],
                    total: 1,
                })
            });
        api.expect_list_records()
            .times(1)
            .returning(|_, _, _, _| Err(ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        let context = MockContext { api };

        let mut browser = RecordBrowser::new(10);
        browser.select_bot(&context, "42");
        browser.reload(&context);

        // prior page stays visible, failure goes to the toast.
        assert_eq!(browser.records().len(), 1);
        assert_eq!(browser.total(), 1);
        let toast = browser.toast().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert!(toast.message.starts_with("Failed to fetch bot records:"));
    }

    #[test]
    fn set_filter_restarts_from_first_page() {
        let mut api = MockBotApi::new();
        api.expect_list_records()
            .times(3)
            .returning(|_, _, _, _| Ok(RecordPage::default()));
        let context = MockContext { api };

        let mut browser = RecordBrowser::new(10);
        browser.select_bot(&context, "42");
        browser.change_page(&context, 3);
        assert_eq!(browser.page(), 3);

        browser.set_filter(&context, "alice");
        assert_eq!(browser.page(), 1);
        assert_eq!(browser.filter(), "alice");
    }

    #[test]
    fn change_page_keeps_filter() {
        let mut api = MockBotApi::new();
        api.expect_list_records()
            .times(2)
            .returning(|_, _, _, _| Ok(RecordPage::default()));
        api.expect_list_records()
            .withf(|_, page, _, user_id| *page == 2 && user_id == "alice")
            .times(1)
            .returning(|_, _, _, _| Ok(RecordPage::default()));
        let context = MockContext { api };

        let mut browser = RecordBrowser::new(10);
        browser.select_bot(&context, "42");
        browser.set_filter(&context, "alice");
        browser.change_page(&context, 2);

        assert_eq!(browser.filter(), "alice");
        assert_eq!(browser.page(), 2);
    }

    #[test]
    fn change_page_rejects_zero() {
        let api = MockBotApi::new();
        let context = MockContext { api };

        let mut browser = RecordBrowser::new(10);
        browser.change_page(&context, 0);

        assert_eq!(browser.page(), 1);
    }

    #[test]
    fn reload_without_bot_issues_no_request() {
        let api = MockBotApi::new();
        let context = MockContext { api };

        let mut browser = RecordBrowser::new(10);
        browser.reload(&context);

        assert!(browser.records().is_empty());
    }

    #[test]
    fn submit_insert_success_closes_dialog_and_reloads() {
        let mut api = MockBotApi::new();
        api.expect_list_records()
            .times(2)
            .returning(|_, _, _, _| Ok(RecordPage::default()));
        api.expect_insert_records()
            .withf(|bot_id, raw| bot_id == "42" && raw.contains("\"question\": \"ping\""))
            .times(1)
            .returning(|_, _| Ok(()));
        let context = MockContext { api };

        let mut browser = RecordBrowser::new(10);
        browser.select_bot(&context, "42");
        browser.open_insert();
        browser.edit_insert(r#"{"user_id": "u-1", "records": [{"question": "ping", "answer": "pong"}]}"#);
        browser.submit_insert(&context);

        assert!(!browser.insert_open());
        let toast = browser.toast().unwrap();
        assert_eq!(toast.kind, ToastKind::Success);
        assert_eq!(toast.message, "Records inserted successfully");
    }

    #[test]
    fn submit_insert_application_failure_keeps_dialog_open() {
        let mut api = MockBotApi::new();
        // one reload from select_bot; none after the failed insert.
        api.expect_list_records()
            .times(1)
            .returning(|_, _, _, _| Ok(RecordPage::default()));
        api.expect_insert_records().times(1).returning(|_, _| {
            Err(ApiError::Failure {
                code: 1,
                message: "duplicate".to_owned(),
            })
        });
        let context = MockContext { api };

        let mut browser = RecordBrowser::new(10);
        browser.select_bot(&context, "42");
        browser.open_insert();
        browser.submit_insert(&context);

        assert!(browser.insert_open());
        let toast = browser.toast().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert!(toast.message.contains("duplicate"));
    }

    #[test]
    fn submit_insert_transport_failure_keeps_dialog_open() {
        let mut api = MockBotApi::new();
        api.expect_list_records()
            .times(1)
            .returning(|_, _, _, _| Ok(RecordPage::default()));
        api.expect_insert_records()
            .times(1)
            .returning(|_, _| Err(ApiError::Status(StatusCode::BAD_GATEWAY)));
        let context = MockContext { api };

        let mut browser = RecordBrowser::new(10);
        browser.select_bot(&context, "42");
        browser.open_insert();
        browser.submit_insert(&context);

        assert!(browser.insert_open());
        assert!(
            browser
                .toast()
                .unwrap()
                .message
                .starts_with("Failed to insert records:")
        );
    }

    #[test]
    fn draft_survives_close_and_reopen() {
        let mut browser = RecordBrowser::new(10);
        assert_eq!(browser.insert_text(), INSERT_TEMPLATE);

        browser.open_insert();
        browser.edit_insert("{\"user_id\": \"u\"}");
        browser.close_insert();
        browser.open_insert();

        assert_eq!(browser.insert_text(), "{\"user_id\": \"u\"}");
    }

    #[test]
    fn page_count_rounds_up() {
        let mut browser = RecordBrowser::new(10);
        assert_eq!(browser.page_count(), 1);

        browser.total = 11;
        assert_eq!(browser.page_count(), 2);

        browser.total = 20;
        assert_eq!(browser.page_count(), 2);
    }
}
