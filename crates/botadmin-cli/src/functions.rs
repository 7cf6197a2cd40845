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

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, TimeZone};

/// Render a unix-seconds timestamp in local time; `"-"` for zero
/// (the backend uses 0 for "never updated").
pub fn format_unix_time(seconds: i64) -> String {
    if seconds == 0 {
        return "-".to_owned();
    }

    match Local.timestamp_opt(seconds, 0).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_owned(),
    }
}

/// OSC 52 escape sequence that asks the terminal to place `text` on the
/// system clipboard.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

pub fn print_stdin_help() {
    #[cfg(target_os = "windows")]
    {
        eprintln!("Please input the document and Ctrl+Z");
    }

    #[cfg(not(target_os = "windows"))]
    {
        eprintln!("Please input the document and Ctrl+D");
    }
}
