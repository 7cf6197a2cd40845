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

use crate::data::api::GetBotApi;
use crate::feature::records::RecordBrowser;
use crate::functions::{format_unix_time, print_stdin_help};
use crate::model::{AnswerContent, Record, ToastKind};
use botadmin::prelude::*;
use ratatui::crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph};
use std::io;
use std::io::prelude::*;

pub fn run_records<Ctx: GetBotApi>(
    context: Ctx,
    bot: Option<String>,
    page_size: u64,
) -> Fallible<()> {
    let mut browser = RecordBrowser::new(page_size);
    if let Some(bot) = bot {
        browser.select_bot(&context, bot);
    }

    let terminal = Terminal::new(CrosstermBackend::new(io::stderr()))?;
    enable_raw_mode()?;
    let mut terminal = BrowserTerminal(terminal);
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;

    let mut prompt = Prompt::None;

    loop {
        terminal.0.draw(|f| browser_view(f, &browser, &prompt))?;

        if let Event::Key(key) = event::read()? {
            // the next event dismisses a pending toast.
            browser.dismiss_toast();

            match &mut prompt {
                Prompt::Filter(buf) | Prompt::BotId(buf) => {
                    match key.code {
                        KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                            return Ok(());
                        }
                        KeyCode::Esc => prompt = Prompt::None,
                        KeyCode::Enter => {
                            let text = std::mem::take(buf);
                            match std::mem::replace(&mut prompt, Prompt::None) {
                                Prompt::Filter(_) => browser.set_filter(&context, text),
                                Prompt::BotId(_) => {
                                    let bot = text.trim().to_owned();
                                    if !bot.is_empty() {
                                        browser.select_bot(&context, bot);
                                    }
                                }
                                Prompt::None => {}
                            }
                        }
                        KeyCode::Backspace => {
                            buf.pop();
                        }
                        KeyCode::Char(c) => buf.push(c),
                        _ => {}
                    }
                    continue;
                }
                Prompt::None => {}
            }

            if browser.insert_open() {
                match key.code {
                    KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                        return Ok(());
                    }
                    KeyCode::Esc => browser.close_insert(),
                    KeyCode::Enter => browser.submit_insert(&context),
                    KeyCode::Char('e') => {
                        if let Some(draft) = read_draft_from_stdin(&mut terminal)? {
                            browser.edit_insert(draft);
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match key.code {
                KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => return Ok(()),
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('n') | KeyCode::Right => {
                    if browser.page() < browser.page_count() {
                        let page = browser.page() + 1;
                        browser.change_page(&context, page);
                    }
                }
                KeyCode::Char('p') | KeyCode::Left => {
                    if browser.page() > 1 {
                        let page = browser.page() - 1;
                        browser.change_page(&context, page);
                    }
                }
                KeyCode::Char('r') => browser.reload(&context),
                KeyCode::Char('/') => prompt = Prompt::Filter(browser.filter().to_owned()),
                KeyCode::Char('b') => prompt = Prompt::BotId(String::new()),
                KeyCode::Char('i') => browser.open_insert(),
                _ => debug!(?key),
            }
        }
    }
}

/// Leave the alternate screen, read a draft document from stdin until
/// EOF, then restore the browser.
fn read_draft_from_stdin<B: Backend + Write>(
    terminal: &mut BrowserTerminal<B>,
) -> Fallible<Option<String>>
where
    <B as Backend>::Error: Send + Sync + 'static,
{
    disable_raw_mode()?;
    execute!(io::stderr(), LeaveAlternateScreen, DisableMouseCapture)?;

    print_stdin_help();
    let mut buf = String::new();
    let ret = io::stdin().read_to_string(&mut buf);

    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;
    terminal.0.clear()?;

    ret?;
    if buf.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(buf))
    }
}

struct BrowserTerminal<B: Backend + Write>(Terminal<B>);

impl<B: Backend + Write> Drop for BrowserTerminal<B> {
    fn drop(&mut self) {
        let ret = disable_raw_mode();
        if let Err(e) = ret {
            warn!(?e, "disable_raw_mode");
        }

        let ret = execute!(
            self.0.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture,
        );
        if let Err(e) = ret {
            warn!(?e, "execute!");
        }

        let ret = self.0.show_cursor();
        if let Err(e) = ret {
            warn!(?e, "show_cursor");
        }
    }
}

enum Prompt {
    None,
    Filter(String),
    BotId(String),
}

fn browser_view(f: &mut Frame, browser: &RecordBrowser, prompt: &Prompt) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let status = match browser.toast() {
        Some(toast) => Paragraph::new(toast.message.as_str()).style(match toast.kind {
            ToastKind::Error => Style::default().fg(Color::White).bg(Color::Red),
            ToastKind::Success => Style::default().fg(Color::Black).bg(Color::Green),
        }),
        None => {
            let bot = browser.bot_id().unwrap_or("(none, press 'b')");
            let mut status = format!(" bot: {bot}");
            match prompt {
                Prompt::Filter(buf) => {
                    status.push_str(&format!(" · filter: {buf}_ (Enter to apply, Esc to cancel)"));
                }
                Prompt::BotId(buf) => {
                    status.push_str(&format!(" · bot id: {buf}_ (Enter to select, Esc to cancel)"));
                }
                Prompt::None if !browser.filter().is_empty() => {
                    status.push_str(&format!(" · filter: {}", browser.filter()));
                }
                Prompt::None => {}
            }
            Paragraph::new(status).style(Style::default().fg(Color::DarkGray))
        }
    };
    f.render_widget(status, chunks[0]);

    let header = Paragraph::new(format!(
        " {:<6} {:<14} {:>6} {:<8} {:<14} {:<19} {:<19}",
        "id", "user id", "token", "status", "model", "created", "updated",
    ))
    .style(Style::default().add_modifier(Modifier::UNDERLINED));
    f.render_widget(header, chunks[1]);

    let width = chunks[2].width.max(4) as usize;
    if browser.records().is_empty() {
        f.render_widget(
            Paragraph::new("No records found.").style(Style::default().fg(Color::DarkGray)),
            chunks[2],
        );
    } else {
        let rows = List::new(
            browser
                .records()
                .iter()
                .map(|record| record_item(record, width))
                .collect::<Vec<_>>(),
        );
        f.render_widget(rows, chunks[2]);
    }

    let footer = Paragraph::new(format!(
        " page {}/{} · {} records · n/p page · / filter · b bot · i insert · r reload · q quit",
        browser.page(),
        browser.page_count(),
        browser.total(),
    ))
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, chunks[3]);

    if browser.insert_open() {
        let area = dialog_rect(f.area());
        f.render_widget(Clear, area);
        let dialog = Paragraph::new(browser.insert_text().to_owned()).block(
            Block::default()
                .title(" Insert Record — 'e' edit · Enter submit · Esc cancel ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
        f.render_widget(dialog, area);
    }
}

fn record_item(record: &Record, width: usize) -> ListItem<'static> {
    let meta = format!(
        " {:<6} {:<14} {:>6} {:<8} {:<14} {:<19} {:<19}",
        format!("#{}", record.id),
        clip(&record.user_id, 14),
        record.token,
        if record.is_deleted != 0 { "Deleted" } else { "Active" },
        clip(&record.mode, 14),
        format_unix_time(record.create_time),
        format_unix_time(record.update_time),
    );

    let mut lines = vec![Line::from(meta)];
    lines.push(detail_line("Q", &record.question, width));
    if !record.content.trim().is_empty() {
        lines.push(detail_line("C", &record.content, width));
    }
    lines.push(detail_line("A", &record.answer, width));
    lines.push(Line::default());

    ListItem::new(lines)
}

fn detail_line(label: &'static str, value: &str, width: usize) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("   {label} "), Style::default().fg(Color::DarkGray)),
        Span::from(clip(&payload_cell(value), width.saturating_sub(6))),
    ])
}

/// Table-cell stand-in for an answer/content payload: media payloads
/// render as a label, rich text inlines with newlines collapsed.
fn payload_cell(value: &str) -> String {
    let content = AnswerContent::classify(value);
    match content {
        AnswerContent::Empty => String::new(),
        AnswerContent::Video(_) | AnswerContent::Audio(_) | AnswerContent::Image(_) => {
            content.media_label().unwrap_or_default()
        }
        AnswerContent::Markdown(text) => text.replace('\n', " "),
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }

    let mut clipped = text
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    clipped.push('…');
    clipped
}

fn dialog_rect(area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(15),
            Constraint::Percentage(70),
            Constraint::Percentage(15),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(10),
            Constraint::Percentage(80),
            Constraint::Percentage(10),
        ])
        .split(vertical[1]);

    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_cell_media_renders_label() {
        let cell = payload_cell("data:image/png;base64,AAAA");
        assert!(cell.starts_with("[image/png"));
    }

    #[test]
    fn payload_cell_text_collapses_newlines() {
        assert_eq!(payload_cell("a\nb"), "a b");
    }

    #[test]
    fn payload_cell_blank_is_empty() {
        assert_eq!(payload_cell("  "), "");
    }

    #[test]
    fn clip_keeps_short_text() {
        assert_eq!(clip("short", 10), "short");
    }

    #[test]
    fn clip_truncates_with_ellipsis() {
        assert_eq!(clip("0123456789", 5), "0123…");
    }
}
