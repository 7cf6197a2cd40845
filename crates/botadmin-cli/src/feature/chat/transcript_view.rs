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
use crate::feature::chat::ChatSession;
use crate::functions::osc52_sequence;
use crate::model::{ChatMessage, MessageRole, ToastKind};
use botadmin::prelude::*;
use ratatui::crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers, MouseEventKind,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use std::io;
use std::io::prelude::*;

pub fn run_chat<Ctx: GetBotApi>(context: Ctx, bot: Option<String>) -> Fallible<()> {
    let mut session = ChatSession::new();
    if let Some(bot) = bot {
        session.select_bot(&context, bot);
    }

    let terminal = Terminal::new(CrosstermBackend::new(io::stderr()))?;
    enable_raw_mode()?;
    let mut terminal = ChatTerminal(terminal);
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;

    let mut view = ViewState::new();

    loop {
        terminal.0.draw(|f| chat_view(f, &session, &mut view))?;

        match event::read()? {
            Event::Key(key) => {
                // the next event dismisses a pending toast.
                session.dismiss_toast();

                if let Prompt::BotId(buf) = &mut view.prompt {
                    match key.code {
                        KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                            return Ok(());
                        }
                        KeyCode::Esc => view.prompt = Prompt::None,
                        KeyCode::Enter => {
                            let bot = std::mem::take(buf).trim().to_owned();
                            view.prompt = Prompt::None;
                            if !bot.is_empty() {
                                session.select_bot(&context, bot);
                                view.follow = true;
                                view.selected = None;
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

                match view.mode {
                    Mode::Input => match key.code {
                        KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                            return Ok(());
                        }
                        KeyCode::Esc => {
                            view.mode = Mode::Browse;
                            view.selected = session.messages().len().checked_sub(1);
                        }
                        KeyCode::Enter => {
                            let text = std::mem::take(&mut view.input);
                            let mut streaming_view = ViewState::new();
                            session.send_prompt(&context, &text, |session| {
                                let ret = terminal
                                    .0
                                    .draw(|f| chat_view(f, session, &mut streaming_view));
                                if let Err(e) = ret {
                                    warn!(?e, "draw");
                                }
                            });
                            view.follow = true;
                            view.selected = None;
                        }
                        KeyCode::Backspace => {
                            view.input.pop();
                        }
                        KeyCode::Char(c) => view.input.push(c),
                        _ => debug!(?key),
                    },
                    Mode::Browse => match key.code {
                        KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                            return Ok(());
                        }
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('i') | KeyCode::Enter | KeyCode::Esc => {
                            view.mode = Mode::Input;
                            view.selected = None;
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            select_next(&session, &mut view);
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            select_prev(&context, &mut session, &mut view);
                        }
                        KeyCode::PageDown => scroll_down(&session, &mut view, 5),
                        KeyCode::PageUp => scroll_up(&context, &mut session, &mut view, 5),
                        KeyCode::End | KeyCode::Char('G') => {
                            view.follow = true;
                            view.selected = session.messages().len().checked_sub(1);
                        }
                        KeyCode::Char('y') => {
                            if let Some(message) =
                                view.selected.and_then(|index| session.messages().get(index))
                            {
                                if message.role != MessageRole::System {
                                    let copied = copy_to_clipboard(&message.content).is_ok();
                                    session.notify_copy(copied);
                                }
                            }
                        }
                        KeyCode::Char('b') => view.prompt = Prompt::BotId(String::new()),
                        _ => debug!(?key),
                    },
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => {
                    session.dismiss_toast();
                    scroll_up(&context, &mut session, &mut view, 3);
                }
                MouseEventKind::ScrollDown => {
                    session.dismiss_toast();
                    scroll_down(&session, &mut view, 3);
                }
                _ => {}
            },
            _ => {}
        }
    }
}

fn select_next(session: &ChatSession, view: &mut ViewState) {
    let message_count = session.messages().len();
    if message_count == 0 {
        return;
    }

    match view.selected.as_mut() {
        Some(index) if *index + 1 < message_count => *index += 1,
        Some(_) => {}
        None => view.selected = Some(0),
    }
    view.follow = false;
    ensure_selected_visible(session, view);
}

fn select_prev<Ctx: GetBotApi>(context: &Ctx, session: &mut ChatSession, view: &mut ViewState) {
    view.follow = false;
    match view.selected.as_mut() {
        Some(index) if *index > 0 => {
            *index -= 1;
            ensure_selected_visible(session, view);
        }
        _ => {
            // already at the first message; this attempt lands the
            // viewport on offset zero.
            view.scroll_top = 0;
        }
    }

    if view.scroll_top == 0 {
        backfill_history(context, session, view);
    }
}

fn scroll_down(session: &ChatSession, view: &mut ViewState, amount: usize) {
    view.follow = false;
    let max_scroll = transcript_height(session.messages(), view.text_width)
        .saturating_sub(view.viewport_height);
    view.scroll_top = (view.scroll_top + amount).min(max_scroll);
    if view.scroll_top == max_scroll {
        view.follow = true;
    }
}

fn scroll_up<Ctx: GetBotApi>(
    context: &Ctx,
    session: &mut ChatSession,
    view: &mut ViewState,
    amount: usize,
) {
    view.follow = false;
    view.scroll_top = view.scroll_top.saturating_sub(amount);
    if view.scroll_top == 0 {
        backfill_history(context, session, view);
    }
}

/// The viewport reached offset zero: pull older history and keep the
/// previously-topmost content at the same visual position by adding
/// exactly the prepended height to the scroll offset.
fn backfill_history<Ctx: GetBotApi>(context: &Ctx, session: &mut ChatSession, view: &mut ViewState) {
    let Some(prepended) = session.on_scroll_to_top(context) else {
        return;
    };

    let added = transcript_height(&session.messages()[..prepended], view.text_width);
    view.scroll_top += added;
    if let Some(index) = view.selected.as_mut() {
        *index += prepended;
    }
}

fn ensure_selected_visible(session: &ChatSession, view: &mut ViewState) {
    let Some(selected) = view.selected else {
        return;
    };

    let mut start = 0;
    let mut height = 0;
    for (index, message) in session.messages().iter().enumerate() {
        height = message_height(message, view.text_width);
        if index == selected {
            break;
        }
        start += height;
    }

    if start < view.scroll_top {
        view.scroll_top = start;
    } else if start + height > view.scroll_top + view.viewport_height {
        view.scroll_top = (start + height).saturating_sub(view.viewport_height);
    }
}

fn copy_to_clipboard(text: &str) -> Fallible<()> {
    let mut out = io::stderr();
    out.write_all(osc52_sequence(text).as_bytes())?;
    out.flush()?;

    Ok(())
}

struct ChatTerminal<B: Backend + Write>(Terminal<B>);

impl<B: Backend + Write> Drop for ChatTerminal<B> {
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

#[derive(Clone, Copy, Eq, PartialEq)]
enum Mode {
    Input,
    Browse,
}

enum Prompt {
    None,
    BotId(String),
}

struct ViewState {
    mode: Mode,
    prompt: Prompt,
    input: String,
    scroll_top: usize,
    selected: Option<usize>,
    follow: bool,
    text_width: usize,
    viewport_height: usize,
}

impl ViewState {
    fn new() -> Self {
        Self {
            mode: Mode::Input,
            prompt: Prompt::None,
            input: String::new(),
            scroll_top: 0,
            selected: None,
            follow: true,
            text_width: 80,
            viewport_height: 20,
        }
    }
}

fn chat_view(f: &mut Frame, session: &ChatSession, view: &mut ViewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(f.area());

    // status line; a pending toast takes it over.
    let status = match session.toast() {
        Some(toast) => Paragraph::new(toast.message.as_str()).style(match toast.kind {
            ToastKind::Error => Style::default().fg(Color::White).bg(Color::Red),
            ToastKind::Success => Style::default().fg(Color::Black).bg(Color::Green),
        }),
        None => {
            let bot = session.bot_id().unwrap_or("(none, press 'b' in browse mode)");
            let mut status = format!(" bot: {bot} · history page {}", session.history_page());
            if !session.has_more_history() {
                status.push_str(" · no more history");
            }
            if session.is_loading() {
                status.push_str(" · loading");
            }
            Paragraph::new(status).style(Style::default().fg(Color::DarkGray))
        }
    };
    f.render_widget(status, chunks[0]);

    view.text_width = chunks[1].width.saturating_sub(2).max(1) as usize;
    view.viewport_height = chunks[1].height.saturating_sub(2).max(1) as usize;

    let lines = transcript_lines(session.messages(), view.text_width, view.selected);
    let max_scroll = lines.len().saturating_sub(view.viewport_height);
    if view.follow {
        view.scroll_top = max_scroll;
    } else {
        view.scroll_top = view.scroll_top.min(max_scroll);
    }

    let transcript = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .title(" Communicate ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .scroll((view.scroll_top as u16, 0));
    f.render_widget(transcript, chunks[1]);

    let (input_title, input_text) = match &view.prompt {
        Prompt::BotId(buf) => (" Bot id (Enter to select, Esc to cancel) ", buf.clone()),
        Prompt::None => match view.mode {
            Mode::Input if session.is_loading() => (" Sending... ", view.input.clone()),
            Mode::Input => (" Message (Enter to send, Esc to browse) ", view.input.clone()),
            Mode::Browse => (
                " Browse: j/k select · y copy · b bot · i input · q quit ",
                String::new(),
            ),
        },
    };
    let input = Paragraph::new(input_text).block(
        Block::default()
            .title(input_title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(input, chunks[2]);
}

fn transcript_lines(
    messages: &[ChatMessage],
    width: usize,
    selected: Option<usize>,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, message) in messages.iter().enumerate() {
        lines.extend(message_lines(message, width, selected == Some(index)));
    }

    lines
}

fn message_lines(message: &ChatMessage, width: usize, selected: bool) -> Vec<Line<'static>> {
    let mut label_style = Style::default().add_modifier(Modifier::UNDERLINED);
    if selected {
        label_style = label_style.bg(Color::White).fg(Color::Black);
    }

    let content_style = match message.role {
        MessageRole::System => Style::default().fg(Color::Red),
        MessageRole::User | MessageRole::Assistant => Style::default(),
    };

    let mut lines = vec![Line::from(Span::styled(
        message.role.label().to_owned(),
        label_style,
    ))];
    for row in wrap_text(&message.content, width) {
        lines.push(Line::from(Span::styled(row, content_style)));
    }
    lines.push(Line::default());

    lines
}

/// Rendered height of one message; must stay in sync with [message_lines].
fn message_height(message: &ChatMessage, width: usize) -> usize {
    wrap_text(&message.content, width).len() + 2
}

fn transcript_height(messages: &[ChatMessage], width: usize) -> usize {
    messages
        .iter()
        .map(|message| message_height(message, width))
        .sum()
}

fn wrap_text(content: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for source_line in content.split('\n') {
        if source_line.is_empty() {
            rows.push(String::new());
            continue;
        }

        let mut row = String::new();
        let mut count = 0;
        for c in source_line.chars() {
            if count == width {
                rows.push(std::mem::take(&mut row));
                count = 0;
            }
            row.push(c);
            count += 1;
        }
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_text_splits_at_width() {
        assert_eq!(wrap_text("abcdef", 4), vec!["abcd".to_owned(), "ef".to_owned()]);
    }

    #[test]
    fn wrap_text_keeps_empty_lines() {
        assert_eq!(
            wrap_text("a\n\nb", 10),
            vec!["a".to_owned(), String::new(), "b".to_owned()],
        );
    }

    #[test]
    fn wrap_text_empty_content_is_one_row() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn wrap_text_exact_multiple_of_width() {
        assert_eq!(wrap_text("abcd", 4), vec!["abcd".to_owned()]);
    }

    #[test]
    fn message_height_matches_rendered_lines() {
        let message = ChatMessage::assistant("0123456789");
        for width in [3, 5, 10, 80] {
            assert_eq!(
                message_height(&message, width),
                message_lines(&message, width, false).len(),
            );
        }
    }

    #[test]
    fn transcript_height_sums_messages() {
        let messages = [ChatMessage::user("hi"), ChatMessage::assistant("there")];
        assert_eq!(
            transcript_height(&messages, 80),
            message_height(&messages[0], 80) + message_height(&messages[1], 80),
        );
    }
}
