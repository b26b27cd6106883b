use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tui_textarea::TextArea;

use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelAction {
    None,
    Submit(String),
    CopyLast,
}

pub struct ChatPanel {
    assistant_name: String,
    messages: Vec<ChatMessage>,
    composer: TextArea<'static>,
    // Reply ids still outstanding
    pending: Vec<u64>,
    // Lines scrolled up from the newest message
    scroll_back: u16,
}

fn new_composer() -> TextArea<'static> {
    let mut ta = TextArea::default();
    ta.set_placeholder_text("Ask a question… (Enter send, Alt+Enter newline)");
    ta.set_cursor_line_style(Style::default());
    ta
}

// tui-textarea speaks ratatui's crossterm; map the few keys the composer needs.
fn to_textarea_key(key: &KeyEvent) -> Option<rt_event::KeyEvent> {
    let code = match key.code {
        KeyCode::Char(c) => rt_event::KeyCode::Char(c),
        KeyCode::Backspace => rt_event::KeyCode::Backspace,
        KeyCode::Delete => rt_event::KeyCode::Delete,
        KeyCode::Left => rt_event::KeyCode::Left,
        KeyCode::Right => rt_event::KeyCode::Right,
        KeyCode::Up => rt_event::KeyCode::Up,
        KeyCode::Down => rt_event::KeyCode::Down,
        KeyCode::Home => rt_event::KeyCode::Home,
        KeyCode::End => rt_event::KeyCode::End,
        KeyCode::Tab => rt_event::KeyCode::Tab,
        _ => return None,
    };
    let mods = rt_event::KeyModifiers::from_bits_truncate(key.modifiers.bits());
    Some(rt_event::KeyEvent::new(code, mods))
}

impl ChatPanel {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        let assistant_name = assistant_name.into();
        let greeting = format!(
            "Hi, I'm {assistant_name}. Ask me about expenses, budgets or savings goals."
        );
        Self {
            assistant_name,
            messages: vec![ChatMessage {
                role: Role::Assistant,
                text: greeting,
            }],
            composer: new_composer(),
            pending: Vec::new(),
            scroll_back: 0,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_waiting(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn composer_text(&self) -> String {
        self.composer.lines().join("\n")
    }

    pub fn last_assistant(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.text.as_str())
    }

    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.messages.push(ChatMessage {
            role,
            text: text.into(),
        });
        self.scroll_back = 0;
    }

    pub fn begin_reply(&mut self, id: u64) {
        self.pending.push(id);
    }

    /// True if `id` was outstanding.
    pub fn finish_reply(&mut self, id: u64) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| *p != id);
        self.pending.len() != before
    }

    pub fn on_key(&mut self, key: &KeyEvent) -> PanelAction {
        match key.code {
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
                self.composer.insert_newline();
                PanelAction::None
            }
            KeyCode::Enter => {
                let text = self.composer_text().trim().to_string();
                if text.is_empty() {
                    return PanelAction::None;
                }
                self.composer = new_composer();
                PanelAction::Submit(text)
            }
            KeyCode::Char('y') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                PanelAction::CopyLast
            }
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(5);
                PanelAction::None
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(5);
                PanelAction::None
            }
            _ => {
                if let Some(ev) = to_textarea_key(key) {
                    let _ = self.composer.input(ev);
                }
                PanelAction::None
            }
        }
    }

    /// Transcript pre-wrapped to `width` columns, one `Line` per screen row,
    /// so scroll offsets count rows.
    fn transcript_lines(&self, theme: &Theme, tick: u64, width: usize) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = Vec::new();
        for m in &self.messages {
            let (label, style) = match m.role {
                Role::User => ("You".to_string(), Style::default().fg(theme.accent)),
                Role::Assistant => (self.assistant_name.clone(), Style::default().fg(theme.primary)),
                Role::System => ("•".to_string(), theme.text_muted()),
            };
            for row in wrap_text(&label, width) {
                lines.push(Line::from(Span::styled(row, style.add_modifier(Modifier::BOLD))));
            }
            for l in m.text.lines() {
                for row in wrap_text(l, width.saturating_sub(2)) {
                    lines.push(Line::from(format!("  {row}")));
                }
            }
            lines.push(Line::from(""));
        }
        if self.is_waiting() {
            let spin = crate::visuals::spinner_head(tick);
            let status = format!("{spin} {} is thinking…", self.assistant_name);
            for row in wrap_text(&status, width) {
                lines.push(Line::from(Span::styled(row, theme.text_muted())));
            }
        }
        lines
    }
}

/// Greedy word wrap on char counts; words longer than `width` are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0usize;
    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        let sep = usize::from(cur_len > 0);
        if cur_len + sep + chars.len() <= width {
            if sep == 1 {
                cur.push(' ');
            }
            cur.extend(chars.iter());
            cur_len += sep + chars.len();
            continue;
        }
        if cur_len > 0 {
            rows.push(std::mem::take(&mut cur));
            cur_len = 0;
        }
        while chars.len() > width {
            let rest = chars.split_off(width);
            rows.push(chars.into_iter().collect());
            chars = rest;
        }
        cur_len = chars.len();
        cur = chars.into_iter().collect();
    }
    if cur_len > 0 || rows.is_empty() {
        rows.push(cur);
    }
    rows
}

/// Area for the docked panel: right side, above the launcher row.
pub fn panel_rect(screen: Rect) -> Rect {
    let width = (screen.width * 2 / 5).clamp(30.min(screen.width), 64.min(screen.width));
    let height = screen.height.saturating_sub(4).min(26);
    Rect {
        x: screen.x + screen.width.saturating_sub(width + 1),
        y: screen.y + screen.height.saturating_sub(height + 3),
        width,
        height,
    }
}

pub fn draw_chat_panel(f: &mut Frame, screen: Rect, panel: &mut ChatPanel, theme: &Theme, tick: u64) {
    let area = panel_rect(screen);
    if area.width < 4 || area.height < 6 {
        return;
    }
    f.render_widget(Clear, area);
    let title = format!(" {} ", panel.assistant_name);
    let block = crate::widgets::chrome::panel_block(&title, true, theme)
        .title_bottom(
            Line::from(Span::styled(" Esc close · Ctrl+Y copy ", theme.text_muted()))
                .right_aligned(),
        )
        .style(theme.base_style());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(4)])
        .split(inner);

    let lines = panel.transcript_lines(theme, tick, chunks[0].width as usize);
    // Keep the newest rows in view unless the user scrolled back.
    let view_h = chunks[0].height as usize;
    let total = lines.len();
    let max_back = total.saturating_sub(view_h);
    let back = (panel.scroll_back as usize).min(max_back);
    panel.scroll_back = back as u16;
    let top = total.saturating_sub(view_h + back) as u16;
    let transcript = Paragraph::new(lines).scroll((top, 0));
    f.render_widget(transcript, chunks[0]);

    panel.composer.set_block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(theme.border_unfocused()),
    );
    f.render_widget(&panel.composer, chunks[1]);
}
