use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::ui::{AppState, ToastLevel};

/// Single footer row: optional status spinner, toast, chat state, then help.
pub fn draw_footer(f: &mut Frame, area: Rect, state: &AppState, help_text: &str) {
    let theme = &state.theme;
    let mut spans: Vec<Span> = Vec::new();
    if let Some(msg) = &state.status_text {
        let spinner = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"][state.tick as usize % 6];
        spans.push(Span::raw(format!(" {spinner} {msg}")));
        spans.push(Span::raw("  |  "));
    }
    if let Some(t) = &state.toast {
        let color = theme.toast_color(t.level);
        let tag = match t.level {
            ToastLevel::Success => "[OK]",
            ToastLevel::Error => "[ERROR]",
            ToastLevel::Info => "[INFO]",
        };
        spans.push(Span::styled(
            format!("{tag} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!("{}  |  ", t.text),
            Style::default().fg(color),
        ));
    }
    let view = state.chat_view;
    spans.push(Span::styled(
        format!(
            "chat: {}{}",
            if view.panel_open { "open" } else { "closed" },
            if view.intro_visible { " · intro" } else { "" }
        ),
        Style::default().fg(theme.accent),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(help_text.to_string(), theme.text_muted()));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
