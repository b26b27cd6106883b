use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::theme::Theme;

/// Floating launcher pinned to the bottom-right corner. Always drawn.
pub fn launcher_rect(screen: Rect, label_w: u16) -> Rect {
    let width = label_w.saturating_add(2).min(screen.width);
    let height = 3.min(screen.height);
    Rect {
        x: screen.x + screen.width.saturating_sub(width + 1),
        y: screen.y + screen.height.saturating_sub(height),
        width,
        height,
    }
}

pub fn draw_launcher(f: &mut Frame, screen: Rect, name: &str, panel_open: bool, theme: &Theme) {
    let label = format!(" ◆ {name} · Ctrl+K ");
    let area = launcher_rect(screen, label.chars().count() as u16);
    if area.width < 3 || area.height < 3 {
        return;
    }
    let (border, text) = if panel_open {
        (theme.border_focused(), theme.button_primary())
    } else {
        (
            theme.border_unfocused(),
            Style::default().fg(theme.primary).add_modifier(Modifier::BOLD),
        )
    };
    f.render_widget(Clear, area);
    let p = Paragraph::new(Line::from(Span::styled(label, text)))
        .block(Block::default().borders(Borders::ALL).border_style(border));
    f.render_widget(p, area);
}
