use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::theme::Theme;

pub fn draw_header(f: &mut Frame, area: Rect, theme: &Theme) {
    let b = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(theme.border_unfocused());
    let line = Line::from(vec![
        Span::styled(
            " Equilibria ",
            Style::default().fg(theme.primary).add_modifier(Modifier::BOLD),
        ),
        Span::styled("· expenses, budgets and savings", theme.text_muted()),
    ]);
    f.render_widget(Paragraph::new(line).block(b), area);
}
