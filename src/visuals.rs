use ratatui::layout::Rect;
use ratatui::prelude::Frame;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use crate::theme::Theme;

pub fn spinner_head(tick: u64) -> char {
    const SPINNERS: [char; 8] = ['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];
    SPINNERS[(tick as usize / 2) % SPINNERS.len()]
}

/// Dim scrim drawn behind modal dialogs: a sparse dotted pattern that
/// drifts one column every tick so the backdrop reads as inactive.
pub fn draw_ambient_bg(f: &mut Frame, area: Rect, theme: &Theme, tick: u64) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let phase = (tick % 16) as u16;
    let style = Style::default()
        .bg(theme.bg)
        .fg(theme.muted)
        .add_modifier(Modifier::DIM);
    let lines: Vec<Line> = (0..area.height)
        .map(|y| {
            let row: String = (0..area.width)
                .map(|x| if (x + y + phase) % 8 == 0 { '·' } else { ' ' })
                .collect();
            Line::from(Span::styled(row, style))
        })
        .collect();
    let p = Paragraph::new(lines)
        .style(Style::default().bg(theme.bg))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_cycles_every_sixteen_ticks() {
        assert_eq!(spinner_head(0), spinner_head(16));
        assert_ne!(spinner_head(0), spinner_head(2));
    }
}
