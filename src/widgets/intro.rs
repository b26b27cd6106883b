use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};

use crate::model::IntroStep;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroAction {
    None,
    Next,
    /// Close the intro, then open the chat panel after a short delay.
    TryNow,
    /// Close the intro only.
    Skip,
}

/// Onboarding dialog: walks a fixed list of steps.
pub struct IntroDialog {
    steps: Vec<IntroStep>,
    step: usize,
    assistant_name: String,
}

impl IntroDialog {
    pub fn new(steps: Vec<IntroStep>, assistant_name: impl Into<String>) -> Self {
        Self {
            steps,
            step: 0,
            assistant_name: assistant_name.into(),
        }
    }

    /// Back to the first step; called whenever the dialog becomes visible.
    pub fn reset(&mut self) {
        self.step = 0;
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_last(&self) -> bool {
        self.step + 1 >= self.steps.len()
    }

    pub fn current(&self) -> Option<&IntroStep> {
        self.steps.get(self.step)
    }

    pub fn on_key(&mut self, key: KeyCode) -> IntroAction {
        match key {
            KeyCode::Enter => {
                if self.is_last() {
                    IntroAction::TryNow
                } else {
                    self.step += 1;
                    IntroAction::Next
                }
            }
            KeyCode::Right | KeyCode::Char('n') if !self.is_last() => {
                self.step += 1;
                IntroAction::Next
            }
            KeyCode::Char('t') if self.is_last() => IntroAction::TryNow,
            KeyCode::Char('s') | KeyCode::Char('x') => IntroAction::Skip,
            _ => IntroAction::None,
        }
    }
}

pub(crate) fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

pub fn draw_intro(f: &mut Frame, screen: Rect, dialog: &IntroDialog, theme: &Theme, tick: u64) {
    // Dim backdrop
    crate::visuals::draw_ambient_bg(f, screen, theme, tick);

    let area = centered_rect(screen, 58, 17);
    f.render_widget(Clear, area);
    let name = dialog.assistant_name.as_str();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_focused())
        .title(Span::styled(format!(" Meet {name} "), theme.text_active_bold()))
        .title_bottom(Line::from(Span::styled(" x close ", theme.text_muted())).right_aligned())
        .padding(Padding::new(2, 2, 1, 0))
        .style(theme.base_style());

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "Your AI assistant is here to help!",
            theme.text_muted(),
        ))
        .centered(),
        Line::from(""),
    ];
    if let Some(step) = dialog.current() {
        lines.push(
            Line::from(Span::styled(
                step.title.clone(),
                Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
            ))
            .centered(),
        );
        lines.push(Line::from(step.description.clone()).centered());
    }
    lines.push(Line::from(""));

    // Progress dots
    let dots: Vec<Span> = (0..dialog.steps.len())
        .map(|i| {
            if i == dialog.step() {
                Span::styled("● ", Style::default().fg(theme.primary))
            } else {
                Span::styled("○ ", theme.text_muted())
            }
        })
        .collect();
    lines.push(Line::from(dots).centered());
    lines.push(Line::from(""));

    let primary = if dialog.is_last() {
        format!(" Try {name} Now (Enter/t) ")
    } else {
        " Next (Enter/n) ".to_string()
    };
    lines.push(
        Line::from(vec![
            Span::styled(" Skip (s) ", theme.text_muted()),
            Span::raw("    "),
            Span::styled(primary, theme.button_primary()),
        ])
        .centered(),
    );
    lines.push(Line::from(""));
    lines.push(
        Line::from(Span::styled(
            format!("Tip: Press Ctrl+K anytime to open {name}"),
            theme.text_muted(),
        ))
        .centered(),
    );

    let p = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(p, area);
}
