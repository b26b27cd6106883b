use ratatui::style::{Color, Modifier, Style};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

#[derive(Clone, Debug)]
pub struct Theme {
    #[allow(dead_code)]
    pub mode: ThemeMode,
    pub bg: Color,
    pub fg: Color,
    pub primary: Color,
    pub accent: Color,
    pub frame: Color,
    pub selected: Color,
    pub success: Color,
    pub error: Color,
    pub muted: Color,
}

impl Theme {
    pub fn equilibria_dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            bg: Color::Rgb(18, 22, 28),
            fg: Color::Rgb(230, 232, 235),
            primary: Color::Rgb(34, 197, 148),
            accent: Color::Rgb(96, 165, 250),
            frame: Color::Rgb(71, 85, 105),
            selected: Color::Rgb(45, 212, 191),
            success: Color::Rgb(34, 197, 94),
            error: Color::Rgb(239, 68, 68),
            muted: Color::Rgb(100, 116, 139),
        }
    }

    pub fn equilibria_light() -> Self {
        Self {
            mode: ThemeMode::Light,
            bg: Color::Rgb(248, 250, 252),
            fg: Color::Rgb(15, 23, 42),
            primary: Color::Rgb(5, 150, 105),
            accent: Color::Rgb(37, 99, 235),
            frame: Color::Rgb(203, 213, 225),
            selected: Color::Rgb(13, 148, 136),
            success: Color::Rgb(22, 163, 74),
            error: Color::Rgb(220, 38, 38),
            muted: Color::Rgb(100, 116, 139),
        }
    }

    /// `EQUILIBRIA_TUI_THEME=light` picks the light palette.
    pub fn from_env() -> Self {
        match std::env::var("EQUILIBRIA_TUI_THEME").ok().as_deref() {
            Some(v) if v.eq_ignore_ascii_case("light") => Self::from_mode(ThemeMode::Light),
            _ => Self::from_mode(ThemeMode::Dark),
        }
    }

    pub fn from_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::equilibria_dark(),
            ThemeMode::Light => Self::equilibria_light(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::equilibria_dark()
    }
}

impl Theme {
    pub fn border_focused(&self) -> Style {
        Style::default().fg(self.selected)
    }

    pub fn border_unfocused(&self) -> Style {
        Style::default().fg(self.frame)
    }

    pub fn text_active_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn base_style(&self) -> Style {
        Style::default().bg(self.bg).fg(self.fg)
    }

    pub fn button_primary(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn toast_color(&self, level: crate::ui::ToastLevel) -> Color {
        match level {
            crate::ui::ToastLevel::Success => self.success,
            crate::ui::ToastLevel::Error => self.error,
            crate::ui::ToastLevel::Info => self.accent,
        }
    }
}
