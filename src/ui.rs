use crate::app::{parse_key_spec, update, AppMsg, Effect};
use crate::chat_core::coordinator::SubscriptionId;
use crate::chat_core::keyboard::ListenerId;
use crate::chat_core::storage::{default_state_dir, FileStore, FlagStore, MemoryStore};
use crate::chat_core::{ChatCoordinator, ChatSnapshot, KeyListeners, KeyboardRouter};
use crate::model::AppConfig;
use crate::services::responder::{spawn_reply, ReplyMsg};
use crate::widgets::chat_panel::{draw_chat_panel, ChatPanel};
use crate::widgets::header::draw_header;
use crate::widgets::intro::{draw_intro, IntroDialog};
use crate::widgets::launcher::draw_launcher;
use crate::widgets::status_bar::draw_footer;
use anyhow::Result;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const TICK_RATE: Duration = Duration::from_millis(200);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

pub(crate) struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) chat: ChatCoordinator,
    // Last snapshot published by the coordinator; the only chat state drawing reads
    pub(crate) chat_view: ChatSnapshot,
    chat_rx: Receiver<ChatSnapshot>,
    chat_sub: Option<SubscriptionId>,
    pub(crate) keys: KeyListeners,
    router: Option<ListenerId>,
    pub(crate) intro: IntroDialog,
    pub(crate) panel: ChatPanel,
    pub(crate) prompts: HashMap<u64, String>,
    pub(crate) next_reply_id: u64,
    pub(crate) tick: u64,
    pub(crate) toast: Option<Toast>,
    pub(crate) status_text: Option<String>,
    pub(crate) theme: crate::theme::Theme,
    pub(crate) quit: bool,
    // Debug log (rendered in bottom debug strip)
    pub(crate) debug_log: VecDeque<String>,
    tx: Sender<ReplyMsg>,
    rx: Receiver<ReplyMsg>,
}

impl AppState {
    /// Builds the coordinator and mounts the view: subscribes to chat
    /// snapshots and registers the shortcut router.
    pub(crate) fn new(config: AppConfig, store: Box<dyn FlagStore>, now: Instant) -> Self {
        let chat = ChatCoordinator::new(store, config.intro_delay(), now);
        let (chat_tx, chat_rx) = mpsc::channel::<ChatSnapshot>();
        let (tx, rx) = mpsc::channel::<ReplyMsg>();
        let mut state = Self {
            intro: IntroDialog::new(config.intro_steps.clone(), config.assistant_name.clone()),
            panel: ChatPanel::new(config.assistant_name.clone()),
            chat_view: chat.snapshot(),
            config,
            config_path: None,
            chat,
            chat_rx,
            chat_sub: None,
            keys: KeyListeners::default(),
            router: None,
            prompts: HashMap::new(),
            next_reply_id: 0,
            tick: 0,
            toast: None,
            status_text: None,
            theme: crate::theme::Theme::default(),
            quit: false,
            debug_log: VecDeque::new(),
            tx,
            rx,
        };
        state.chat_sub = Some(state.chat.subscribe(move |snap| {
            let _ = chat_tx.send(snap);
        }));
        state.router = Some(state.keys.add(KeyboardRouter));
        state
    }

    /// Unmount: drop the router and subscription, cancel pending timers.
    pub(crate) fn teardown(&mut self) {
        if let Some(id) = self.router.take() {
            self.keys.remove(id);
        }
        if let Some(id) = self.chat_sub.take() {
            self.chat.unsubscribe(id);
        }
        self.chat.shutdown();
        if !self.keys.is_empty() {
            warn!(listeners = self.keys.len(), "key listeners still mounted after teardown");
        }
        info!(shut_down = self.chat.is_shut_down(), "assistant widget torn down");
    }

    pub fn dbg(&mut self, msg: impl Into<String>) {
        const MAX_LOG_LINES: usize = 200;
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg.into());
    }

    /// Apply snapshots published since the last call.
    pub(crate) fn sync_chat_view(&mut self) {
        let published: Vec<ChatSnapshot> = self.chat_rx.try_iter().collect();
        for snap in published {
            if snap.intro_visible && !self.chat_view.intro_visible {
                self.intro.reset();
            }
            self.dbg(format!(
                "chat: panel={} intro={}",
                if snap.panel_open { "open" } else { "closed" },
                if snap.intro_visible { "visible" } else { "hidden" }
            ));
            self.chat_view = snap;
        }
    }

    fn drain_replies(&mut self) -> Vec<ReplyMsg> {
        self.rx.try_iter().collect()
    }

    /// How long the loop may block on input before the next tick or deferred action.
    fn poll_timeout(&self, last_tick: Instant, now: Instant) -> Duration {
        let until_tick = TICK_RATE
            .checked_sub(now.duration_since(last_tick))
            .unwrap_or(Duration::ZERO);
        match self.chat.next_deadline() {
            Some(d) => until_tick.min(d.saturating_duration_since(now)),
            None => until_tick,
        }
    }
}

fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::RequestReply { id, prompt } => {
                state.dbg(format!("reply #{id} requested"));
                spawn_reply(
                    state.config.responder_cmd.clone(),
                    id,
                    prompt,
                    state.tx.clone(),
                );
            }
            Effect::CopyToClipboard(text) => match arboard::Clipboard::new() {
                Ok(mut clipboard) => {
                    if clipboard.set_text(&text).is_ok() {
                        state.toast = Some(Toast {
                            text: "Copied to clipboard!".into(),
                            level: ToastLevel::Success,
                            expires_at_tick: state.tick.saturating_add(10),
                        });
                    }
                }
                Err(e) => {
                    warn!(error = %e, "clipboard unavailable");
                    state.dbg(format!("clipboard unavailable: {e}"));
                }
            },
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5); // ~200ms tick
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: state.tick.saturating_add(ticks),
                });
            }
            Effect::Quit => state.quit = true,
        }
    }
}

/// Feed loop-side inputs (replies, deferred timers) through `update`.
fn pump(state: &mut AppState, now: Instant) {
    for msg in state.drain_replies() {
        let effs = update(
            state,
            AppMsg::ReplyReady {
                id: msg.id,
                outcome: msg.outcome,
            },
        );
        run_effects(state, effs);
    }
    if state.chat.next_deadline().is_some_and(|d| d <= now) {
        let fired = state.chat.poll_deferred(now);
        state.dbg(format!("deferred actions fired: {fired}"));
        state.sync_chat_view();
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

/// Pick the flag store: in-memory for ephemeral sessions, else the JSON file.
pub(crate) fn open_store(cfg: &AppConfig) -> Box<dyn FlagStore> {
    if env_flag("EQUILIBRIA_TUI_EPHEMERAL") {
        info!("ephemeral session: intro seen flag kept in memory");
        return Box::new(MemoryStore::new());
    }
    let path = cfg
        .storage_path
        .as_deref()
        .map(crate::chat_core::storage::expand_home)
        .unwrap_or_else(|| default_state_dir().join("state.json"));
    let store = FileStore::new(path);
    info!(path = %store.path().display(), "using flag store");
    Box::new(store)
}

pub fn run(cfg: AppConfig, cfg_path: Option<PathBuf>) -> Result<()> {
    let mut store = open_store(&cfg);
    if env_flag("EQUILIBRIA_TUI_RESET_INTRO") {
        if let Err(e) = store.delete(crate::chat_core::storage::INTRO_SEEN_KEY) {
            warn!(error = %e, "could not reset intro flag");
        }
    }
    let mut state = AppState::new(cfg, store, Instant::now());
    state.theme = crate::theme::Theme::from_env();
    state.config_path = cfg_path;
    match &state.config_path {
        Some(p) => {
            let line = format!("config: {}", p.display());
            state.dbg(line);
        }
        None => state.dbg("config: defaults"),
    }

    if env_flag("EQUILIBRIA_TUI_HEADLESS") {
        let res = run_headless(&mut state);
        state.teardown();
        return res;
    }

    // Setup terminal (interactive)
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut last_tick = Instant::now();
    let res: Result<()> = loop {
        if let Err(e) = terminal.draw(|f| ui(f, &mut state)) {
            break Err(e.into());
        }
        let timeout = state.poll_timeout(last_tick, Instant::now());
        match event::poll(timeout) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => {
                    let effs = update(
                        &mut state,
                        AppMsg::Key {
                            key,
                            at: Instant::now(),
                        },
                    );
                    run_effects(&mut state, effs);
                }
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }
        pump(&mut state, Instant::now());
        if last_tick.elapsed() >= TICK_RATE {
            let effs = update(&mut state, AppMsg::Tick(Instant::now()));
            run_effects(&mut state, effs);
            last_tick = Instant::now();
        }
        if state.quit {
            break Ok(());
        }
    };
    state.teardown();
    // Restore
    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}

/// Smoke mode: draw to a `TestBackend` for `EQUILIBRIA_TUI_TICKS` ticks,
/// replaying `EQUILIBRIA_TUI_HEADLESS_KEYS` (comma separated, one per tick).
fn run_headless(state: &mut AppState) -> Result<()> {
    let ticks: u64 = std::env::var("EQUILIBRIA_TUI_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    let mut keys: VecDeque<String> = std::env::var("EQUILIBRIA_TUI_HEADLESS_KEYS")
        .ok()
        .map(|s| s.split(',').map(|k| k.to_string()).collect())
        .unwrap_or_default();
    let backend = ratatui::backend::TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend)?;
    let mut intro_seen_visible = false;
    for _ in 0..ticks {
        terminal.draw(|f| ui(f, state))?;
        if let Some(spec) = keys.pop_front() {
            match parse_key_spec(&spec) {
                Some(key) => {
                    let effs = update(
                        state,
                        AppMsg::Key {
                            key,
                            at: Instant::now(),
                        },
                    );
                    run_effects(state, effs);
                }
                None => state.dbg(format!("headless: bad key spec {spec:?}")),
            }
        }
        std::thread::sleep(TICK_RATE);
        pump(state, Instant::now());
        let effs = update(state, AppMsg::Tick(Instant::now()));
        run_effects(state, effs);
        intro_seen_visible |= state.chat_view.intro_visible;
        if state.quit {
            break;
        }
    }
    terminal.draw(|f| ui(f, state))?;
    if env_flag("EQUILIBRIA_TUI_SMOKE_SUMMARY") {
        let summary = serde_json::json!({
            "ok": true,
            "panel_open": state.chat_view.panel_open,
            "intro_visible": state.chat_view.intro_visible,
            "intro_shown": intro_seen_visible,
            "intro_seen": state.chat.intro_seen(),
            "messages": state.panel.messages().len(),
            "ticks": state.tick,
        });
        println!("{summary}");
    }
    Ok(())
}

fn help_text(view: ChatSnapshot) -> &'static str {
    if view.intro_visible {
        "Enter next  s skip  t try now"
    } else if view.panel_open {
        "Enter send  Alt+Enter newline  PgUp/PgDn scroll  Esc close"
    } else {
        "Ctrl+K assistant  ? intro  R reset intro  F forget intro  q quit"
    }
}

pub(crate) fn ui(f: &mut Frame, state: &mut AppState) {
    let screen = f.area();
    let bg = Block::default().style(state.theme.base_style());
    f.render_widget(bg, screen);

    const DEBUG_H: u16 = 4;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(DEBUG_H),
            Constraint::Length(1),
        ])
        .split(screen);

    draw_header(f, chunks[0], &state.theme);
    draw_dashboard(f, chunks[1], state);
    draw_debug(f, chunks[2], state);
    draw_footer(f, chunks[3], state, help_text(state.chat_view));

    // Overlays, in stacking order: launcher, chat panel, intro.
    let body = Rect {
        height: screen.height.saturating_sub(1),
        ..screen
    };
    let view = state.chat_view;
    draw_launcher(
        f,
        body,
        &state.config.assistant_name,
        view.panel_open,
        &state.theme,
    );
    if view.panel_open {
        draw_chat_panel(f, body, &mut state.panel, &state.theme, state.tick);
    }
    if view.intro_visible {
        draw_intro(f, screen, &state.intro, &state.theme, state.tick);
    }
}

fn draw_dashboard(f: &mut Frame, area: Rect, state: &AppState) {
    let block = crate::widgets::chrome::panel_block("Dashboard", false, &state.theme);
    let name = &state.config.assistant_name;
    let lines = vec![
        Line::from(Span::styled(
            "Welcome back!",
            state.theme.text_active_bold(),
        )),
        Line::from(""),
        Line::from("Track expenses, manage budgets and follow your savings goal."),
        Line::from(format!(
            "Need a hand? Press Ctrl+K (or Enter) to chat with {name}."
        )),
    ];
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_debug(f: &mut Frame, area: Rect, state: &AppState) {
    let b = Block::default()
        .borders(Borders::TOP)
        .border_style(state.theme.border_unfocused())
        .title(Span::styled(
            "Debug",
            state.theme.text_muted().add_modifier(Modifier::BOLD),
        ));
    // Take last `area.height` lines
    let h = area.height as usize;
    let start = state.debug_log.len().saturating_sub(h);
    let lines: Vec<Line> = state
        .debug_log
        .iter()
        .skip(start)
        .map(|s| Line::raw(s.clone()))
        .collect();
    let p = Paragraph::new(lines)
        .style(state.theme.text_muted())
        .block(b)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}
