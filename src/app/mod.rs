use crate::chat_core::KeyOutcome;
use crate::services::responder::canned_reply;
use crate::ui::{AppState, ToastLevel};
use crate::widgets::chat_panel::{PanelAction, Role};
use crate::widgets::intro::IntroAction;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Instant;
use tracing::{info, warn};

pub enum AppMsg {
    Key { key: KeyEvent, at: Instant },
    Tick(Instant),
    ReplyReady {
        id: u64,
        outcome: Result<String, String>,
    },
}

#[derive(Debug, PartialEq)]
pub enum Effect {
    RequestReply {
        id: u64,
        prompt: String,
    },
    CopyToClipboard(String),
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
    Quit,
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        AppMsg::Key { key, at } => handle_key(state, key, at, &mut effects),
        AppMsg::Tick(now) => {
            let fired = state.chat.poll_deferred(now);
            if fired > 0 {
                state.dbg(format!("deferred actions fired: {fired}"));
            }
            state.tick = state.tick.wrapping_add(1);
            if let Some(t) = &state.toast {
                if state.tick >= t.expires_at_tick {
                    state.toast = None;
                }
            }
        }
        AppMsg::ReplyReady { id, outcome } => {
            let prompt = state.prompts.remove(&id).unwrap_or_default();
            if !state.panel.finish_reply(id) {
                state.dbg(format!("dropping stale reply #{id}"));
            } else {
                match outcome {
                    Ok(text) => state.panel.push(Role::Assistant, text),
                    Err(e) => {
                        warn!(id, error = %e, "reply failed; using built-in help");
                        state.dbg(format!("reply #{id} failed: {e}"));
                        state.panel.push(Role::System, "Assistant unavailable; offline answer:");
                        state.panel.push(Role::Assistant, canned_reply(&prompt));
                        effects.push(Effect::ShowToast {
                            text: "Assistant unavailable; showing built-in help".into(),
                            level: ToastLevel::Error,
                            seconds: 4,
                        });
                    }
                }
                if !state.panel.is_waiting() {
                    state.status_text = None;
                }
            }
        }
    }
    state.sync_chat_view();
    effects
}

fn handle_key(state: &mut AppState, key: KeyEvent, at: Instant, effects: &mut Vec<Effect>) {
    if key.kind == KeyEventKind::Release {
        return;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        effects.push(Effect::Quit);
        return;
    }
    // Global listeners (chat shortcut router) see every key first.
    if state.keys.dispatch(&key, &mut state.chat) == KeyOutcome::Consumed {
        return;
    }
    let snap = state.chat.snapshot();

    // The intro is modal while visible.
    if snap.intro_visible {
        match state.intro.on_key(key.code) {
            IntroAction::TryNow => {
                info!("intro: try now");
                state.chat.hide_intro();
                let delay = state.config.try_now_delay();
                state.chat.open_chatbot_after(delay, at);
            }
            IntroAction::Skip => {
                info!("intro: skipped");
                state.chat.hide_intro();
            }
            IntroAction::Next | IntroAction::None => {}
        }
        return;
    }

    if snap.panel_open {
        match state.panel.on_key(&key) {
            PanelAction::Submit(prompt) => {
                state.next_reply_id += 1;
                let id = state.next_reply_id;
                state.panel.push(Role::User, prompt.clone());
                state.panel.begin_reply(id);
                state.prompts.insert(id, prompt.clone());
                state.status_text = Some(format!("{} is thinking…", state.config.assistant_name));
                effects.push(Effect::RequestReply { id, prompt });
            }
            PanelAction::CopyLast => {
                if let Some(text) = state.panel.last_assistant() {
                    effects.push(Effect::CopyToClipboard(text.to_string()));
                }
            }
            PanelAction::None => {}
        }
        return;
    }

    // Dashboard-level keys
    match key.code {
        KeyCode::Char('q') => effects.push(Effect::Quit),
        KeyCode::Enter | KeyCode::Char('c') => state.chat.open_chatbot(),
        KeyCode::Char('?') => state.chat.show_intro(),
        KeyCode::Char('R') => {
            state.chat.reset_intro();
            effects.push(Effect::ShowToast {
                text: "Intro reset".into(),
                level: ToastLevel::Info,
                seconds: 3,
            });
        }
        KeyCode::Char('F') => {
            state.chat.forget_intro_seen();
            effects.push(Effect::ShowToast {
                text: "Intro will show again next session".into(),
                level: ToastLevel::Info,
                seconds: 3,
            });
        }
        _ => {}
    }
}

/// Parse a headless key script entry such as `ctrl+k`, `esc`, `enter` or `t`.
pub fn parse_key_spec(spec: &str) -> Option<KeyEvent> {
    let spec = spec.trim();
    if spec.is_empty() {
        return None;
    }
    let mut modifiers = KeyModifiers::NONE;
    let mut parts: Vec<&str> = spec.split('+').collect();
    let last = parts.pop()?;
    for m in parts {
        match m.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
            "alt" => modifiers |= KeyModifiers::ALT,
            "shift" => modifiers |= KeyModifiers::SHIFT,
            "cmd" | "super" => modifiers |= KeyModifiers::SUPER,
            "meta" => modifiers |= KeyModifiers::META,
            _ => return None,
        }
    }
    let code = match last.to_ascii_lowercase().as_str() {
        "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "space" => KeyCode::Char(' '),
        _ => {
            let mut chars = last.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };
    Some(KeyEvent::new(code, modifiers))
}

// Keep test module at the very end to satisfy clippy::items-after-test-module
#[cfg(test)]
mod tests;
