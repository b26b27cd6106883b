use super::*;
use crate::chat_core::storage::{FlagStore, MemoryStore, INTRO_SEEN_KEY};
use crate::model::AppConfig;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<MemoryStore>>);

impl FlagStore for SharedStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.0.borrow().read(key)
    }
    fn write(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.0.borrow_mut().write(key, value)
    }
    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        self.0.borrow_mut().delete(key)
    }
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn press(st: &mut AppState, k: KeyEvent, at: Instant) -> Vec<Effect> {
    update(st, AppMsg::Key { key: k, at })
}

fn seen_state(t0: Instant) -> (AppState, SharedStore) {
    let store = SharedStore::default();
    store
        .0
        .borrow_mut()
        .write(INTRO_SEEN_KEY, "true")
        .unwrap();
    let st = AppState::new(AppConfig::default(), Box::new(store.clone()), t0);
    (st, store)
}

#[test]
fn ctrl_k_toggles_panel_and_view_follows() {
    let t0 = Instant::now();
    let (mut st, _) = seen_state(t0);
    assert!(!st.chat_view.panel_open);
    press(&mut st, ctrl('k'), t0);
    assert!(st.chat_view.panel_open);
    press(&mut st, ctrl('K'), t0);
    assert!(!st.chat_view.panel_open);
}

#[test]
fn esc_closes_open_panel_but_not_the_intro() {
    let t0 = Instant::now();
    let (mut st, _) = seen_state(t0);
    press(&mut st, key(KeyCode::Char('?')), t0);
    assert!(st.chat_view.intro_visible);
    press(&mut st, key(KeyCode::Esc), t0);
    assert!(st.chat_view.intro_visible);
    assert!(!st.chat_view.panel_open);

    // Shortcut still works over the intro; Esc then closes only the panel.
    press(&mut st, ctrl('k'), t0);
    assert!(st.chat_view.panel_open);
    press(&mut st, key(KeyCode::Esc), t0);
    assert!(!st.chat_view.panel_open);
    assert!(st.chat_view.intro_visible);
}

#[test]
fn first_run_intro_then_try_now_opens_panel_after_delay() {
    let t0 = Instant::now();
    let store = SharedStore::default();
    let mut st = AppState::new(AppConfig::default(), Box::new(store.clone()), t0);
    assert!(!st.chat_view.intro_visible);

    update(&mut st, AppMsg::Tick(t0 + Duration::from_millis(1499)));
    assert!(!st.chat_view.intro_visible);
    update(&mut st, AppMsg::Tick(t0 + Duration::from_millis(1500)));
    assert!(st.chat_view.intro_visible);

    let at = t0 + Duration::from_secs(2);
    press(&mut st, key(KeyCode::Enter), at);
    press(&mut st, key(KeyCode::Enter), at);
    assert!(st.intro.is_last());
    press(&mut st, key(KeyCode::Char('t')), at);
    assert!(!st.chat_view.intro_visible);
    assert!(!st.chat_view.panel_open);
    assert_eq!(
        store.0.borrow().read(INTRO_SEEN_KEY).unwrap().as_deref(),
        Some("true")
    );

    update(&mut st, AppMsg::Tick(at + Duration::from_millis(299)));
    assert!(!st.chat_view.panel_open);
    update(&mut st, AppMsg::Tick(at + Duration::from_millis(300)));
    assert!(st.chat_view.panel_open);
}

#[test]
fn skip_hides_intro_and_persists() {
    let t0 = Instant::now();
    let store = SharedStore::default();
    let mut st = AppState::new(AppConfig::default(), Box::new(store.clone()), t0);
    press(&mut st, key(KeyCode::Char('?')), t0);
    press(&mut st, key(KeyCode::Char('s')), t0);
    assert!(!st.chat_view.intro_visible);
    assert!(!st.chat_view.panel_open);
    assert!(st.chat.intro_seen());
    // The explicit show cancelled the automatic intro.
    update(&mut st, AppMsg::Tick(t0 + Duration::from_secs(5)));
    assert!(!st.chat_view.intro_visible);
}

#[test]
fn intro_step_resets_when_shown_again() {
    let t0 = Instant::now();
    let (mut st, _) = seen_state(t0);
    press(&mut st, key(KeyCode::Char('?')), t0);
    press(&mut st, key(KeyCode::Enter), t0);
    assert_eq!(st.intro.step(), 1);
    press(&mut st, key(KeyCode::Char('x')), t0);
    press(&mut st, key(KeyCode::Char('?')), t0);
    assert_eq!(st.intro.step(), 0);
}

#[test]
fn submit_requests_reply_and_reply_lands() {
    let t0 = Instant::now();
    let (mut st, _) = seen_state(t0);
    press(&mut st, key(KeyCode::Enter), t0);
    assert!(st.chat_view.panel_open);
    for c in "budget".chars() {
        press(&mut st, key(KeyCode::Char(c)), t0);
    }
    let effs = press(&mut st, key(KeyCode::Enter), t0);
    assert_eq!(
        effs,
        vec![Effect::RequestReply {
            id: 1,
            prompt: "budget".into()
        }]
    );
    assert!(st.panel.is_waiting());
    assert!(st.status_text.is_some());

    update(
        &mut st,
        AppMsg::ReplyReady {
            id: 1,
            outcome: Ok("Open Budgets.".into()),
        },
    );
    assert!(!st.panel.is_waiting());
    assert!(st.status_text.is_none());
    assert_eq!(st.panel.last_assistant(), Some("Open Budgets."));
}

#[test]
fn failed_reply_falls_back_to_canned_help() {
    let t0 = Instant::now();
    let (mut st, _) = seen_state(t0);
    press(&mut st, key(KeyCode::Char('c')), t0);
    for c in "expense".chars() {
        press(&mut st, key(KeyCode::Char(c)), t0);
    }
    press(&mut st, key(KeyCode::Enter), t0);
    let effs = update(
        &mut st,
        AppMsg::ReplyReady {
            id: 1,
            outcome: Err("boom".into()),
        },
    );
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast {
            level: ToastLevel::Error,
            ..
        }]
    ));
    assert_eq!(
        st.panel.last_assistant().map(str::to_string),
        Some(canned_reply("expense"))
    );
}

#[test]
fn stale_reply_is_dropped() {
    let t0 = Instant::now();
    let (mut st, _) = seen_state(t0);
    let before = st.panel.messages().len();
    let effs = update(
        &mut st,
        AppMsg::ReplyReady {
            id: 42,
            outcome: Ok("late".into()),
        },
    );
    assert!(effs.is_empty());
    assert_eq!(st.panel.messages().len(), before);
}

#[test]
fn ctrl_y_copies_last_assistant_message() {
    let t0 = Instant::now();
    let (mut st, _) = seen_state(t0);
    press(&mut st, ctrl('k'), t0);
    let effs = press(&mut st, ctrl('y'), t0);
    assert!(matches!(effs.as_slice(), [Effect::CopyToClipboard(t)] if t.contains("BriLow")));
}

#[test]
fn reset_and_forget_keys_touch_the_flag() {
    let t0 = Instant::now();
    let (mut st, store) = seen_state(t0);
    let effs = press(&mut st, key(KeyCode::Char('F')), t0);
    assert_eq!(effs.len(), 1);
    assert_eq!(store.0.borrow().read(INTRO_SEEN_KEY).unwrap(), None);
    assert!(!st.chat_view.intro_visible);

    press(&mut st, key(KeyCode::Char('R')), t0);
    assert!(st.chat_view.intro_visible);
}

#[test]
fn quit_keys_and_release_events() {
    let t0 = Instant::now();
    let (mut st, _) = seen_state(t0);
    assert_eq!(press(&mut st, ctrl('c'), t0), vec![Effect::Quit]);
    assert_eq!(press(&mut st, key(KeyCode::Char('q')), t0), vec![Effect::Quit]);

    let mut release = ctrl('k');
    release.kind = KeyEventKind::Release;
    press(&mut st, release, t0);
    assert!(!st.chat_view.panel_open);
}

#[test]
fn toast_expires_on_tick() {
    let t0 = Instant::now();
    let (mut st, _) = seen_state(t0);
    st.toast = Some(crate::ui::Toast {
        text: "hi".into(),
        level: ToastLevel::Info,
        expires_at_tick: 2,
    });
    update(&mut st, AppMsg::Tick(t0));
    assert!(st.toast.is_some());
    update(&mut st, AppMsg::Tick(t0));
    assert!(st.toast.is_none());
}

#[test]
fn parse_key_spec_handles_modifiers_and_names() {
    assert_eq!(parse_key_spec("ctrl+k"), Some(ctrl('k')));
    assert_eq!(parse_key_spec("esc"), Some(key(KeyCode::Esc)));
    assert_eq!(parse_key_spec(" Enter "), Some(key(KeyCode::Enter)));
    assert_eq!(parse_key_spec("R"), Some(key(KeyCode::Char('R'))));
    assert_eq!(
        parse_key_spec("cmd+k"),
        Some(KeyEvent::new(KeyCode::Char('k'), KeyModifiers::SUPER))
    );
    assert_eq!(parse_key_spec(""), None);
    assert_eq!(parse_key_spec("hyper+k"), None);
    assert_eq!(parse_key_spec("kk"), None);
}
