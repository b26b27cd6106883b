use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use super::coordinator::ChatCoordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Handled; nothing else in the app sees the key.
    Consumed,
    Ignored,
}

pub trait KeyListener {
    fn on_key(&mut self, key: &KeyEvent, chat: &mut ChatCoordinator) -> KeyOutcome;
}

/// Ctrl/Cmd+K toggles the chat panel, Esc closes it while open.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyboardRouter;

pub fn is_open_shortcut(key: &KeyEvent) -> bool {
    let letter_k = matches!(key.code, KeyCode::Char(c) if c.eq_ignore_ascii_case(&'k'));
    letter_k
        && key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER | KeyModifiers::META)
}

impl KeyListener for KeyboardRouter {
    fn on_key(&mut self, key: &KeyEvent, chat: &mut ChatCoordinator) -> KeyOutcome {
        if key.kind == KeyEventKind::Release {
            return KeyOutcome::Ignored;
        }
        if is_open_shortcut(key) {
            if chat.snapshot().panel_open {
                debug!("shortcut: close chat panel");
                chat.close_chatbot();
            } else {
                debug!("shortcut: open chat panel");
                chat.open_chatbot();
            }
            return KeyOutcome::Consumed;
        }
        if key.code == KeyCode::Esc && chat.snapshot().panel_open {
            debug!("esc: close chat panel");
            chat.close_chatbot();
            return KeyOutcome::Consumed;
        }
        KeyOutcome::Ignored
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Global key listeners, consulted before any view-local handling.
/// First listener to consume a key wins.
#[derive(Default)]
pub struct KeyListeners {
    next_id: u64,
    entries: Vec<(ListenerId, Box<dyn KeyListener>)>,
}

impl KeyListeners {
    pub fn add(&mut self, listener: impl KeyListener + 'static) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, Box::new(listener)));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(lid, _)| *lid != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dispatch(&mut self, key: &KeyEvent, chat: &mut ChatCoordinator) -> KeyOutcome {
        for (_, l) in self.entries.iter_mut() {
            if l.on_key(key, chat) == KeyOutcome::Consumed {
                return KeyOutcome::Consumed;
            }
        }
        KeyOutcome::Ignored
    }
}
