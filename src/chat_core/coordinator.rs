use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::deferred::{DeferredAction, DeferredQueue, TimerId};
use super::storage::{FlagStore, INTRO_SEEN_KEY};

pub const DEFAULT_INTRO_DELAY: Duration = Duration::from_millis(1500);

/// What the render layer sees of the assistant widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub panel_open: bool,
    pub intro_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(ChatSnapshot)>;

/// Owns chat panel and intro visibility, plus the persisted seen flag.
///
/// All mutation goes through the methods below; subscribers only observe.
/// Listeners run after a transition only if the snapshot actually changed.
pub struct ChatCoordinator {
    panel_open: bool,
    intro_visible: bool,
    store: Box<dyn FlagStore>,
    deferred: DeferredQueue,
    intro_timer: Option<TimerId>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for ChatCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCoordinator")
            .field("panel_open", &self.panel_open)
            .field("intro_visible", &self.intro_visible)
            .field("intro_timer", &self.intro_timer)
            .field("pending", &self.deferred.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ChatCoordinator {
    /// Reads the seen flag and, on a first run, arms the automatic intro.
    pub fn new(store: Box<dyn FlagStore>, intro_delay: Duration, now: Instant) -> Self {
        let mut me = Self {
            panel_open: false,
            intro_visible: false,
            store,
            deferred: DeferredQueue::new(),
            intro_timer: None,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        if me.intro_seen() {
            info!("user has seen the assistant intro before");
        } else {
            info!(
                delay_ms = intro_delay.as_millis() as u64,
                "first-time user: scheduling assistant intro"
            );
            me.intro_timer = me
                .deferred
                .schedule(DeferredAction::ShowIntro, intro_delay, now);
        }
        me
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            panel_open: self.panel_open,
            intro_visible: self.intro_visible,
        }
    }

    /// Persisted flag; unreadable storage counts as "not seen".
    pub fn intro_seen(&self) -> bool {
        match self.store.read(INTRO_SEEN_KEY) {
            Ok(Some(v)) => !v.is_empty() && v != "false",
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "flag store unreadable; treating intro as unseen");
                false
            }
        }
    }

    pub fn open_chatbot(&mut self) {
        self.set_panel(true);
    }

    pub fn close_chatbot(&mut self) {
        self.set_panel(false);
    }

    pub fn toggle_chatbot(&mut self) {
        let next = !self.panel_open;
        self.set_panel(next);
    }

    pub fn show_intro(&mut self) {
        info!("showing assistant intro");
        self.cancel_intro_timer();
        self.set_intro(true);
    }

    pub fn hide_intro(&mut self) {
        info!("hiding assistant intro");
        self.cancel_intro_timer();
        self.set_intro(false);
        if let Err(e) = self.store.write(INTRO_SEEN_KEY, "true") {
            warn!(error = %e, "could not persist intro seen flag");
        }
    }

    pub fn reset_intro(&mut self) {
        info!("resetting assistant intro");
        self.cancel_intro_timer();
        if let Err(e) = self.store.delete(INTRO_SEEN_KEY) {
            warn!(error = %e, "could not clear intro seen flag");
        }
        self.set_intro(true);
    }

    /// Clears the persisted flag without touching visibility; the intro
    /// comes back on the next session.
    pub fn forget_intro_seen(&mut self) {
        info!("forgetting intro seen flag; intro returns next session");
        if let Err(e) = self.store.delete(INTRO_SEEN_KEY) {
            warn!(error = %e, "could not clear intro seen flag");
        }
    }

    pub fn open_chatbot_after(&mut self, delay: Duration, now: Instant) -> Option<TimerId> {
        self.deferred.schedule(DeferredAction::OpenChatbot, delay, now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deferred.next_deadline()
    }

    /// Runs every deferred action due at `now`. Returns how many fired.
    pub fn poll_deferred(&mut self, now: Instant) -> usize {
        let due = self.deferred.take_due(now);
        let fired = due.len();
        for (id, action) in due {
            match action {
                DeferredAction::ShowIntro => {
                    if self.intro_timer == Some(id) {
                        self.intro_timer = None;
                    }
                    info!("showing assistant intro (first time user)");
                    self.set_intro(true);
                }
                DeferredAction::OpenChatbot => self.open_chatbot(),
            }
        }
        fired
    }

    /// Cancels pending deferred actions. Later polls never fire anything.
    pub fn shutdown(&mut self) {
        if !self.deferred.is_empty() {
            debug!(pending = self.deferred.len(), "cancelling deferred actions");
        }
        self.deferred.close();
        self.intro_timer = None;
    }

    pub fn is_shut_down(&self) -> bool {
        self.deferred.is_closed()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(ChatSnapshot) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn cancel_intro_timer(&mut self) {
        if let Some(id) = self.intro_timer.take() {
            self.deferred.cancel(id);
        }
    }

    fn set_panel(&mut self, open: bool) {
        if self.panel_open == open {
            return;
        }
        self.panel_open = open;
        debug!(panel_open = open, "chat panel changed");
        self.notify();
    }

    fn set_intro(&mut self, visible: bool) {
        if self.intro_visible == visible {
            return;
        }
        self.intro_visible = visible;
        self.notify();
    }

    fn notify(&mut self) {
        let snap = self.snapshot();
        for (_, l) in self.listeners.iter_mut() {
            l(snap);
        }
    }
}
