use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    ShowIntro,
    OpenChatbot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Pending {
    id: TimerId,
    due: Instant,
    action: DeferredAction,
}

/// One-shot timers driven by the UI loop's clock.
///
/// Nothing fires on its own: the loop calls [`DeferredQueue::take_due`] with
/// the current instant. Once closed, pending entries are dropped and new
/// schedules are refused, so no stale action can run after teardown.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    next_id: u64,
    pending: Vec<Pending>,
    closed: bool,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(
        &mut self,
        action: DeferredAction,
        delay: Duration,
        now: Instant,
    ) -> Option<TimerId> {
        if self.closed {
            return None;
        }
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.push(Pending {
            id,
            due: now + delay,
            action,
        });
        Some(id)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        self.pending.len() != before
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Remove and return every action due at `now`, earliest first.
    /// Ties keep scheduling order.
    pub fn take_due(&mut self, now: Instant) -> Vec<(TimerId, DeferredAction)> {
        let (mut due, rest): (Vec<Pending>, Vec<Pending>) =
            std::mem::take(&mut self.pending)
                .into_iter()
                .partition(|p| p.due <= now);
        self.pending = rest;
        due.sort_by_key(|p| (p.due, p.id));
        due.into_iter().map(|p| (p.id, p.action)).collect()
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn fires_only_once_deadline_passes() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(DeferredAction::ShowIntro, 1500 * MS, t0).unwrap();
        assert!(q.take_due(t0 + 1499 * MS).is_empty());
        let fired = q.take_due(t0 + 1500 * MS);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].1, DeferredAction::ShowIntro);
        assert!(q.take_due(t0 + 10_000 * MS).is_empty());
    }

    #[test]
    fn due_actions_come_back_in_deadline_order() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(DeferredAction::ShowIntro, 500 * MS, t0);
        q.schedule(DeferredAction::OpenChatbot, 100 * MS, t0);
        assert_eq!(q.next_deadline(), Some(t0 + 100 * MS));
        let fired: Vec<_> = q
            .take_due(t0 + 1000 * MS)
            .into_iter()
            .map(|(_, a)| a)
            .collect();
        assert_eq!(
            fired,
            vec![DeferredAction::OpenChatbot, DeferredAction::ShowIntro]
        );
        assert_eq!(q.next_deadline(), None);
    }

    #[test]
    fn cancel_removes_single_entry() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        let a = q.schedule(DeferredAction::ShowIntro, 10 * MS, t0).unwrap();
        q.schedule(DeferredAction::OpenChatbot, 10 * MS, t0).unwrap();
        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn closed_queue_drops_and_refuses() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(DeferredAction::ShowIntro, 10 * MS, t0);
        q.close();
        assert!(q.is_closed());
        assert!(q.is_empty());
        assert!(q.schedule(DeferredAction::OpenChatbot, MS, t0).is_none());
        assert!(q.take_due(t0 + 1000 * MS).is_empty());
    }
}
