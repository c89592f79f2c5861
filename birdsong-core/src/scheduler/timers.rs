//! Single-shot timers on an emitter's local clock.

/// A timer that holds at most one pending action.
///
/// Arming replaces whatever was pending, which is how a successor transition
/// supersedes its predecessor. A timer only fires on a tick after the one it
/// was armed in, so zero-length waits resume on the next tick.
#[derive(Debug, Clone)]
pub(crate) struct TimerSlot<T> {
    pending: Option<Pending<T>>,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    due: f64,
    armed_tick: u64,
    action: T,
}

impl<T> TimerSlot<T> {
    pub(crate) fn new() -> Self {
        Self { pending: None }
    }

    pub(crate) fn arm(&mut self, now: f64, tick: u64, delay: f32, action: T) {
        self.pending = Some(Pending {
            due: now + f64::from(delay.max(0.0)),
            armed_tick: tick,
            action,
        });
    }

    pub(crate) fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn action(&self) -> Option<&T> {
        self.pending.as_ref().map(|pending| &pending.action)
    }

    /// Due time of the pending action if it may fire at `now` during `tick`.
    pub(crate) fn due_at(&self, now: f64, tick: u64) -> Option<f64> {
        self.pending
            .as_ref()
            .filter(|pending| pending.armed_tick < tick && pending.due <= now)
            .map(|pending| pending.due)
    }

    pub(crate) fn take(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_only_after_due() {
        let mut slot = TimerSlot::new();
        slot.arm(0.0, 0, 1.5, "next");
        assert_eq!(slot.due_at(1.0, 1), None);
        assert_eq!(slot.due_at(1.5, 2), Some(1.5));
        assert_eq!(slot.take(), Some("next"));
        assert!(!slot.is_armed());
    }

    #[test]
    fn test_zero_delay_waits_for_next_tick() {
        let mut slot = TimerSlot::new();
        slot.arm(2.0, 5, 0.0, ());
        assert_eq!(slot.due_at(2.0, 5), None);
        assert_eq!(slot.due_at(2.0, 6), Some(2.0));
    }

    #[test]
    fn test_arm_replaces_pending() {
        let mut slot = TimerSlot::new();
        slot.arm(0.0, 0, 10.0, 1);
        slot.arm(0.0, 0, 1.0, 2);
        assert_eq!(slot.action(), Some(&2));
        assert_eq!(slot.due_at(1.0, 1), Some(1.0));
        assert!(slot.cancel());
        assert!(!slot.cancel());
    }
}
