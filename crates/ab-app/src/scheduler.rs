use std::collections::BTreeMap;
use std::time::Duration;

use ab_core::traits::{FrameRequestId, Scheduler, TimerId};

use crate::session::EffectSession;

/// Callback dû par la boucle hôte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// A frame request is due.
    Frame(FrameRequestId),
    /// A timer expired.
    Timeout(TimerId),
}

/// Boucle de frames à temps virtuel.
///
/// Frame requests fire on the next `advance`, never on the one during
/// which they were made. Timers fire once their deadline is reached.
/// Cancelled handles are forgotten; unknown handles are ignored.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ab_core::traits::Scheduler;
/// use ab_app::scheduler::{FrameLoop, HostEvent};
///
/// let mut host = FrameLoop::new();
/// let frame = host.request_frame();
/// let timer = host.set_timeout(Duration::from_millis(20));
/// assert_eq!(host.advance(Duration::from_millis(16)), vec![HostEvent::Frame(frame)]);
/// assert_eq!(host.advance(Duration::from_millis(16)), vec![HostEvent::Timeout(timer)]);
/// ```
#[derive(Debug, Default)]
pub struct FrameLoop {
    now: Duration,
    next_id: u64,
    frames: Vec<FrameRequestId>,
    timers: BTreeMap<TimerId, Duration>,
}

impl FrameLoop {
    /// Empty loop at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Frame requests waiting for the next `advance`.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Armed timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Move time forward by `dt` and collect what is due: expired timers
    /// (by deadline) first, then every frame request made before this call.
    pub fn advance(&mut self, dt: Duration) -> Vec<HostEvent> {
        self.now += dt;
        let now = self.now;

        let mut due: Vec<(Duration, TimerId)> = self
            .timers
            .iter()
            .filter(|&(_, &deadline)| deadline <= now)
            .map(|(&id, &deadline)| (deadline, id))
            .collect();
        due.sort_unstable();
        for (_, id) in &due {
            self.timers.remove(id);
        }

        let mut events: Vec<HostEvent> = due.into_iter().map(|(_, id)| HostEvent::Timeout(id)).collect();
        events.extend(self.frames.drain(..).map(HostEvent::Frame));
        events
    }
}

impl Scheduler for FrameLoop {
    fn request_frame(&mut self) -> FrameRequestId {
        let id = FrameRequestId(self.next_id());
        self.frames.push(id);
        id
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        self.frames.retain(|&f| f != id);
    }

    fn set_timeout(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id());
        self.timers.insert(id, self.now + delay);
        id
    }

    fn clear_timeout(&mut self, id: TimerId) {
        self.timers.remove(&id);
    }
}

/// Advance `host` by `dt` and deliver the due callbacks to `session`.
///
/// Returns the number of callbacks delivered (stale ones included; the
/// session ignores those).
pub fn drive(host: &mut FrameLoop, session: &mut EffectSession, dt: Duration) -> usize {
    let events = host.advance(dt);
    for event in &events {
        match *event {
            HostEvent::Frame(id) => session.on_frame(id, host),
            HostEvent::Timeout(id) => session.on_timeout(id, host),
        }
    }
    events.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_made_during_dispatch_waits_for_next_advance() {
        let mut host = FrameLoop::new();
        let first = host.request_frame();
        let events = host.advance(Duration::from_millis(16));
        assert_eq!(events, vec![HostEvent::Frame(first)]);
        let second = host.request_frame();
        assert_ne!(first, second);
        assert_eq!(host.pending_frames(), 1);
        assert_eq!(host.advance(Duration::ZERO), vec![HostEvent::Frame(second)]);
    }

    #[test]
    fn cancelled_handles_never_fire() {
        let mut host = FrameLoop::new();
        let frame = host.request_frame();
        let timer = host.set_timeout(Duration::from_millis(5));
        host.cancel_frame(frame);
        host.clear_timeout(timer);
        assert!(host.advance(Duration::from_secs(1)).is_empty());
        // Unknown handles are ignored.
        host.cancel_frame(frame);
        host.clear_timeout(TimerId(999));
    }

    #[test]
    fn timers_fire_in_deadline_order_before_frames() {
        let mut host = FrameLoop::new();
        let late = host.set_timeout(Duration::from_millis(30));
        let early = host.set_timeout(Duration::from_millis(10));
        let frame = host.request_frame();
        assert_eq!(
            host.advance(Duration::from_millis(50)),
            vec![
                HostEvent::Timeout(early),
                HostEvent::Timeout(late),
                HostEvent::Frame(frame)
            ]
        );
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn zero_delay_timer_fires_on_next_advance() {
        let mut host = FrameLoop::new();
        let timer = host.set_timeout(Duration::ZERO);
        assert_eq!(host.advance(Duration::ZERO), vec![HostEvent::Timeout(timer)]);
        assert_eq!(host.now(), Duration::ZERO);
    }
}
