//! Exam countdown.
//!
//! The countdown has no background task. A host awaits [`Countdown::next_event`],
//! which sleeps until the next tick boundary and only then advances the
//! schedule. Dropping that future (for example when another `select!` branch
//! wins) or calling [`Countdown::cancel`] therefore leaves nothing in flight:
//! once cancelled, no tick or expiry can be observed.

use std::time::Duration;

use tokio::time::Instant;

/// An event produced by an armed countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// A visible tick; `remaining` is the time left until the deadline.
    Tick { remaining: Duration },
    /// The deadline elapsed. Emitted once per arming.
    Expired,
}

#[derive(Debug, Clone, Copy)]
struct Schedule {
    deadline: Instant,
    next_tick: Instant,
}

/// A single cancellable countdown.
#[derive(Debug)]
pub struct Countdown {
    tick_interval: Duration,
    schedule: Option<Schedule>,
}

impl Countdown {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            schedule: None,
        }
    }

    /// Start counting down from `duration`, replacing any running countdown.
    ///
    /// Returns `false`, leaving the countdown stopped, when the deadline is
    /// too far away to represent.
    pub fn arm(&mut self, duration: Duration) -> bool {
        self.cancel();
        let now = Instant::now();
        let Some(deadline) = now.checked_add(duration) else {
            tracing::warn!(secs = duration.as_secs(), "countdown deadline out of range");
            return false;
        };
        self.schedule = Some(Schedule {
            deadline,
            next_tick: tick_after(now, self.tick_interval, deadline),
        });
        tracing::debug!(secs = duration.as_secs(), "countdown armed");
        true
    }

    /// Stop the countdown. Returns `false` if it was not running.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.schedule.take().is_some();
        if was_armed {
            tracing::debug!("countdown cancelled");
        }
        was_armed
    }

    pub fn is_armed(&self) -> bool {
        self.schedule.is_some()
    }

    /// Time left until the deadline, or `None` when not armed.
    pub fn remaining(&self) -> Option<Duration> {
        self.schedule
            .map(|s| s.deadline.saturating_duration_since(Instant::now()))
    }

    /// Wait for the next tick or the expiry.
    ///
    /// Never resolves while the countdown is not armed.
    pub async fn next_event(&mut self) -> ClockEvent {
        let Some(schedule) = self.schedule else {
            return std::future::pending().await;
        };

        tokio::time::sleep_until(schedule.next_tick).await;

        if schedule.next_tick >= schedule.deadline {
            self.schedule = None;
            tracing::debug!("countdown expired");
            return ClockEvent::Expired;
        }

        self.schedule = Some(Schedule {
            next_tick: tick_after(schedule.next_tick, self.tick_interval, schedule.deadline),
            ..schedule
        });
        ClockEvent::Tick {
            remaining: schedule.deadline - schedule.next_tick,
        }
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// The tick one `interval` after `from`, never past `deadline`.
fn tick_after(from: Instant, interval: Duration, deadline: Instant) -> Instant {
    from.checked_add(interval).map_or(deadline, |tick| tick.min(deadline))
}

/// Format time left as `MM:SS`, rounding partial seconds up.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_millis().div_ceil(1000);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_then_expires_once() {
        let mut clock = Countdown::new(Duration::from_secs(1));
        clock.arm(Duration::from_secs(3));
        let start = Instant::now();

        assert_eq!(
            clock.next_event().await,
            ClockEvent::Tick {
                remaining: Duration::from_secs(2)
            }
        );
        assert_eq!(
            clock.next_event().await,
            ClockEvent::Tick {
                remaining: Duration::from_secs(1)
            }
        );
        assert_eq!(clock.next_event().await, ClockEvent::Expired);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert!(!clock.is_armed());

        let again = tokio::time::timeout(Duration::from_secs(60), clock.next_event()).await;
        assert!(again.is_err(), "expiry must not fire twice");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_all_events() {
        let mut clock = Countdown::new(Duration::from_secs(1));
        clock.arm(Duration::from_secs(1));
        tokio::time::advance(Duration::from_millis(998)).await;

        assert!(clock.cancel());
        assert!(!clock.cancel(), "second cancel is a no-op");

        let late = tokio::time::timeout(Duration::from_secs(5), clock.next_event()).await;
        assert!(late.is_err(), "no late expiry after cancel");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_wait_does_not_lose_the_schedule() {
        let mut clock = Countdown::new(Duration::from_secs(10));
        clock.arm(Duration::from_secs(10));

        let lost = tokio::time::timeout(Duration::from_secs(4), clock.next_event()).await;
        assert!(lost.is_err());
        assert!(clock.is_armed());
        assert_eq!(clock.remaining(), Some(Duration::from_secs(6)));
        assert_eq!(clock.next_event().await, ClockEvent::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_deadline() {
        let mut clock = Countdown::new(Duration::from_secs(60));
        clock.arm(Duration::from_secs(1));
        clock.arm(Duration::from_secs(5));
        let start = Instant::now();
        assert_eq!(clock.next_event().await, ClockEvent::Expired);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_deadline_is_not_armed() {
        let mut clock = Countdown::new(Duration::from_secs(1));
        clock.arm(Duration::from_secs(5));

        assert!(!clock.arm(Duration::MAX));
        assert!(!clock.is_armed());
        let r = tokio::time::timeout(Duration::from_secs(60), clock.next_event()).await;
        assert!(r.is_err(), "previous countdown was replaced");
    }

    #[tokio::test(start_paused = true)]
    async fn huge_tick_interval_goes_straight_to_expiry() {
        let mut clock = Countdown::new(Duration::MAX);
        assert!(clock.arm(Duration::from_secs(2)));
        let start = Instant::now();
        assert_eq!(clock.next_event().await, ClockEvent::Expired);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn unarmed_clock_never_fires() {
        let mut clock = Countdown::default();
        assert_eq!(clock.remaining(), None);
        let r = tokio::time::timeout(Duration::from_secs(3600), clock.next_event()).await;
        assert!(r.is_err());
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_remaining(Duration::from_secs(1200)), "20:00");
        assert_eq!(format_remaining(Duration::from_secs(299)), "04:59");
        assert_eq!(format_remaining(Duration::from_millis(500)), "00:01");
        assert_eq!(format_remaining(Duration::ZERO), "00:00");
    }
}
