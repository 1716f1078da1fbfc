//! # Failsafe Supervisor
//!
//! Tracks how long ago the last valid frame arrived and decides whether the
//! link is considered lost.
//!
//! The state is level-triggered: [`LinkState::evaluate`] reports edges for
//! logging, but callers must consult [`LinkState::status`] every cycle and
//! keep the motors stopped for as long as it says `Failsafe`.

use std::time::Duration;
use tokio::time::Instant;

/// Timer resolution used to turn "age exceeds timeout" into an instant
const STALE_RESOLUTION: Duration = Duration::from_millis(1);

/// Link supervision state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Running,
    Failsafe,
}

/// Edge reported when the status changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTransition {
    /// No valid frame for longer than the timeout
    Lost { silence: Duration },
    /// A valid frame arrived while in failsafe
    Recovered { outage: Duration },
}

/// Time of the last validated frame and the resulting link status
#[derive(Debug, Clone)]
pub struct LinkState {
    timeout: Duration,
    last_frame: Instant,
    status: LinkStatus,
    failsafe_since: Option<Instant>,
    failsafe_entries: u64,
}

impl LinkState {
    /// Start supervising at `now`; the timeout window opens immediately.
    #[must_use]
    pub fn new(now: Instant, timeout: Duration) -> Self {
        Self {
            timeout,
            last_frame: now,
            status: LinkStatus::Running,
            failsafe_since: None,
            failsafe_entries: 0,
        }
    }

    #[must_use]
    pub fn status(&self) -> LinkStatus {
        self.status
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of times the link has entered failsafe
    #[must_use]
    pub fn failsafe_entries(&self) -> u64 {
        self.failsafe_entries
    }

    /// Time since the last validated frame
    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_frame)
    }

    /// First instant at which the link counts as stale, unless a frame
    /// arrives before it
    #[must_use]
    pub fn stale_at(&self) -> Instant {
        self.last_frame + self.timeout + STALE_RESOLUTION
    }

    /// `true` once the link age strictly exceeds the timeout
    #[must_use]
    pub fn is_stale(&self, now: Instant) -> bool {
        self.age(now) > self.timeout
    }

    /// Record a validated frame received at `now`
    pub fn record_frame(&mut self, now: Instant) {
        self.last_frame = now;
    }

    /// Recompute the status for `now`, returning the edge if it changed
    pub fn evaluate(&mut self, now: Instant) -> Option<LinkTransition> {
        let stale = self.is_stale(now);

        match (self.status, stale) {
            (LinkStatus::Running, true) => {
                self.status = LinkStatus::Failsafe;
                self.failsafe_since = Some(now);
                self.failsafe_entries += 1;
                Some(LinkTransition::Lost {
                    silence: self.age(now),
                })
            }
            (LinkStatus::Failsafe, false) => {
                self.status = LinkStatus::Running;
                let outage = self
                    .failsafe_since
                    .take()
                    .map(|since| now.saturating_duration_since(since))
                    .unwrap_or_default();
                Some(LinkTransition::Recovered { outage })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[test]
    fn test_starts_running() {
        let t0 = Instant::now();
        let mut link = LinkState::new(t0, TIMEOUT);

        assert_eq!(link.status(), LinkStatus::Running);
        assert_eq!(link.evaluate(t0), None);
        assert_eq!(link.failsafe_entries(), 0);
    }

    #[test]
    fn test_exact_timeout_is_not_stale() {
        let t0 = Instant::now();
        let link = LinkState::new(t0, TIMEOUT);

        assert!(!link.is_stale(t0 + TIMEOUT));
        assert!(link.is_stale(t0 + TIMEOUT + Duration::from_millis(1)));
    }

    #[test]
    fn test_stale_at_is_first_stale_instant() {
        let t0 = Instant::now();
        let mut link = LinkState::new(t0, TIMEOUT);

        assert!(link.is_stale(link.stale_at()));
        assert!(!link.is_stale(link.stale_at() - STALE_RESOLUTION));

        let later = t0 + Duration::from_millis(300);
        link.record_frame(later);
        assert_eq!(link.stale_at(), later + TIMEOUT + STALE_RESOLUTION);
    }

    #[test]
    fn test_enters_failsafe_once() {
        let t0 = Instant::now();
        let mut link = LinkState::new(t0, TIMEOUT);

        let lost_at = t0 + Duration::from_millis(550);
        assert_eq!(
            link.evaluate(lost_at),
            Some(LinkTransition::Lost {
                silence: Duration::from_millis(550)
            })
        );
        assert_eq!(link.status(), LinkStatus::Failsafe);

        // Level stays, no repeated edge
        assert_eq!(link.evaluate(lost_at + Duration::from_secs(3)), None);
        assert_eq!(link.status(), LinkStatus::Failsafe);
        assert_eq!(link.failsafe_entries(), 1);
    }

    #[test]
    fn test_recovers_on_next_frame() {
        let t0 = Instant::now();
        let mut link = LinkState::new(t0, TIMEOUT);

        let lost_at = t0 + Duration::from_millis(600);
        link.evaluate(lost_at);

        let back_at = lost_at + Duration::from_millis(400);
        link.record_frame(back_at);
        assert_eq!(
            link.evaluate(back_at),
            Some(LinkTransition::Recovered {
                outage: Duration::from_millis(400)
            })
        );
        assert_eq!(link.status(), LinkStatus::Running);
    }

    #[test]
    fn test_frames_keep_link_alive() {
        let t0 = Instant::now();
        let mut link = LinkState::new(t0, TIMEOUT);

        for step in 1..=20 {
            let now = t0 + Duration::from_millis(100 * step);
            link.record_frame(now);
            assert_eq!(link.evaluate(now), None);
        }
        assert_eq!(link.status(), LinkStatus::Running);
    }

    #[test]
    fn test_counts_repeated_outages() {
        let t0 = Instant::now();
        let mut link = LinkState::new(t0, TIMEOUT);

        let mut now = t0;
        for _ in 0..3 {
            now += Duration::from_secs(1);
            link.evaluate(now);
            link.record_frame(now);
            link.evaluate(now);
        }
        assert_eq!(link.failsafe_entries(), 3);
        assert_eq!(link.status(), LinkStatus::Running);
    }
}
