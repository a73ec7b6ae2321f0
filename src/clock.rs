//! Time sources used by the [RateLimiter].
//!
//! [RateLimiter]: crate::RateLimiter

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A source of time which a [RateLimiter] reads from and sleeps on.
///
/// Readings from [Clock::now] must be consistent over the lifetime of the
/// limiter, and [Clock::sleep] must block the calling thread for at least the
/// given duration. A test clock is free to implement sleeping as an instant
/// advance of virtual time, see [MockClock].
///
/// [RateLimiter]: crate::RateLimiter
pub trait Clock {
    /// Get the current time.
    fn now(&self) -> Instant;

    /// Block the current thread for the given duration.
    fn sleep(&self, duration: Duration);
}

impl<C> Clock for &C
where
    C: ?Sized + Clock,
{
    #[inline]
    fn now(&self) -> Instant {
        (**self).now()
    }

    #[inline]
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<C> Clock for Arc<C>
where
    C: ?Sized + Clock,
{
    #[inline]
    fn now(&self) -> Instant {
        (**self).now()
    }

    #[inline]
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// The default clock, backed by [Instant::now] and [thread::sleep].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration)
    }
}

/// A clock which only moves when told to.
///
/// Sleeping on a mock clock returns immediately after advancing its virtual
/// time by the requested duration, which makes it possible to assert exact
/// pacing behavior without waiting for it.
///
/// Clones share the same virtual time, so a test can keep one handle around to
/// inspect or [advance] the clock after handing another one to a limiter.
///
/// Virtual time saturates at [MockClock::MAX_ELAPSED] past construction, so
/// readings never move backwards.
///
/// [advance]: MockClock::advance
///
/// # Examples
///
/// ```
/// use paced_limiter::{Clock, MockClock};
/// use std::time::Duration;
///
/// let clock = MockClock::new();
/// let start = clock.now();
///
/// clock.sleep(Duration::from_millis(250));
/// clock.advance(Duration::from_millis(750));
///
/// assert_eq!(clock.now().duration_since(start), Duration::from_secs(1));
/// assert_eq!(clock.elapsed(), Duration::from_secs(1));
/// ```
#[derive(Clone)]
pub struct MockClock {
    start: Instant,
    now: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// The furthest a mock clock can be advanced past its construction.
    pub const MAX_ELAPSED: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

    /// Construct a new mock clock anchored at the current instant.
    pub fn new() -> Self {
        let start = Instant::now();

        Self {
            start,
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move virtual time forward by `duration`, saturating at
    /// [MockClock::MAX_ELAPSED].
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();

        let elapsed = now
            .duration_since(self.start)
            .saturating_add(duration)
            .min(Self::MAX_ELAPSED);

        // Instants which can't be represented leave the clock where it is.
        if let Some(next) = self.start.checked_add(elapsed) {
            *now = next;
        }
    }

    /// Virtual time passed since the clock was constructed.
    pub fn elapsed(&self) -> Duration {
        self.now.lock().duration_since(self.start)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockClock")
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

impl Clock for MockClock {
    #[inline]
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    #[inline]
    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, MockClock, SystemClock};
    use std::time::Duration;

    #[test]
    fn test_system_clock_sleeps() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(10));
        assert!(clock.now().duration_since(start) >= Duration::from_millis(10));
    }

    #[test]
    fn test_mock_clock_shared_between_clones() {
        let clock = MockClock::new();
        let other = clock.clone();
        let start = clock.now();

        other.sleep(Duration::from_millis(30));
        assert_eq!(clock.elapsed(), Duration::from_millis(30));
        assert_eq!(clock.now(), other.now());
        assert_eq!(clock.now().duration_since(start), Duration::from_millis(30));
    }

    #[test]
    fn test_mock_clock_saturates() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(1));
        let before = clock.now();

        clock.advance(Duration::MAX);
        assert!(clock.now() >= before);
        assert_eq!(clock.elapsed(), MockClock::MAX_ELAPSED);

        clock.sleep(Duration::from_secs(1));
        assert_eq!(clock.now().duration_since(start), MockClock::MAX_ELAPSED);
    }

    #[test]
    fn test_mock_clock_debug() {
        let clock = MockClock::new();
        clock.advance(Duration::from_secs(2));
        assert_eq!(format!("{:?}", clock), "MockClock { elapsed: 2s }");
    }
}
