#![deny(missing_docs)]
//! A blocking rate limiter which paces calls evenly over time.
//!
//! A [RateLimiter] is configured with a `rate` of operations allowed per
//! `interval`. Every call to [RateLimiter::take] blocks the calling thread
//! just long enough for calls to be spaced `interval / rate` apart, so a
//! burst of callers is smoothed out into a steady stream rather than being
//! admitted all at once.
//!
//! If calls arrive slower than the configured rate, the limiter banks the
//! difference as *slack*. Banked slack lets a later burst through without
//! delay, but it is capped to a configurable number of requests (10 by
//! default) so that a long idle period can't release an unbounded burst.
//!
//! The limiter only ever delays. It never rejects a call and a call that is
//! waiting can't be cancelled.
//!
//! ## Usage
//!
//! Add the following to your `Cargo.toml`:
//!
//! ```toml
//! paced-limiter = "0.1.0"
//! ```
//!
//! ## Example
//!
//! ```
//! use paced_limiter::RateLimiter;
//! use std::time::{Duration, Instant};
//!
//! let limiter = RateLimiter::new(100, Duration::from_secs(1))?;
//! assert_eq!(limiter.to_string(), "100/1s");
//!
//! let start = Instant::now();
//!
//! // The first call is admitted immediately, the next four are spaced
//! // 10 milliseconds apart.
//! for _ in 0..5 {
//!     limiter.take();
//! }
//!
//! assert!(start.elapsed() >= Duration::from_millis(40));
//! # Ok::<_, paced_limiter::Error>(())
//! ```
//!
//! ## Testing with a mock clock
//!
//! The limiter reads time through the [Clock] trait. Using a [MockClock]
//! allows for asserting exact pacing behavior in virtual time, since sleeping
//! on it returns immediately.
//!
//! ```
//! use paced_limiter::{MockClock, RateLimiter};
//! use std::time::Duration;
//!
//! let clock = MockClock::new();
//!
//! let limiter = RateLimiter::builder(4, Duration::from_secs(1))
//!     .clock(clock.clone())
//!     .build()?;
//!
//! for _ in 0..9 {
//!     limiter.take();
//! }
//!
//! assert_eq!(clock.elapsed(), Duration::from_secs(2));
//! # Ok::<_, paced_limiter::Error>(())
//! ```
//!
//! ## Concurrency
//!
//! A limiter is shared between threads by reference, typically through an
//! [Arc]. Calls to [RateLimiter::take] are serialized by an internal lock,
//! which is held while sleeping. Callers are therefore admitted strictly one
//! at a time, in the order they acquire the lock.
//!
//! [Arc]: std::sync::Arc

use std::convert::TryFrom;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;

mod clock;
pub use self::clock::{Clock, MockClock, SystemClock};

/// Number of requests worth of slack a limiter may bank by default.
pub const DEFAULT_SLACK: usize = 10;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Error raised when a [RateLimiter] is given an invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The rate was zero.
    #[error("Rate must be greater than zero")]
    ZeroRate,
    /// The interval was zero.
    #[error("Interval must be greater than zero")]
    ZeroInterval,
    /// The interval is too short to allot a non-zero duration to each request.
    #[error("Interval {interval:?} is too short to pace {rate} requests")]
    PerRequestTooSmall {
        /// The configured rate.
        rate: usize,
        /// The configured interval.
        interval: Duration,
    },
    /// The amount of slack can't be represented.
    #[error("Slack of {slack} requests at {per_request:?} each is too large")]
    SlackOverflow {
        /// The configured slack multiplier.
        slack: usize,
        /// The duration allotted to each request.
        per_request: Duration,
    },
}

/// Builder for a [RateLimiter].
///
/// Constructed through [RateLimiter::builder].
pub struct Builder<C = SystemClock> {
    rate: usize,
    interval: Duration,
    slack: usize,
    clock: C,
}

impl<C> Builder<C> {
    /// Set how many requests worth of slack the limiter is allowed to bank
    /// when calls arrive slower than the configured rate.
    ///
    /// Defaults to [DEFAULT_SLACK]. Setting it to `0` disables banking
    /// entirely, so every call is paced relative to the one before it.
    ///
    /// # Examples
    ///
    /// ```
    /// use paced_limiter::{MockClock, RateLimiter};
    /// use std::time::Duration;
    ///
    /// let clock = MockClock::new();
    ///
    /// let limiter = RateLimiter::builder(10, Duration::from_secs(1))
    ///     .slack(0)
    ///     .clock(clock.clone())
    ///     .build()?;
    ///
    /// limiter.take();
    /// clock.advance(Duration::from_secs(10));
    ///
    /// // Nothing was banked while idle, so only one call gets through
    /// // without waiting.
    /// limiter.take();
    /// let start = clock.elapsed();
    /// limiter.take();
    /// assert_eq!(clock.elapsed() - start, Duration::from_millis(100));
    /// # Ok::<_, paced_limiter::Error>(())
    /// ```
    #[inline]
    pub fn slack(mut self, slack: usize) -> Self {
        self.slack = slack;
        self
    }

    /// Use the given clock for reading time and sleeping.
    ///
    /// Defaults to [SystemClock].
    #[inline]
    pub fn clock<D>(self, clock: D) -> Builder<D>
    where
        D: Clock,
    {
        Builder {
            rate: self.rate,
            interval: self.interval,
            slack: self.slack,
            clock,
        }
    }

    /// Construct the rate limiter.
    ///
    /// # Errors
    ///
    /// Errors if the rate or interval is zero, if the interval is too short to
    /// give each request a non-zero duration, or if the configured slack can't
    /// be represented.
    ///
    /// ```
    /// use paced_limiter::{Error, RateLimiter};
    /// use std::time::Duration;
    ///
    /// let error = RateLimiter::builder(0, Duration::from_secs(1)).build().unwrap_err();
    /// assert_eq!(error, Error::ZeroRate);
    /// ```
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            level = "trace",
            skip(self),
            fields(rate = self.rate, interval = ?self.interval, slack = self.slack)
        )
    )]
    pub fn build(self) -> Result<RateLimiter<C>, Error>
    where
        C: Clock,
    {
        if self.rate == 0 {
            return Err(Error::ZeroRate);
        }

        if self.interval.is_zero() {
            return Err(Error::ZeroInterval);
        }

        let per_request = split_interval(self.interval, self.rate);

        if per_request.is_zero() {
            return Err(Error::PerRequestTooSmall {
                rate: self.rate,
                interval: self.interval,
            });
        }

        let per_request_nanos = per_request.as_nanos() as i128;

        let max_slack = i128::try_from(self.slack)
            .ok()
            .and_then(|slack| slack.checked_mul(per_request_nanos))
            .ok_or(Error::SlackOverflow {
                slack: self.slack,
                per_request,
            })?;

        #[cfg(feature = "tracing")]
        tracing::trace!(?per_request, max_slack = ?nanos_to_duration(max_slack), "derived pacing");

        Ok(RateLimiter {
            rate: self.rate,
            interval: self.interval,
            per_request,
            per_request_nanos,
            slack: self.slack,
            max_slack: -max_slack,
            clock: self.clock,
            state: Mutex::new(State {
                last: None,
                sleep_for: 0,
            }),
        })
    }
}

/// Mutable pacing state, guarded by the limiter's lock.
struct State {
    /// When the last call was admitted, or `None` before the first call.
    last: Option<Instant>,
    /// Signed nanoseconds owed by the next call.
    ///
    /// Positive means the next call has to sleep, negative means calls are
    /// ahead of schedule by that much. Never below `max_slack`.
    sleep_for: i128,
}

/// A rate limiter which paces calls to [RateLimiter::take] so that on average
/// at most `rate` calls complete per `interval`.
///
/// See the [crate-level documentation](crate) for more.
pub struct RateLimiter<C = SystemClock> {
    rate: usize,
    interval: Duration,
    per_request: Duration,
    per_request_nanos: i128,
    slack: usize,
    /// Lower bound for the accumulator, `-(slack * per_request)` nanoseconds.
    max_slack: i128,
    clock: C,
    state: Mutex<State>,
}

impl RateLimiter {
    /// Construct a rate limiter allowing `rate` calls per `interval`, using
    /// the default amount of slack and the system clock.
    ///
    /// # Errors
    ///
    /// Errors under the same conditions as [Builder::build].
    ///
    /// # Examples
    ///
    /// ```
    /// use paced_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let limiter = RateLimiter::new(100, Duration::from_secs(1))?;
    /// assert_eq!(limiter.per_request(), Duration::from_millis(10));
    /// # Ok::<_, paced_limiter::Error>(())
    /// ```
    pub fn new(rate: usize, interval: Duration) -> Result<Self, Error> {
        Self::builder(rate, interval).build()
    }

    /// Construct a builder for a rate limiter allowing `rate` calls per
    /// `interval`.
    pub fn builder(rate: usize, interval: Duration) -> Builder {
        Builder {
            rate,
            interval,
            slack: DEFAULT_SLACK,
            clock: SystemClock,
        }
    }
}

impl<C> RateLimiter<C>
where
    C: Clock,
{
    /// Block until the calling thread is allowed to proceed, returning the
    /// instant at which the call is considered admitted.
    ///
    /// The first call is always admitted immediately. After that, calls are
    /// spaced [per_request] apart on average. Calls arriving later than
    /// scheduled bank the difference as credit, up to the configured slack,
    /// which later calls spend by proceeding without delay.
    ///
    /// The returned instant is derived from the clock reading taken at the
    /// start of the call: it is the reading itself if no sleep was needed, or
    /// the reading plus the time slept.
    ///
    /// [per_request]: RateLimiter::per_request
    ///
    /// # Examples
    ///
    /// ```
    /// use paced_limiter::{MockClock, RateLimiter};
    /// use std::time::Duration;
    ///
    /// let clock = MockClock::new();
    ///
    /// let limiter = RateLimiter::builder(100, Duration::from_secs(1))
    ///     .clock(clock.clone())
    ///     .build()?;
    ///
    /// let a = limiter.take();
    /// let b = limiter.take();
    /// assert_eq!(b.duration_since(a), Duration::from_millis(10));
    /// # Ok::<_, paced_limiter::Error>(())
    /// ```
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self), fields(limiter = %self)))]
    pub fn take(&self) -> Instant {
        let mut state = self.state.lock();
        let now = self.clock.now();

        let last = match state.last {
            Some(last) => last,
            None => {
                #[cfg(feature = "tracing")]
                tracing::trace!("first call admitted");
                state.last = Some(now);
                return now;
            }
        };

        state.sleep_for = state
            .sleep_for
            .saturating_add(self.per_request_nanos)
            .saturating_sub(signed_elapsed(last, now));

        if state.sleep_for < self.max_slack {
            state.sleep_for = self.max_slack;
        }

        let admitted = if state.sleep_for > 0 {
            let sleep = nanos_to_duration(state.sleep_for);
            #[cfg(feature = "tracing")]
            tracing::trace!(?sleep, "sleeping");
            self.clock.sleep(sleep);
            state.sleep_for = 0;
            now.checked_add(sleep).unwrap_or(now)
        } else {
            // Credit is kept for the next call.
            #[cfg(feature = "tracing")]
            tracing::trace!(credit = ?nanos_to_duration(-state.sleep_for), "admitted ahead of schedule");
            now
        };

        state.last = Some(admitted);
        admitted
    }

    /// Access the clock used by this limiter.
    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C> RateLimiter<C> {
    /// The number of calls allowed per [period].
    ///
    /// [period]: RateLimiter::period
    #[inline]
    pub fn rate(&self) -> usize {
        self.rate
    }

    /// The interval over which [rate] calls are allowed.
    ///
    /// [rate]: RateLimiter::rate
    #[inline]
    pub fn period(&self) -> Duration {
        self.interval
    }

    /// The ideal spacing between two admitted calls, `period / rate`.
    #[inline]
    pub fn per_request(&self) -> Duration {
        self.per_request
    }

    /// How many requests worth of slack this limiter may bank.
    #[inline]
    pub fn slack(&self) -> usize {
        self.slack
    }
}

impl<C> fmt::Display for RateLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:?}", self.rate, self.interval)
    }
}

impl<C> fmt::Debug for RateLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate", &self.rate)
            .field("interval", &self.interval)
            .field("per_request", &self.per_request)
            .field("max_slack", &nanos_to_duration(-self.max_slack))
            .finish()
    }
}

/// Divide `interval` into `rate` equal parts, truncating to whole nanoseconds.
fn split_interval(interval: Duration, rate: usize) -> Duration {
    // A part is never longer than the interval, so its seconds fit in a u64.
    let nanos = interval.as_nanos() / rate as u128;
    let secs = (nanos / NANOS_PER_SEC as u128) as u64;
    let subsec = (nanos % NANOS_PER_SEC as u128) as u32;
    Duration::new(secs, subsec)
}

/// Nanoseconds from `from` to `to`, negative if `to` is earlier.
fn signed_elapsed(from: Instant, to: Instant) -> i128 {
    match to.checked_duration_since(from) {
        Some(elapsed) => elapsed.as_nanos() as i128,
        None => -(from.duration_since(to).as_nanos() as i128),
    }
}

/// Convert signed nanoseconds into a duration, saturating at zero.
fn nanos_to_duration(nanos: i128) -> Duration {
    if nanos <= 0 {
        return Duration::ZERO;
    }

    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
}
