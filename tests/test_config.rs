use paced_limiter::{Error, MockClock, RateLimiter, DEFAULT_SLACK};
use std::time::Duration;

#[test]
fn test_zero_rate() {
    let error = RateLimiter::new(0, Duration::from_secs(1)).unwrap_err();
    assert_eq!(error, Error::ZeroRate);
    assert_eq!(error.to_string(), "Rate must be greater than zero");
}

#[test]
fn test_zero_interval() {
    let error = RateLimiter::new(10, Duration::ZERO).unwrap_err();
    assert_eq!(error, Error::ZeroInterval);
}

#[test]
fn test_zero_rate_reported_before_zero_interval() {
    let error = RateLimiter::new(0, Duration::ZERO).unwrap_err();
    assert_eq!(error, Error::ZeroRate);
}

#[test]
fn test_per_request_too_small() {
    let error = RateLimiter::builder(1_000, Duration::from_nanos(999))
        .clock(MockClock::new())
        .build()
        .unwrap_err();

    assert_eq!(
        error,
        Error::PerRequestTooSmall {
            rate: 1_000,
            interval: Duration::from_nanos(999),
        }
    );

    assert_eq!(
        error.to_string(),
        "Interval 999ns is too short to pace 1000 requests"
    );
}

#[test]
fn test_smallest_per_request() -> anyhow::Result<()> {
    let limiter = RateLimiter::new(1_000, Duration::from_nanos(1_000))?;
    assert_eq!(limiter.per_request(), Duration::from_nanos(1));
    Ok(())
}

#[test]
fn test_defaults() -> anyhow::Result<()> {
    let limiter = RateLimiter::new(100, Duration::from_secs(1))?;

    assert_eq!(limiter.rate(), 100);
    assert_eq!(limiter.period(), Duration::from_secs(1));
    assert_eq!(limiter.per_request(), Duration::from_millis(10));
    assert_eq!(limiter.slack(), DEFAULT_SLACK);
    assert_eq!(limiter.to_string(), "100/1s");
    Ok(())
}

#[test]
fn test_builder_overrides() -> anyhow::Result<()> {
    let clock = MockClock::new();

    let limiter = RateLimiter::builder(60, Duration::from_secs(60))
        .slack(0)
        .clock(clock.clone())
        .build()?;

    assert_eq!(limiter.slack(), 0);
    assert_eq!(limiter.per_request(), Duration::from_secs(1));
    assert_eq!(limiter.to_string(), "60/60s");
    assert_eq!(limiter.clock().elapsed(), Duration::ZERO);
    Ok(())
}
