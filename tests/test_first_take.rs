use paced_limiter::{Clock, MockClock, RateLimiter};
use std::time::{Duration, Instant};

#[test]
fn test_first_take_is_immediate() -> anyhow::Result<()> {
    for &(rate, interval) in &[
        (1, Duration::from_secs(3600)),
        (100, Duration::from_secs(1)),
        (7, Duration::from_millis(13)),
    ] {
        for &slack in &[0, 1, 10, 1000] {
            let clock = MockClock::new();
            let start = clock.now();

            let limiter = RateLimiter::builder(rate, interval)
                .slack(slack)
                .clock(clock.clone())
                .build()?;

            assert_eq!(limiter.take(), start);
            assert_eq!(clock.elapsed(), Duration::ZERO);
        }
    }

    Ok(())
}

#[test]
fn test_first_take_is_immediate_with_system_clock() -> anyhow::Result<()> {
    let limiter = RateLimiter::new(1, Duration::from_secs(3600))?;

    let start = Instant::now();
    let admitted = limiter.take();

    assert!(admitted >= start);
    assert!(start.elapsed() < Duration::from_secs(1));
    Ok(())
}

#[test]
fn test_first_take_after_idle_is_not_paced() -> anyhow::Result<()> {
    let clock = MockClock::new();

    let limiter = RateLimiter::builder(10, Duration::from_secs(1))
        .clock(clock.clone())
        .build()?;

    // Time passing before the first call is not banked.
    clock.advance(Duration::from_secs(60));

    let first = limiter.take();
    assert_eq!(first, clock.now());

    let second = limiter.take();
    assert_eq!(second.duration_since(first), Duration::from_millis(100));
    Ok(())
}
