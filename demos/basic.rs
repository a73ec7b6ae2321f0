use anyhow::Result;
use paced_limiter::RateLimiter;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    helpers::init_logging();

    let limiter = RateLimiter::new(10, Duration::from_secs(1))?;
    println!("Pacing at {}", limiter);

    let start = Instant::now();

    // Should take about one second in total.
    for n in 0..11 {
        let admitted = limiter.take();
        println!("tick {}: {:.1}ms", n, helpers::millis_since(start, admitted));
    }

    println!(
        "I made it in {:?}, expected about {:?}!",
        start.elapsed(),
        helpers::expected_span(limiter.per_request(), 11)
    );

    Ok(())
}
