use anyhow::Result;
use paced_limiter::RateLimiter;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    helpers::init_logging();

    let limiter = RateLimiter::builder(20, Duration::from_secs(1))
        .slack(5)
        .build()?;

    let start = Instant::now();
    limiter.take();

    println!("Idling for a second...");
    thread::sleep(Duration::from_secs(1));

    // The first six are immediate since they spend the banked slack, the rest
    // are paced 50ms apart.
    for n in 0..10 {
        let admitted = limiter.take();
        println!("tick {}: {:.1}ms", n, helpers::millis_since(start, admitted));
    }

    Ok(())
}
