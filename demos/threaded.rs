use anyhow::Result;
use paced_limiter::RateLimiter;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    helpers::init_logging();

    let limiter = Arc::new(RateLimiter::new(50, Duration::from_secs(1))?);
    let start = Instant::now();

    let mut threads = Vec::new();

    for n in 0..5 {
        let limiter = limiter.clone();

        let t = thread::Builder::new()
            .name(format!("worker-{}", n))
            .spawn(move || {
                for i in 0..10 {
                    let admitted = limiter.take();

                    println!(
                        "tick: {}:{} at {:.1}ms",
                        n,
                        i,
                        helpers::millis_since(start, admitted)
                    );
                }
            })?;

        threads.push(t);
    }

    for t in threads {
        t.join().map_err(|_| anyhow::anyhow!("worker panicked"))?;
    }

    println!(
        "50 calls in {:?}, expected about {:?}",
        start.elapsed(),
        helpers::expected_span(limiter.per_request(), 50)
    );

    Ok(())
}
