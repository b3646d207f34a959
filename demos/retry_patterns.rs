//! Retry Patterns Example
//!
//! Demonstrates the retry runner on its own:
//! - Immediate retries (the default)
//! - Backoff strategies
//! - Conditional retry (run_if)
//! - Hooks for observability
//! - Per-attempt timeouts
//!
//! Run with: cargo run --example retry_patterns

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chordjob::{AttemptError, Backoff, RetryEvent, RetryPolicy, RetryRunner};

// ==================== Immediate Retry ====================

/// Example 1: the default policy retries at once, up to five attempts.
async fn example_immediate_retry() {
    println!("\n=== Example 1: Immediate Retry ===");

    let attempts = AtomicU32::new(0);
    let runner = RetryRunner::new(RetryPolicy::default());

    let result = runner
        .run(|| async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            println!("  Attempt {}", n + 1);
            if n < 2 {
                Err("rate limited")
            } else {
                Ok(42)
            }
        })
        .await;

    match result {
        Ok(value) => println!("Success: {}", value),
        Err(exhausted) => println!("Gave up: {}", exhausted),
    }
}

// ==================== Backoff Strategies ====================

/// Example 2: delays before each retry for every strategy.
async fn example_backoff_strategies() {
    println!("\n=== Example 2: Backoff Strategies ===");

    let base = Duration::from_millis(100);
    let strategies = [
        ("Constant", Backoff::Constant { delay: base }),
        ("Linear", Backoff::Linear { base }),
        ("Exponential", Backoff::Exponential { base }),
        ("Fibonacci", Backoff::Fibonacci { base }),
    ];

    for (label, backoff) in strategies {
        let policy = RetryPolicy::new(6)
            .with_backoff(backoff)
            .with_max_delay(Duration::from_millis(800));
        let delays: Vec<_> = (1..6).filter_map(|r| policy.delay_before_retry(r)).collect();
        println!("{:>12}: {:?}", label, delays);
    }
}

// ==================== Conditional Retry ====================

/// Example 3: permanent errors stop the loop at once.
async fn example_conditional_retry() {
    println!("\n=== Example 3: Conditional Retry ===");

    #[derive(Debug)]
    enum ApiError {
        RateLimited,
        NotFound,
    }

    impl std::fmt::Display for ApiError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                ApiError::RateLimited => write!(f, "rate limited"),
                ApiError::NotFound => write!(f, "not found"),
            }
        }
    }

    let attempts = AtomicU32::new(0);
    let result = RetryRunner::new(RetryPolicy::new(5))
        .run_if(
            || async {
                match attempts.fetch_add(1, Ordering::SeqCst) {
                    0 => Err::<(), _>(ApiError::RateLimited),
                    _ => Err(ApiError::NotFound),
                }
            },
            |err| matches!(err, ApiError::RateLimited),
        )
        .await;

    println!("Result: {:?}", result.map_err(|e| e.to_string()));
    println!("Total attempts: {}", attempts.load(Ordering::SeqCst));
}

// ==================== Hooks ====================

/// Example 4: observe every failed attempt.
async fn example_hooks() {
    println!("\n=== Example 4: Retry with Hooks ===");

    let attempts = AtomicU32::new(0);
    let policy = RetryPolicy::new(4).with_backoff(Backoff::Exponential {
        base: Duration::from_millis(20),
    });

    let result = RetryRunner::new(policy)
        .run_with_hooks(
            || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(format!("error on attempt {}", n + 1))
                } else {
                    Ok("finally succeeded!")
                }
            },
            |event: &RetryEvent<'_, String>| {
                println!("  [HOOK] Attempt {} failed with: {}", event.attempt, event.error);
                match event.next_delay {
                    Some(delay) => println!("         Waiting {:?} before retry...", delay),
                    None if event.will_retry => println!("         Retrying now"),
                    None => println!("         No more retries!"),
                }
            },
        )
        .await;

    println!("Result: {:?}", result.map_err(|e| e.to_string()));
}

// ==================== Timeout ====================

/// Example 5: a hanging attempt is cut off and retried.
async fn example_timeout() {
    println!("\n=== Example 5: Per-Attempt Timeout ===");

    let attempts = AtomicU32::new(0);
    let policy = RetryPolicy::new(3).with_timeout(Duration::from_millis(100));

    let result = RetryRunner::new(policy)
        .run(|| async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            println!("  Attempt {} starting...", n + 1);
            if n == 0 {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok::<_, String>("responded")
        })
        .await;

    match result {
        Ok(value) => println!("Completed: {}", value),
        Err(exhausted) => match exhausted.last_error {
            AttemptError::TimedOut { duration } => println!("Timed out after {:?}", duration),
            AttemptError::Failed(e) => println!("Failed: {}", e),
        },
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    println!("======================================");
    println!("       Retry Patterns Example         ");
    println!("======================================");

    example_immediate_retry().await;
    example_backoff_strategies().await;
    example_conditional_retry().await;
    example_hooks().await;
    example_timeout().await;

    println!("\n======================================");
    println!("           Examples Complete           ");
    println!("======================================");
}
