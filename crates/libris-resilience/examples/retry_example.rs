//! Example: Retrying data-access calls with libris-resilience
//!
//! This example demonstrates:
//! 1. A flaky catalogue lookup retried with the database policy
//! 2. A non-retryable failure surfacing immediately
//! 3. Jitter impact on the default policy's delays
//! 4. A blocking file read retried with the file I/O policy
//!
//! Run with:
//! ```bash
//! RUST_LOG=libris_resilience=debug cargo run -p libris-resilience --example retry_example
//! ```

use libris_resilience::prelude::*;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// A simulated catalogue table that fails the first few lookups.
struct FlakyCatalogue {
    attempts: Arc<AtomicU32>,
    fail_count: u32,
}

impl FlakyCatalogue {
    fn new(fail_count: u32) -> Self {
        Self {
            attempts: Arc::new(AtomicU32::new(0)),
            fail_count,
        }
    }

    async fn find_title(&self, isbn: &str) -> Result<String, OperationError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

        if attempt < self.fail_count {
            println!("  Attempt {}: FAILED (deadlock)", attempt + 1);
            Err(OperationError::database_with_code(
                "40P01",
                "deadlock detected",
            ))
        } else {
            println!("  Attempt {}: SUCCESS", attempt + 1);
            Ok(format!("Title for {isbn}"))
        }
    }

    fn total_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Example 1: Transient database failure
async fn example_database_retry() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 1: Database Policy ===\n");

    let policy = PolicyFactory::database_policy();
    let catalogue = FlakyCatalogue::new(2);

    println!("Looking up a title (will deadlock twice before succeeding)...");
    let start = Instant::now();

    let title = execute_with_retry_async(|| catalogue.find_title("978-0-13-110362-7"), &policy).await?;

    println!("\nResult: {}", title);
    println!("Total attempts: {}", catalogue.total_attempts());
    println!("Total time: {:?}", start.elapsed());
    println!("Expected delays: ~500ms + ~1000ms (10% jitter)");

    Ok(())
}

/// Example 2: Failures outside the policy are not retried
async fn example_non_retryable() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 2: Non-Retryable Failure ===\n");

    let policy = PolicyFactory::network_policy();
    let attempts = Arc::new(AtomicU32::new(0));

    let result = policy
        .execute_async(|| {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(OperationError::AccessDenied("membership expired".into()))
            }
        })
        .await;

    println!("Result: {:?}", result);
    println!("Total attempts: {}", attempts.load(Ordering::SeqCst));

    Ok(())
}

/// Example 3: Jitter demonstration
fn example_jitter_impact() {
    println!("\n=== Example 3: Jitter Impact (10 Samples) ===\n");

    let jittered = PolicyFactory::default_policy();
    let steady = PolicyFactory::custom_policy(
        3,
        Duration::from_millis(1000),
        BackoffStrategy::Linear,
        [FailureKind::Timeout],
    );

    for attempt in 0..3 {
        let samples: Vec<u128> = (0..10)
            .map(|_| calculate_delay(attempt, &jittered).as_millis())
            .collect();
        println!(
            "  Attempt {}: exponential+jitter {:?}, linear {}ms",
            attempt,
            samples,
            calculate_delay(attempt, &steady).as_millis()
        );
    }
}

/// Example 4: Blocking retry around local file access
fn example_blocking_file_read() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 4: Blocking File I/O Policy ===\n");

    let policy = PolicyFactory::custom_policy(
        2,
        Duration::from_millis(50),
        BackoffStrategy::Linear,
        [FailureKind::Io, FailureKind::AccessDenied],
    );

    let path = std::env::temp_dir().join("libris-retry-example.txt");
    std::fs::write(&path, "overdue: 3")?;

    let contents = execute_with_retry(|| std::fs::read_to_string(&path), &policy)?;
    println!("Read {:?} from {}", contents, path.display());

    std::fs::remove_file(&path)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("==============================================");
    println!("   Libris Resilience: Retry Policy Examples");
    println!("==============================================");

    example_database_retry().await?;
    example_non_retryable().await?;
    example_jitter_impact();
    example_blocking_file_read()?;

    println!("\n==============================================");
    println!("   All examples completed successfully!");
    println!("==============================================\n");

    Ok(())
}
