//! One policy shared by many independent callers.

use libris_resilience::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn shared_policy() -> Arc<RetryPolicy> {
    Arc::new(
        RetryPolicy::builder()
            .max_retries(3)
            .initial_delay(Duration::from_millis(2))
            .max_delay(Duration::from_millis(20))
            .jitter(0.5)
            .retry_on(FailureKind::Timeout)
            .build()
            .unwrap(),
    )
}

#[test]
fn test_threads_keep_independent_attempt_counts() {
    let policy = shared_policy();
    let total_calls = Arc::new(AtomicU32::new(0));

    let handles: Vec<_> = (0..8u32)
        .map(|worker| {
            let policy = Arc::clone(&policy);
            let total_calls = Arc::clone(&total_calls);
            std::thread::spawn(move || {
                // Worker n fails n % 4 times before succeeding.
                let failures = worker % 4;
                let mut calls = 0u32;
                let result = execute_with_retry(
                    || {
                        calls += 1;
                        total_calls.fetch_add(1, Ordering::SeqCst);
                        if calls <= failures {
                            Err(OperationError::Timeout(format!("worker {worker}")))
                        } else {
                            Ok(worker)
                        }
                    },
                    &policy,
                );
                (result.unwrap(), calls, failures)
            })
        })
        .collect();

    for handle in handles {
        let (worker, calls, failures) = handle.join().unwrap();
        assert_eq!(calls, failures + 1, "worker {worker}");
    }
    // 2 * (1 + 2 + 3 + 4)
    assert_eq!(total_calls.load(Ordering::SeqCst), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tasks_share_policy_without_coordination() {
    let policy = shared_policy();
    let mut tasks = Vec::new();

    for id in 0..16u32 {
        let policy = Arc::clone(&policy);
        tasks.push(tokio::spawn(async move {
            let attempts = Arc::new(AtomicU32::new(0));
            let attempts_clone = Arc::clone(&attempts);
            let result = policy
                .execute_async(|| {
                    let attempts = Arc::clone(&attempts_clone);
                    async move {
                        if attempts.fetch_add(1, Ordering::SeqCst) < id % 3 {
                            Err(OperationError::Timeout("pool busy".into()))
                        } else {
                            Ok(id)
                        }
                    }
                })
                .await;
            (result, attempts.load(Ordering::SeqCst), id)
        }));
    }

    for task in tasks {
        let (result, attempts, id) = task.await.unwrap();
        assert_eq!(result.unwrap(), id);
        assert_eq!(attempts, id % 3 + 1);
    }
}
