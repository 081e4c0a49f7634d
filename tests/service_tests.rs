//! Concurrency tests — many threads starting, ending, and registering at once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use reqcycle_core::{
    HookResult, IdStrategy, RegistryConfig, RequestFailure, RequestId, RequestInterceptor,
    RequestService, StatsInterceptor,
};
use reqcycle_protocol::ExecutionContext;

const THREADS: usize = 32;
const ROUNDS: usize = 200;

fn services() -> Vec<Arc<RequestService>> {
    vec![
        Arc::new(RequestService::new()),
        Arc::new(RequestService::with_config(
            RegistryConfig::default().with_id_strategy(IdStrategy::Sequential),
        )),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Id uniqueness
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn concurrent_starts_produce_distinct_ids() {
    for service in services() {
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let service = service.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let ctx = ExecutionContext::current();
                    barrier.wait();
                    let id = service.start_request(&ctx).unwrap();
                    assert_eq!(service.current_request_id(&ctx), Some(id.clone()));
                    id
                })
            })
            .collect();

        let ids: HashSet<RequestId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), THREADS);
        assert_eq!(service.active_request_count(), THREADS);
    }
}

#[test]
fn repeated_cycles_never_reuse_ids() {
    for service in services() {
        let stats = Arc::new(StatsInterceptor::new());
        let _h = service.register_request_interceptor(Some(stats.clone())).unwrap();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|worker| {
                let service = service.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let ctx = ExecutionContext::worker(worker as u64);
                    barrier.wait();
                    let mut ids = Vec::with_capacity(ROUNDS);
                    for round in 0..ROUNDS {
                        let id = service.start_request(&ctx).unwrap();
                        let failure = (round % 7 == 0).then(|| RequestFailure::msg("seventh"));
                        assert_eq!(service.end_request(&ctx, failure).unwrap(), Some(id.clone()));
                        assert_eq!(service.end_request(&ctx, None).unwrap(), None);
                        ids.push(id);
                    }
                    ids
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate request id");
            }
        }

        let total = (THREADS * ROUNDS) as u64;
        let failed = (THREADS * ROUNDS.div_ceil(7)) as u64;
        let snap = stats.snapshot();
        assert_eq!(seen.len() as u64, total);
        assert_eq!(snap.started, total);
        assert_eq!(snap.failed, failed);
        assert_eq!(snap.completed, total - failed);
        assert_eq!(service.active_request_count(), 0);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration interleaved with dispatch
// ─────────────────────────────────────────────────────────────────────────────

struct Counter {
    starts: AtomicU64,
    ends: AtomicU64,
}

impl RequestInterceptor for Counter {
    fn on_start(&self, _: &RequestId) -> HookResult {
        self.starts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn on_end(&self, _: &RequestId, _: Option<&RequestFailure>) -> HookResult {
        self.ends.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn counter() -> Arc<Counter> {
    Arc::new(Counter {
        starts: AtomicU64::new(0),
        ends: AtomicU64::new(0),
    })
}

#[test]
fn registering_and_dropping_during_dispatch_is_safe() {
    let service = Arc::new(RequestService::new());
    let steady = counter();
    let _steady = service.register_request_interceptor(Some(steady.clone())).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let workers: Vec<_> = (0..THREADS)
        .map(|worker| {
            let service = service.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let ctx = ExecutionContext::worker(worker as u64);
                barrier.wait();
                for _ in 0..ROUNDS {
                    service.start_request(&ctx).unwrap();
                    service.end_request(&ctx, None).unwrap();
                }
            })
        })
        .collect();

    // Churn registrations while the workers dispatch.
    let churn = {
        let service = service.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            let mut kept = Vec::new();
            for i in 0..ROUNDS {
                let handle = service.register_request_interceptor(Some(counter())).unwrap();
                if i % 2 == 0 {
                    kept.push(handle);
                }
            }
            kept
        })
    };

    for worker in workers {
        worker.join().unwrap();
    }
    let kept = churn.join().unwrap();

    let total = (THREADS * ROUNDS) as u64;
    assert_eq!(steady.starts.load(Ordering::Relaxed), total);
    assert_eq!(steady.ends.load(Ordering::Relaxed), total);

    // One more pass prunes every interceptor whose handle was dropped.
    let ctx = ExecutionContext::current();
    service.start_request(&ctx).unwrap();
    assert_eq!(service.interceptor_count(), 1 + kept.len());
    assert_eq!(service.live_interceptor_count(), 1 + kept.len());
    service.end_request(&ctx, None).unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Async callers
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blocking_tasks_with_worker_contexts() {
    let service = Arc::new(RequestService::new());
    let stats = Arc::new(StatsInterceptor::new());
    let _h = service.register_request_interceptor(Some(stats.clone())).unwrap();

    let tasks: Vec<_> = (0..16u64)
        .map(|worker| {
            let service = service.clone();
            tokio::task::spawn_blocking(move || {
                let ctx = ExecutionContext::worker(worker);
                let id = service.start_request(&ctx).unwrap();
                let snap = service.current_request(&ctx).unwrap();
                assert_eq!(snap.id, id);
                assert_eq!(snap.context, format!("worker:{worker}"));
                service.end_request(&ctx, None).unwrap()
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_some());
    }
    assert_eq!(stats.snapshot().ended(), 16);
    assert!(service.active_requests().is_empty());
}
