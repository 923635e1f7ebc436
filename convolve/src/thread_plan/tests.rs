use super::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_round_robin_layout() {
    let plan = ThreadPlan::distribute(10, 3);
    assert_eq!(plan.num_threads(), 3);
    assert_eq!(plan.columns(), 10 / 3 + 2);
    assert_eq!(plan.indices(0).collect::<Vec<_>>(), vec![0, 3, 6, 9]);
    assert_eq!(plan.indices(1).collect::<Vec<_>>(), vec![1, 4, 7]);
    assert_eq!(plan.indices(2).collect::<Vec<_>>(), vec![2, 5, 8]);
}

#[test]
fn test_rows_are_sentinel_terminated() {
    let plan = ThreadPlan::distribute(10, 3);
    for t in 0..plan.num_threads() {
        let row = plan.row(t);
        let used = plan.indices(t).count();
        assert!(used < row.len());
        assert!(row[used..].iter().all(|&i| i == SENTINEL));
    }
}

#[test]
fn test_balanced_and_complete() {
    for (len, threads) in [(1, 1), (7, 2), (100, 8), (1000, 7), (64, 64)] {
        let plan = ThreadPlan::distribute(len, threads);
        let counts: Vec<usize> = (0..plan.num_threads())
            .map(|t| plan.indices(t).count())
            .collect();
        let min = *counts.iter().min().unwrap();
        let max = *counts.iter().max().unwrap();
        assert!(max - min <= 1, "unbalanced {counts:?} for len={len}");

        let mut all: Vec<usize> = (0..plan.num_threads())
            .flat_map(|t| plan.indices(t))
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..len).collect::<Vec<_>>());
    }
}

#[test]
fn test_more_threads_than_items() {
    let plan = ThreadPlan::distribute(3, 16);
    assert_eq!(plan.num_threads(), 3);
    for t in 0..3 {
        assert_eq!(plan.indices(t).collect::<Vec<_>>(), vec![t]);
    }
}

#[test]
fn test_empty_plan() {
    let plan = ThreadPlan::distribute(0, 4);
    assert!(plan.is_empty());
    assert_eq!(plan.num_threads(), 1);
    assert_eq!(plan.indices(0).count(), 0);
}

#[test]
fn test_run_visits_every_index_once() {
    let plan = ThreadPlan::distribute(1000, 6);
    let visits: Vec<AtomicUsize> = (0..1000).map(|_| AtomicUsize::new(0)).collect();
    plan.run("visit", |_, indices| {
        for i in indices {
            visits[i].fetch_add(1, Ordering::Relaxed);
        }
    });
    assert!(visits.iter().all(|v| v.load(Ordering::Relaxed) == 1));
}

#[test]
fn test_run_reports_thread_ids() {
    let plan = ThreadPlan::distribute(20, 4);
    let seen = Mutex::new(Vec::new());
    plan.run("ids", |thread, indices| {
        let owned: Vec<usize> = indices.collect();
        assert!(owned.iter().all(|i| i % 4 == thread));
        seen.lock().unwrap().push(thread);
    });
    let mut seen = seen.into_inner().unwrap();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);
}

#[test]
fn test_barrier_is_reusable() {
    let plan = ThreadPlan::distribute(4, 4);
    let barrier = plan.make_barrier();
    let rounds = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..plan.num_threads() {
            s.spawn(|| {
                for _ in 0..3 {
                    barrier.wait();
                }
            });
        }
        for _ in 0..3 {
            barrier.wait();
            rounds.fetch_add(1, Ordering::Relaxed);
        }
    });
    assert_eq!(rounds.load(Ordering::Relaxed), 3);
}
