//! Server-wide request metrics
//!
//! Tracks:
//! - request latencies with percentiles (p50, p95, p99) over a rolling window
//! - slow requests (the most recent few above a threshold)
//! - per-operation counts and latency sums
//! - snapshot flush timing
//!
//! Counters are atomics; the latency window, slow-request log and the
//! per-operation table sit behind mutexes. A poisoned mutex is recovered,
//! since every guarded value is valid after any partial update.
//!
//! ```no_run
//! use linkgraph::metrics::Metrics;
//!
//! let metrics = Metrics::new();
//! metrics.record_query("GetSuggestions", 15);
//! let stats = metrics.snapshot();
//! println!("p50: {}ms", stats.query_p50_ms);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Rolling window used for percentiles and the average.
const LATENCY_WINDOW_SIZE: usize = 1000;

const MAX_SLOW_QUERIES: usize = 10;

/// Requests at or above this duration land in the slow-request log.
pub const SLOW_QUERY_THRESHOLD_MS: u64 = 100;

/// Operations reported in `MetricsSnapshot::op_stats`
const TOP_OPERATIONS: usize = 5;

#[derive(Default)]
struct OperationTotals {
    count: u64,
    latency_sum_ms: u64,
}

pub struct Metrics {
    query_count: AtomicU64,
    slow_query_count: AtomicU64,

    latencies_ms: Mutex<VecDeque<u64>>,
    latency_sum_ms: AtomicU64,

    operations: Mutex<HashMap<String, OperationTotals>>,

    flush_count: AtomicU64,
    flush_total_ms: AtomicU64,
    last_flush_ms: AtomicU64,
    last_flush_users: AtomicU64,
    last_flush_edges: AtomicU64,

    slow_queries: Mutex<VecDeque<SlowQuery>>,

    started_at: Instant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowQuery {
    pub operation: String,
    pub duration_ms: u64,
    /// Milliseconds since server start
    pub timestamp_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub query_count: u64,
    pub slow_query_count: u64,
    pub query_p50_ms: u64,
    pub query_p95_ms: u64,
    pub query_p99_ms: u64,
    pub query_avg_ms: u64,

    pub flush_count: u64,
    pub flush_avg_ms: u64,
    pub last_flush_ms: u64,
    pub last_flush_users: u64,
    pub last_flush_edges: u64,

    pub top_slow_queries: Vec<SlowQuery>,
    pub uptime_secs: u64,

    /// Busiest operations by total time spent
    pub op_stats: Vec<OperationStat>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStat {
    pub operation: String,
    pub count: u64,
    pub avg_ms: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            query_count: AtomicU64::new(0),
            slow_query_count: AtomicU64::new(0),
            latencies_ms: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW_SIZE)),
            latency_sum_ms: AtomicU64::new(0),
            operations: Mutex::new(HashMap::new()),
            flush_count: AtomicU64::new(0),
            flush_total_ms: AtomicU64::new(0),
            last_flush_ms: AtomicU64::new(0),
            last_flush_users: AtomicU64::new(0),
            last_flush_edges: AtomicU64::new(0),
            slow_queries: Mutex::new(VecDeque::with_capacity(MAX_SLOW_QUERIES)),
            started_at: Instant::now(),
        }
    }

    /// Record one completed request.
    pub fn record_query(&self, operation: &str, duration_ms: u64) {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        {
            let mut operations = lock(&self.operations);
            let totals = operations.entry(operation.to_string()).or_default();
            totals.count += 1;
            totals.latency_sum_ms += duration_ms;
        }

        {
            let mut latencies = lock(&self.latencies_ms);
            if latencies.len() >= LATENCY_WINDOW_SIZE {
                if let Some(old) = latencies.pop_front() {
                    self.latency_sum_ms.fetch_sub(old, Ordering::Relaxed);
                }
            }
            latencies.push_back(duration_ms);
            self.latency_sum_ms.fetch_add(duration_ms, Ordering::Relaxed);
        }

        if duration_ms >= SLOW_QUERY_THRESHOLD_MS {
            self.slow_query_count.fetch_add(1, Ordering::Relaxed);

            let slow_query = SlowQuery {
                operation: operation.to_string(),
                duration_ms,
                timestamp_ms: self.started_at.elapsed().as_millis() as u64,
            };

            let mut slow_queries = lock(&self.slow_queries);
            if slow_queries.len() >= MAX_SLOW_QUERIES {
                slow_queries.pop_front();
            }
            slow_queries.push_back(slow_query);
        }
    }

    /// Record a snapshot flush and how much it wrote.
    pub fn record_flush(&self, duration_ms: u64, users_written: u64, edges_written: u64) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        self.flush_total_ms.fetch_add(duration_ms, Ordering::Relaxed);
        self.last_flush_ms.store(duration_ms, Ordering::Relaxed);
        self.last_flush_users.store(users_written, Ordering::Relaxed);
        self.last_flush_edges.store(edges_written, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (p50, p95, p99, avg) = {
            let latencies = lock(&self.latencies_ms);
            if latencies.is_empty() {
                (0, 0, 0, 0)
            } else {
                let mut sorted: Vec<u64> = latencies.iter().copied().collect();
                sorted.sort_unstable();
                let len = sorted.len();
                let p50 = sorted[len * 50 / 100];
                let p95 = sorted[len * 95 / 100];
                let p99 = sorted.get(len * 99 / 100).copied().unwrap_or(sorted[len - 1]);
                let avg = self.latency_sum_ms.load(Ordering::Relaxed) / len as u64;
                (p50, p95, p99, avg)
            }
        };

        let flush_count = self.flush_count.load(Ordering::Relaxed);
        let flush_avg_ms = if flush_count > 0 {
            self.flush_total_ms.load(Ordering::Relaxed) / flush_count
        } else {
            0
        };

        MetricsSnapshot {
            query_count: self.query_count.load(Ordering::Relaxed),
            slow_query_count: self.slow_query_count.load(Ordering::Relaxed),
            query_p50_ms: p50,
            query_p95_ms: p95,
            query_p99_ms: p99,
            query_avg_ms: avg,
            flush_count,
            flush_avg_ms,
            last_flush_ms: self.last_flush_ms.load(Ordering::Relaxed),
            last_flush_users: self.last_flush_users.load(Ordering::Relaxed),
            last_flush_edges: self.last_flush_edges.load(Ordering::Relaxed),
            top_slow_queries: lock(&self.slow_queries).iter().cloned().collect(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            op_stats: self.top_operations(TOP_OPERATIONS),
        }
    }

    /// Top `n` operations by total latency, ties broken by name.
    fn top_operations(&self, n: usize) -> Vec<OperationStat> {
        let operations = lock(&self.operations);
        let mut ranked: Vec<(&String, &OperationTotals)> = operations.iter().collect();
        ranked.sort_by(|(a_name, a), (b_name, b)| {
            b.latency_sum_ms
                .cmp(&a.latency_sum_ms)
                .then_with(|| a_name.cmp(b_name))
        });

        ranked
            .into_iter()
            .take(n)
            .map(|(name, totals)| OperationStat {
                operation: name.clone(),
                count: totals.count,
                avg_ms: totals.latency_sum_ms / totals.count.max(1),
            })
            .collect()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod metrics_tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_snapshot() {
        let stats = Metrics::new().snapshot();
        assert_eq!(stats.query_count, 0);
        assert_eq!(stats.query_p50_ms, 0);
        assert_eq!(stats.query_p99_ms, 0);
        assert_eq!(stats.flush_avg_ms, 0);
        assert!(stats.top_slow_queries.is_empty());
        assert!(stats.op_stats.is_empty());
    }

    #[test]
    fn test_percentiles() {
        let metrics = Metrics::new();
        for ms in 1..=100 {
            metrics.record_query("GetFollowers", ms);
        }

        let stats = metrics.snapshot();
        assert_eq!(stats.query_count, 100);
        assert_eq!(stats.query_p50_ms, 51);
        assert_eq!(stats.query_p95_ms, 96);
        assert_eq!(stats.query_p99_ms, 100);
        assert_eq!(stats.query_avg_ms, 50);
    }

    #[test]
    fn test_latency_window_rolls() {
        let metrics = Metrics::new();
        for _ in 0..LATENCY_WINDOW_SIZE {
            metrics.record_query("Ping", 1000);
        }
        for _ in 0..LATENCY_WINDOW_SIZE {
            metrics.record_query("Ping", 2);
        }

        let stats = metrics.snapshot();
        assert_eq!(stats.query_count, 2 * LATENCY_WINDOW_SIZE as u64);
        assert_eq!(stats.query_p99_ms, 2);
        assert_eq!(stats.query_avg_ms, 2);
    }

    #[test]
    fn test_slow_queries_keep_most_recent() {
        let metrics = Metrics::new();
        metrics.record_query("GetFollowings", SLOW_QUERY_THRESHOLD_MS - 1);
        for i in 0..15 {
            metrics.record_query("GetSuggestions", SLOW_QUERY_THRESHOLD_MS + i);
        }

        let stats = metrics.snapshot();
        assert_eq!(stats.slow_query_count, 15);
        assert_eq!(stats.top_slow_queries.len(), MAX_SLOW_QUERIES);
        assert_eq!(stats.top_slow_queries[0].duration_ms, SLOW_QUERY_THRESHOLD_MS + 5);
        assert!(stats.top_slow_queries.iter().all(|q| q.operation == "GetSuggestions"));
    }

    #[test]
    fn test_op_stats_ranked_by_total_time() {
        let metrics = Metrics::new();
        for name in ["A", "B", "C", "D", "E", "F"] {
            metrics.record_query(name, 1);
        }
        metrics.record_query("BlockUser", 40);
        metrics.record_query("BlockUser", 20);
        metrics.record_query("GetSuggestions", 50);

        let stats = metrics.snapshot();
        assert_eq!(stats.op_stats.len(), TOP_OPERATIONS);
        assert_eq!(
            stats.op_stats[0],
            OperationStat { operation: "BlockUser".into(), count: 2, avg_ms: 30 }
        );
        assert_eq!(stats.op_stats[1].operation, "GetSuggestions");
        assert_eq!(stats.op_stats[2].operation, "A");
    }

    #[test]
    fn test_record_flush() {
        let metrics = Metrics::new();
        metrics.record_flush(10, 5, 7);
        metrics.record_flush(30, 6, 8);

        let stats = metrics.snapshot();
        assert_eq!(stats.flush_count, 2);
        assert_eq!(stats.flush_avg_ms, 20);
        assert_eq!(stats.last_flush_ms, 30);
        assert_eq!(stats.last_flush_users, 6);
        assert_eq!(stats.last_flush_edges, 8);
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Arc::new(Metrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        metrics.record_query("IsBlockedAny", 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = metrics.snapshot();
        assert_eq!(stats.query_count, 1000);
        assert_eq!(stats.op_stats[0].count, 1000);
    }
}
