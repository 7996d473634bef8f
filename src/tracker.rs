//! Request-rate tracking with per-second bucketing.
//!
//! [`RequestTracker`] records one timestamp per observed event and derives
//! per-second throughput statistics on demand. One mutex guards the whole
//! sample sequence: `record` and `compute_stats` take the same lock, so a
//! stats snapshot never observes a partially appended sample and concurrent
//! recorders are strictly serialized. The lock is held only for the append
//! or the scan - never across any I/O.
//!
//! Samples are monotonic [`Instant`]s; statistics are computed from offsets
//! relative to the first sample, so wall-clock steps cannot skew them.
//!
//! # Example
//!
//! ```rust
//! use contesa::tracker::RequestTracker;
//!
//! let tracker = RequestTracker::new();
//! tracker.record();
//! tracker.record();
//!
//! let stats = tracker.compute_stats();
//! assert_eq!(stats.total_requests, 2);
//! // Two samples within the same second: no rates yet.
//! assert_eq!(stats.avg_rps, 0.0);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Throughput statistics derived from the recorded samples.
///
/// Recomputed on demand; never persisted. `min_rps`/`max_rps` are integer
/// bucket counts, the other fields are rounded to two decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpsStats {
    /// Number of recorded samples.
    pub total_requests: u64,
    /// Seconds between the first and the last sample.
    pub duration_seconds: f64,
    /// Mean of the per-second bucket counts.
    pub avg_rps: f64,
    /// Smallest per-second bucket count.
    pub min_rps: u64,
    /// Largest per-second bucket count.
    pub max_rps: u64,
}

impl RpsStats {
    /// The all-zero result returned while there is nothing to measure.
    pub fn zero() -> Self {
        RpsStats {
            total_requests: 0,
            duration_seconds: 0.0,
            avg_rps: 0.0,
            min_rps: 0,
            max_rps: 0,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Records event timestamps under concurrent access.
///
/// The sample sequence is append-only and owned exclusively by the tracker;
/// it is never trimmed during the process lifetime.
#[derive(Debug, Default)]
pub struct RequestTracker {
    samples: Mutex<Vec<Instant>>,
}

impl RequestTracker {
    /// Creates a tracker with no samples.
    pub fn new() -> Self {
        Self::default()
    }

    fn samples(&self) -> MutexGuard<'_, Vec<Instant>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one event at the current time.
    pub fn record(&self) {
        self.record_at(Instant::now());
    }

    /// Records one event at an explicit timestamp.
    ///
    /// Exists for tests and replay; live callers use [`record`](Self::record).
    pub fn record_at(&self, at: Instant) {
        self.samples().push(at);
    }

    /// Derives throughput statistics from the samples recorded so far.
    ///
    /// With no samples, or with all samples inside one second, the rate
    /// fields are zero - there is no full one-second bucket to rate over,
    /// and no division by zero ever happens.
    pub fn compute_stats(&self) -> RpsStats {
        let samples = self.samples();
        let (first, last) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return RpsStats::zero(),
        };

        let total_requests = samples.len() as u64;
        let duration = last.duration_since(first);
        if duration.as_secs() == 0 {
            return RpsStats {
                total_requests,
                ..RpsStats::zero()
            };
        }

        // One bucket per elapsed whole second since the first sample.
        let mut buckets: HashMap<u64, u64> = HashMap::new();
        for sample in samples.iter() {
            let bucket = sample.duration_since(first).as_secs();
            *buckets.entry(bucket).or_insert(0) += 1;
        }

        let counts: Vec<u64> = buckets.values().copied().collect();
        let avg = counts.iter().sum::<u64>() as f64 / counts.len() as f64;

        RpsStats {
            total_requests,
            duration_seconds: round2(duration.as_secs_f64()),
            avg_rps: round2(avg),
            min_rps: counts.iter().copied().min().unwrap_or(0),
            max_rps: counts.iter().copied().max().unwrap_or(0),
        }
    }
}
