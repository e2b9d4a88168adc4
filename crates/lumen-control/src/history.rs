// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rolling statistics over recent metric snapshots.

use lumen_core::SystemMetricsSnapshot;

/// Number of snapshots kept per metric.
pub const HISTORY_LEN: usize = 60;

/// A fixed-size circular buffer of samples.
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize> {
    data: [f64; N],
    index: usize,
    count: usize,
}

impl<const N: usize> RingBuffer<N> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            data: [0.0; N],
            index: 0,
            count: 0,
        }
    }

    /// Pushes a value, overwriting the oldest once full. Non-finite values are
    /// ignored.
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() || N == 0 {
            return;
        }
        self.data[self.index] = value;
        self.index = (self.index + 1) % N;
        if self.count < N {
            self.count += 1;
        }
    }

    /// Number of stored samples.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        // Until the buffer fills, the oldest sample sits at slot 0.
        let oldest = if self.count < N { 0 } else { self.index };
        self.data[oldest..]
            .iter()
            .chain(self.data[..oldest].iter())
            .take(self.count)
    }

    /// Arithmetic mean, or 0.0 when empty.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.iter().sum::<f64>() / self.count as f64
    }

    /// Mean of the newer half minus mean of the older half.
    ///
    /// Positive when the metric is rising.
    pub fn trend(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let half = self.count / 2;
        let older: f64 = self.iter().take(half).sum::<f64>() / half as f64;
        let newer: f64 = self.iter().skip(self.count - half).sum::<f64>() / half as f64;
        newer - older
    }

    /// Smallest sample, if any.
    pub fn min(&self) -> Option<f64> {
        self.iter().copied().reduce(f64::min)
    }

    /// Largest sample, if any.
    pub fn max(&self) -> Option<f64> {
        self.iter().copied().reduce(f64::max)
    }

    /// Snapshot of the buffer's statistics.
    pub fn stats(&self) -> MetricStats {
        MetricStats {
            samples: self.count,
            average: self.average(),
            trend: self.trend(),
            min: self.min().unwrap_or(0.0),
            max: self.max().unwrap_or(0.0),
        }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary statistics of one metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricStats {
    /// Number of samples used.
    pub samples: usize,
    /// Mean value.
    pub average: f64,
    /// Newer-half mean minus older-half mean.
    pub trend: f64,
    /// Smallest value (0.0 when empty).
    pub min: f64,
    /// Largest value (0.0 when empty).
    pub max: f64,
}

/// Recent memory, CPU and RTT readings.
#[derive(Debug, Clone, Default)]
pub struct MetricHistory {
    memory_mb: RingBuffer<HISTORY_LEN>,
    cpu_percent: RingBuffer<HISTORY_LEN>,
    rtt_ms: RingBuffer<HISTORY_LEN>,
    recorded: usize,
}

impl MetricHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one snapshot.
    pub fn record(&mut self, snapshot: &SystemMetricsSnapshot) {
        self.memory_mb.push(snapshot.memory_used_mb);
        self.cpu_percent.push(snapshot.cpu_usage_percent);
        self.rtt_ms.push(snapshot.rtt_ms);
        self.recorded = self.recorded.saturating_add(1);
    }

    /// Number of recorded snapshots (bounded by [`HISTORY_LEN`]).
    pub fn len(&self) -> usize {
        self.recorded.min(HISTORY_LEN)
    }

    /// `true` before the first snapshot.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Memory usage statistics, in megabytes.
    pub fn memory(&self) -> MetricStats {
        self.memory_mb.stats()
    }

    /// CPU usage statistics, in percent.
    pub fn cpu(&self) -> MetricStats {
        self.cpu_percent.stats()
    }

    /// Round-trip time statistics, in milliseconds.
    pub fn rtt(&self) -> MetricStats {
        self.rtt_ms.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ring_buffer_wraps() {
        let mut buffer = RingBuffer::<3>::new();
        for v in [1.0, 2.0, 3.0, 4.0] {
            buffer.push(v);
        }
        let values: Vec<f64> = buffer.iter().copied().collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(buffer.count(), 3);
    }

    #[test]
    fn test_partial_buffer_iterates_in_order() {
        let mut buffer = RingBuffer::<5>::new();
        buffer.push(7.0);
        buffer.push(9.0);
        let values: Vec<f64> = buffer.iter().copied().collect();
        assert_eq!(values, vec![7.0, 9.0]);
    }

    #[test]
    fn test_statistics() {
        let mut buffer = RingBuffer::<10>::new();
        for v in [10.0, 20.0, 30.0, 40.0] {
            buffer.push(v);
        }
        assert_relative_eq!(buffer.average(), 25.0);
        assert_relative_eq!(buffer.trend(), 20.0);
        assert_eq!(buffer.min(), Some(10.0));
        assert_eq!(buffer.max(), Some(40.0));
    }

    #[test]
    fn test_empty_and_non_finite() {
        let mut buffer = RingBuffer::<4>::new();
        buffer.push(f64::NAN);
        buffer.push(f64::INFINITY);
        assert_eq!(buffer.count(), 0);
        assert_eq!(buffer.stats(), MetricStats::default());
    }

    #[test]
    fn test_history_records_snapshots() {
        let mut history = MetricHistory::new();
        for i in 0..(HISTORY_LEN + 5) {
            history.record(&SystemMetricsSnapshot {
                memory_used_mb: i as f64,
                cpu_usage_percent: 50.0,
                ..Default::default()
            });
        }
        assert_eq!(history.len(), HISTORY_LEN);
        assert_eq!(history.memory().min, 5.0);
        assert_relative_eq!(history.cpu().average, 50.0);
        assert!(history.memory().trend > 0.0);
    }

    #[test]
    fn test_history_counts_snapshots_with_missing_readings() {
        let mut history = MetricHistory::new();
        history.record(&SystemMetricsSnapshot {
            memory_used_mb: f64::NAN,
            cpu_usage_percent: 40.0,
            rtt_ms: 80.0,
            ..Default::default()
        });
        history.record(&SystemMetricsSnapshot {
            memory_used_mb: 300.0,
            cpu_usage_percent: 60.0,
            rtt_ms: 120.0,
            ..Default::default()
        });

        assert_eq!(history.len(), 2);
        assert_eq!(history.memory().samples, 1);
        assert_eq!(history.cpu().samples, 2);
        assert_relative_eq!(history.rtt().average, 100.0);
    }
}
