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

//! Capacity-derived numeric limits.
//!
//! Every function takes raw capacity facts and returns a value inside a fixed
//! `[MIN, MAX]` band, so a starved machine and an abundant one both get sane
//! limits. The general shape is:
//!
//! ```text
//! allocatable = total × (1 − RESERVED_FRACTION)
//! limit       = clamp(allocatable × domain_ratio, MIN, MAX)
//! ```
//!
//! NaN or negative capacities are treated as zero and infinite ones reach the
//! top of each band. None of these functions can fail.

use lumen_core::SystemCapacity;
use std::time::Duration;

/// Share of total memory kept out of every calculation for the OS and other apps.
pub const RESERVED_FRACTION: f64 = 0.2;

/// Average live footprint of a tab, used to turn a memory budget into a tab count.
pub const AVERAGE_TAB_MB: f64 = 100.0;

const TAB_MEMORY_RATIO: f64 = 0.6;
const MIN_TABS: usize = 5;
const MAX_TABS: usize = 100;

const HISTORY_ENTRIES_PER_MB: f64 = 10.0;
const MIN_HISTORY_ENTRIES: usize = 1_000;
const MAX_HISTORY_ENTRIES: usize = 50_000;

const GC_RATIO: f64 = 0.7;
const MIN_GC_MB: f64 = 150.0;
const MAX_GC_MB: f64 = 800.0;

const CRITICAL_RATIO: f64 = 0.85;
const MIN_CRITICAL_MB: f64 = 250.0;
const MAX_CRITICAL_MB: f64 = 1_200.0;

const HARD_LIMIT_RATIO: f64 = 0.95;
const MIN_HARD_LIMIT_MB: f64 = 300.0;
const MAX_HARD_LIMIT_MB: f64 = 1_500.0;

const WORKER_CORE_RATIO: f64 = 0.75;
const MIN_WORKERS: usize = 1;
const MAX_WORKERS: usize = 8;

const MEMORY_CACHE_RATIO: f64 = 0.05;
const MIN_MEMORY_CACHE_MB: f64 = 32.0;
const MAX_MEMORY_CACHE_MB: f64 = 512.0;

const DISK_CACHE_RATIO: f64 = 0.1;
const MIN_DISK_CACHE_MB: f64 = 64.0;
const MAX_DISK_CACHE_MB: f64 = 1_024.0;

/// Fastest sampling interval for the policy service.
pub const MIN_SAMPLING_INTERVAL: Duration = Duration::from_secs(1);
/// Slowest sampling interval for the policy service.
pub const MAX_SAMPLING_INTERVAL: Duration = Duration::from_secs(5);

/// NaN and non-positive capacity count as none. Infinite capacity stays
/// infinite and lands on each band's ceiling.
fn sanitize(value: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        0.0
    }
}

fn allocatable_mb(total_memory_mb: f64) -> f64 {
    sanitize(total_memory_mb) * (1.0 - RESERVED_FRACTION)
}

/// Multiplier applied to the tab ceiling as current memory usage rises.
///
/// | usage | multiplier |
/// |---|---|
/// | < 60% | 1.0 |
/// | ≥ 60% | 0.75 |
/// | ≥ 70% | 0.5 |
/// | ≥ 80% | 0.3 |
pub fn tab_usage_multiplier(current_usage_percent: f64) -> f64 {
    let usage = if current_usage_percent.is_finite() {
        current_usage_percent
    } else {
        0.0
    };
    if usage >= 80.0 {
        0.3
    } else if usage >= 70.0 {
        0.5
    } else if usage >= 60.0 {
        0.75
    } else {
        1.0
    }
}

/// Maximum number of open tabs, de-rated as current memory usage rises.
pub fn max_tabs(total_memory_mb: f64, current_usage_percent: f64) -> usize {
    let budget_mb = allocatable_mb(total_memory_mb) * TAB_MEMORY_RATIO;
    let tabs = (budget_mb / AVERAGE_TAB_MB) * tab_usage_multiplier(current_usage_percent);
    (tabs.floor() as usize).clamp(MIN_TABS, MAX_TABS)
}

/// Maximum number of history entries kept in memory.
pub fn max_history_entries(total_memory_mb: f64) -> usize {
    let entries = allocatable_mb(total_memory_mb) * HISTORY_ENTRIES_PER_MB;
    (entries.floor() as usize).clamp(MIN_HISTORY_ENTRIES, MAX_HISTORY_ENTRIES)
}

/// Usage at which caches start being trimmed, in megabytes.
pub fn gc_threshold_mb(total_memory_mb: f64) -> f64 {
    (allocatable_mb(total_memory_mb) * GC_RATIO).clamp(MIN_GC_MB, MAX_GC_MB)
}

/// Usage at which background tabs start being released, in megabytes.
pub fn critical_threshold_mb(total_memory_mb: f64) -> f64 {
    (allocatable_mb(total_memory_mb) * CRITICAL_RATIO).clamp(MIN_CRITICAL_MB, MAX_CRITICAL_MB)
}

/// Usage at which every measure applies, in megabytes.
pub fn hard_limit_mb(total_memory_mb: f64) -> f64 {
    (allocatable_mb(total_memory_mb) * HARD_LIMIT_RATIO).clamp(MIN_HARD_LIMIT_MB, MAX_HARD_LIMIT_MB)
}

/// Maximum number of background worker threads.
pub fn max_worker_threads(core_count: u32) -> usize {
    let workers = (core_count as f64 * WORKER_CORE_RATIO).floor() as usize;
    workers.clamp(MIN_WORKERS, MAX_WORKERS)
}

/// In-memory cache size, in megabytes.
pub fn memory_cache_mb(total_memory_mb: f64) -> f64 {
    (allocatable_mb(total_memory_mb) * MEMORY_CACHE_RATIO)
        .clamp(MIN_MEMORY_CACHE_MB, MAX_MEMORY_CACHE_MB)
}

/// On-disk cache size, in megabytes.
pub fn disk_cache_mb(total_memory_mb: f64) -> f64 {
    (allocatable_mb(total_memory_mb) * DISK_CACHE_RATIO).clamp(MIN_DISK_CACHE_MB, MAX_DISK_CACHE_MB)
}

/// Period between two metric samples.
///
/// Small machines sample less often so the monitor itself stays cheap.
pub fn sampling_interval(total_memory_mb: f64, core_count: u32) -> Duration {
    let total = sanitize(total_memory_mb);
    let interval = if total < 4_096.0 || core_count <= 2 {
        MAX_SAMPLING_INTERVAL
    } else if total < 8_192.0 {
        Duration::from_secs(3)
    } else if total >= 16_384.0 && core_count >= 8 {
        MIN_SAMPLING_INTERVAL
    } else {
        Duration::from_secs(2)
    };
    interval.clamp(MIN_SAMPLING_INTERVAL, MAX_SAMPLING_INTERVAL)
}

/// Every capacity-derived limit, computed once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceThresholds {
    /// Tab ceiling at low usage.
    pub max_tabs: usize,
    /// History retention ceiling.
    pub max_history_entries: usize,
    /// Memory GC threshold, in megabytes.
    pub gc_threshold_mb: f64,
    /// Memory critical threshold, in megabytes.
    pub critical_threshold_mb: f64,
    /// Memory hard limit, in megabytes.
    pub hard_limit_mb: f64,
    /// Worker thread ceiling.
    pub max_worker_threads: usize,
    /// In-memory cache size, in megabytes.
    pub memory_cache_mb: f64,
    /// On-disk cache size, in megabytes.
    pub disk_cache_mb: f64,
    /// Sampling interval for the policy service.
    pub sampling_interval: Duration,
}

impl ResourceThresholds {
    /// Derives every limit from the given capacity.
    pub fn for_capacity(capacity: SystemCapacity) -> Self {
        let total = capacity.total_memory_mb;
        Self {
            max_tabs: max_tabs(total, 0.0),
            max_history_entries: max_history_entries(total),
            gc_threshold_mb: gc_threshold_mb(total),
            critical_threshold_mb: critical_threshold_mb(total),
            hard_limit_mb: hard_limit_mb(total),
            max_worker_threads: max_worker_threads(capacity.core_count),
            memory_cache_mb: memory_cache_mb(total),
            disk_cache_mb: disk_cache_mb(total),
            sampling_interval: sampling_interval(total, capacity.core_count),
        }
    }
}
