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

//! Point-in-time system metrics and raw capacity facts.

use serde::{Deserialize, Serialize};

/// An immutable, point-in-time read of system pressure and managed-unit counts.
///
/// Snapshots are produced by a [`MetricsSource`](crate::platform::MetricsSource)
/// on a timer. Values are not validated: anything outside the documented domain
/// classifies to the nearest policy rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemMetricsSnapshot {
    /// Memory currently used by the application, in megabytes.
    pub memory_used_mb: f64,
    /// Total physical memory of the machine, in megabytes.
    pub memory_total_mb: f64,
    /// Global CPU usage (0.0 to 100.0).
    pub cpu_usage_percent: f64,
    /// Number of logical cores.
    pub core_count: u32,
    /// Last measured network round-trip time, in milliseconds.
    pub rtt_ms: f64,
    /// Battery charge (0.0 to 100.0).
    pub battery_percent: f64,
    /// `true` when the device runs unplugged.
    pub is_on_battery: bool,
    /// Number of tabs in the `active` state.
    pub active_tab_count: u32,
    /// Number of tabs in the `background` state.
    pub background_tab_count: u32,
    /// Number of background tasks currently running.
    pub running_task_count: u32,
    /// Number of background tasks currently paused.
    pub paused_task_count: u32,
}

impl Default for SystemMetricsSnapshot {
    fn default() -> Self {
        Self {
            memory_used_mb: 0.0,
            memory_total_mb: SystemCapacity::default().total_memory_mb,
            cpu_usage_percent: 0.0,
            core_count: SystemCapacity::default().core_count,
            rtt_ms: 0.0,
            battery_percent: 100.0,
            is_on_battery: false,
            active_tab_count: 0,
            background_tab_count: 0,
            running_task_count: 0,
            paused_task_count: 0,
        }
    }
}

impl SystemMetricsSnapshot {
    /// Returns the capacity facts embedded in this snapshot.
    pub fn capacity(&self) -> SystemCapacity {
        SystemCapacity {
            total_memory_mb: self.memory_total_mb,
            core_count: self.core_count,
        }
    }

    /// `true` if the device is unplugged and the charge is strictly below `percent`.
    pub fn is_unplugged_below(&self, percent: f64) -> bool {
        self.is_on_battery && self.battery_percent < percent
    }
}

/// Raw capacity facts from which every numeric limit is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemCapacity {
    /// Total physical memory, in megabytes.
    pub total_memory_mb: f64,
    /// Number of logical cores.
    pub core_count: u32,
}

impl Default for SystemCapacity {
    fn default() -> Self {
        Self {
            total_memory_mb: 8192.0,
            core_count: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_plugged_in_and_full() {
        let snapshot = SystemMetricsSnapshot::default();
        assert!(!snapshot.is_on_battery);
        assert_eq!(snapshot.battery_percent, 100.0);
        assert_eq!(snapshot.capacity(), SystemCapacity::default());
    }

    #[test]
    fn test_unplugged_below_requires_battery_power() {
        let mut snapshot = SystemMetricsSnapshot {
            battery_percent: 15.0,
            ..Default::default()
        };
        assert!(!snapshot.is_unplugged_below(20.0));

        snapshot.is_on_battery = true;
        assert!(snapshot.is_unplugged_below(20.0));
        assert!(!snapshot.is_unplugged_below(15.0));
    }

    #[test]
    fn test_capacity_deserializes_with_defaults() {
        let capacity: SystemCapacity = serde_json::from_str(r#"{"core_count": 16}"#).unwrap();
        assert_eq!(capacity.core_count, 16);
        assert_eq!(capacity.total_memory_mb, 8192.0);
    }
}
