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

//! Construction-time configuration of the engine and its service.

use crate::policy::MemoryPolicyThresholds;
use lumen_core::SystemCapacity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Optional replacements for the capacity-derived memory thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryThresholdOverrides {
    /// Usage at which caches start being trimmed.
    pub gc_mb: Option<f64>,
    /// Usage at which background tabs start being released.
    pub critical_mb: Option<f64>,
    /// Usage at which every measure applies.
    pub hard_limit_mb: Option<f64>,
}

impl MemoryThresholdOverrides {
    /// Applies the overrides on top of `defaults`.
    pub fn apply(&self, defaults: MemoryPolicyThresholds) -> MemoryPolicyThresholds {
        MemoryPolicyThresholds {
            gc_mb: self.gc_mb.unwrap_or(defaults.gc_mb),
            critical_mb: self.critical_mb.unwrap_or(defaults.critical_mb),
            hard_limit_mb: self.hard_limit_mb.unwrap_or(defaults.hard_limit_mb),
        }
    }
}

/// Configuration of an [`EnforcerManager`](crate::EnforcerManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity the thresholds derive from.
    pub capacity: SystemCapacity,
    /// Memory threshold overrides.
    pub memory: MemoryThresholdOverrides,
    /// Lower bound of the tab enforcer's memory target, in megabytes.
    pub tab_target_floor_mb: f64,
    /// Share of total memory used as the tab enforcer's target.
    pub tab_target_ratio: f64,
    /// Capacity of the enforcement event bus.
    pub event_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: SystemCapacity::default(),
            memory: MemoryThresholdOverrides::default(),
            tab_target_floor_mb: 700.0,
            tab_target_ratio: 0.8,
            event_buffer_size: 256,
        }
    }
}

impl EngineConfig {
    /// Configuration for the given capacity, everything else default.
    pub fn for_capacity(capacity: SystemCapacity) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Memory thresholds after overrides.
    pub fn memory_thresholds(&self) -> MemoryPolicyThresholds {
        self.memory
            .apply(MemoryPolicyThresholds::for_capacity(self.capacity))
    }

    /// Tab enforcer target for a machine with `total_memory_mb`.
    pub fn tab_target_mb(&self, total_memory_mb: f64) -> f64 {
        let total = if total_memory_mb.is_finite() {
            total_memory_mb.max(0.0)
        } else {
            0.0
        };
        self.tab_target_floor_mb.max(self.tab_target_ratio * total)
    }
}

/// Configuration of a [`PolicyService`](crate::PolicyService).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base sampling interval. `None` derives it from capacity.
    pub sampling_interval: Option<Duration>,
    /// Maximum number of undelivered cycle reports.
    /// If the buffer is full, new reports are dropped.
    pub report_buffer_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sampling_interval: None,
            report_buffer_size: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tab_target_floor_mb, 700.0);
        assert_relative_eq!(config.tab_target_mb(500.0), 700.0);
        assert_relative_eq!(config.tab_target_mb(16_000.0), 12_800.0);
        assert_relative_eq!(config.tab_target_mb(f64::NAN), 700.0);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let mut config = EngineConfig::for_capacity(SystemCapacity {
            total_memory_mb: 16_000.0,
            core_count: 8,
        });
        config.memory.critical_mb = Some(1_000.0);
        let thresholds = config.memory_thresholds();
        assert_eq!(thresholds.gc_mb, 800.0);
        assert_eq!(thresholds.critical_mb, 1_000.0);
    }

    #[test]
    fn test_load_from_ron() {
        let source = r#"(
            capacity: (total_memory_mb: 4096.0, core_count: 2),
            memory: (gc_mb: Some(400.0)),
            event_buffer_size: 32,
        )"#;
        let config: EngineConfig = ron::from_str(source).expect("valid config");
        assert_eq!(config.capacity.core_count, 2);
        assert_eq!(config.memory.gc_mb, Some(400.0));
        assert_eq!(config.memory.hard_limit_mb, None);
        assert_eq!(config.event_buffer_size, 32);
        assert_eq!(config.tab_target_ratio, 0.8);
    }

    #[test]
    fn test_service_config_from_ron() {
        let config: ServiceConfig =
            ron::from_str("(sampling_interval: Some((secs: 2, nanos: 0)))").expect("valid config");
        assert_eq!(config.sampling_interval, Some(Duration::from_secs(2)));
        assert_eq!(config.report_buffer_size, 64);
    }
}
