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

//! Ordered severity tiers produced by the domain policies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory pressure tier, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    /// Usage is below the GC threshold.
    #[default]
    Healthy,
    /// Usage reached the GC threshold; caches should be trimmed.
    Warning,
    /// Usage reached the critical threshold; background tabs must be released.
    Critical,
    /// Usage reached the hard limit; every available measure applies.
    Emergency,
}

/// CPU load tier, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CpuStatus {
    /// Below 50% usage.
    #[default]
    Healthy,
    /// At or above 50% usage.
    Elevated,
    /// At or above 70% usage.
    High,
    /// At or above 80% usage.
    Critical,
}

/// Network quality profile derived from round-trip time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkProfile {
    /// Below 100ms.
    #[default]
    Excellent,
    /// At or above 100ms.
    Good,
    /// At or above 300ms.
    Slow,
    /// At or above 1000ms.
    VerySlow,
}

impl NetworkProfile {
    /// `true` for the profiles that degrade content quality.
    pub fn is_degraded(self) -> bool {
        matches!(self, NetworkProfile::Slow | NetworkProfile::VerySlow)
    }
}

/// Battery tier, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    /// Charging, or charge above 30%.
    #[default]
    Healthy,
    /// At or below 30% while unplugged.
    Saver,
    /// At or below 20% while unplugged.
    Low,
    /// At or below 10% while unplugged.
    Critical,
}

impl fmt::Display for MemoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemoryStatus::Healthy => "healthy",
            MemoryStatus::Warning => "warning",
            MemoryStatus::Critical => "critical",
            MemoryStatus::Emergency => "emergency",
        })
    }
}

impl fmt::Display for CpuStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CpuStatus::Healthy => "healthy",
            CpuStatus::Elevated => "elevated",
            CpuStatus::High => "high",
            CpuStatus::Critical => "critical",
        })
    }
}

impl fmt::Display for NetworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NetworkProfile::Excellent => "excellent",
            NetworkProfile::Good => "good",
            NetworkProfile::Slow => "slow",
            NetworkProfile::VerySlow => "very-slow",
        })
    }
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatteryStatus::Healthy => "healthy",
            BatteryStatus::Saver => "saver",
            BatteryStatus::Low => "low",
            BatteryStatus::Critical => "critical",
        })
    }
}
