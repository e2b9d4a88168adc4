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

//! Memory pressure policy.

use super::{Evaluation, PolicyRule, RecommendedAction, RuleSet, Trigger};
use crate::thresholds;
use lumen_core::{MemoryStatus, SystemCapacity};

/// The three memory thresholds, in megabytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryPolicyThresholds {
    /// Usage at which caches start being trimmed.
    pub gc_mb: f64,
    /// Usage at which background tabs start being released.
    pub critical_mb: f64,
    /// Usage at which every measure applies.
    pub hard_limit_mb: f64,
}

impl MemoryPolicyThresholds {
    /// Derives the thresholds from machine capacity.
    pub fn for_capacity(capacity: SystemCapacity) -> Self {
        Self {
            gc_mb: thresholds::gc_threshold_mb(capacity.total_memory_mb),
            critical_mb: thresholds::critical_threshold_mb(capacity.total_memory_mb),
            hard_limit_mb: thresholds::hard_limit_mb(capacity.total_memory_mb),
        }
    }

    /// Forces the thresholds into non-decreasing order.
    ///
    /// A lower tier never sits above a higher one: `critical` is raised to
    /// `gc` and `hard_limit` to `critical` when overrides disagree.
    pub fn normalized(self) -> Self {
        let gc_mb = if self.gc_mb.is_finite() { self.gc_mb } else { 0.0 };
        let critical_mb = if self.critical_mb.is_finite() {
            self.critical_mb.max(gc_mb)
        } else {
            gc_mb
        };
        let hard_limit_mb = if self.hard_limit_mb.is_finite() {
            self.hard_limit_mb.max(critical_mb)
        } else {
            critical_mb
        };
        Self {
            gc_mb,
            critical_mb,
            hard_limit_mb,
        }
    }
}

/// Settings attached to each memory tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySettings {
    /// Maximum number of tabs the tab enforcer suspends in one pass.
    pub suspend_batch: usize,
    /// Maximum number of suspended tabs the tab enforcer discards in one pass.
    pub discard_batch: usize,
}

/// Result of a memory evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryEvaluation<'a> {
    /// The matched tier.
    pub status: MemoryStatus,
    /// The matched rule.
    pub rule: &'a PolicyRule<MemoryStatus, MemorySettings>,
    /// Proximity to the hard limit: 0.0 at or below the GC threshold, 1.0 at
    /// or above the hard limit.
    pub pressure: f64,
}

/// Classifies application memory usage.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPolicy {
    thresholds: MemoryPolicyThresholds,
    rules: RuleSet<MemoryStatus, MemorySettings>,
}

impl MemoryPolicy {
    /// Creates a policy from explicit thresholds (normalised first).
    pub fn new(thresholds: MemoryPolicyThresholds) -> Self {
        let thresholds = thresholds.normalized();
        let rules = RuleSet::new(
            Trigger::AtOrAbove,
            PolicyRule::new(
                f64::NEG_INFINITY,
                MemoryStatus::Healthy,
                Vec::new(),
                MemorySettings {
                    suspend_batch: 0,
                    discard_batch: 0,
                },
            ),
            vec![
                PolicyRule::new(
                    thresholds.gc_mb,
                    MemoryStatus::Warning,
                    vec![RecommendedAction::ClearCaches, RecommendedAction::SuspendTabs],
                    MemorySettings {
                        suspend_batch: 1,
                        discard_batch: 0,
                    },
                ),
                PolicyRule::new(
                    thresholds.critical_mb,
                    MemoryStatus::Critical,
                    vec![
                        RecommendedAction::ClearCaches,
                        RecommendedAction::UnloadBackgroundTabs,
                        RecommendedAction::SuspendTabs,
                        RecommendedAction::DiscardTabs,
                    ],
                    MemorySettings {
                        suspend_batch: 3,
                        discard_batch: 2,
                    },
                ),
                PolicyRule::new(
                    thresholds.hard_limit_mb,
                    MemoryStatus::Emergency,
                    vec![
                        RecommendedAction::ClearCaches,
                        RecommendedAction::UnloadBackgroundTabs,
                        RecommendedAction::SuspendTabs,
                        RecommendedAction::DiscardTabs,
                        RecommendedAction::TriggerGc,
                        RecommendedAction::WarnUser,
                    ],
                    MemorySettings {
                        suspend_batch: 5,
                        discard_batch: 5,
                    },
                ),
            ],
        );
        Self { thresholds, rules }
    }

    /// Creates a policy whose thresholds derive from machine capacity.
    pub fn for_capacity(capacity: SystemCapacity) -> Self {
        Self::new(MemoryPolicyThresholds::for_capacity(capacity))
    }

    /// Classifies `used_mb` and computes the continuous pressure.
    pub fn evaluate(&self, used_mb: f64) -> MemoryEvaluation<'_> {
        let Evaluation { status, rule } = self.rules.evaluate(used_mb);
        log::trace!("MemoryPolicy: {:.1}MB -> {}", used_mb, status);
        MemoryEvaluation {
            status,
            rule,
            pressure: self.pressure(used_mb),
        }
    }

    /// Convenience accessor for the tier only.
    pub fn status(&self, used_mb: f64) -> MemoryStatus {
        self.rules.evaluate(used_mb).status
    }

    /// Continuous pressure in `[0, 1]`, non-decreasing in `used_mb`.
    pub fn pressure(&self, used_mb: f64) -> f64 {
        let MemoryPolicyThresholds {
            gc_mb,
            hard_limit_mb,
            ..
        } = self.thresholds;
        if used_mb.is_nan() || used_mb <= gc_mb {
            return 0.0;
        }
        if used_mb >= hard_limit_mb {
            return 1.0;
        }
        ((used_mb - gc_mb) / (hard_limit_mb - gc_mb)).clamp(0.0, 1.0)
    }

    /// Returns the settings of the rule reporting `status`.
    pub fn settings_for(&self, status: MemoryStatus) -> MemorySettings {
        self.rules
            .rule_for(status)
            .map(|rule| rule.settings)
            .unwrap_or(MemorySettings {
                suspend_batch: 0,
                discard_batch: 0,
            })
    }

    /// The normalised thresholds in use.
    pub fn thresholds(&self) -> MemoryPolicyThresholds {
        self.thresholds
    }

    /// The underlying rules.
    pub fn rules(&self) -> &RuleSet<MemoryStatus, MemorySettings> {
        &self.rules
    }
}
