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

//! CPU load policy.

use super::{Evaluation, PolicyRule, RecommendedAction, RuleSet, Trigger};
use lumen_core::CpuStatus;

/// Settings attached to each CPU tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSettings {
    /// Share of the worker-thread ceiling that may be used, in percent.
    pub worker_thread_percent: u8,
}

/// Classifies global CPU usage.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuPolicy {
    rules: RuleSet<CpuStatus, CpuSettings>,
}

impl CpuPolicy {
    /// Creates the policy with thresholds at 50%, 70% and 80%.
    pub fn new() -> Self {
        Self::with_thresholds(50.0, 70.0, 80.0)
    }

    /// Creates the policy with custom thresholds (sorted ascending first).
    pub fn with_thresholds(elevated: f64, high: f64, critical: f64) -> Self {
        let mut bounds = [elevated, high, critical];
        bounds.sort_by(f64::total_cmp);
        let [elevated, high, critical] = bounds;

        let rules = RuleSet::new(
            Trigger::AtOrAbove,
            PolicyRule::new(
                f64::NEG_INFINITY,
                CpuStatus::Healthy,
                Vec::new(),
                CpuSettings {
                    worker_thread_percent: 100,
                },
            ),
            vec![
                PolicyRule::new(
                    elevated,
                    CpuStatus::Elevated,
                    vec![RecommendedAction::PauseBackgroundTasks],
                    CpuSettings {
                        worker_thread_percent: 75,
                    },
                ),
                PolicyRule::new(
                    high,
                    CpuStatus::High,
                    vec![
                        RecommendedAction::PauseBackgroundTasks,
                        RecommendedAction::ReduceWorkerThreads,
                    ],
                    CpuSettings {
                        worker_thread_percent: 50,
                    },
                ),
                PolicyRule::new(
                    critical,
                    CpuStatus::Critical,
                    vec![
                        RecommendedAction::PauseBackgroundTasks,
                        RecommendedAction::ReduceWorkerThreads,
                        RecommendedAction::DisableAnimations,
                    ],
                    CpuSettings {
                        worker_thread_percent: 25,
                    },
                ),
            ],
        );
        Self { rules }
    }

    /// Classifies `usage_percent`.
    pub fn evaluate(&self, usage_percent: f64) -> Evaluation<'_, CpuStatus, CpuSettings> {
        self.rules.evaluate(usage_percent)
    }

    /// Convenience accessor for the tier only.
    pub fn status(&self, usage_percent: f64) -> CpuStatus {
        self.rules.evaluate(usage_percent).status
    }

    /// Worker threads recommended for `usage_percent` given a ceiling.
    pub fn recommended_workers(&self, usage_percent: f64, max_workers: usize) -> usize {
        let percent = self.evaluate(usage_percent).rule.settings.worker_thread_percent as usize;
        (max_workers * percent / 100).max(1)
    }

    /// The underlying rules.
    pub fn rules(&self) -> &RuleSet<CpuStatus, CpuSettings> {
        &self.rules
    }
}

impl Default for CpuPolicy {
    fn default() -> Self {
        Self::new()
    }
}
