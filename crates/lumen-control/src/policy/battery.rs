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

//! Battery policy. Rules fire at or below their threshold.

use super::{Evaluation, PolicyRule, RecommendedAction, RuleSet, Trigger};
use lumen_core::BatteryStatus;

/// Settings attached to each battery tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatterySettings {
    /// Whether the shell should switch to its power-saving profile.
    pub power_saver: bool,
    /// Whether UI animations run.
    pub animations_enabled: bool,
    /// Factor applied to the sampling interval of the policy service.
    pub sampling_interval_multiplier: f64,
}

/// Classifies battery charge. Charging always reads as healthy.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryPolicy {
    rules: RuleSet<BatteryStatus, BatterySettings>,
}

impl BatteryPolicy {
    /// Creates the policy with tiers at 30%, 20% and 10%.
    pub fn new() -> Self {
        let rules = RuleSet::new(
            Trigger::AtOrBelow,
            PolicyRule::new(
                f64::INFINITY,
                BatteryStatus::Healthy,
                Vec::new(),
                BatterySettings {
                    power_saver: false,
                    animations_enabled: true,
                    sampling_interval_multiplier: 1.0,
                },
            ),
            vec![
                PolicyRule::new(
                    30.0,
                    BatteryStatus::Saver,
                    vec![RecommendedAction::PauseBackgroundTasks],
                    BatterySettings {
                        power_saver: false,
                        animations_enabled: true,
                        sampling_interval_multiplier: 1.5,
                    },
                ),
                PolicyRule::new(
                    20.0,
                    BatteryStatus::Low,
                    vec![
                        RecommendedAction::PauseBackgroundTasks,
                        RecommendedAction::EnablePowerSaver,
                    ],
                    BatterySettings {
                        power_saver: true,
                        animations_enabled: false,
                        sampling_interval_multiplier: 2.0,
                    },
                ),
                PolicyRule::new(
                    10.0,
                    BatteryStatus::Critical,
                    vec![
                        RecommendedAction::PauseBackgroundTasks,
                        RecommendedAction::EnablePowerSaver,
                        RecommendedAction::DisableAnimations,
                        RecommendedAction::WarnUser,
                    ],
                    BatterySettings {
                        power_saver: true,
                        animations_enabled: false,
                        sampling_interval_multiplier: 3.0,
                    },
                ),
            ],
        );
        Self { rules }
    }

    /// Classifies `level_percent`; `is_charging` short-circuits to healthy.
    pub fn evaluate(
        &self,
        level_percent: f64,
        is_charging: bool,
    ) -> Evaluation<'_, BatteryStatus, BatterySettings> {
        if is_charging {
            return self.rules.evaluate(f64::INFINITY);
        }
        self.rules.evaluate(level_percent)
    }

    /// Convenience accessor for the tier only.
    pub fn status(&self, level_percent: f64, is_charging: bool) -> BatteryStatus {
        self.evaluate(level_percent, is_charging).status
    }

    /// The underlying rules.
    pub fn rules(&self) -> &RuleSet<BatteryStatus, BatterySettings> {
        &self.rules
    }
}

impl Default for BatteryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_is_total_and_idempotent() {
        let policy = BatteryPolicy::new();
        for level in [
            f64::NAN,
            f64::NEG_INFINITY,
            -10.0,
            0.0,
            10.0,
            20.0,
            30.0,
            100.0,
            f64::INFINITY,
        ] {
            for charging in [false, true] {
                let first = policy.evaluate(level, charging);
                assert_eq!(first, policy.evaluate(level, charging), "{} {}", level, charging);
                assert_eq!(first.status, first.rule.status);
            }
        }
        assert_eq!(policy.status(f64::NEG_INFINITY, false), BatteryStatus::Critical);
        assert_eq!(policy.status(f64::INFINITY, false), BatteryStatus::Healthy);
    }

    #[test]
    fn test_charging_is_always_healthy() {
        let policy = BatteryPolicy::new();
        for level in [-10.0, 0.0, 5.0, 15.0, 25.0, 100.0, f64::NAN] {
            assert_eq!(policy.status(level, true), BatteryStatus::Healthy);
        }
    }

    #[test]
    fn test_tiers_while_unplugged() {
        let policy = BatteryPolicy::new();
        assert_eq!(policy.status(80.0, false), BatteryStatus::Healthy);
        assert_eq!(policy.status(30.0, false), BatteryStatus::Saver);
        assert_eq!(policy.status(20.0, false), BatteryStatus::Low);
        assert_eq!(policy.status(10.0, false), BatteryStatus::Critical);
        assert_eq!(policy.status(-1.0, false), BatteryStatus::Critical);
    }

    #[test]
    fn test_nan_level_is_healthy() {
        let policy = BatteryPolicy::new();
        assert_eq!(policy.status(f64::NAN, false), BatteryStatus::Healthy);
    }

    #[test]
    fn test_sampling_slows_as_battery_drains() {
        let policy = BatteryPolicy::new();
        let full = policy.evaluate(90.0, false).rule.settings;
        let low = policy.evaluate(15.0, false).rule.settings;
        assert!(low.sampling_interval_multiplier > full.sampling_interval_multiplier);
        assert!(low.power_saver);
    }
}
