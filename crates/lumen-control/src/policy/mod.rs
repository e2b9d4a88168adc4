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

//! Domain policies: pure classifiers mapping a metric to a severity tier and
//! the settings recommended for that tier.
//!
//! Each policy owns a [`RuleSet`]: one base rule that always matches, plus
//! escalation rules ordered from least to most severe. Evaluation scans the
//! escalations from most severe down and falls back to the base rule, so every
//! input (including NaN) maps to exactly one rule.
//!
//! Policies perform no I/O, hold no mutable state and never call into the
//! enforcers.

mod battery;
mod cpu;
mod memory;
mod network;

pub use battery::{BatteryPolicy, BatterySettings};
pub use cpu::{CpuPolicy, CpuSettings};
pub use memory::{MemoryEvaluation, MemoryPolicy, MemoryPolicyThresholds, MemorySettings};
pub use network::{NetworkPolicy, NetworkSettings};

/// Direction in which a rule's threshold is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The rule fires when the metric is at or above the threshold.
    AtOrAbove,
    /// The rule fires when the metric is at or below the threshold.
    AtOrBelow,
}

impl Trigger {
    fn fires(self, value: f64, threshold: f64) -> bool {
        match self {
            Trigger::AtOrAbove => value >= threshold,
            Trigger::AtOrBelow => value <= threshold,
        }
    }
}

/// A corrective measure a rule recommends. Enforcers decide how to apply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecommendedAction {
    /// Drop in-memory caches.
    ClearCaches,
    /// Release renderer content of old background tabs.
    UnloadBackgroundTabs,
    /// Suspend old background tabs.
    SuspendTabs,
    /// Discard old suspended tabs.
    DiscardTabs,
    /// Ask for a garbage-collection pass.
    TriggerGc,
    /// Tell the user something is wrong.
    WarnUser,
    /// Pause background tasks below the priority ceiling.
    PauseBackgroundTasks,
    /// Reduce the background worker pool.
    ReduceWorkerThreads,
    /// Lower image quality.
    ReduceImageQuality,
    /// Stop autoplaying video.
    DisableVideoAutoplay,
    /// Stop UI animations.
    DisableAnimations,
    /// Give cross-process calls more time.
    ExtendIpcTimeout,
    /// Switch the shell to its power-saving profile.
    EnablePowerSaver,
}

/// One tier of a domain policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRule<S, T> {
    /// Metric value at which the rule fires.
    pub threshold: f64,
    /// Tier reported when the rule fires.
    pub status: S,
    /// Measures recommended at this tier.
    pub recommended_actions: Vec<RecommendedAction>,
    /// Domain settings applied at this tier.
    pub settings: T,
}

impl<S, T> PolicyRule<S, T> {
    /// Creates a rule.
    pub fn new(
        threshold: f64,
        status: S,
        recommended_actions: Vec<RecommendedAction>,
        settings: T,
    ) -> Self {
        Self {
            threshold,
            status,
            recommended_actions,
            settings,
        }
    }
}

/// The outcome of evaluating a metric against a policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation<'a, S, T> {
    /// The matched tier.
    pub status: S,
    /// The matched rule.
    pub rule: &'a PolicyRule<S, T>,
}

/// An exhaustive, ordered list of rules for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet<S, T> {
    trigger: Trigger,
    base: PolicyRule<S, T>,
    escalations: Vec<PolicyRule<S, T>>,
}

impl<S: Copy + PartialEq, T> RuleSet<S, T> {
    /// Creates a rule set.
    ///
    /// `base` matches everything no escalation claims. `escalations` must be
    /// ordered from least to most severe.
    pub fn new(trigger: Trigger, base: PolicyRule<S, T>, escalations: Vec<PolicyRule<S, T>>) -> Self {
        Self {
            trigger,
            base,
            escalations,
        }
    }

    /// Returns the most severe rule whose condition holds for `value`.
    pub fn evaluate(&self, value: f64) -> Evaluation<'_, S, T> {
        let rule = self
            .escalations
            .iter()
            .rev()
            .find(|rule| self.trigger.fires(value, rule.threshold))
            .unwrap_or(&self.base);
        Evaluation {
            status: rule.status,
            rule,
        }
    }

    /// Returns the rule reporting `status`, if the set has one.
    pub fn rule_for(&self, status: S) -> Option<&PolicyRule<S, T>> {
        self.rules().find(|rule| rule.status == status)
    }

    /// Iterates the rules from least to most severe.
    pub fn rules(&self) -> impl Iterator<Item = &PolicyRule<S, T>> {
        std::iter::once(&self.base).chain(self.escalations.iter())
    }

    /// Comparison direction of this set.
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> RuleSet<u8, ()> {
        RuleSet::new(
            Trigger::AtOrAbove,
            PolicyRule::new(f64::NEG_INFINITY, 0, vec![], ()),
            vec![
                PolicyRule::new(10.0, 1, vec![RecommendedAction::ClearCaches], ()),
                PolicyRule::new(20.0, 2, vec![RecommendedAction::TriggerGc], ()),
            ],
        )
    }

    #[test]
    fn test_most_severe_matching_rule_wins() {
        let set = sample_set();
        assert_eq!(set.evaluate(5.0).status, 0);
        assert_eq!(set.evaluate(10.0).status, 1);
        assert_eq!(set.evaluate(19.9).status, 1);
        assert_eq!(set.evaluate(20.0).status, 2);
        assert_eq!(set.evaluate(1e12).status, 2);
    }

    #[test]
    fn test_nan_falls_back_to_base_rule() {
        let set = sample_set();
        assert_eq!(set.evaluate(f64::NAN).status, 0);
    }

    #[test]
    fn test_at_or_below_trigger() {
        let set: RuleSet<u8, ()> = RuleSet::new(
            Trigger::AtOrBelow,
            PolicyRule::new(f64::INFINITY, 0, vec![], ()),
            vec![
                PolicyRule::new(30.0, 1, vec![], ()),
                PolicyRule::new(10.0, 2, vec![], ()),
            ],
        );
        assert_eq!(set.evaluate(50.0).status, 0);
        assert_eq!(set.evaluate(30.0).status, 1);
        assert_eq!(set.evaluate(10.0).status, 2);
        assert_eq!(set.evaluate(-5.0).status, 2);
    }

    #[test]
    fn test_rule_lookup_by_status() {
        let set = sample_set();
        let rule = set.rule_for(2).expect("status 2 exists");
        assert_eq!(rule.threshold, 20.0);
        assert!(set.rule_for(9).is_none());
        assert_eq!(set.rules().count(), 3);
    }
}
