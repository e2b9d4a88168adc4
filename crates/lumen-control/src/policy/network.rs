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

//! Network quality policy, keyed on round-trip time.

use super::{Evaluation, PolicyRule, RecommendedAction, RuleSet, Trigger};
use lumen_core::NetworkProfile;
use std::time::Duration;

/// Content settings pushed to the UI process for each profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSettings {
    /// Image quality, 0 to 100.
    pub image_quality_percent: u8,
    /// Whether videos may autoplay.
    pub video_autoplay: bool,
    /// Whether UI animations run.
    pub animations_enabled: bool,
    /// Timeout for cross-process calls.
    pub ipc_timeout: Duration,
}

/// Classifies network round-trip time into a profile.
///
/// | profile | RTT | image | autoplay | animations | ipc timeout |
/// |---|---|---|---|---|---|
/// | excellent | < 100ms | 100% | yes | yes | 5s |
/// | good | ≥ 100ms | 85% | yes | yes | 8s |
/// | slow | ≥ 300ms | 60% | no | no | 15s |
/// | very-slow | ≥ 1000ms | 30% | no | no | 30s |
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkPolicy {
    rules: RuleSet<NetworkProfile, NetworkSettings>,
}

impl NetworkPolicy {
    /// Creates the policy with the default RTT bands.
    pub fn new() -> Self {
        let rules = RuleSet::new(
            Trigger::AtOrAbove,
            PolicyRule::new(
                f64::NEG_INFINITY,
                NetworkProfile::Excellent,
                Vec::new(),
                NetworkSettings {
                    image_quality_percent: 100,
                    video_autoplay: true,
                    animations_enabled: true,
                    ipc_timeout: Duration::from_secs(5),
                },
            ),
            vec![
                PolicyRule::new(
                    100.0,
                    NetworkProfile::Good,
                    vec![
                        RecommendedAction::ReduceImageQuality,
                        RecommendedAction::ExtendIpcTimeout,
                    ],
                    NetworkSettings {
                        image_quality_percent: 85,
                        video_autoplay: true,
                        animations_enabled: true,
                        ipc_timeout: Duration::from_secs(8),
                    },
                ),
                PolicyRule::new(
                    300.0,
                    NetworkProfile::Slow,
                    vec![
                        RecommendedAction::ReduceImageQuality,
                        RecommendedAction::DisableVideoAutoplay,
                        RecommendedAction::DisableAnimations,
                        RecommendedAction::ExtendIpcTimeout,
                    ],
                    NetworkSettings {
                        image_quality_percent: 60,
                        video_autoplay: false,
                        animations_enabled: false,
                        ipc_timeout: Duration::from_secs(15),
                    },
                ),
                PolicyRule::new(
                    1_000.0,
                    NetworkProfile::VerySlow,
                    vec![
                        RecommendedAction::ReduceImageQuality,
                        RecommendedAction::DisableVideoAutoplay,
                        RecommendedAction::DisableAnimations,
                        RecommendedAction::ExtendIpcTimeout,
                    ],
                    NetworkSettings {
                        image_quality_percent: 30,
                        video_autoplay: false,
                        animations_enabled: false,
                        ipc_timeout: Duration::from_secs(30),
                    },
                ),
            ],
        );
        Self { rules }
    }

    /// Classifies `rtt_ms`.
    pub fn evaluate(&self, rtt_ms: f64) -> Evaluation<'_, NetworkProfile, NetworkSettings> {
        self.rules.evaluate(rtt_ms)
    }

    /// Convenience accessor for the profile only.
    pub fn profile(&self, rtt_ms: f64) -> NetworkProfile {
        self.rules.evaluate(rtt_ms).status
    }

    /// Settings of the given profile.
    pub fn settings_for(&self, profile: NetworkProfile) -> Option<NetworkSettings> {
        self.rules.rule_for(profile).map(|rule| rule.settings)
    }

    /// The underlying rules.
    pub fn rules(&self) -> &RuleSet<NetworkProfile, NetworkSettings> {
        &self.rules
    }
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_is_total_and_idempotent() {
        let policy = NetworkPolicy::new();
        for rtt in [
            f64::NAN,
            f64::NEG_INFINITY,
            -1.0,
            0.0,
            100.0,
            300.0,
            1_000.0,
            f64::INFINITY,
        ] {
            let first = policy.evaluate(rtt);
            assert_eq!(first, policy.evaluate(rtt), "{}", rtt);
            assert_eq!(first.status, first.rule.status);
        }
        assert_eq!(policy.profile(f64::NAN), NetworkProfile::Excellent);
        assert_eq!(policy.profile(f64::NEG_INFINITY), NetworkProfile::Excellent);
        assert_eq!(policy.profile(f64::INFINITY), NetworkProfile::VerySlow);
    }

    #[test]
    fn test_profiles() {
        let policy = NetworkPolicy::new();
        assert_eq!(policy.profile(20.0), NetworkProfile::Excellent);
        assert_eq!(policy.profile(100.0), NetworkProfile::Good);
        assert_eq!(policy.profile(299.0), NetworkProfile::Good);
        assert_eq!(policy.profile(300.0), NetworkProfile::Slow);
        assert_eq!(policy.profile(1_500.0), NetworkProfile::VerySlow);
        assert_eq!(policy.profile(-1.0), NetworkProfile::Excellent);
    }

    #[test]
    fn test_settings_degrade_with_profile() {
        let policy = NetworkPolicy::new();
        let excellent = policy.settings_for(NetworkProfile::Excellent).unwrap();
        let slow = policy.settings_for(NetworkProfile::Slow).unwrap();
        let very_slow = policy.settings_for(NetworkProfile::VerySlow).unwrap();

        assert!(excellent.video_autoplay && excellent.animations_enabled);
        assert!(!slow.video_autoplay && !slow.animations_enabled);
        assert!(very_slow.image_quality_percent < slow.image_quality_percent);
        assert!(very_slow.ipc_timeout > slow.ipc_timeout);
    }

    #[test]
    fn test_thresholds_are_monotonic() {
        let policy = NetworkPolicy::new();
        let thresholds: Vec<f64> = policy.rules().rules().map(|r| r.threshold).collect();
        assert!(thresholds.windows(2).all(|w| w[0] < w[1]));
    }
}
