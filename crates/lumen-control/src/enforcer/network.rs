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

//! Network enforcer: pushes content settings matching the current latency.

use super::{BusyFlag, EnforcerOutputs};
use crate::actions::EnforcementAction;
use crate::policy::NetworkPolicy;
use lumen_core::event::EnforcementEvent;
use lumen_core::NetworkProfile;
use std::sync::{Mutex, PoisonError};

/// RTT change below which an unchanged profile is not re-applied.
pub const RTT_HYSTERESIS_MS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Applied {
    profile: NetworkProfile,
    rtt_ms: f64,
}

/// Applies the network policy with hysteresis.
pub struct NetworkEnforcer {
    policy: NetworkPolicy,
    outputs: EnforcerOutputs,
    last: Mutex<Option<Applied>>,
    busy: BusyFlag,
}

impl NetworkEnforcer {
    /// Creates an enforcer that has not applied any profile yet.
    pub fn new(policy: NetworkPolicy, outputs: EnforcerOutputs) -> Self {
        Self {
            policy,
            outputs,
            last: Mutex::new(None),
            busy: BusyFlag::new(),
        }
    }

    /// The policy this enforcer applies.
    pub fn policy(&self) -> &NetworkPolicy {
        &self.policy
    }

    /// Profile pushed by the last applied call.
    pub fn applied_profile(&self) -> Option<NetworkProfile> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|applied| applied.profile)
    }

    /// `true` while degraded settings are in effect and must be lifted once
    /// latency recovers.
    pub fn needs_recovery(&self) -> bool {
        self.applied_profile()
            .is_some_and(NetworkProfile::is_degraded)
    }

    /// Classifies `rtt_ms` and pushes the settings of its profile.
    ///
    /// Returns an empty list when the profile is unchanged since the last
    /// applied call and the RTT moved by less than [`RTT_HYSTERESIS_MS`].
    pub fn enforce(&self, rtt_ms: f64) -> Vec<EnforcementAction> {
        let Some(_guard) = self.busy.try_enter() else {
            log::debug!("NetworkEnforcer: busy, skipping pass");
            return Vec::new();
        };

        let evaluation = self.policy.evaluate(rtt_ms);
        let profile = evaluation.status;
        let settings = evaluation.rule.settings;

        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *last;
        if let Some(applied) = previous {
            let moved = (rtt_ms - applied.rtt_ms).abs() >= RTT_HYSTERESIS_MS;
            if applied.profile == profile && !moved {
                log::trace!(
                    "NetworkEnforcer: {rtt_ms:.0}ms within hysteresis of {:.0}ms",
                    applied.rtt_ms
                );
                return Vec::new();
            }
        }

        let channel = &self.outputs.channel;
        channel.set_image_quality(settings.image_quality_percent);
        channel.set_video_autoplay(settings.video_autoplay);
        channel.set_animations(settings.animations_enabled);
        channel.set_ipc_timeout(settings.ipc_timeout);

        let previous_profile = previous.map(|applied| applied.profile);
        if previous_profile != Some(profile) {
            log::info!(
                "NetworkEnforcer: profile {} -> {} ({rtt_ms:.0}ms)",
                previous_profile.map_or_else(|| "none".to_owned(), |p| p.to_string()),
                profile
            );
        }
        self.outputs
            .events
            .publish(EnforcementEvent::NetworkProfileChanged {
                previous: previous_profile,
                current: profile,
                rtt_ms,
            });
        *last = Some(Applied { profile, rtt_ms });

        vec![
            EnforcementAction::NetworkProfileApplied { profile },
            EnforcementAction::ImageQualitySet {
                percent: settings.image_quality_percent,
            },
            EnforcementAction::VideoAutoplaySet {
                enabled: settings.video_autoplay,
            },
            EnforcementAction::AnimationsSet {
                enabled: settings.animations_enabled,
            },
            EnforcementAction::IpcTimeoutSet {
                timeout: settings.ipc_timeout,
            },
        ]
    }
}
