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

//! The enforcer manager: decides which enforcers run for a snapshot and in
//! what order, and aggregates what they did.

use crate::actions::EnforcerActions;
use crate::config::EngineConfig;
use crate::enforcer::{
    BackgroundTaskEnforcer, EnforcerOutputs, MemoryEnforcer, NetworkEnforcer, TabEnforcer,
};
use crate::history::{MetricHistory, MetricStats};
use crate::policy::{BatteryPolicy, CpuPolicy, MemoryPolicy, NetworkPolicy};
use crate::registry::{TabCounts, TabRegistry, TaskCounts};
use crate::thresholds::ResourceThresholds;
use lumen_core::event::{EnforcementEvent, EventBus};
use lumen_core::platform::{ActuationChannel, NotificationSink};
use lumen_core::{
    BatteryStatus, CpuStatus, MemoryStatus, NetworkProfile, SystemMetricsSnapshot,
};
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Battery level below which an unplugged device counts as pressured.
pub const BATTERY_PRESSURE_PERCENT: f64 = 30.0;

/// Whether a domain's enforcer must run for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DomainAttention {
    /// Nothing to do.
    #[default]
    None,
    /// The domain is under pressure.
    Pressured,
    /// Pressure is gone but earlier corrective measures are still in effect.
    Recovering,
}

impl DomainAttention {
    /// `true` unless the domain needs nothing.
    pub fn is_needed(self) -> bool {
        self != DomainAttention::None
    }
}

/// Classification of one snapshot across all domains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    /// Memory tier.
    pub memory: MemoryStatus,
    /// Proximity to the memory hard limit, in `[0, 1]`.
    pub memory_pressure: f64,
    /// CPU tier.
    pub cpu: CpuStatus,
    /// Battery tier (healthy while charging).
    pub battery: BatteryStatus,
    /// Unplugged with less than [`BATTERY_PRESSURE_PERCENT`] left.
    pub battery_pressured: bool,
    /// Network profile.
    pub network: NetworkProfile,
    /// Gate of the memory and tab enforcers.
    pub memory_attention: DomainAttention,
    /// Gate of the background-task enforcer.
    pub task_attention: DomainAttention,
    /// Gate of the network enforcer.
    pub network_attention: DomainAttention,
}

impl Assessment {
    /// Pressured domains in priority order (memory, cpu, battery, network),
    /// joined by `" > "`, or `"none"`.
    pub fn priority_label(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if self.memory_attention == DomainAttention::Pressured {
            parts.push("memory");
        }
        if self.cpu != CpuStatus::Healthy {
            parts.push("cpu");
        }
        if self.battery_pressured {
            parts.push("battery");
        }
        if self.task_attention == DomainAttention::Recovering {
            parts.push("tasks(recovering)");
        }
        match self.network_attention {
            DomainAttention::Pressured => parts.push("network"),
            DomainAttention::Recovering => parts.push("network(recovering)"),
            DomainAttention::None => {}
        }
        if parts.is_empty() {
            "none".to_owned()
        } else {
            parts.join(" > ")
        }
    }
}

/// Read-only projection of the engine's state.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSummary {
    /// Completed `enforce_all` passes.
    pub passes: u64,
    /// Priority label of the last pass.
    pub last_priority: String,
    /// Memory tier seen by the memory enforcer's last run.
    pub memory_status: MemoryStatus,
    /// Network profile currently applied, if any.
    pub network_profile: Option<NetworkProfile>,
    /// Tabs per state.
    pub tabs: TabCounts,
    /// Tasks per state.
    pub tasks: TaskCounts,
    /// Recent memory usage.
    pub memory_history: MetricStats,
    /// Recent CPU usage.
    pub cpu_history: MetricStats,
    /// Recent round-trip time.
    pub rtt_history: MetricStats,
}

impl fmt::Display for EngineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "passes: {} (last: {})", self.passes, self.last_priority)?;
        writeln!(
            f,
            "memory: {} | avg {:.0}MB, trend {:+.1}MB, range {:.0}-{:.0}MB",
            self.memory_status,
            self.memory_history.average,
            self.memory_history.trend,
            self.memory_history.min,
            self.memory_history.max
        )?;
        writeln!(
            f,
            "cpu: avg {:.1}%, trend {:+.1}%",
            self.cpu_history.average, self.cpu_history.trend
        )?;
        writeln!(
            f,
            "network: {} | avg rtt {:.0}ms",
            self.network_profile
                .map_or_else(|| "unset".to_owned(), |p| p.to_string()),
            self.rtt_history.average
        )?;
        writeln!(
            f,
            "tabs: {} active, {} background, {} suspended",
            self.tabs.active, self.tabs.background, self.tabs.suspended
        )?;
        write!(
            f,
            "tasks: {} pending, {} running, {} paused, {} finished",
            self.tasks.pending, self.tasks.running, self.tasks.paused, self.tasks.finished
        )
    }
}

/// Owns the four enforcers and arbitrates between them.
///
/// For every snapshot each domain gets one [`DomainAttention`] that serves
/// both as the label of the pass and as the gate of its enforcer. Enforcers
/// then run in a fixed order: memory, tabs, background tasks, network.
pub struct EnforcerManager {
    config: EngineConfig,
    thresholds: ResourceThresholds,
    cpu_policy: CpuPolicy,
    battery_policy: BatteryPolicy,
    memory: MemoryEnforcer,
    tabs: TabEnforcer,
    tasks: BackgroundTaskEnforcer,
    network: NetworkEnforcer,
    events: Arc<EventBus<EnforcementEvent>>,
    history: Mutex<MetricHistory>,
    last_priority: Mutex<String>,
    passes: AtomicU64,
}

impl EnforcerManager {
    /// Builds the engine with its own tab and task registries.
    pub fn new(
        config: EngineConfig,
        channel: Arc<dyn ActuationChannel>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let outputs = EnforcerOutputs::new(channel, config.event_buffer_size);
        let memory_policy = MemoryPolicy::new(config.memory_thresholds());
        let tab_registry = Arc::new(RwLock::new(TabRegistry::new()));

        log::info!(
            "EnforcerManager: capacity {:.0}MB / {} cores, memory thresholds {:?}",
            config.capacity.total_memory_mb,
            config.capacity.core_count,
            memory_policy.thresholds()
        );

        Self {
            thresholds: ResourceThresholds::for_capacity(config.capacity),
            cpu_policy: CpuPolicy::new(),
            battery_policy: BatteryPolicy::new(),
            memory: MemoryEnforcer::new(
                memory_policy.clone(),
                Arc::clone(&tab_registry),
                outputs.clone(),
                sink,
            ),
            tabs: TabEnforcer::new(tab_registry, memory_policy, outputs.clone()),
            tasks: BackgroundTaskEnforcer::new(outputs.clone()),
            network: NetworkEnforcer::new(NetworkPolicy::new(), outputs.clone()),
            events: outputs.events,
            history: Mutex::new(MetricHistory::new()),
            last_priority: Mutex::new("none".to_owned()),
            passes: AtomicU64::new(0),
            config,
        }
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Capacity-derived limits.
    pub fn thresholds(&self) -> &ResourceThresholds {
        &self.thresholds
    }

    /// CPU policy used for labelling and gating.
    pub fn cpu_policy(&self) -> &CpuPolicy {
        &self.cpu_policy
    }

    /// Battery policy used for labelling and gating.
    pub fn battery_policy(&self) -> &BatteryPolicy {
        &self.battery_policy
    }

    /// The memory enforcer.
    pub fn memory_enforcer(&self) -> &MemoryEnforcer {
        &self.memory
    }

    /// The tab enforcer, through which hosts register and update tabs.
    pub fn tab_enforcer(&self) -> &TabEnforcer {
        &self.tabs
    }

    /// The background-task enforcer, through which hosts manage tasks.
    pub fn task_enforcer(&self) -> &BackgroundTaskEnforcer {
        &self.tasks
    }

    /// The network enforcer.
    pub fn network_enforcer(&self) -> &NetworkEnforcer {
        &self.network
    }

    /// The bus carrying [`EnforcementEvent`]s.
    pub fn event_bus(&self) -> Arc<EventBus<EnforcementEvent>> {
        Arc::clone(&self.events)
    }

    /// Removes and returns every pending event.
    pub fn drain_events(&self) -> Vec<EnforcementEvent> {
        self.events.drain()
    }

    /// Classifies `snapshot` without acting on it.
    pub fn assess(&self, snapshot: &SystemMetricsSnapshot) -> Assessment {
        let memory = self.memory.policy().evaluate(snapshot.memory_used_mb);
        let cpu = self.cpu_policy.status(snapshot.cpu_usage_percent);
        let battery = self
            .battery_policy
            .status(snapshot.battery_percent, !snapshot.is_on_battery);
        let network = self.network.policy().profile(snapshot.rtt_ms);

        let memory_attention = if memory.status != MemoryStatus::Healthy {
            DomainAttention::Pressured
        } else {
            DomainAttention::None
        };
        let battery_pressured = snapshot.is_unplugged_below(BATTERY_PRESSURE_PERCENT);
        let task_attention = if cpu != CpuStatus::Healthy || battery_pressured {
            DomainAttention::Pressured
        } else if self.tasks.has_paused_tasks() {
            DomainAttention::Recovering
        } else {
            DomainAttention::None
        };
        let network_attention = if network.is_degraded() {
            DomainAttention::Pressured
        } else if self.network.needs_recovery() {
            DomainAttention::Recovering
        } else {
            DomainAttention::None
        };

        Assessment {
            memory: memory.status,
            memory_pressure: memory.pressure,
            cpu,
            battery,
            battery_pressured,
            network,
            memory_attention,
            task_attention,
            network_attention,
        }
    }

    /// Runs every enforcer the snapshot calls for and aggregates their actions.
    pub fn enforce_all(&self, snapshot: &SystemMetricsSnapshot) -> EnforcerActions {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(snapshot);

        let assessment = self.assess(snapshot);
        let mut actions = EnforcerActions {
            priority: assessment.priority_label(),
            ..EnforcerActions::default()
        };

        if assessment.memory_attention.is_needed() {
            actions.memory = self.memory.enforce(snapshot.memory_used_mb);
            let target_mb = self.config.tab_target_mb(snapshot.memory_total_mb);
            actions.tabs = self
                .tabs
                .optimize(assessment.memory, snapshot.memory_used_mb, target_mb);
        }
        match assessment.task_attention {
            DomainAttention::Pressured => {
                actions.tasks = self.tasks.enforce_task_queue(
                    snapshot.cpu_usage_percent,
                    snapshot.battery_percent,
                    snapshot.is_on_battery,
                );
            }
            DomainAttention::Recovering => {
                actions.tasks = self.tasks.resume_task_queue(
                    snapshot.cpu_usage_percent,
                    snapshot.battery_percent,
                    snapshot.is_on_battery,
                );
            }
            DomainAttention::None => {}
        }
        if assessment.network_attention.is_needed() {
            actions.network = self.network.enforce(snapshot.rtt_ms);
        }

        let passes = self.passes.fetch_add(1, Ordering::Relaxed) + 1;
        let mut last = self
            .last_priority
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last != actions.priority {
            log::info!(
                "EnforcerManager: priority {} -> {}",
                *last,
                actions.priority
            );
            last.clone_from(&actions.priority);
        }
        log::debug!(
            "EnforcerManager: pass {} [{}] {} action(s)",
            passes,
            actions.priority,
            actions.len()
        );
        actions
    }

    /// Copies the registry counts into `snapshot`.
    pub fn with_registry_counts(&self, snapshot: SystemMetricsSnapshot) -> SystemMetricsSnapshot {
        let tabs = self.tabs.counts();
        let tasks = self.tasks.counts();
        SystemMetricsSnapshot {
            active_tab_count: saturate(tabs.active),
            background_tab_count: saturate(tabs.background),
            running_task_count: saturate(tasks.running),
            paused_task_count: saturate(tasks.paused),
            ..snapshot
        }
    }

    /// Human-readable explanation of what a snapshot would trigger.
    pub fn diagnose(&self, snapshot: &SystemMetricsSnapshot) -> String {
        let assessment = self.assess(snapshot);
        let memory_thresholds = self.memory.policy().thresholds();
        let mut out = String::new();
        let _ = writeln!(out, "priority: {}", assessment.priority_label());
        let _ = writeln!(
            out,
            "memory: {:.0}MB -> {} (pressure {:.2}; gc {:.0}, critical {:.0}, hard {:.0})",
            snapshot.memory_used_mb,
            assessment.memory,
            assessment.memory_pressure,
            memory_thresholds.gc_mb,
            memory_thresholds.critical_mb,
            memory_thresholds.hard_limit_mb
        );
        let _ = writeln!(
            out,
            "cpu: {:.1}% -> {} (workers {}/{})",
            snapshot.cpu_usage_percent,
            assessment.cpu,
            self.cpu_policy.recommended_workers(
                snapshot.cpu_usage_percent,
                self.thresholds.max_worker_threads
            ),
            self.thresholds.max_worker_threads
        );
        let _ = writeln!(
            out,
            "battery: {:.0}% {} -> {}",
            snapshot.battery_percent,
            if snapshot.is_on_battery {
                "unplugged"
            } else {
                "plugged in"
            },
            assessment.battery
        );
        let _ = writeln!(
            out,
            "network: {:.0}ms -> {}",
            snapshot.rtt_ms, assessment.network
        );
        let _ = write!(
            out,
            "tabs: {} active, {} background | tasks: {} running, {} paused",
            snapshot.active_tab_count,
            snapshot.background_tab_count,
            snapshot.running_task_count,
            snapshot.paused_task_count
        );
        out
    }

    /// Read-only summary of the engine's state and recent history.
    pub fn summary(&self) -> EngineSummary {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        EngineSummary {
            passes: self.passes.load(Ordering::Relaxed),
            last_priority: self
                .last_priority
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            memory_status: self.memory.last_status(),
            network_profile: self.network.applied_profile(),
            tabs: self.tabs.counts(),
            tasks: self.tasks.counts(),
            memory_history: history.memory(),
            cpu_history: history.cpu(),
            rtt_history: history.rtt(),
        }
    }
}

fn saturate(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::test_support::{RecordingChannel, RecordingSink};
    use lumen_core::{
        SystemCapacity, TabId, TabRecord, TabState, TaskId, TaskPriority, TaskRecord, TaskState,
    };

    fn manager() -> EnforcerManager {
        EnforcerManager::new(
            EngineConfig::for_capacity(SystemCapacity {
                total_memory_mb: 1_000.0,
                core_count: 4,
            }),
            Arc::new(RecordingChannel::default()),
            Arc::new(RecordingSink::default()),
        )
    }

    #[test]
    fn test_calm_snapshot_does_nothing() {
        let manager = manager();
        let actions = manager.enforce_all(&SystemMetricsSnapshot::default());
        assert_eq!(actions.priority, "none");
        assert!(actions.is_empty());
    }

    #[test]
    fn test_priority_label_order() {
        let manager = manager();
        let snapshot = SystemMetricsSnapshot {
            memory_used_mb: 900.0,
            memory_total_mb: 1_000.0,
            cpu_usage_percent: 75.0,
            battery_percent: 15.0,
            is_on_battery: true,
            rtt_ms: 500.0,
            ..Default::default()
        };
        assert_eq!(
            manager.assess(&snapshot).priority_label(),
            "memory > cpu > battery > network"
        );
    }

    #[test]
    fn test_charging_battery_does_not_gate_tasks() {
        let manager = manager();
        let snapshot = SystemMetricsSnapshot {
            battery_percent: 5.0,
            is_on_battery: false,
            ..Default::default()
        };
        let assessment = manager.assess(&snapshot);
        assert_eq!(assessment.task_attention, DomainAttention::None);
        assert_eq!(assessment.priority_label(), "none");
    }

    #[test]
    fn test_battery_gate_starts_below_thirty_percent() {
        let manager = manager();
        let id = TaskId::from_name("prefetch");
        manager.task_enforcer().register_task(
            TaskRecord::new(id, TaskPriority::Low)
                .with_intensity(10, 10)
                .with_state(TaskState::Running),
        );
        let mut snapshot = SystemMetricsSnapshot {
            cpu_usage_percent: 40.0,
            battery_percent: 30.0,
            is_on_battery: true,
            ..Default::default()
        };

        let at_threshold = manager.enforce_all(&snapshot);
        assert_eq!(at_threshold.priority, "none");
        assert!(at_threshold.tasks.is_empty());
        assert_eq!(manager.task_enforcer().task(id).unwrap().state, TaskState::Running);

        snapshot.battery_percent = 29.9;
        let assessment = manager.assess(&snapshot);
        assert!(assessment.battery_pressured);
        assert_eq!(assessment.task_attention, DomainAttention::Pressured);
        assert_eq!(assessment.priority_label(), "battery");
    }

    #[test]
    fn test_network_recovery_is_labelled() {
        let manager = manager();
        manager.enforce_all(&SystemMetricsSnapshot {
            rtt_ms: 600.0,
            ..Default::default()
        });
        let actions = manager.enforce_all(&SystemMetricsSnapshot {
            rtt_ms: 40.0,
            ..Default::default()
        });
        assert_eq!(actions.priority, "network(recovering)");
        assert!(!actions.network.is_empty());
        assert_eq!(manager.network_enforcer().applied_profile(), Some(NetworkProfile::Excellent));
    }

    #[test]
    fn test_registry_counts_overlay() {
        let manager = manager();
        manager
            .tab_enforcer()
            .register_tab(TabRecord::new(TabId(1), TabState::Active, 10.0, 1));
        manager
            .tab_enforcer()
            .register_tab(TabRecord::new(TabId(2), TabState::Background, 10.0, 1));
        let snapshot = manager.with_registry_counts(SystemMetricsSnapshot::default());
        assert_eq!(snapshot.active_tab_count, 1);
        assert_eq!(snapshot.background_tab_count, 1);
    }

    #[test]
    fn test_diagnose_is_read_only() {
        let manager = manager();
        let snapshot = SystemMetricsSnapshot {
            memory_used_mb: 900.0,
            ..Default::default()
        };
        let report = manager.diagnose(&snapshot);
        assert!(report.starts_with("priority: memory"));
        assert!(report.contains("emergency"));
        assert_eq!(manager.summary().passes, 0);
        assert!(manager.drain_events().is_empty());
    }

    #[test]
    fn test_summary_tracks_passes() {
        let manager = manager();
        manager.enforce_all(&SystemMetricsSnapshot {
            cpu_usage_percent: 60.0,
            ..Default::default()
        });
        let summary = manager.summary();
        assert_eq!(summary.passes, 1);
        assert_eq!(summary.last_priority, "cpu");
        assert_eq!(summary.cpu_history.samples, 1);
        assert!(summary.to_string().contains("passes: 1 (last: cpu)"));
    }
}
