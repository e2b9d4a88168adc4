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

use lumen_control::policy::{MemoryPolicy, MemoryPolicyThresholds};
use lumen_control::{EngineConfig, EnforcementAction, EnforcerManager, MemoryThresholdOverrides};
use lumen_core::event::EnforcementEvent;
use lumen_core::platform::{ActuationChannel, ActuationRequest, NotificationSink};
use lumen_core::{
    MemoryStatus, SystemCapacity, SystemMetricsSnapshot, TabId, TabRecord, TabState, TaskId,
    TaskPriority, TaskRecord, TaskState,
};
use std::sync::{Arc, Mutex};

// --- TEST DOUBLES ---
#[derive(Default)]
struct RecordingChannel(Mutex<Vec<ActuationRequest>>);

impl RecordingChannel {
    fn requests(&self) -> Vec<ActuationRequest> {
        self.0.lock().unwrap().clone()
    }
}

impl ActuationChannel for RecordingChannel {
    fn submit(&self, request: ActuationRequest) {
        self.0.lock().unwrap().push(request);
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<String>>);

impl NotificationSink for RecordingSink {
    fn warn(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_owned());
    }
}

struct Harness {
    manager: EnforcerManager,
    channel: Arc<RecordingChannel>,
    sink: Arc<RecordingSink>,
}

fn harness() -> Harness {
    let channel = Arc::new(RecordingChannel::default());
    let sink = Arc::new(RecordingSink::default());
    let config = EngineConfig {
        capacity: SystemCapacity {
            total_memory_mb: 1_000.0,
            core_count: 4,
        },
        memory: MemoryThresholdOverrides {
            gc_mb: Some(500.0),
            critical_mb: Some(750.0),
            hard_limit_mb: Some(950.0),
        },
        ..EngineConfig::default()
    };
    let manager = EnforcerManager::new(config, channel.clone(), sink.clone());
    Harness {
        manager,
        channel,
        sink,
    }
}

fn populate(manager: &EnforcerManager) {
    let tabs = manager.tab_enforcer();
    tabs.register_tab(TabRecord::new(TabId(1), TabState::Active, 150.0, 1_000));
    for i in 2..=8u64 {
        tabs.register_tab(TabRecord::new(TabId(i), TabState::Background, 60.0, 100 * i));
    }

    let tasks = manager.task_enforcer();
    for (name, priority, battery) in [
        ("prefetch", TaskPriority::Low, 40),
        ("sync", TaskPriority::Normal, 10),
        ("download", TaskPriority::High, 70),
        ("session-save", TaskPriority::Critical, 90),
    ] {
        tasks.register_task(
            TaskRecord::new(TaskId::from_name(name), priority)
                .with_intensity(20, battery)
                .with_state(TaskState::Running),
        );
    }
}

fn stressed() -> SystemMetricsSnapshot {
    SystemMetricsSnapshot {
        memory_used_mb: 1_200.0,
        memory_total_mb: 1_000.0,
        cpu_usage_percent: 90.0,
        core_count: 4,
        rtt_ms: 1_500.0,
        battery_percent: 4.0,
        is_on_battery: true,
        ..Default::default()
    }
}

#[test]
fn test_gc_threshold_for_16gb() {
    assert_eq!(lumen_control::thresholds::gc_threshold_mb(16_000.0), 800.0);
}

#[test]
fn test_memory_scenario_pressure() {
    let policy = MemoryPolicy::new(MemoryPolicyThresholds {
        gc_mb: 500.0,
        critical_mb: 750.0,
        hard_limit_mb: 950.0,
    });
    let evaluation = policy.evaluate(800.0);
    assert_eq!(evaluation.status, MemoryStatus::Critical);
    approx::assert_abs_diff_eq!(evaluation.pressure, 0.667, epsilon = 1e-3);
}

#[test]
fn test_enforce_all_runs_in_fixed_order() {
    // --- 1. ARRANGE ---
    let h = harness();
    populate(&h.manager);

    // --- 2. ACT ---
    let actions = h.manager.enforce_all(&stressed());

    // --- 3. ASSERT ---
    assert_eq!(actions.priority, "memory > cpu > battery > network");
    assert!(!actions.memory.is_empty());
    assert!(!actions.tabs.is_empty());
    assert_eq!(actions.tasks.len(), 3, "every non-critical task pauses");
    assert!(!actions.network.is_empty());

    // Memory requests come first, network settings last.
    let requests = h.channel.requests();
    assert!(matches!(requests.first(), Some(ActuationRequest::ClearCaches { .. })));
    assert!(matches!(requests.last(), Some(ActuationRequest::SetIpcTimeout { .. })));
    assert_eq!(h.sink.0.lock().unwrap().len(), 1, "emergency warns the user");
}

#[test]
fn test_enforce_all_is_deterministic() {
    let first = harness();
    let second = harness();
    populate(&first.manager);
    populate(&second.manager);

    let a = first.manager.enforce_all(&stressed());
    let b = second.manager.enforce_all(&stressed());

    assert_eq!(a, b);
    assert_eq!(first.channel.requests(), second.channel.requests());
}

#[test]
fn test_active_tab_and_critical_task_survive_everything() {
    let h = harness();
    populate(&h.manager);

    for _ in 0..10 {
        h.manager.enforce_all(&stressed());
    }

    let active = h
        .manager
        .tab_enforcer()
        .tabs()
        .into_iter()
        .find(|t| t.id == TabId(1))
        .expect("active tab is never discarded");
    assert_eq!(active.state, TabState::Active);

    let critical = h
        .manager
        .task_enforcer()
        .task(TaskId::from_name("session-save"))
        .expect("critical task tracked");
    assert_eq!(critical.state, TaskState::Running);

    let requests = h.channel.requests();
    assert!(!requests.contains(&ActuationRequest::SuspendTab { id: TabId(1) }));
    assert!(!requests.contains(&ActuationRequest::DiscardTab { id: TabId(1) }));
    assert!(!requests.contains(&ActuationRequest::PauseTask {
        id: TaskId::from_name("session-save")
    }));
}

#[test]
fn test_discards_follow_suspensions() {
    let h = harness();
    populate(&h.manager);

    // First pass only suspends: nothing was suspended beforehand.
    let first = h.manager.enforce_all(&stressed());
    assert!(first
        .tabs
        .iter()
        .all(|a| matches!(a, EnforcementAction::TabSuspended { .. })));

    // Second pass may discard what the first suspended.
    let second = h.manager.enforce_all(&stressed());
    assert!(second
        .tabs
        .iter()
        .any(|a| matches!(a, EnforcementAction::TabDiscarded { .. })));
}

#[test]
fn test_recovery_restores_tasks_and_network() {
    let h = harness();
    populate(&h.manager);
    h.manager.enforce_all(&stressed());
    assert!(h.manager.task_enforcer().has_paused_tasks());

    let calm = SystemMetricsSnapshot {
        memory_used_mb: 200.0,
        memory_total_mb: 1_000.0,
        cpu_usage_percent: 10.0,
        rtt_ms: 30.0,
        ..Default::default()
    };
    let actions = h.manager.enforce_all(&calm);

    assert_eq!(actions.priority, "tasks(recovering) > network(recovering)");
    assert_eq!(actions.tasks.len(), 3);
    assert!(!h.manager.task_enforcer().has_paused_tasks());
    assert!(actions
        .network
        .contains(&EnforcementAction::ImageQualitySet { percent: 100 }));

    // Fully recovered: the next calm pass does nothing.
    let idle = h.manager.enforce_all(&calm);
    assert_eq!(idle.priority, "none");
    assert!(idle.is_empty());
}

#[test]
fn test_recovery_pass_leaves_running_tasks_alone() {
    // --- 1. ARRANGE ---
    let h = harness();
    let early = TaskId::from_name("prefetch");
    let late = TaskId::from_name("thumbnails");
    let tasks = h.manager.task_enforcer();
    tasks.register_task(
        TaskRecord::new(early, TaskPriority::Low).with_state(TaskState::Running),
    );
    h.manager.enforce_all(&SystemMetricsSnapshot {
        cpu_usage_percent: 75.0,
        ..Default::default()
    });
    assert_eq!(tasks.task(early).unwrap().state, TaskState::Paused);
    tasks.register_task(TaskRecord::new(late, TaskPriority::Low).with_state(TaskState::Running));

    // --- 2. ACT ---
    // CPU is healthy again but still above the LOW ceiling.
    let actions = h.manager.enforce_all(&SystemMetricsSnapshot {
        cpu_usage_percent: 40.0,
        ..Default::default()
    });

    // --- 3. ASSERT ---
    assert_eq!(actions.priority, "tasks(recovering)");
    assert!(actions.tasks.is_empty());
    assert_eq!(tasks.task(late).unwrap().state, TaskState::Running);
    assert_eq!(tasks.task(early).unwrap().state, TaskState::Paused);
    assert!(!h
        .channel
        .requests()
        .contains(&ActuationRequest::PauseTask { id: late }));
}

#[test]
fn test_events_mirror_actions() {
    let h = harness();
    populate(&h.manager);
    h.manager.enforce_all(&stressed());

    let events = h.manager.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        EnforcementEvent::MemoryStatusChanged {
            current: MemoryStatus::Emergency,
            ..
        }
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, EnforcementEvent::GarbageCollectionRequested)));
    assert!(events
        .iter()
        .any(|e| matches!(e, EnforcementEvent::TaskPaused { .. })));
    assert!(h.manager.drain_events().is_empty());
}

#[test]
fn test_unknown_ids_are_ignored() {
    let h = harness();
    assert!(!h.manager.tab_enforcer().resume(TabId(404)));
    assert!(h.manager.tab_enforcer().close(TabId(404)).is_none());
    assert!(!h.manager.task_enforcer().complete(TaskId::from_name("ghost")));
    assert!(h.channel.requests().is_empty());
}
