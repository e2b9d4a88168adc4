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

//! Background task enforcer: pauses and resumes deferred work under CPU and
//! battery pressure.

use super::{BusyFlag, EnforcerOutputs};
use crate::actions::EnforcementAction;
use crate::registry::{self, TaskCounts, TaskRegistry};
use lumen_core::event::EnforcementEvent;
use lumen_core::{TaskId, TaskPriority, TaskRecord, TaskState};
use std::sync::RwLock;

/// Lowest priority allowed to run at `cpu_percent`.
///
/// | CPU | ceiling |
/// |---|---|
/// | ≥ 80% | CRITICAL |
/// | ≥ 70% | HIGH |
/// | > 30% | NORMAL |
/// | otherwise | LOW |
pub fn cpu_priority_ceiling(cpu_percent: f64) -> TaskPriority {
    if cpu_percent >= 80.0 {
        TaskPriority::Critical
    } else if cpu_percent >= 70.0 {
        TaskPriority::High
    } else if cpu_percent > 30.0 {
        TaskPriority::Normal
    } else {
        TaskPriority::Low
    }
}

/// Highest battery intensity allowed to run.
///
/// On external power, at 20% or more, or with an unreadable level, every
/// task may run.
pub fn battery_intensity_ceiling(battery_percent: f64, on_battery: bool) -> u8 {
    if !on_battery || battery_percent.is_nan() || battery_percent >= 20.0 {
        100
    } else if battery_percent >= 10.0 {
        50
    } else if battery_percent >= 5.0 {
        20
    } else {
        0
    }
}

fn may_run(task: &TaskRecord, priority_ceiling: TaskPriority, intensity_ceiling: u8) -> bool {
    task.priority == TaskPriority::Critical
        || (task.priority >= priority_ceiling && task.battery_intensity <= intensity_ceiling)
}

/// Owns the background task queue on the engine side.
pub struct BackgroundTaskEnforcer {
    tasks: RwLock<TaskRegistry>,
    outputs: EnforcerOutputs,
    busy: BusyFlag,
}

impl BackgroundTaskEnforcer {
    /// Creates an enforcer with an empty queue.
    pub fn new(outputs: EnforcerOutputs) -> Self {
        Self {
            tasks: RwLock::new(TaskRegistry::new()),
            outputs,
            busy: BusyFlag::new(),
        }
    }

    /// Starts tracking a task.
    pub fn register_task(&self, record: TaskRecord) {
        registry::write(&self.tasks).register(record);
    }

    /// Marks a pending task as running.
    pub fn start(&self, id: TaskId) -> bool {
        let mut tasks = registry::write(&self.tasks);
        match tasks.get(id).map(|task| task.state) {
            Some(TaskState::Pending) => tasks.transition(id, TaskState::Running),
            _ => false,
        }
    }

    /// Marks a task as completed.
    pub fn complete(&self, id: TaskId) -> bool {
        registry::write(&self.tasks).transition(id, TaskState::Completed)
    }

    /// Marks a task as failed.
    pub fn fail(&self, id: TaskId) -> bool {
        registry::write(&self.tasks).transition(id, TaskState::Failed)
    }

    /// Stops tracking a task.
    pub fn remove(&self, id: TaskId) -> Option<TaskRecord> {
        registry::write(&self.tasks).remove(id)
    }

    /// Copy of a task's record.
    pub fn task(&self, id: TaskId) -> Option<TaskRecord> {
        registry::read(&self.tasks).get(id).cloned()
    }

    /// Copy of every tracked task, in id order.
    pub fn tasks(&self) -> Vec<TaskRecord> {
        registry::read(&self.tasks).iter().cloned().collect()
    }

    /// Task counts per state.
    pub fn counts(&self) -> TaskCounts {
        registry::read(&self.tasks).counts()
    }

    /// `true` if some task waits for pressure to clear.
    pub fn has_paused_tasks(&self) -> bool {
        self.counts().paused > 0
    }

    /// Pauses running tasks that may no longer run and resumes paused tasks
    /// that may run again. Pending and finished tasks are left alone.
    pub fn enforce_task_queue(
        &self,
        cpu_percent: f64,
        battery_percent: f64,
        on_battery: bool,
    ) -> Vec<EnforcementAction> {
        self.apply(cpu_percent, battery_percent, on_battery, true)
    }

    /// Resumes paused tasks that may run again without pausing anything.
    ///
    /// Used once pressure has cleared: a running task is never paused by a
    /// recovery pass.
    pub fn resume_task_queue(
        &self,
        cpu_percent: f64,
        battery_percent: f64,
        on_battery: bool,
    ) -> Vec<EnforcementAction> {
        self.apply(cpu_percent, battery_percent, on_battery, false)
    }

    fn apply(
        &self,
        cpu_percent: f64,
        battery_percent: f64,
        on_battery: bool,
        may_pause: bool,
    ) -> Vec<EnforcementAction> {
        let Some(_guard) = self.busy.try_enter() else {
            log::debug!("BackgroundTaskEnforcer: busy, skipping pass");
            return Vec::new();
        };

        let priority_ceiling = cpu_priority_ceiling(cpu_percent);
        let intensity_ceiling = battery_intensity_ceiling(battery_percent, on_battery);
        let mut actions = Vec::new();

        let mut tasks = registry::write(&self.tasks);
        for task in tasks.iter_mut() {
            let allowed = may_run(task, priority_ceiling, intensity_ceiling);
            match task.state {
                TaskState::Running if may_pause && !allowed => {
                    task.state = TaskState::Paused;
                    self.outputs.channel.pause_task(task.id);
                    self.outputs
                        .events
                        .publish(EnforcementEvent::TaskPaused { id: task.id });
                    actions.push(EnforcementAction::TaskPaused { id: task.id });
                }
                TaskState::Paused if allowed => {
                    task.state = TaskState::Running;
                    self.outputs.channel.resume_task(task.id);
                    self.outputs
                        .events
                        .publish(EnforcementEvent::TaskResumed { id: task.id });
                    actions.push(EnforcementAction::TaskResumed { id: task.id });
                }
                _ => {}
            }
        }

        log::debug!(
            "BackgroundTaskEnforcer: {} pass, ceiling {} / intensity {}, {} action(s)",
            if may_pause { "enforce" } else { "resume" },
            priority_ceiling,
            intensity_ceiling,
            actions.len()
        );
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::test_support::RecordingChannel;
    use lumen_core::platform::ActuationRequest;
    use std::sync::Arc;

    fn enforcer() -> (BackgroundTaskEnforcer, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::default());
        let enforcer = BackgroundTaskEnforcer::new(EnforcerOutputs::new(channel.clone(), 64));
        (enforcer, channel)
    }

    fn running(name: &str, priority: TaskPriority, battery: u8) -> TaskRecord {
        TaskRecord::new(TaskId::from_name(name), priority)
            .with_intensity(10, battery)
            .with_state(TaskState::Running)
    }

    #[test]
    fn test_cpu_ceiling_bands() {
        assert_eq!(cpu_priority_ceiling(10.0), TaskPriority::Low);
        assert_eq!(cpu_priority_ceiling(30.0), TaskPriority::Low);
        assert_eq!(cpu_priority_ceiling(30.5), TaskPriority::Normal);
        assert_eq!(cpu_priority_ceiling(70.0), TaskPriority::High);
        assert_eq!(cpu_priority_ceiling(80.0), TaskPriority::Critical);
    }

    #[test]
    fn test_battery_ceiling_bands() {
        assert_eq!(battery_intensity_ceiling(3.0, false), 100);
        assert_eq!(battery_intensity_ceiling(25.0, true), 100);
        assert_eq!(battery_intensity_ceiling(15.0, true), 50);
        assert_eq!(battery_intensity_ceiling(7.0, true), 20);
        assert_eq!(battery_intensity_ceiling(2.0, true), 0);
    }

    #[test]
    fn test_high_cpu_runs_only_critical() {
        let (enforcer, _) = enforcer();
        for (name, priority) in [
            ("a", TaskPriority::Low),
            ("b", TaskPriority::Normal),
            ("c", TaskPriority::High),
            ("d", TaskPriority::Critical),
        ] {
            enforcer.register_task(running(name, priority, 0));
        }

        let actions = enforcer.enforce_task_queue(85.0, 50.0, false);
        assert_eq!(actions.len(), 3);
        for task in enforcer.tasks() {
            let expected = if task.priority == TaskPriority::Critical {
                TaskState::Running
            } else {
                TaskState::Paused
            };
            assert_eq!(task.state, expected, "{}", task.priority);
        }
    }

    #[test]
    fn test_critical_task_survives_empty_battery() {
        let (enforcer, channel) = enforcer();
        enforcer.register_task(running("keepalive", TaskPriority::Critical, 100));
        assert!(enforcer.enforce_task_queue(99.0, 1.0, true).is_empty());
        assert!(channel.take().is_empty());
    }

    #[test]
    fn test_battery_pauses_heavy_tasks() {
        let (enforcer, _) = enforcer();
        enforcer.register_task(running("light", TaskPriority::Normal, 10));
        enforcer.register_task(running("heavy", TaskPriority::Normal, 80));

        enforcer.enforce_task_queue(10.0, 15.0, true);
        assert_eq!(
            enforcer.task(TaskId::from_name("light")).unwrap().state,
            TaskState::Running
        );
        assert_eq!(
            enforcer.task(TaskId::from_name("heavy")).unwrap().state,
            TaskState::Paused
        );
    }

    #[test]
    fn test_paused_tasks_resume_when_pressure_clears() {
        let (enforcer, channel) = enforcer();
        let id = TaskId::from_name("indexer");
        enforcer.register_task(running("indexer", TaskPriority::Low, 0));

        enforcer.enforce_task_queue(75.0, 100.0, false);
        assert!(enforcer.has_paused_tasks());
        enforcer.enforce_task_queue(10.0, 100.0, false);
        assert!(!enforcer.has_paused_tasks());
        assert_eq!(
            channel.take(),
            vec![
                ActuationRequest::PauseTask { id },
                ActuationRequest::ResumeTask { id }
            ]
        );
    }

    #[test]
    fn test_resume_pass_never_pauses() {
        let (enforcer, channel) = enforcer();
        let paused = TaskId::from_name("indexer");
        let fresh = TaskId::from_name("thumbnailer");
        enforcer.register_task(running("indexer", TaskPriority::Low, 0));
        enforcer.enforce_task_queue(75.0, 100.0, false);
        channel.take();

        enforcer.register_task(running("thumbnailer", TaskPriority::Low, 0));
        // 40% CPU still puts the ceiling at NORMAL.
        assert!(enforcer.resume_task_queue(40.0, 100.0, false).is_empty());
        assert_eq!(enforcer.task(fresh).unwrap().state, TaskState::Running);
        assert_eq!(enforcer.task(paused).unwrap().state, TaskState::Paused);

        let actions = enforcer.resume_task_queue(10.0, 100.0, false);
        assert_eq!(actions, vec![EnforcementAction::TaskResumed { id: paused }]);
        assert_eq!(channel.take(), vec![ActuationRequest::ResumeTask { id: paused }]);
    }

    #[test]
    fn test_finished_and_pending_tasks_are_untouched() {
        let (enforcer, _) = enforcer();
        let done = TaskId::from_name("done");
        let queued = TaskId::from_name("queued");
        enforcer.register_task(running("done", TaskPriority::Low, 0));
        enforcer.register_task(TaskRecord::new(queued, TaskPriority::Low));
        assert!(enforcer.complete(done));

        assert!(enforcer.enforce_task_queue(95.0, 100.0, false).is_empty());
        assert_eq!(enforcer.task(done).unwrap().state, TaskState::Completed);
        assert_eq!(enforcer.task(queued).unwrap().state, TaskState::Pending);
    }

    #[test]
    fn test_lifecycle() {
        let (enforcer, _) = enforcer();
        let id = TaskId::from_name("sync");
        enforcer.register_task(TaskRecord::new(id, TaskPriority::High));
        assert!(enforcer.start(id));
        assert!(!enforcer.start(id));
        assert!(enforcer.fail(id));
        assert!(!enforcer.complete(id));
        assert!(enforcer.remove(id).is_some());
        assert!(!enforcer.start(TaskId::from_name("ghost")));
    }
}
