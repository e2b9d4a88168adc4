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

//! Periodic driver of the enforcer manager.

use crate::actions::EnforcerActions;
use crate::config::ServiceConfig;
use crate::manager::EnforcerManager;
use crate::thresholds::{MAX_SAMPLING_INTERVAL, MIN_SAMPLING_INTERVAL};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use lumen_core::event::EnforcementEvent;
use lumen_core::platform::{MetricsError, MetricsSource};
use lumen_core::SystemMetricsSnapshot;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest uninterrupted sleep, so that `stop` is honoured promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Errors raised while starting the policy service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// `start` was called on a running service.
    #[error("policy service is already running")]
    AlreadyRunning,
    /// The background thread could not be spawned.
    #[error("failed to spawn policy service thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Outcome of one sampling cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Snapshot the cycle acted on, with registry counts applied.
    pub snapshot: SystemMetricsSnapshot,
    /// What the enforcers did.
    pub actions: EnforcerActions,
    /// Events drained from the manager's bus after the pass.
    pub events: Vec<EnforcementEvent>,
    /// Delay before the next cycle.
    pub next_interval: Duration,
}

/// Scales `base` by `multiplier` and clamps the result to the sampling band.
pub fn effective_interval(base: Duration, multiplier: f64) -> Duration {
    let secs = base.as_secs_f64() * multiplier;
    if !secs.is_finite() {
        return MAX_SAMPLING_INTERVAL;
    }
    Duration::from_secs_f64(secs.clamp(
        MIN_SAMPLING_INTERVAL.as_secs_f64(),
        MAX_SAMPLING_INTERVAL.as_secs_f64(),
    ))
}

/// Samples a [`MetricsSource`] on a background thread and feeds every
/// snapshot to an [`EnforcerManager`].
///
/// The interval derives from machine capacity and stretches as the battery
/// drains. Cycle reports are forwarded over a bounded channel; when the
/// buffer is full, new reports are dropped. Every cycle drains the manager's
/// event bus into its report.
pub struct PolicyService {
    config: ServiceConfig,
    manager: Arc<EnforcerManager>,
    source: Arc<dyn MetricsSource>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    report_tx: Sender<CycleReport>,
}

impl PolicyService {
    /// Creates a stopped service and the receiving end of its reports.
    pub fn new(
        config: ServiceConfig,
        manager: Arc<EnforcerManager>,
        source: Arc<dyn MetricsSource>,
    ) -> (Self, Receiver<CycleReport>) {
        let (tx, rx) = crossbeam_channel::bounded(config.report_buffer_size.max(1));
        let service = Self {
            config,
            manager,
            source,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            report_tx: tx,
        };
        (service, rx)
    }

    /// The driven manager.
    pub fn manager(&self) -> &Arc<EnforcerManager> {
        &self.manager
    }

    /// `true` while the background thread runs.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Base interval before battery scaling.
    pub fn base_interval(&self) -> Duration {
        self.config
            .sampling_interval
            .unwrap_or(self.manager.thresholds().sampling_interval)
    }

    /// Runs one cycle on the calling thread.
    pub fn run_once(&self) -> Result<CycleReport, MetricsError> {
        run_cycle(&self.manager, self.source.as_ref(), self.base_interval())
    }

    /// Starts the background thread.
    pub fn start(&mut self) -> Result<(), ServiceError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::AlreadyRunning);
        }

        let running = Arc::clone(&self.running);
        let manager = Arc::clone(&self.manager);
        let source = Arc::clone(&self.source);
        let report_tx = self.report_tx.clone();
        let base_interval = self.base_interval();

        let spawned = thread::Builder::new()
            .name("lumen-policy".into())
            .spawn(move || {
                log::info!(
                    "Policy service thread started (base interval {:?}).",
                    base_interval
                );
                let mut interval = base_interval;

                while running.load(Ordering::Relaxed) {
                    let start_time = Instant::now();

                    match run_cycle(&manager, source.as_ref(), base_interval) {
                        Ok(report) => {
                            interval = report.next_interval;
                            match report_tx.try_send(report) {
                                Ok(()) => {}
                                Err(TrySendError::Full(_)) => {
                                    log::debug!(
                                        "Policy service: report buffer full, dropping report."
                                    );
                                }
                                Err(TrySendError::Disconnected(_)) => {
                                    log::trace!("Policy service: no report receiver.");
                                }
                            }
                        }
                        Err(e) => log::warn!("Policy service: sampling failed: {}", e),
                    }

                    while running.load(Ordering::Relaxed) {
                        let elapsed = start_time.elapsed();
                        if elapsed >= interval {
                            break;
                        }
                        thread::sleep((interval - elapsed).min(SLEEP_SLICE));
                    }
                }
                log::info!("Policy service thread stopped.");
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(ServiceError::Spawn(e))
            }
        }
    }

    /// Stops the background thread and waits for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Policy service thread panicked.");
            }
        }
    }
}

impl Drop for PolicyService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_cycle(
    manager: &EnforcerManager,
    source: &dyn MetricsSource,
    base_interval: Duration,
) -> Result<CycleReport, MetricsError> {
    let snapshot = manager.with_registry_counts(source.sample()?);
    let actions = manager.enforce_all(&snapshot);
    let multiplier = manager
        .battery_policy()
        .evaluate(snapshot.battery_percent, !snapshot.is_on_battery)
        .rule
        .settings
        .sampling_interval_multiplier;
    Ok(CycleReport {
        snapshot,
        actions,
        events: manager.drain_events(),
        next_interval: effective_interval(base_interval, multiplier),
    })
}
