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

//! Headless sandbox: runs the policy service against this machine for a few
//! cycles, then replays a synthetic pressure spike.
//!
//! Usage: `sandbox [config.ron]`

use anyhow::{Context, Result};
use lumen_control::{EngineConfig, EnforcerManager, PolicyService, ServiceConfig};
use lumen_core::platform::MetricsSource;
use lumen_core::{
    SystemMetricsSnapshot, TabId, TabRecord, TabState, TaskId, TaskPriority, TaskRecord,
    TaskState,
};
use lumen_infra::{ChannelActuator, LogNotificationSink, SysinfoMetricsSource, TcpConnectProbe};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SandboxConfig {
    /// `None` derives the engine configuration from this machine.
    engine: Option<EngineConfig>,
    service: ServiceConfig,
    cycles: Option<usize>,
    /// Address probed with a TCP handshake to measure round-trip time.
    rtt_probe: Option<SocketAddr>,
}

fn load_config(path: &Path) -> Result<SandboxConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading config '{}'", path.display()))?;
    ron::from_str(&source).with_context(|| format!("parsing config '{}'", path.display()))
}

fn populate(manager: &EnforcerManager) {
    let tabs = manager.tab_enforcer();
    tabs.register_tab(TabRecord::new(TabId(1), TabState::Active, 180.0, 1_000));
    for (i, memory) in [(2, 90.0), (3, 140.0), (4, 60.0), (5, 220.0), (6, 75.0)] {
        tabs.register_tab(TabRecord::new(TabId(i), TabState::Background, memory, 100 * i));
    }

    let tasks = manager.task_enforcer();
    for (name, priority, battery) in [
        ("history-index", TaskPriority::Low, 30),
        ("bookmark-sync", TaskPriority::Normal, 15),
        ("download", TaskPriority::High, 60),
        ("session-save", TaskPriority::Critical, 10),
    ] {
        tasks.register_task(
            TaskRecord::new(TaskId::from_name(name), priority)
                .with_intensity(25, battery)
                .with_state(TaskState::Running),
        );
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::args_os().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => SandboxConfig::default(),
    };

    let mut source = SysinfoMetricsSource::new();
    if let Some(target) = config.rtt_probe {
        log::info!("Probing round-trip time against {}.", target);
        source = source.with_probe(TcpConnectProbe::new(target, Duration::from_secs(2)));
    }
    let source = Arc::new(source);
    let engine_config = match config.engine {
        Some(engine) => engine,
        None => {
            let first = source.sample().context("initial metrics sample")?;
            EngineConfig::for_capacity(first.capacity())
        }
    };

    let (actuator, requests) = ChannelActuator::new(256);
    let pump = thread::Builder::new()
        .name("ui-pump".into())
        .spawn(move || {
            for request in requests {
                log::info!("-> UI: {}", request);
            }
        })
        .context("spawning ui pump")?;

    let manager = Arc::new(EnforcerManager::new(
        engine_config,
        Arc::new(actuator),
        Arc::new(LogNotificationSink),
    ));
    populate(&manager);

    let cycles = config.cycles.unwrap_or(3);
    let (mut service, reports) =
        PolicyService::new(config.service, Arc::clone(&manager), source);
    log::info!(
        "Running {} live cycle(s), base interval {:?}.",
        cycles,
        service.base_interval()
    );
    service.start()?;
    for _ in 0..cycles {
        match reports.recv_timeout(Duration::from_secs(15)) {
            Ok(report) => log::info!(
                "cycle: {} ({} event(s))",
                report.actions,
                report.events.len()
            ),
            Err(e) => {
                log::warn!("No cycle report: {}", e);
                break;
            }
        }
    }
    service.stop();

    let total = manager.config().capacity.total_memory_mb;
    let spike = SystemMetricsSnapshot {
        memory_used_mb: manager.memory_enforcer().policy().thresholds().hard_limit_mb + 50.0,
        memory_total_mb: total,
        cpu_usage_percent: 88.0,
        core_count: manager.config().capacity.core_count,
        rtt_ms: 650.0,
        battery_percent: 12.0,
        is_on_battery: true,
        ..SystemMetricsSnapshot::default()
    };
    let spike = manager.with_registry_counts(spike);
    log::info!("Synthetic spike:\n{}", manager.diagnose(&spike));
    log::info!("{}", manager.enforce_all(&spike));

    for event in manager.drain_events() {
        log::debug!("event: {:?}", event);
    }
    log::info!("Summary:\n{}", manager.summary());

    drop(service);
    drop(manager);
    if pump.join().is_err() {
        log::error!("UI pump panicked.");
    }
    Ok(())
}
