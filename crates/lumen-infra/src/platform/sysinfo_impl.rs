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

//! sysinfo-based implementation of the MetricsSource trait.

use super::TcpConnectProbe;
use lumen_core::platform::{MetricsError, MetricsSource};
use lumen_core::SystemMetricsSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A metrics source that uses the `sysinfo` crate.
///
/// Memory usage is the resident size of the current process (or of the whole
/// system when the process cannot be resolved). Battery is reported as
/// external power. Round-trip time comes from the optional probe, or else
/// from the last value passed to [`record_rtt`](Self::record_rtt).
/// Tab and task counts are left at zero for the engine to fill in.
pub struct SysinfoMetricsSource {
    system: Mutex<System>,
    pid: Option<Pid>,
    probe: Option<TcpConnectProbe>,
    last_rtt_bits: AtomicU64,
}

impl SysinfoMetricsSource {
    /// Creates a source without a latency probe.
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                log::warn!(
                    "SysinfoMetricsSource: cannot resolve own pid ({e}), using system memory"
                );
                None
            }
        };
        Self {
            system: Mutex::new(system),
            pid,
            probe: None,
            last_rtt_bits: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// Measures RTT with `probe` on every sample.
    pub fn with_probe(mut self, probe: TcpConnectProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Records an RTT measured by the host.
    pub fn record_rtt(&self, rtt_ms: f64) {
        if rtt_ms.is_finite() && rtt_ms >= 0.0 {
            self.last_rtt_bits.store(rtt_ms.to_bits(), Ordering::Relaxed);
        }
    }

    /// The last recorded or probed RTT, in milliseconds.
    pub fn last_rtt(&self) -> f64 {
        f64::from_bits(self.last_rtt_bits.load(Ordering::Relaxed))
    }

    fn current_rtt(&self) -> f64 {
        if let Some(probe) = &self.probe {
            match probe.measure() {
                Ok(rtt) => self.record_rtt(rtt),
                Err(e) => log::debug!("SysinfoMetricsSource: {e}, keeping last rtt"),
            }
        }
        self.last_rtt()
    }
}

impl MetricsSource for SysinfoMetricsSource {
    fn sample(&self) -> Result<SystemMetricsSnapshot, MetricsError> {
        let rtt_ms = self.current_rtt();
        let mut system = self.system.lock().map_err(|_| MetricsError::Poisoned)?;
        system.refresh_memory();
        system.refresh_cpu_usage();

        let total_bytes = system.total_memory();
        if total_bytes == 0 {
            return Err(MetricsError::SensorUnavailable {
                sensor: "memory",
                reason: "total memory reported as zero".into(),
            });
        }

        let used_bytes = match self.pid {
            Some(pid) => {
                system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                system
                    .process(pid)
                    .map(|process| process.memory())
                    .unwrap_or_else(|| system.used_memory())
            }
            None => system.used_memory(),
        };

        let snapshot = SystemMetricsSnapshot {
            memory_used_mb: used_bytes as f64 / BYTES_PER_MB,
            memory_total_mb: total_bytes as f64 / BYTES_PER_MB,
            cpu_usage_percent: f64::from(system.global_cpu_usage()),
            core_count: u32::try_from(system.cpus().len()).unwrap_or(u32::MAX).max(1),
            rtt_ms,
            battery_percent: 100.0,
            is_on_battery: false,
            ..SystemMetricsSnapshot::default()
        };
        log::trace!(
            "SysinfoMetricsSource: {:.0}/{:.0}MB, cpu {:.1}%, rtt {:.0}ms",
            snapshot.memory_used_mb,
            snapshot.memory_total_mb,
            snapshot.cpu_usage_percent,
            snapshot.rtt_ms
        );
        Ok(snapshot)
    }
}

impl Default for SysinfoMetricsSource {
    fn default() -> Self {
        Self::new()
    }
}
