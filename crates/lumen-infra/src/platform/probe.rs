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

//! Round-trip time measured by opening a TCP connection.

use lumen_core::platform::MetricsError;
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

/// Measures latency as the time needed to complete a TCP handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpConnectProbe {
    target: SocketAddr,
    timeout: Duration,
}

impl TcpConnectProbe {
    /// Creates a probe against `target`, giving up after `timeout`.
    pub fn new(target: SocketAddr, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    /// The probed address.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Connects once and returns the elapsed time, in milliseconds.
    pub fn measure(&self) -> Result<f64, MetricsError> {
        let start = Instant::now();
        let stream = TcpStream::connect_timeout(&self.target, self.timeout).map_err(|e| {
            MetricsError::SensorUnavailable {
                sensor: "rtt",
                reason: format!("{}: {}", self.target, e),
            }
        })?;
        let elapsed = start.elapsed();
        drop(stream);
        log::trace!("TcpConnectProbe: {} in {:?}", self.target, elapsed);
        Ok(elapsed.as_secs_f64() * 1_000.0)
    }
}
