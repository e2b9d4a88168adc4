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

//! Stateful enforcers turning policy tiers into corrective requests.
//!
//! Every enforcer takes `&self` and keeps its state behind interior
//! mutability, so a single engine can be shared across threads. Each entry
//! point is guarded by a [`BusyFlag`]: a call that overlaps another call into
//! the same enforcer does nothing and returns an empty action list.

mod memory;
mod network;
mod tab;
mod task;

pub use memory::MemoryEnforcer;
pub use network::NetworkEnforcer;
pub use tab::TabEnforcer;
pub use task::{battery_intensity_ceiling, cpu_priority_ceiling, BackgroundTaskEnforcer};

use lumen_core::event::{EnforcementEvent, EventBus};
use lumen_core::platform::ActuationChannel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Re-entrancy guard shared by all enforcers.
#[derive(Debug, Default)]
pub struct BusyFlag {
    busy: AtomicBool,
}

impl BusyFlag {
    /// Creates an idle flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the flag busy, or returns `None` if it already is.
    pub fn try_enter(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| BusyGuard { flag: self })
    }

    /// `true` while a guarded call is in progress.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Clears its [`BusyFlag`] when dropped.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a BusyFlag,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Release);
    }
}

/// Outbound collaborators every enforcer reports to.
#[derive(Clone)]
pub struct EnforcerOutputs {
    /// Corrective requests to the UI process.
    pub channel: Arc<dyn ActuationChannel>,
    /// Typed record of what happened.
    pub events: Arc<EventBus<EnforcementEvent>>,
}

impl EnforcerOutputs {
    /// Bundles a channel with a fresh event bus of the given capacity.
    pub fn new(channel: Arc<dyn ActuationChannel>, event_capacity: usize) -> Self {
        Self {
            channel,
            events: Arc::new(EventBus::with_capacity(event_capacity)),
        }
    }
}

impl std::fmt::Debug for EnforcerOutputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnforcerOutputs")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use lumen_core::platform::{ActuationChannel, ActuationRequest, NotificationSink};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingChannel(pub Mutex<Vec<ActuationRequest>>);

    impl RecordingChannel {
        pub fn take(&self) -> Vec<ActuationRequest> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl ActuationChannel for RecordingChannel {
        fn submit(&self, request: ActuationRequest) {
            self.0.lock().unwrap().push(request);
        }
    }

    #[derive(Default)]
    pub struct RecordingSink(pub Mutex<Vec<String>>);

    impl NotificationSink for RecordingSink {
        fn warn(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_flag_rejects_overlap() {
        let flag = BusyFlag::new();
        let guard = flag.try_enter();
        assert!(guard.is_some());
        assert!(flag.is_busy());
        assert!(flag.try_enter().is_none());
        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_enter().is_some());
    }
}
