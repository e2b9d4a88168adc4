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

use log;
use std::sync::atomic::{AtomicU64, Ordering};

/// A bounded, typed event channel.
///
/// Publishing never blocks: when the buffer is full the oldest undelivered
/// event is evicted, so the bus always holds the most recent history and a
/// host that never drains it cannot stall enforcement.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
    evicted: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    /// Creates a new EventBus holding at most `capacity` undelivered events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity.max(1));
        log::debug!("EventBus initialized (capacity={}).", capacity.max(1));
        Self {
            sender,
            receiver,
            evicted: AtomicU64::new(0),
        }
    }

    /// Publishes an event, evicting the oldest one if the buffer is full.
    pub fn publish(&self, event: T) {
        log::trace!("Publishing an event.");

        let mut event = event;
        loop {
            match self.sender.try_send(event) {
                Ok(()) => return,
                Err(flume::TrySendError::Full(rejected)) => {
                    if self.receiver.try_recv().is_ok() {
                        let evicted = self.evicted.fetch_add(1, Ordering::Relaxed) + 1;
                        log::warn!(
                            "EventBus full, evicted the oldest event ({} so far).",
                            evicted
                        );
                    }
                    event = rejected;
                }
                Err(flume::TrySendError::Disconnected(_)) => {
                    log::error!("Failed to send event: receiver disconnected.");
                    return;
                }
            }
        }
    }

    /// Number of undelivered events evicted to make room for newer ones.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Returns a clone of the sender end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Removes and returns every pending event, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::with_capacity(256)
    }
}
