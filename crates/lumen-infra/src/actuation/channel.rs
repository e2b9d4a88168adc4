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

//! Forwards corrective requests to the UI process over a bounded channel.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use lumen_core::platform::{ActuationChannel, ActuationRequest};
use std::sync::atomic::{AtomicU64, Ordering};

/// An [`ActuationChannel`] backed by a bounded `crossbeam-channel`.
///
/// The receiving end is pumped by whatever relays requests to the UI
/// process. Submitting never blocks: if the buffer is full or the receiver is
/// gone, the request is dropped with a warning.
#[derive(Debug)]
pub struct ChannelActuator {
    sender: Sender<ActuationRequest>,
    dropped: AtomicU64,
}

impl ChannelActuator {
    /// Creates the actuator and the receiving end of its requests.
    pub fn new(capacity: usize) -> (Self, Receiver<ActuationRequest>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        (
            Self {
                sender,
                dropped: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Number of requests dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ActuationChannel for ChannelActuator {
    fn submit(&self, request: ActuationRequest) {
        match self.sender.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("ChannelActuator: buffer full, dropping '{}'", request);
            }
            Err(TrySendError::Disconnected(request)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("ChannelActuator: receiver gone, dropping '{}'", request);
            }
        }
    }
}
