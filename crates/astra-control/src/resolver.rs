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

//! The resolver worker: drains queued requests in FIFO order.

use crate::broker::BrokerShared;
use astra_core::{RequestState, ResourceAsk, ResourceRequest};
use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::sync::Arc;
use std::thread;

/// Commands understood by the resolver thread.
pub(crate) enum BrokerCommand {
    /// Resolve one request.
    Resolve(Arc<ResourceRequest>),
    /// Acknowledge once every earlier command has been handled.
    Barrier(Sender<()>),
    /// Settle what is still queued as DEAD and stop.
    Shutdown,
}

/// Starts the resolver thread.
pub(crate) fn spawn(
    shared: Arc<BrokerShared>,
    commands: Receiver<BrokerCommand>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("astra-resolver".to_string())
        .spawn(move || run(&shared, &commands))
}

fn run(shared: &BrokerShared, commands: &Receiver<BrokerCommand>) {
    log::info!("Resolver thread started.");

    while let Ok(command) = commands.recv() {
        match command {
            BrokerCommand::Resolve(request) => resolve(shared, &request),
            BrokerCommand::Barrier(ack) => {
                let _ = ack.send(());
            }
            BrokerCommand::Shutdown => break,
        }
    }

    // Nothing queued after this point will ever be resolved. Submitters
    // check the flag after sending, so raise it before draining.
    shared.mark_stopped();
    let mut abandoned = 0;
    while let Ok(command) = commands.try_recv() {
        match command {
            BrokerCommand::Resolve(request) => {
                if request.mark_dead() {
                    abandoned += 1;
                }
            }
            BrokerCommand::Barrier(ack) => {
                let _ = ack.send(());
            }
            BrokerCommand::Shutdown => {}
        }
    }
    shared.cache().abandon();

    if abandoned > 0 {
        log::warn!("Resolver stopped with {abandoned} unresolved request(s).");
    }
    log::info!("Resolver thread stopped.");
}

/// Resolves one dequeued request.
pub(crate) fn resolve(shared: &BrokerShared, request: &Arc<ResourceRequest>) {
    // 1. Abandoned or already settled requests never reach their sender.
    match request.state() {
        RequestState::Pending => {}
        RequestState::Stale => {
            log::trace!("Skipping abandoned request {}", request.key());
            return;
        }
        state => {
            log::trace!("Skipping {state} request {}", request.key());
            return;
        }
    }

    // 2. Fatal gate.
    if shared.is_fatal() {
        request.mark_dead();
        return;
    }

    // 3. Deduplicate against the cache.
    let leader = {
        let mut cache = shared.cache();
        cache.purge();
        cache.get(request.key())
    };
    if let Some(leader) = leader {
        if ResourceRequest::follow(&leader, request) {
            log::trace!("Request {} served from cache", request.key());
            return;
        }
        shared.cache().evict(&leader);
    }

    // 4. Locate the sender.
    let Some(sender) = shared.lookup(request.sender()) else {
        log::debug!("No live sender for request {}", request.key());
        request.mark_dead();
        return;
    };

    // 5. Ask the sender, with no broker lock held.
    sender.resolve(ResourceAsk::new(Arc::clone(request)));
    drop(sender);

    match request.state() {
        RequestState::Ready | RequestState::Pending => {
            shared.cache().insert(Arc::clone(request));
        }
        RequestState::Dead | RequestState::Stale => return,
    }

    // 6. The sender may have left while it was resolving. Unregistering
    // removes the registry entry before invalidating the cache, so either
    // this check sees it gone or the invalidation sees the new entry.
    let registered = shared.registry().contains(request.sender());
    if !registered {
        log::debug!("Sender of {} left during resolution", request.key());
        shared.cache().evict(request);
        if !request.mark_dead() {
            request.mark_stale();
        }
    }
}
