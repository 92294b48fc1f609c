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

use astra_control::Broker;
use astra_core::{Asset, AssetCore, CancelToken, RequestState, ResourceAsk, Severity};
use astra_telemetry::{Logger, LoggerConfig, MemorySink};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

// --- TEST ASSETS ---

struct Caller {
    core: AssetCore,
}

impl Asset for Caller {
    fn core(&self) -> &AssetCore {
        &self.core
    }
}

/// Answers every request on the spot with the same string.
struct Eager {
    core: AssetCore,
    value: Arc<String>,
    calls: AtomicUsize,
}

impl Asset for Eager {
    fn core(&self) -> &AssetCore {
        &self.core
    }

    fn resolve(&self, ask: ResourceAsk) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = ask.set_resource(&self.value);
    }
}

/// Keeps every ask and answers them when told to.
struct Deferred {
    core: AssetCore,
    value: Arc<String>,
    asks: Mutex<Vec<ResourceAsk>>,
    calls: AtomicUsize,
}

impl Asset for Deferred {
    fn core(&self) -> &AssetCore {
        &self.core
    }

    fn resolve(&self, ask: ResourceAsk) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.asks.lock().unwrap().push(ask);
    }
}

impl Deferred {
    fn answer_all(&self) {
        for ask in self.asks.lock().unwrap().drain(..) {
            ask.set_resource(&self.value).unwrap();
        }
    }
}

/// Blocks the resolver thread inside `resolve` until released.
struct Gate {
    core: AssetCore,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl Asset for Gate {
    fn core(&self) -> &AssetCore {
        &self.core
    }

    fn resolve(&self, ask: ResourceAsk) {
        self.entered.send(()).unwrap();
        self.release.recv().unwrap();
        ask.invalidate();
    }
}

/// Like `Gate`, but keeps the ask pending instead of answering it.
struct Keeper {
    core: AssetCore,
    entered: Sender<()>,
    release: Receiver<()>,
    asks: Mutex<Vec<ResourceAsk>>,
    calls: AtomicUsize,
}

impl Asset for Keeper {
    fn core(&self) -> &AssetCore {
        &self.core
    }

    fn resolve(&self, ask: ResourceAsk) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.asks.lock().unwrap().push(ask);
        self.entered.send(()).unwrap();
        self.release.recv().unwrap();
    }
}

fn broker() -> Broker {
    let logger = Logger::with_sinks(LoggerConfig::default(), vec![Box::new(MemorySink::new())])
        .unwrap();
    Broker::with_logger(logger).unwrap()
}

fn caller(broker: &Broker, name: &str) -> Arc<Caller> {
    broker.create_asset(name, |core| Caller { core }).unwrap()
}

fn eager(broker: &Broker) -> Arc<Eager> {
    broker
        .create_asset("Eager", |core| Eager {
            core,
            value: Arc::new("shared".to_string()),
            calls: AtomicUsize::new(0),
        })
        .unwrap()
}

fn deferred(broker: &Broker) -> Arc<Deferred> {
    broker
        .create_asset("Deferred", |core| Deferred {
            core,
            value: Arc::new("late".to_string()),
            asks: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
        .unwrap()
}

// --- DEDUPLICATION ---

#[test]
fn test_ready_entry_serves_identical_requests() {
    // --- 1. ARRANGE ---
    let broker = broker();
    let sender = eager(&broker);
    let first = caller(&broker, "First");
    let second = caller(&broker, "Second");

    // --- 2. ACT ---
    let mut a = first.core.request::<String>(sender.id(), "value", &[1, 2]);
    assert_eq!(a.wait(), RequestState::Ready);
    let mut b = second.core.request::<String>(sender.id(), "value", &[1, 2]);
    assert_eq!(b.wait(), RequestState::Ready);

    // --- 3. ASSERT ---
    assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
    let (a, b) = (a.get().unwrap(), b.get().unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &sender.value));
}

#[test]
fn test_different_args_are_not_deduplicated() {
    let broker = broker();
    let sender = eager(&broker);
    let first = caller(&broker, "First");

    let mut a = first.core.request::<String>(sender.id(), "value", &[1, 2]);
    let mut b = first.core.request::<String>(sender.id(), "value", &[2, 1]);
    assert_eq!(a.wait(), RequestState::Ready);
    assert_eq!(b.wait(), RequestState::Ready);
    assert_eq!(sender.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_pending_entry_adopts_followers() {
    // --- 1. ARRANGE ---
    let broker = broker();
    let sender = deferred(&broker);
    let first = caller(&broker, "First");
    let second = caller(&broker, "Second");

    let mut a = first.core.request::<String>(sender.id(), "value", &[]);
    broker.sync();
    let mut b = second.core.request::<String>(sender.id(), "value", &[]);
    broker.sync();

    assert_eq!(a.state(), RequestState::Pending);
    assert_eq!(b.state(), RequestState::Pending);
    assert_eq!(a.request().follower_count(), 1);

    // --- 2. ACT ---
    sender.answer_all();

    // --- 3. ASSERT ---
    assert_eq!(a.wait(), RequestState::Ready);
    assert_eq!(b.wait(), RequestState::Ready);
    assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&a.get().unwrap(), &b.get().unwrap()));
}

#[test]
fn test_follower_with_another_type_goes_dead() {
    let broker = broker();
    let sender = deferred(&broker);
    let first = caller(&broker, "First");

    let mut a = first.core.request::<String>(sender.id(), "value", &[]);
    broker.sync();
    let mut b = first.core.request::<u64>(sender.id(), "value", &[]);
    broker.sync();

    sender.answer_all();
    assert_eq!(a.wait(), RequestState::Ready);
    assert_eq!(b.wait(), RequestState::Dead);
}

#[test]
fn test_type_mismatch_at_resolution_is_dead() {
    let broker = broker();
    let sender = eager(&broker);
    let first = caller(&broker, "First");

    let mut handle = first.core.request::<Vec<u8>>(sender.id(), "value", &[]);
    assert_eq!(handle.wait(), RequestState::Dead);
    assert!(handle.get().is_none());
    assert_eq!(broker.cache_len(), 0);
}

// --- CANCELLATION ---

#[test]
fn test_dropped_handle_is_never_resolved() {
    // --- 1. ARRANGE ---
    let broker = broker();
    let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
    let (release_tx, release_rx) = crossbeam_channel::bounded(1);
    let gate = broker
        .create_asset("Gate", |core| Gate {
            core,
            entered: entered_tx,
            release: release_rx,
        })
        .unwrap();
    let sender = eager(&broker);
    let first = caller(&broker, "First");

    // Park the resolver inside the gate.
    let _blocker = first.core.request::<String>(gate.id(), "block", &[]);
    entered_rx.recv().unwrap();

    // --- 2. ACT ---
    let handle = first.core.request::<String>(sender.id(), "value", &[]);
    let request = Arc::clone(handle.request());
    drop(handle);
    release_tx.send(()).unwrap();
    broker.sync();

    // --- 3. ASSERT ---
    assert_eq!(request.state(), RequestState::Stale);
    assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
    assert_eq!(broker.cache_len(), 0);
}

#[test]
fn test_clones_keep_the_request_alive() {
    let broker = broker();
    let sender = deferred(&broker);
    let first = caller(&broker, "First");

    let handle = first.core.request::<String>(sender.id(), "value", &[]);
    let mut clone = handle.clone();
    drop(handle);
    broker.sync();

    assert_eq!(clone.state(), RequestState::Pending);
    sender.answer_all();
    assert_eq!(clone.wait(), RequestState::Ready);
}

#[test]
fn test_cancel_token_interrupts_a_wait() {
    let broker = broker();
    let sender = deferred(&broker);
    let first = caller(&broker, "First");

    let mut handle = first.core.request::<String>(sender.id(), "value", &[]);
    let token = CancelToken::new();

    let state = thread::scope(|scope| {
        let waiter = scope.spawn(|| handle.wait_cancellable(&token, None));
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        waiter.join().unwrap()
    });

    assert_eq!(state, RequestState::Pending);
    assert!(token.is_cancelled());
}

#[test]
fn test_wait_timeout_gives_up() {
    let broker = broker();
    let sender = deferred(&broker);
    let first = caller(&broker, "First");

    let mut handle = first.core.request::<String>(sender.id(), "value", &[]);
    assert_eq!(
        handle.wait_timeout(Duration::from_millis(30)),
        RequestState::Pending
    );
}

#[test]
fn test_vanished_resource_turns_stale() {
    let broker = broker();
    let sender = deferred(&broker);
    let first = caller(&broker, "First");

    let mut handle = first.core.request::<String>(sender.id(), "value", &[]);
    broker.sync();
    {
        let short_lived = Arc::new("temporary".to_string());
        let asks: Vec<_> = sender.asks.lock().unwrap().drain(..).collect();
        for ask in asks {
            ask.set_resource(&short_lived).unwrap();
        }
    }

    assert_eq!(handle.poll(), RequestState::Stale);
    assert!(handle.get().is_none());
}

// --- SENDER DEATH ---

#[test]
fn test_unregistering_the_sender_kills_pending_requests() {
    // --- 1. ARRANGE ---
    let broker = broker();
    let sender = deferred(&broker);
    let first = caller(&broker, "First");

    let mut handle = first.core.request::<String>(sender.id(), "value", &[]);
    broker.sync();
    assert_eq!(broker.cache_len(), 1);

    // --- 2. ACT ---
    broker.unregister_asset(sender.id()).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(handle.wait(), RequestState::Dead);
    assert_eq!(broker.cache_len(), 0);

    // Answering afterwards has no effect.
    let late = sender.asks.lock().unwrap().pop().unwrap();
    assert!(late.set_resource(&sender.value).is_err());
    assert_eq!(handle.state(), RequestState::Dead);
}

#[test]
fn test_unregistering_the_sender_stales_ready_requests() {
    let broker = broker();
    let sender = eager(&broker);
    let first = caller(&broker, "First");

    let mut handle = first.core.request::<String>(sender.id(), "value", &[]);
    assert_eq!(handle.wait(), RequestState::Ready);
    broker.sync();

    broker.unregister_asset(sender.id()).unwrap();
    assert_eq!(handle.poll(), RequestState::Stale);
    assert!(handle.get().is_none());
}

#[test]
fn test_sender_unregistered_mid_resolve_leaves_no_cache_entry() {
    // --- 1. ARRANGE ---
    let broker = broker();
    let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
    let (release_tx, release_rx) = crossbeam_channel::bounded(1);
    let keeper = broker
        .create_asset("Keeper", |core| Keeper {
            core,
            entered: entered_tx,
            release: release_rx,
            asks: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
        .unwrap();
    let id = keeper.id();
    let first = caller(&broker, "First");

    let mut handle = first.core.request::<String>(id, "value", &[]);
    entered_rx.recv().unwrap();

    // --- 2. ACT ---
    // The resolver is still inside `resolve` while the sender leaves.
    broker.unregister_asset(id).unwrap();
    release_tx.send(()).unwrap();
    broker.sync();

    // --- 3. ASSERT ---
    assert_eq!(handle.wait(), RequestState::Dead);
    assert_eq!(broker.cache_len(), 0);

    // A repeat request must not follow an orphaned entry.
    let mut again = first.core.request::<String>(id, "value", &[]);
    broker.sync();
    assert_eq!(again.wait(), RequestState::Dead);
    assert_eq!(keeper.calls.load(Ordering::SeqCst), 1);
    assert_eq!(broker.cache_len(), 0);
}

#[test]
fn test_dropping_the_sender_kills_pending_requests() {
    let broker = broker();
    let sender = deferred(&broker);
    let first = caller(&broker, "First");

    let mut handle = first.core.request::<String>(sender.id(), "value", &[]);
    broker.sync();
    drop(sender);

    assert_eq!(handle.wait(), RequestState::Dead);
    assert_eq!(broker.asset_count(), 1);
}

#[test]
fn test_requests_to_a_dead_identity_go_dead() {
    let broker = broker();
    let sender = eager(&broker);
    let id = sender.id();
    let first = caller(&broker, "First");
    drop(sender);

    let mut handle = first.core.request::<String>(id, "value", &[]);
    assert_eq!(handle.wait(), RequestState::Dead);
}

#[test]
fn test_refusal_raises_no_alert_on_the_caller() {
    let broker = broker();
    let first = caller(&broker, "First");
    let second = caller(&broker, "Second");

    let mut handle = first.core.request::<String>(second.id(), "anything", &[]);
    assert_eq!(handle.wait(), RequestState::Dead);
    assert_eq!(first.core.alert_state().severity, Severity::None);
}
