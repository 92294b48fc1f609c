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

//! The broker: asset registry, resolver worker and fatal gate.

use crate::cache::ResolvedCache;
use crate::config::CoreConfig;
use crate::error::BrokerError;
use crate::registry::AssetRegistry;
use crate::resolver::{self, BrokerCommand};
use astra_core::asset::AsAnyArc;
use astra_core::{
    AlertRecord, Asset, AssetCore, AssetId, BrokerLink, RequestSpec, ResourceId, ResourceKey,
    ResourceRequest, Severity, Submission, Target,
};
use astra_telemetry::{AlertSender, Logger};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;

/// Display name the broker uses for its own alert records.
pub const BROKER_NAME: &str = "Broker";

/// State shared between the broker, its resolver thread and every asset.
pub(crate) struct BrokerShared {
    id: AssetId,
    registry: Mutex<AssetRegistry>,
    cache: Mutex<ResolvedCache>,
    commands: Sender<BrokerCommand>,
    fatal: AtomicBool,
    stopped: AtomicBool,
    alerts: AlertSender,
}

impl BrokerShared {
    pub(crate) fn registry(&self) -> MutexGuard<'_, AssetRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn cache(&self) -> MutexGuard<'_, ResolvedCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Upgrades the registered back-reference for `id`.
    ///
    /// The registry lock is released before the upgrade, so the returned
    /// `Arc` may be dropped anywhere.
    pub(crate) fn lookup(&self, id: AssetId) -> Option<Arc<dyn Asset>> {
        let asset = self.registry().get(id);
        asset.and_then(|asset| asset.upgrade())
    }

    pub(crate) fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::SeqCst)
    }

    /// Set by the resolver once it stops taking requests.
    pub(crate) fn mark_stopped(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn announce(&self, message: String) {
        self.alerts
            .enqueue(AlertRecord::new(self.id, BROKER_NAME, message, Severity::Banner));
    }

    fn forget(&self, id: AssetId) -> usize {
        let evicted = self.cache().invalidate_sender(id);
        if evicted > 0 {
            log::debug!("Broker: Invalidated {evicted} cached request(s) served by {id}");
        }
        evicted
    }

    fn resolve_self(request: &ResourceRequest, asset: Option<&Arc<dyn Asset>>) {
        let Some(asset) = asset else {
            request.mark_dead();
            return;
        };
        let found = (**asset).concrete_type_name();
        if let Err(e) = request.fulfill(&Arc::clone(asset).as_any_arc(), found) {
            log::debug!("Self request rejected: {e}");
        }
    }
}

impl BrokerLink for BrokerShared {
    fn escalate(&self, record: AlertRecord) {
        if record.severity.is_terminal() && !self.fatal.swap(true, Ordering::SeqCst) {
            // Stop scheduling; queued requests are settled DEAD by the worker.
            let _ = self.commands.send(BrokerCommand::Shutdown);
        }
        self.alerts.enqueue(record);
    }

    fn submit(&self, spec: RequestSpec) -> Submission {
        let RequestSpec {
            caller,
            target,
            resource,
            args,
            resource_type,
        } = spec;

        let (sender, unknown) = match target {
            Target::Id(id) => (id, None),
            Target::Name(name) => {
                let found = self.registry().find_by_name(&name);
                match found {
                    Some(id) => (id, None),
                    None => (AssetId::NONE, Some(name)),
                }
            }
        };

        let asset = self.lookup(sender);
        let resource = match (&asset, resource) {
            (Some(asset), ResourceId::Name(name)) if name != ResourceId::SELF => {
                match asset.resource_symbol(&name) {
                    Some(symbol) => ResourceId::Symbol(symbol),
                    None => ResourceId::Name(name),
                }
            }
            (_, resource) => resource,
        };

        let request = ResourceRequest::new(
            caller,
            ResourceKey::new(sender, resource, args),
            resource_type,
        );

        if self.is_fatal() || self.is_stopped() {
            request.mark_dead();
        } else if request.key().resource.is_self() {
            Self::resolve_self(&request, asset.as_ref());
        } else if self
            .commands
            .send(BrokerCommand::Resolve(Arc::clone(&request)))
            .is_err()
        {
            request.mark_dead();
        } else if self.is_fatal() || self.is_stopped() {
            // Queued behind a Shutdown the resolver may already have drained.
            request.mark_dead();
        }
        drop(asset);

        match unknown {
            Some(name) => Submission::UnknownTarget { name, request },
            None => Submission::Accepted(request),
        }
    }

    fn release(&self, id: AssetId) {
        let removed = self.registry().remove_if_dead(id);
        if removed {
            self.forget(id);
            log::debug!("Broker: Released {id}");
        }
    }

    fn is_fatal(&self) -> bool {
        BrokerShared::is_fatal(self)
    }
}

/// Owns the asset registry, the resolver thread and the logger.
///
/// Assets reach the broker through the [`BrokerLink`] handed to their
/// [`AssetCore`]; the broker itself never owns an asset. Dropping the broker
/// shuts both workers down.
pub struct Broker {
    shared: Arc<BrokerShared>,
    logger: Logger,
    resolver: Option<thread::JoinHandle<()>>,
}

impl Broker {
    /// Starts a broker and its logger from `config`.
    pub fn start(config: CoreConfig) -> Result<Self, BrokerError> {
        let logger = Logger::start(config.logger)?;
        Self::with_logger(logger)
    }

    /// Starts a broker reporting to an already running logger.
    pub fn with_logger(logger: Logger) -> Result<Self, BrokerError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(BrokerShared {
            id: AssetId::generate(),
            registry: Mutex::new(AssetRegistry::new()),
            cache: Mutex::new(ResolvedCache::new()),
            commands: tx,
            fatal: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            alerts: logger.sender(),
        });

        let resolver = resolver::spawn(Arc::clone(&shared), rx).map_err(BrokerError::Spawn)?;
        shared.announce(format!("==== {BROKER_NAME} {} online ====", shared.id));

        Ok(Self {
            shared,
            logger,
            resolver: Some(resolver),
        })
    }

    /// The broker's own identity, used on its alert records.
    pub fn id(&self) -> AssetId {
        self.shared.id
    }

    /// Returns a link for assets to reach this broker.
    pub fn link(&self) -> Weak<dyn BrokerLink> {
        let link: Arc<dyn BrokerLink> = self.shared.clone();
        Arc::downgrade(&link)
    }

    /// Builds an unregistered [`AssetCore`] linked to this broker.
    pub fn core(&self, name: impl Into<String>) -> AssetCore {
        AssetCore::new(name, self.link())
    }

    /// Builds an asset around a fresh [`AssetCore`] and registers it.
    pub fn create_asset<A, F>(
        &self,
        name: impl Into<String>,
        build: F,
    ) -> Result<Arc<A>, BrokerError>
    where
        A: Asset,
        F: FnOnce(AssetCore) -> A,
    {
        let asset = Arc::new(build(self.core(name)));
        self.register_asset(asset.clone())?;
        Ok(asset)
    }

    /// Registers an asset under its identity.
    ///
    /// The broker keeps a weak reference only. Registering a second live asset
    /// under the same identity fails.
    pub fn register_asset(&self, asset: Arc<dyn Asset>) -> Result<(), BrokerError> {
        let id = asset.id();
        let inserted = self
            .shared
            .registry()
            .insert(id, asset.name(), Arc::downgrade(&asset));
        inserted?;
        log::info!("Broker: Registered '{}' ({id})", asset.name());
        Ok(())
    }

    /// Removes an identity from the registry.
    ///
    /// Pending requests served by it become DEAD and resolved ones STALE.
    pub fn unregister_asset(&self, id: AssetId) -> Result<(), BrokerError> {
        let removed = self.shared.registry().remove(id);
        if !removed {
            return Err(BrokerError::UnknownAsset(id));
        }
        self.shared.forget(id);
        log::info!("Broker: Unregistered {id}");
        Ok(())
    }

    /// Re-points a registered identity at another allocation carrying the
    /// same identity, e.g. a hot-reloaded asset.
    pub fn update_asset_pointer(
        &self,
        id: AssetId,
        asset: Arc<dyn Asset>,
    ) -> Result<(), BrokerError> {
        if asset.id() != id {
            return Err(BrokerError::IdentityMismatch {
                expected: id,
                found: asset.id(),
            });
        }
        let repointed = self
            .shared
            .registry()
            .repoint(id, asset.name(), Arc::downgrade(&asset));
        repointed?;
        log::debug!("Broker: Re-pointed {id} at a new '{}'", asset.name());
        Ok(())
    }

    /// Blocks until every request queued before this call was handled.
    pub fn sync(&self) {
        let (ack, done) = crossbeam_channel::bounded(1);
        if self.shared.commands.send(BrokerCommand::Barrier(ack)).is_ok() {
            let _ = done.recv();
        }
    }

    /// Returns the earliest registered live asset named `name`.
    pub fn find_asset(&self, name: &str) -> Option<Arc<dyn Asset>> {
        let asset = {
            let registry = self.shared.registry();
            registry.find_by_name(name).and_then(|id| registry.get(id))
        };
        asset.and_then(|asset| asset.upgrade())
    }

    /// Returns the live asset registered under `id`.
    pub fn asset(&self, id: AssetId) -> Option<Arc<dyn Asset>> {
        self.shared.lookup(id)
    }

    /// Returns the number of live registered assets.
    pub fn asset_count(&self) -> usize {
        self.shared.registry().len()
    }

    /// Returns the number of cached requests that can still serve others.
    pub fn cache_len(&self) -> usize {
        let mut cache = self.shared.cache();
        cache.purge();
        cache.len()
    }

    /// Returns the logger alerts are routed to.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Returns `true` once any asset raised a FATAL alert.
    pub fn is_fatal(&self) -> bool {
        self.shared.is_fatal()
    }

    /// Stops the resolver and drains the logger. Called on drop.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.resolver.take() {
            self.shared
                .announce(format!("==== {BROKER_NAME} {} shutting down ====", self.shared.id));
            let _ = self.shared.commands.send(BrokerCommand::Shutdown);
            if handle.join().is_err() {
                log::error!("Resolver thread panicked.");
            }
        }
        self.logger.shutdown();
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astra_core::{RequestState, ResourceAsk};
    use astra_telemetry::{LoggerConfig, MemorySink};

    struct Counter {
        core: AssetCore,
        value: Arc<u32>,
    }

    impl Asset for Counter {
        fn core(&self) -> &AssetCore {
            &self.core
        }

        fn resolve(&self, ask: ResourceAsk) {
            if ask.resource().as_name() == Some("value") {
                let _ = ask.set_resource(&self.value);
            }
        }
    }

    fn broker() -> (Broker, MemorySink) {
        let sink = MemorySink::new();
        let logger =
            Logger::with_sinks(LoggerConfig::default(), vec![Box::new(sink.clone())]).unwrap();
        (Broker::with_logger(logger).unwrap(), sink)
    }

    #[test]
    fn test_broker_lifecycle_banners() {
        let (mut broker, sink) = broker();
        broker.shutdown();

        let banners = sink.with_severity(Severity::Banner);
        assert_eq!(banners.len(), 2);
        assert!(banners[0].message.contains("online"));
        assert!(banners[1].message.contains("shutting down"));
        assert!(banners.iter().all(|r| r.caller_id == broker.id()));
    }

    #[test]
    fn test_self_request_is_ready_without_the_worker() {
        let (broker, _sink) = broker();
        let counter = broker
            .create_asset("Counter", |core| Counter {
                core,
                value: Arc::new(3),
            })
            .unwrap();

        let handle = counter
            .core
            .request::<Counter>(counter.id(), ResourceId::SELF, &[]);
        assert_eq!(handle.state(), RequestState::Ready);

        let mut handle = handle;
        assert_eq!(handle.poll(), RequestState::Ready);
        assert!(Arc::ptr_eq(&handle.get().unwrap(), &counter));
    }

    #[test]
    fn test_request_after_fatal_is_dead() {
        let (broker, _sink) = broker();
        let counter = broker
            .create_asset("Counter", |core| Counter {
                core,
                value: Arc::new(3),
            })
            .unwrap();

        counter.core.alert("out of memory", Severity::Fatal);
        assert!(broker.is_fatal());

        let handle = counter.core.request::<u32>(counter.id(), "value", &[]);
        assert_eq!(handle.state(), RequestState::Dead);
    }

    #[test]
    fn test_request_after_resolver_stopped_is_dead() {
        // --- 1. ARRANGE ---
        let (broker, _sink) = broker();
        let counter = broker
            .create_asset("Counter", |core| Counter {
                core,
                value: Arc::new(3),
            })
            .unwrap();
        // The state the resolver leaves behind once it drains on shutdown.
        broker.shared.mark_stopped();

        // --- 2. ACT ---
        let handle = counter.core.request::<u32>(counter.id(), "value", &[]);

        // --- 3. ASSERT ---
        assert_eq!(handle.state(), RequestState::Dead);
        assert!(!broker.is_fatal());
    }

    #[test]
    fn test_request_after_shutdown_is_dead() {
        // --- 1. ARRANGE ---
        let (mut broker, _sink) = broker();
        let counter = broker
            .create_asset("Counter", |core| Counter {
                core,
                value: Arc::new(3),
            })
            .unwrap();
        broker.shutdown();

        // --- 2. ACT ---
        let mut handle = counter.core.request::<u32>(counter.id(), "value", &[]);

        // --- 3. ASSERT ---
        assert!(broker.shared.is_stopped());
        assert_eq!(handle.wait(), RequestState::Dead);
    }

    #[test]
    fn test_release_keeps_a_repointed_identity() {
        let (broker, _sink) = broker();
        let old = broker
            .create_asset("Counter", |core| Counter {
                core,
                value: Arc::new(1),
            })
            .unwrap();
        let id = old.id();

        let new: Arc<dyn Asset> = Arc::new(Counter {
            core: AssetCore::with_id(id, "Counter", broker.link()),
            value: Arc::new(2),
        });
        broker.update_asset_pointer(id, new.clone()).unwrap();
        drop(old);

        assert_eq!(broker.asset_count(), 1);
        assert!(Arc::ptr_eq(&broker.asset(id).unwrap(), &new));
    }
}
