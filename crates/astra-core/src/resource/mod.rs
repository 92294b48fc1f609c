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

//! The request / handle / ask triad that lets one asset pull a resource owned
//! by another.
//!
//! A [`ResourceRequest`] is the shared state of one outstanding ask. The
//! caller observes it through a typed [`ResourceHandle`], the owner answers it
//! through a [`ResourceAsk`]. Resources are never owned by the request: it
//! keeps a `Weak` pointer, so a resource cannot outlive the asset serving it.

mod ask;
mod cancel;
mod error;
mod handle;
mod request;

pub use ask::ResourceAsk;
pub use cancel::CancelToken;
pub use error::ResourceError;
pub use handle::ResourceHandle;
pub use request::ResourceRequest;

use crate::asset::AssetId;
use std::any::{Any, TypeId};
use std::fmt;

/// Identifies a resource within the asset that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    /// A resource addressed by name.
    Name(String),
    /// A resource addressed by the symbolic id its owner publishes.
    Symbol(u64),
}

impl ResourceId {
    /// The reserved name under which every asset serves itself.
    pub const SELF: &'static str = "self";

    /// Returns the name, if this id is a name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            ResourceId::Name(name) => Some(name),
            ResourceId::Symbol(_) => None,
        }
    }

    /// Returns the symbol, if this id is a symbol.
    pub fn as_symbol(&self) -> Option<u64> {
        match self {
            ResourceId::Name(_) => None,
            ResourceId::Symbol(symbol) => Some(*symbol),
        }
    }

    /// Returns `true` for the reserved `"self"` resource.
    pub fn is_self(&self) -> bool {
        self.as_name() == Some(Self::SELF)
    }
}

impl From<&str> for ResourceId {
    fn from(name: &str) -> Self {
        ResourceId::Name(name.to_owned())
    }
}

impl From<String> for ResourceId {
    fn from(name: String) -> Self {
        ResourceId::Name(name)
    }
}

impl From<u64> for ResourceId {
    fn from(symbol: u64) -> Self {
        ResourceId::Symbol(symbol)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Name(name) => f.write_str(name),
            ResourceId::Symbol(symbol) => write!(f, "#{symbol}"),
        }
    }
}

/// The deduplication key of a request: who serves it, what, and with which
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    /// The asset expected to serve the resource.
    pub sender: AssetId,
    /// The resource within the sender.
    pub resource: ResourceId,
    /// Ordered numeric arguments.
    pub args: Vec<i64>,
}

impl ResourceKey {
    /// Creates a key.
    pub fn new(sender: AssetId, resource: ResourceId, args: Vec<i64>) -> Self {
        Self {
            sender,
            resource,
            args,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}{:?}", self.resource, self.sender, self.args)
    }
}

/// The lifecycle of a [`ResourceRequest`].
///
/// Legal transitions are `Pending -> {Ready, Dead, Stale}` and
/// `{Ready, Dead} -> Stale`. `Stale` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestState {
    /// Waiting for the sender.
    #[default]
    Pending,
    /// A resource is attached.
    Ready,
    /// The sender died, refused, or answered with the wrong type.
    Dead,
    /// Abandoned by the caller, or its resource vanished. Reclaimable.
    Stale,
}

impl RequestState {
    /// Checks whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Pending, Ready) | (Pending, Dead) | (Pending, Stale) | (Ready, Stale) | (Dead, Stale)
        )
    }

    /// Returns `true` once the request left `Pending`.
    pub fn is_settled(self) -> bool {
        self != RequestState::Pending
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Pending => "PENDING",
            RequestState::Ready => "READY",
            RequestState::Dead => "DEAD",
            RequestState::Stale => "STALE",
        };
        f.write_str(name)
    }
}

/// Runtime description of the type a caller reads a resource as.
///
/// Carried by every request so a mismatch is caught when the sender attaches
/// the resource, instead of when the caller dereferences it.
#[derive(Clone, Copy)]
pub struct ResourceType {
    id: TypeId,
    name: &'static str,
    accepts: fn(&(dyn Any + Send + Sync)) -> bool,
}

impl ResourceType {
    /// Describes `T`.
    pub fn of<T: Any + Send + Sync>() -> Self {
        fn accepts<T: Any>(value: &(dyn Any + Send + Sync)) -> bool {
            value.is::<T>()
        }

        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            accepts: accepts::<T>,
        }
    }

    /// The [`TypeId`] of the described type.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The name of the described type, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Checks whether an erased value is of the described type.
    pub fn accepts(&self, value: &(dyn Any + Send + Sync)) -> bool {
        (self.accepts)(value)
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResourceType {}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceType").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn state_transitions_are_monotonic() {
        use RequestState::*;
        let all = [Pending, Ready, Dead, Stale];
        let allowed: Vec<_> = all
            .iter()
            .flat_map(|from| all.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();
        assert_eq!(
            allowed,
            vec![
                (Pending, Ready),
                (Pending, Dead),
                (Pending, Stale),
                (Ready, Stale),
                (Dead, Stale)
            ]
        );
    }

    #[test]
    fn resource_type_checks_erased_values() {
        let ty = ResourceType::of::<Vec<u32>>();
        let good: Arc<dyn Any + Send + Sync> = Arc::new(vec![1u32, 2, 3]);
        let bad: Arc<dyn Any + Send + Sync> = Arc::new(String::from("nope"));
        assert!(ty.accepts(&*good));
        assert!(!ty.accepts(&*bad));
        assert_eq!(ty, ResourceType::of::<Vec<u32>>());
        assert_ne!(ty, ResourceType::of::<String>());
    }

    #[test]
    fn self_resource_is_recognised() {
        assert!(ResourceId::from("self").is_self());
        assert!(!ResourceId::from("mesh").is_self());
        assert!(!ResourceId::from(7u64).is_self());
        assert_eq!(ResourceId::from(7u64).to_string(), "#7");
    }
}
