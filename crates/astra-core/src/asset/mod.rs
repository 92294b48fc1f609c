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

//! Provides the identity and alert contract shared by every engine asset.
//!
//! An "asset" here is any long-lived component that participates in the
//! broker: a renderer, a mesh cache, a window. Each one embeds an
//! [`AssetCore`] and implements [`Asset`] so the broker can reach it.
//!
//! The key components are:
//! - [`AssetId`]: the process-unique identity of an asset.
//! - [`AssetCore`]: identity, display name, local alert state and the
//!   connection to the broker.
//! - The [`Asset`] trait: exposes the core and, optionally, serves resources
//!   to other assets.

mod base;
mod id;

pub use base::AssetCore;
pub use id::AssetId;

use crate::resource::ResourceAsk;
use std::any::Any;
use std::sync::Arc;

/// Erases an `Arc<Self>` into a shareable `Arc<dyn Any>`.
///
/// Implemented for every sized `Send + Sync + 'static` type, so asset
/// implementors never write it by hand. The broker uses it to hand an asset
/// out as its own `"self"` resource.
pub trait AsAnyArc: Any + Send + Sync {
    /// Converts the `Arc` without copying the allocation.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// The concrete type name, for diagnostics.
    fn concrete_type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAnyArc for T {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn concrete_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A component that participates in the identity, alert and resource protocol.
///
/// The supertraits guarantee that an asset can be shared across the resolver
/// and logger threads and erased to `dyn Any` for typed resource handles.
///
/// # Examples
///
/// ```
/// use astra_core::{Asset, AssetCore, ResourceAsk};
/// use std::sync::Arc;
///
/// struct Palette {
///     core: AssetCore,
///     colors: Arc<Vec<[f32; 4]>>,
/// }
///
/// impl Asset for Palette {
///     fn core(&self) -> &AssetCore {
///         &self.core
///     }
///
///     fn resolve(&self, ask: ResourceAsk) {
///         if ask.resource().as_name() == Some("colors") {
///             let _ = ask.set_resource(&self.colors);
///         } else {
///             ask.invalidate();
///         }
///     }
/// }
/// ```
pub trait Asset: AsAnyArc {
    /// Returns the embedded identity and alert state.
    fn core(&self) -> &AssetCore;

    /// Serves a resource request addressed to this asset.
    ///
    /// Called on the resolver thread, once per request that could not be
    /// served from the broker's cache. The implementation either answers
    /// right away, keeps the ask to answer later, or refuses. The default
    /// refuses every request.
    fn resolve(&self, ask: ResourceAsk) {
        ask.invalidate();
    }

    /// Maps a resource name to the symbolic id this asset publishes it under.
    ///
    /// Requests for a mapped name are keyed by the symbol, so two names that
    /// map to the same symbol share one cache entry. Unmapped names stay
    /// keyed by name.
    fn resource_symbol(&self, _name: &str) -> Option<u64> {
        None
    }

    /// Returns the identity of this asset.
    fn id(&self) -> AssetId {
        self.core().id()
    }

    /// Returns the display name of this asset.
    fn name(&self) -> &str {
        self.core().name()
    }
}
