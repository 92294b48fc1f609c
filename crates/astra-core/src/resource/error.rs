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

//! Errors reported to the sender side of a request.

use super::{RequestState, ResourceKey};
use thiserror::Error;

/// An error raised while answering a resource request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The sender attached a value of a different type than the caller asked
    /// for. The request has been marked DEAD.
    #[error("resource {key} was requested as `{expected}` but served as `{found}`")]
    TypeMismatch {
        /// The key of the request.
        key: ResourceKey,
        /// The type the caller asked for.
        expected: &'static str,
        /// The type the sender attached.
        found: &'static str,
    },
    /// The request already left PENDING, so the answer was dropped.
    #[error("resource {key} is no longer pending (state: {state})")]
    NotPending {
        /// The key of the request.
        key: ResourceKey,
        /// The state the request was found in.
        state: RequestState,
    },
}
