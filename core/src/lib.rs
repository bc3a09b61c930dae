// Copyright 2025 The Kindred Authors.
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

// ============================================================================
// Core Public Modules
// ============================================================================

/// Error types shared across the SDK
pub mod error;

/// Notification event payloads emitted to observers
pub mod event;

/// Blocking-thread dispatch and exception translation for engine calls
pub mod gateway;

/// The engine binding surface and the embedded in-process backend
pub mod native;

/// Observer registration and fan-out
pub mod observer;

// ============================================================================
// Clean Public API
// ============================================================================

/// Error types for kindred-core
pub use error::{ErrorKind, Result, SdkError};

/// Notification payload delivered to observers
pub use event::NotificationEvent;

/// Call dispatch and message-id helpers
pub use gateway::{error_id, kind_for_code, NativeCallGateway, LAST_EXCEPTION_BUFFER_SIZE};

/// The binding surface of the native engine and its embedded backend
pub use native::{ConfigHandle, EmbeddedEngine, HelperResult, NativeApi, NO_ERROR};

/// Observer trait and per-component hub
pub use observer::{Observer, ObserverHub};
