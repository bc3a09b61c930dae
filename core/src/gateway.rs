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

//! The native call gateway.
//!
//! Every engine call from the SDK components goes through
//! [`NativeCallGateway::invoke`]. The gateway runs the call on a dedicated
//! blocking thread and, when the helper reports failure, reads and clears
//! the engine's thread-local last-exception state on that same thread
//! before anything else can run on it. The exception text and code are
//! translated into a structured [`SdkError`] carrying a stable message id.

use std::sync::Arc;

use crate::error::{ErrorKind, Result, SdkError};
use crate::native::{HelperResult, NativeApi, NO_ERROR};

/// Size of the buffer handed to the engine when fetching exception text.
pub const LAST_EXCEPTION_BUFFER_SIZE: usize = 65535;

/// Prefix of every SDK message id.
pub const MESSAGE_ID_PREFIX: &str = "KNSDK";

/// Build the message id of a call site, e.g. `KNSDK60014001`.
pub fn error_id(component_id: u16, call_site: u16) -> String {
    format!("{MESSAGE_ID_PREFIX}{component_id:04}{call_site:04}")
}

/// Map an engine exception code onto an error kind via the engine's
/// published code ranges.
pub fn kind_for_code(code: i64) -> ErrorKind {
    match code {
        1..=999 => ErrorKind::BadInput,
        1000..=1999 => ErrorKind::Configuration,
        2000..=2999 => ErrorKind::Retryable,
        7000..=7999 => ErrorKind::ReplaceConflict,
        9000..=9999 => ErrorKind::Unrecoverable,
        _ => ErrorKind::Generic,
    }
}

/// Read, translate, and clear the engine's thread-local exception state.
///
/// Must run on the same OS thread that made the failing call.
fn translate_last_exception(
    native: &dyn NativeApi,
    component_id: u16,
    call_site: u16,
    raw_code: i64,
) -> SdkError {
    let mut buffer = vec![0u8; LAST_EXCEPTION_BUFFER_SIZE];
    let written = native.get_last_exception(&mut buffer);
    let mut reason = String::from_utf8_lossy(&buffer[..written])
        .trim_end_matches('\0')
        .trim()
        .to_string();
    let mut code = native.get_last_exception_code();
    // Always clear, even when the state turns out to be empty, so a stale
    // exception can never leak into the next call on this thread.
    native.clear_last_exception();

    if code == 0 {
        code = raw_code;
    }
    if reason.is_empty() {
        reason = "unknown native error".to_string();
    }
    SdkError::from_native(kind_for_code(code), error_id(component_id, call_site), code, reason)
}

/// Dispatches calls of one SDK component into the engine.
#[derive(Clone)]
pub struct NativeCallGateway {
    native: Arc<dyn NativeApi>,
    component_id: u16,
}

impl NativeCallGateway {
    pub fn new(native: Arc<dyn NativeApi>, component_id: u16) -> Self {
        Self { native, component_id }
    }

    /// The backend this gateway dispatches into.
    pub fn native_api(&self) -> Arc<dyn NativeApi> {
        self.native.clone()
    }

    /// Run a helper call on a blocking thread and translate failure.
    ///
    /// The closure and the exception read/clear execute inside one
    /// `spawn_blocking` closure with no await points, so they are pinned
    /// to one OS thread for the whole exchange.
    pub async fn invoke<T, F>(&self, call_site: u16, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn NativeApi) -> HelperResult<T> + Send + 'static,
    {
        let native = self.native.clone();
        let component_id = self.component_id;
        let outcome = tokio::task::spawn_blocking(move || {
            let result = call(native.as_ref());
            if result.return_code == NO_ERROR {
                Ok(result.response)
            } else {
                Err(translate_last_exception(
                    native.as_ref(),
                    component_id,
                    call_site,
                    result.return_code,
                ))
            }
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(join_error) => Err(SdkError::from_native(
                ErrorKind::Unrecoverable,
                error_id(component_id, call_site),
                0,
                format!("native call task failed: {join_error}"),
            )),
        }
    }

    /// [`invoke`](Self::invoke) for helpers that return only a code.
    pub async fn invoke_void<F>(&self, call_site: u16, call: F) -> Result<()>
    where
        F: FnOnce(&dyn NativeApi) -> i64 + Send + 'static,
    {
        self.invoke(call_site, move |native| {
            let code = call(native);
            if code == NO_ERROR {
                HelperResult::ok(())
            } else {
                HelperResult::failed(code)
            }
        })
        .await
    }
}

impl std::fmt::Debug for NativeCallGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeCallGateway")
            .field("component_id", &self.component_id)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
