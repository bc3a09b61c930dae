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

//! The raw native call surface.
//!
//! [`NativeApi`] mirrors the engine's C helper-call convention: operations
//! return sentinel codes or `{return_code, response}` result structs, never
//! Rust errors, and failure details live in per-OS-thread exception state
//! retrieved through the get/clear protocol. Everything above this trait
//! deals only in owned strings and opaque handles; a gateway to the real
//! shared library implements this trait and keeps raw-buffer marshaling
//! confined behind it.

/// Return code of a successful native call.
pub const NO_ERROR: i64 = 0;

/// Opaque, pointer-sized identifier of one in-memory, mutable configuration
/// instance. Valid only between its creating call (create/load) and its
/// close; never interpret or persist it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConfigHandle(pub(crate) usize);

impl ConfigHandle {
    /// The raw pointer-sized value, for display and bookkeeping only.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A helper-call result: the C convention of a return code plus an owned
/// response payload (string, handle, or configuration id).
#[derive(Debug, Clone)]
pub struct HelperResult<T> {
    pub return_code: i64,
    pub response: T,
}

impl<T> HelperResult<T> {
    pub fn ok(response: T) -> Self {
        Self {
            return_code: NO_ERROR,
            response,
        }
    }
}

impl<T: Default> HelperResult<T> {
    pub fn failed(return_code: i64) -> Self {
        Self {
            return_code,
            response: T::default(),
        }
    }
}

/// The native engine's call surface.
///
/// Implementations must keep last-exception state per OS thread: a failing
/// call records `{code, message}` on the calling thread, where it persists
/// across subsequent calls on that thread until cleared.
pub trait NativeApi: Send + Sync + std::fmt::Debug {
    // --- configuration handles ---------------------------------------------

    fn config_init(&self, instance_name: &str, settings: &str, verbose_logging: i64) -> i64;
    fn config_destroy(&self) -> i64;
    /// Load the built-in template configuration into a fresh instance.
    fn config_create(&self) -> HelperResult<ConfigHandle>;
    /// Parse `definition` into a fresh instance.
    fn config_load(&self, definition: &str) -> HelperResult<ConfigHandle>;
    /// `fragment` is a `{"DSRC_CODE": "<code>"}` document; the response
    /// carries the assigned numeric id.
    fn config_add_data_source(&self, handle: ConfigHandle, fragment: &str) -> HelperResult<String>;
    fn config_delete_data_source(&self, handle: ConfigHandle, fragment: &str) -> i64;
    fn config_list_data_sources(&self, handle: ConfigHandle) -> HelperResult<String>;
    fn config_save(&self, handle: ConfigHandle) -> HelperResult<String>;
    fn config_close(&self, handle: ConfigHandle) -> i64;

    // --- configuration registry --------------------------------------------

    fn config_mgr_init(&self, instance_name: &str, settings: &str, verbose_logging: i64) -> i64;
    fn config_mgr_destroy(&self) -> i64;
    fn config_mgr_add_config(&self, definition: &str, comment: &str) -> HelperResult<i64>;
    fn config_mgr_get_config(&self, config_id: i64) -> HelperResult<String>;
    fn config_mgr_get_config_list(&self) -> HelperResult<String>;
    /// Zero means no default has been set.
    fn config_mgr_get_default_config_id(&self) -> HelperResult<i64>;
    fn config_mgr_set_default_config_id(&self, config_id: i64) -> i64;
    /// Compare-and-swap: succeeds only while the current default equals
    /// `current_default`; fails without mutating state otherwise.
    fn config_mgr_replace_default_config_id(&self, current_default: i64, new_default: i64) -> i64;

    // --- diagnostic --------------------------------------------------------

    fn diagnostic_init(
        &self,
        instance_name: &str,
        settings: &str,
        config_id: i64,
        verbose_logging: i64,
    ) -> i64;
    fn diagnostic_destroy(&self) -> i64;
    fn diagnostic_reinit(&self, config_id: i64) -> i64;
    fn diagnostic_get_datastore_info(&self) -> HelperResult<String>;
    fn diagnostic_check_datastore_performance(&self, seconds_to_run: i64) -> HelperResult<String>;
    fn diagnostic_purge_repository(&self) -> i64;

    // --- engine ------------------------------------------------------------

    fn engine_init(
        &self,
        instance_name: &str,
        settings: &str,
        config_id: i64,
        verbose_logging: i64,
    ) -> i64;
    fn engine_destroy(&self) -> i64;
    fn engine_reinit(&self, config_id: i64) -> i64;
    fn engine_get_active_config_id(&self) -> HelperResult<i64>;
    fn engine_get_stats(&self) -> HelperResult<String>;
    fn engine_prime(&self) -> i64;

    // --- product -----------------------------------------------------------

    fn product_init(&self, instance_name: &str, settings: &str, verbose_logging: i64) -> i64;
    fn product_destroy(&self) -> i64;
    fn product_get_license(&self) -> HelperResult<String>;
    fn product_get_version(&self) -> HelperResult<String>;

    // --- last-exception protocol (per OS thread) ----------------------------

    /// Copy the calling thread's last exception message into `buffer`
    /// (NUL-padded); returns the number of bytes written.
    fn get_last_exception(&self, buffer: &mut [u8]) -> usize;
    fn get_last_exception_code(&self) -> i64;
    fn clear_last_exception(&self);
}
