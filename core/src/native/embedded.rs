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

//! The embedded in-process backend.
//!
//! [`EmbeddedEngine`] implements [`NativeApi`] with the same observable
//! contract as the shared-library engine: per-OS-thread last-exception
//! state, opaque pointer-sized configuration handles minted from an arena,
//! a built-in template configuration, and a configuration registry whose
//! default-id replacement is a linearizable compare-and-swap. It is the
//! default backend of the SDK and the backend the test suite runs against.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::{json, Value};

use super::api::{ConfigHandle, HelperResult, NativeApi, NO_ERROR};

/// Sentinel return code of a failing helper call.
const FAILURE: i64 = -2;

// Exception codes, drawn from the engine-defined code-range table
// (see `crate::gateway::kind_for_code`).
const EX_BAD_DATA_SOURCE_CODE: i64 = 3;
const EX_INVALID_HANDLE: i64 = 35;
const EX_MALFORMED_DOCUMENT: i64 = 1007;
const EX_BAD_SETTINGS: i64 = 1008;
const EX_UNKNOWN_CONFIG_ID: i64 = 1010;
const EX_REPLACE_CONFLICT: i64 = 7245;
const EX_NOT_INITIALIZED: i64 = 9001;

/// The built-in template configuration loaded by `config_create`.
const TEMPLATE_CONFIG: &str =
    r#"{"G2_CONFIG":{"CFG_DSRC":[{"DSRC_ID":1,"DSRC_CODE":"TEST"},{"DSRC_ID":2,"DSRC_CODE":"SEARCH"}]}}"#;

#[derive(Debug, Clone)]
struct NativeException {
    code: i64,
    message: String,
}

thread_local! {
    // Last-exception state is per OS thread, exactly as the shared library
    // keeps it: set on every failing call, persisting across calls on the
    // same thread until cleared.
    static LAST_EXCEPTION: RefCell<Option<NativeException>> = const { RefCell::new(None) };
}

#[derive(Debug, Default)]
struct SubsystemFlags {
    config: bool,
    config_manager: bool,
    diagnostic: bool,
    engine: bool,
    product: bool,
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    definition: String,
    comments: String,
    created_at: String,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: BTreeMap<i64, RegistryEntry>,
    default_id: i64,
    next_config_id: i64,
}

#[derive(Debug, Default)]
struct EngineState {
    subsystems: SubsystemFlags,
    handles: HashMap<usize, Value>,
    next_handle: usize,
    registry: RegistryState,
    active_config_id: i64,
}

/// In-process implementation of the native engine's binding surface.
#[derive(Debug, Default)]
pub struct EmbeddedEngine {
    state: Mutex<EngineState>,
}

impl EmbeddedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record an exception on the calling thread and return the failure
    /// sentinel.
    fn raise(&self, code: i64, message: impl Into<String>) -> i64 {
        LAST_EXCEPTION.with(|cell| {
            *cell.borrow_mut() = Some(NativeException {
                code,
                message: message.into(),
            });
        });
        FAILURE
    }

    fn raise_result<T: Default>(&self, code: i64, message: impl Into<String>) -> HelperResult<T> {
        HelperResult::failed(self.raise(code, message))
    }

    fn check_settings(&self, settings: &str) -> i64 {
        match serde_json::from_str::<Value>(settings) {
            Ok(Value::Object(_)) => NO_ERROR,
            _ => self.raise(EX_BAD_SETTINGS, "settings document is not a JSON object"),
        }
    }

    fn parse_definition(&self, definition: &str) -> Result<Value, i64> {
        let document: Value = serde_json::from_str(definition).map_err(|e| {
            self.raise(
                EX_MALFORMED_DOCUMENT,
                format!("configuration document is not valid JSON: {e}"),
            )
        })?;
        if document.get("G2_CONFIG").map(Value::is_object) != Some(true) {
            return Err(self.raise(
                EX_MALFORMED_DOCUMENT,
                "configuration document has no G2_CONFIG object",
            ));
        }
        Ok(document)
    }

    /// Extract `DSRC_CODE` from a `{"DSRC_CODE": "<code>"}` fragment,
    /// applying the engine's identifier validation.
    fn parse_data_source_code(&self, fragment: &str) -> Result<String, i64> {
        let fragment: Value = serde_json::from_str(fragment).map_err(|e| {
            self.raise(
                EX_BAD_DATA_SOURCE_CODE,
                format!("data source fragment is not valid JSON: {e}"),
            )
        })?;
        let code = fragment
            .get("DSRC_CODE")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if code.is_empty() {
            return Err(self.raise(EX_BAD_DATA_SOURCE_CODE, "data source code is empty"));
        }
        if code.chars().any(char::is_control) {
            return Err(self.raise(
                EX_BAD_DATA_SOURCE_CODE,
                "data source code contains control characters",
            ));
        }
        Ok(code.to_string())
    }
}

/// Data sources of a configuration document, as mutable JSON array access.
fn data_sources(document: &mut Value) -> Option<&mut Vec<Value>> {
    document
        .get_mut("G2_CONFIG")?
        .as_object_mut()?
        .entry("CFG_DSRC")
        .or_insert_with(|| json!([]))
        .as_array_mut()
}

impl NativeApi for EmbeddedEngine {
    // --- configuration handles ---------------------------------------------

    fn config_init(&self, _instance_name: &str, settings: &str, _verbose_logging: i64) -> i64 {
        let code = self.check_settings(settings);
        if code == NO_ERROR {
            self.state().subsystems.config = true;
        }
        code
    }

    fn config_destroy(&self) -> i64 {
        let mut state = self.state();
        state.subsystems.config = false;
        state.handles.clear();
        NO_ERROR
    }

    fn config_create(&self) -> HelperResult<ConfigHandle> {
        let mut state = self.state();
        if !state.subsystems.config {
            drop(state);
            return self.raise_result(EX_NOT_INITIALIZED, "configuration subsystem is not initialized");
        }
        let template: Value = match serde_json::from_str(TEMPLATE_CONFIG) {
            Ok(template) => template,
            Err(e) => {
                drop(state);
                return self.raise_result(EX_MALFORMED_DOCUMENT, e.to_string());
            }
        };
        state.next_handle += 1;
        let handle = state.next_handle;
        state.handles.insert(handle, template);
        HelperResult::ok(ConfigHandle(handle))
    }

    fn config_load(&self, definition: &str) -> HelperResult<ConfigHandle> {
        let mut state = self.state();
        if !state.subsystems.config {
            drop(state);
            return self.raise_result(EX_NOT_INITIALIZED, "configuration subsystem is not initialized");
        }
        let document = match self.parse_definition(definition) {
            Ok(document) => document,
            Err(code) => return HelperResult::failed(code),
        };
        state.next_handle += 1;
        let handle = state.next_handle;
        state.handles.insert(handle, document);
        HelperResult::ok(ConfigHandle(handle))
    }

    fn config_add_data_source(&self, handle: ConfigHandle, fragment: &str) -> HelperResult<String> {
        let code = match self.parse_data_source_code(fragment) {
            Ok(code) => code,
            Err(raw) => return HelperResult::failed(raw),
        };
        let mut state = self.state();
        let Some(document) = state.handles.get_mut(&handle.0) else {
            drop(state);
            return self.raise_result(EX_INVALID_HANDLE, format!("invalid configuration handle {handle}"));
        };
        let Some(sources) = data_sources(document) else {
            drop(state);
            return self.raise_result(EX_MALFORMED_DOCUMENT, "configuration has no G2_CONFIG object");
        };
        // Adding an already-registered code is accepted and answers with the
        // id it holds.
        let existing = sources
            .iter()
            .find(|entry| entry.get("DSRC_CODE").and_then(Value::as_str) == Some(code.as_str()))
            .and_then(|entry| entry.get("DSRC_ID").and_then(Value::as_i64));
        let id = match existing {
            Some(id) => id,
            None => {
                let next = sources
                    .iter()
                    .filter_map(|entry| entry.get("DSRC_ID").and_then(Value::as_i64))
                    .fold(1000, i64::max)
                    + 1;
                sources.push(json!({"DSRC_ID": next, "DSRC_CODE": code}));
                next
            }
        };
        HelperResult::ok(format!(r#"{{"DSRC_ID":{id}}}"#))
    }

    fn config_delete_data_source(&self, handle: ConfigHandle, fragment: &str) -> i64 {
        let code = match self.parse_data_source_code(fragment) {
            Ok(code) => code,
            Err(raw) => return raw,
        };
        let mut state = self.state();
        let Some(document) = state.handles.get_mut(&handle.0) else {
            drop(state);
            return self.raise(EX_INVALID_HANDLE, format!("invalid configuration handle {handle}"));
        };
        if let Some(sources) = data_sources(document) {
            // Deleting an absent code is a no-op success.
            sources.retain(|entry| {
                entry.get("DSRC_CODE").and_then(Value::as_str) != Some(code.as_str())
            });
        }
        NO_ERROR
    }

    fn config_list_data_sources(&self, handle: ConfigHandle) -> HelperResult<String> {
        let mut state = self.state();
        let Some(document) = state.handles.get_mut(&handle.0) else {
            drop(state);
            return self.raise_result(EX_INVALID_HANDLE, format!("invalid configuration handle {handle}"));
        };
        let sources = data_sources(document).cloned().unwrap_or_default();
        HelperResult::ok(json!({ "DATA_SOURCES": sources }).to_string())
    }

    fn config_save(&self, handle: ConfigHandle) -> HelperResult<String> {
        let state = self.state();
        match state.handles.get(&handle.0) {
            Some(document) => HelperResult::ok(document.to_string()),
            None => {
                drop(state);
                self.raise_result(EX_INVALID_HANDLE, format!("invalid configuration handle {handle}"))
            }
        }
    }

    fn config_close(&self, handle: ConfigHandle) -> i64 {
        let mut state = self.state();
        if state.handles.remove(&handle.0).is_none() {
            drop(state);
            return self.raise(EX_INVALID_HANDLE, format!("invalid configuration handle {handle}"));
        }
        NO_ERROR
    }

    // --- configuration registry --------------------------------------------

    fn config_mgr_init(&self, _instance_name: &str, settings: &str, _verbose_logging: i64) -> i64 {
        let code = self.check_settings(settings);
        if code == NO_ERROR {
            self.state().subsystems.config_manager = true;
        }
        code
    }

    fn config_mgr_destroy(&self) -> i64 {
        self.state().subsystems.config_manager = false;
        NO_ERROR
    }

    fn config_mgr_add_config(&self, definition: &str, comment: &str) -> HelperResult<i64> {
        let mut state = self.state();
        if !state.subsystems.config_manager {
            drop(state);
            return self.raise_result(EX_NOT_INITIALIZED, "configuration manager is not initialized");
        }
        if let Err(code) = self.parse_definition(definition) {
            return HelperResult::failed(code);
        }
        state.registry.next_config_id += 1;
        let config_id = state.registry.next_config_id;
        state.registry.entries.insert(
            config_id,
            RegistryEntry {
                definition: definition.to_string(),
                comments: comment.to_string(),
                created_at: Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            },
        );
        HelperResult::ok(config_id)
    }

    fn config_mgr_get_config(&self, config_id: i64) -> HelperResult<String> {
        let state = self.state();
        if !state.subsystems.config_manager {
            drop(state);
            return self.raise_result(EX_NOT_INITIALIZED, "configuration manager is not initialized");
        }
        match state.registry.entries.get(&config_id) {
            Some(entry) => HelperResult::ok(entry.definition.clone()),
            None => {
                drop(state);
                self.raise_result(
                    EX_UNKNOWN_CONFIG_ID,
                    format!("configuration id {config_id} is not registered"),
                )
            }
        }
    }

    fn config_mgr_get_config_list(&self) -> HelperResult<String> {
        let state = self.state();
        if !state.subsystems.config_manager {
            drop(state);
            return self.raise_result(EX_NOT_INITIALIZED, "configuration manager is not initialized");
        }
        let configs: Vec<Value> = state
            .registry
            .entries
            .iter()
            .map(|(id, entry)| {
                json!({
                    "CONFIG_ID": id,
                    "CONFIG_COMMENTS": entry.comments,
                    "SYS_CREATE_DT": entry.created_at,
                })
            })
            .collect();
        HelperResult::ok(json!({ "CONFIGS": configs }).to_string())
    }

    fn config_mgr_get_default_config_id(&self) -> HelperResult<i64> {
        let state = self.state();
        if !state.subsystems.config_manager {
            drop(state);
            return self.raise_result(EX_NOT_INITIALIZED, "configuration manager is not initialized");
        }
        HelperResult::ok(state.registry.default_id)
    }

    fn config_mgr_set_default_config_id(&self, config_id: i64) -> i64 {
        let mut state = self.state();
        if !state.subsystems.config_manager {
            drop(state);
            return self.raise(EX_NOT_INITIALIZED, "configuration manager is not initialized");
        }
        if !state.registry.entries.contains_key(&config_id) {
            drop(state);
            return self.raise(
                EX_UNKNOWN_CONFIG_ID,
                format!("configuration id {config_id} is not registered"),
            );
        }
        state.registry.default_id = config_id;
        NO_ERROR
    }

    fn config_mgr_replace_default_config_id(&self, current_default: i64, new_default: i64) -> i64 {
        // Compare and swap happen under the single registry lock, which is
        // what makes this call linearizable.
        let mut state = self.state();
        if !state.subsystems.config_manager {
            drop(state);
            return self.raise(EX_NOT_INITIALIZED, "configuration manager is not initialized");
        }
        if !state.registry.entries.contains_key(&new_default) {
            drop(state);
            return self.raise(
                EX_UNKNOWN_CONFIG_ID,
                format!("configuration id {new_default} is not registered"),
            );
        }
        if state.registry.default_id != current_default {
            let actual = state.registry.default_id;
            drop(state);
            return self.raise(
                EX_REPLACE_CONFLICT,
                format!("current default configuration id is {actual}, not {current_default}"),
            );
        }
        state.registry.default_id = new_default;
        NO_ERROR
    }

    // --- diagnostic --------------------------------------------------------

    fn diagnostic_init(
        &self,
        _instance_name: &str,
        settings: &str,
        config_id: i64,
        _verbose_logging: i64,
    ) -> i64 {
        let code = self.check_settings(settings);
        if code != NO_ERROR {
            return code;
        }
        let mut state = self.state();
        if config_id != 0 && !state.registry.entries.contains_key(&config_id) {
            drop(state);
            return self.raise(
                EX_UNKNOWN_CONFIG_ID,
                format!("configuration id {config_id} is not registered"),
            );
        }
        state.subsystems.diagnostic = true;
        NO_ERROR
    }

    fn diagnostic_destroy(&self) -> i64 {
        self.state().subsystems.diagnostic = false;
        NO_ERROR
    }

    fn diagnostic_reinit(&self, config_id: i64) -> i64 {
        let mut state = self.state();
        if !state.subsystems.diagnostic {
            drop(state);
            return self.raise(EX_NOT_INITIALIZED, "diagnostic subsystem is not initialized");
        }
        if !state.registry.entries.contains_key(&config_id) {
            drop(state);
            return self.raise(
                EX_UNKNOWN_CONFIG_ID,
                format!("configuration id {config_id} is not registered"),
            );
        }
        state.active_config_id = config_id;
        NO_ERROR
    }

    fn diagnostic_get_datastore_info(&self) -> HelperResult<String> {
        if !self.state().subsystems.diagnostic {
            return self.raise_result(EX_NOT_INITIALIZED, "diagnostic subsystem is not initialized");
        }
        HelperResult::ok(
            json!({"dataStores": [{"id": "CORE", "type": "embedded", "location": "in-process"}]})
                .to_string(),
        )
    }

    fn diagnostic_check_datastore_performance(&self, seconds_to_run: i64) -> HelperResult<String> {
        if !self.state().subsystems.diagnostic {
            return self.raise_result(EX_NOT_INITIALIZED, "diagnostic subsystem is not initialized");
        }
        HelperResult::ok(
            json!({"numRecordsInserted": 0, "insertTime": seconds_to_run * 1000}).to_string(),
        )
    }

    fn diagnostic_purge_repository(&self) -> i64 {
        if !self.state().subsystems.diagnostic {
            return self.raise(EX_NOT_INITIALIZED, "diagnostic subsystem is not initialized");
        }
        NO_ERROR
    }

    // --- engine ------------------------------------------------------------

    fn engine_init(
        &self,
        _instance_name: &str,
        settings: &str,
        config_id: i64,
        _verbose_logging: i64,
    ) -> i64 {
        let code = self.check_settings(settings);
        if code != NO_ERROR {
            return code;
        }
        let mut state = self.state();
        if config_id != 0 && !state.registry.entries.contains_key(&config_id) {
            drop(state);
            return self.raise(
                EX_UNKNOWN_CONFIG_ID,
                format!("configuration id {config_id} is not registered"),
            );
        }
        state.active_config_id = if config_id != 0 {
            config_id
        } else {
            state.registry.default_id
        };
        state.subsystems.engine = true;
        NO_ERROR
    }

    fn engine_destroy(&self) -> i64 {
        self.state().subsystems.engine = false;
        NO_ERROR
    }

    fn engine_reinit(&self, config_id: i64) -> i64 {
        let mut state = self.state();
        if !state.subsystems.engine {
            drop(state);
            return self.raise(EX_NOT_INITIALIZED, "engine subsystem is not initialized");
        }
        if !state.registry.entries.contains_key(&config_id) {
            drop(state);
            return self.raise(
                EX_UNKNOWN_CONFIG_ID,
                format!("configuration id {config_id} is not registered"),
            );
        }
        state.active_config_id = config_id;
        NO_ERROR
    }

    fn engine_get_active_config_id(&self) -> HelperResult<i64> {
        let state = self.state();
        if !state.subsystems.engine {
            drop(state);
            return self.raise_result(EX_NOT_INITIALIZED, "engine subsystem is not initialized");
        }
        HelperResult::ok(state.active_config_id)
    }

    fn engine_get_stats(&self) -> HelperResult<String> {
        if !self.state().subsystems.engine {
            return self.raise_result(EX_NOT_INITIALIZED, "engine subsystem is not initialized");
        }
        HelperResult::ok(
            json!({"workload": {"apiVersion": "4.0.0", "loadedRecords": 0, "addedRecords": 0}})
                .to_string(),
        )
    }

    fn engine_prime(&self) -> i64 {
        if !self.state().subsystems.engine {
            return self.raise(EX_NOT_INITIALIZED, "engine subsystem is not initialized");
        }
        NO_ERROR
    }

    // --- product -----------------------------------------------------------

    fn product_init(&self, _instance_name: &str, settings: &str, _verbose_logging: i64) -> i64 {
        let code = self.check_settings(settings);
        if code == NO_ERROR {
            self.state().subsystems.product = true;
        }
        code
    }

    fn product_destroy(&self) -> i64 {
        self.state().subsystems.product = false;
        NO_ERROR
    }

    fn product_get_license(&self) -> HelperResult<String> {
        if !self.state().subsystems.product {
            return self.raise_result(EX_NOT_INITIALIZED, "product subsystem is not initialized");
        }
        HelperResult::ok(
            json!({
                "customer": "",
                "contract": "",
                "licenseType": "EVAL",
                "licenseLevel": "STANDARD",
                "expireDate": "",
                "recordLimit": 100_000,
            })
            .to_string(),
        )
    }

    fn product_get_version(&self) -> HelperResult<String> {
        if !self.state().subsystems.product {
            return self.raise_result(EX_NOT_INITIALIZED, "product subsystem is not initialized");
        }
        HelperResult::ok(
            json!({
                "PRODUCT_NAME": "Kindred Engine",
                "VERSION": "4.0.0",
                "BUILD_VERSION": "4.0.0.00000",
                "BUILD_NUMBER": "00000",
            })
            .to_string(),
        )
    }

    // --- last-exception protocol -------------------------------------------

    fn get_last_exception(&self, buffer: &mut [u8]) -> usize {
        LAST_EXCEPTION.with(|cell| match cell.borrow().as_ref() {
            Some(exception) => {
                let bytes = exception.message.as_bytes();
                let written = bytes.len().min(buffer.len());
                buffer[..written].copy_from_slice(&bytes[..written]);
                written
            }
            None => 0,
        })
    }

    fn get_last_exception_code(&self) -> i64 {
        LAST_EXCEPTION.with(|cell| cell.borrow().as_ref().map(|e| e.code).unwrap_or(0))
    }

    fn clear_last_exception(&self) {
        LAST_EXCEPTION.with(|cell| *cell.borrow_mut() = None);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = "{}";

    fn initialized_engine() -> EmbeddedEngine {
        let engine = EmbeddedEngine::new();
        assert_eq!(engine.config_init("test", SETTINGS, 0), NO_ERROR);
        assert_eq!(engine.config_mgr_init("test", SETTINGS, 0), NO_ERROR);
        engine
    }

    #[test]
    fn test_exception_state_persists_until_cleared() {
        let engine = EmbeddedEngine::new();
        let result = engine.config_create();
        assert_ne!(result.return_code, NO_ERROR);

        // State survives a subsequent successful call on the same thread.
        assert_eq!(engine.config_init("test", SETTINGS, 0), NO_ERROR);
        assert_eq!(engine.get_last_exception_code(), EX_NOT_INITIALIZED);

        let mut buffer = [0u8; 256];
        let written = engine.get_last_exception(&mut buffer);
        assert!(written > 0);
        let message = String::from_utf8_lossy(&buffer[..written]).to_string();
        assert!(message.contains("not initialized"));

        engine.clear_last_exception();
        assert_eq!(engine.get_last_exception_code(), 0);
        assert_eq!(engine.get_last_exception(&mut buffer), 0);
    }

    #[test]
    fn test_calls_before_init_fail() {
        let engine = EmbeddedEngine::new();
        assert_ne!(engine.config_create().return_code, NO_ERROR);
        assert_ne!(engine.config_mgr_get_default_config_id().return_code, NO_ERROR);
        assert_ne!(engine.engine_get_stats().return_code, NO_ERROR);
        assert_ne!(engine.product_get_version().return_code, NO_ERROR);
    }

    #[test]
    fn test_init_rejects_malformed_settings() {
        let engine = EmbeddedEngine::new();
        assert_ne!(engine.config_init("test", "}{", 0), NO_ERROR);
        assert_eq!(engine.get_last_exception_code(), EX_BAD_SETTINGS);
        engine.clear_last_exception();
    }

    #[test]
    fn test_template_carries_data_sources() {
        let engine = initialized_engine();
        let handle = engine.config_create().response;
        let listing = engine.config_list_data_sources(handle).response;
        assert!(listing.contains("\"DSRC_CODE\":\"TEST\""));
        assert!(listing.contains("\"DSRC_CODE\":\"SEARCH\""));
    }

    #[test]
    fn test_add_duplicate_returns_existing_id() {
        let engine = initialized_engine();
        let handle = engine.config_create().response;
        let first = engine.config_add_data_source(handle, r#"{"DSRC_CODE": "CUSTOMERS"}"#);
        assert_eq!(first.return_code, NO_ERROR);
        let second = engine.config_add_data_source(handle, r#"{"DSRC_CODE": "CUSTOMERS"}"#);
        assert_eq!(second.return_code, NO_ERROR);
        assert_eq!(first.response, second.response);
    }

    #[test]
    fn test_add_rejects_empty_and_control_codes() {
        let engine = initialized_engine();
        let handle = engine.config_create().response;
        let empty = engine.config_add_data_source(handle, r#"{"DSRC_CODE": ""}"#);
        assert_ne!(empty.return_code, NO_ERROR);
        assert_eq!(engine.get_last_exception_code(), EX_BAD_DATA_SOURCE_CODE);
        engine.clear_last_exception();

        let control = engine.config_add_data_source(handle, "{\"DSRC_CODE\": \"BAD\\nCODE\"}");
        assert_ne!(control.return_code, NO_ERROR);
        engine.clear_last_exception();
    }

    #[test]
    fn test_delete_absent_code_is_no_op_success() {
        let engine = initialized_engine();
        let handle = engine.config_create().response;
        assert_eq!(
            engine.config_delete_data_source(handle, r#"{"DSRC_CODE": "NOT_THERE"}"#),
            NO_ERROR
        );
    }

    #[test]
    fn test_closed_handle_is_invalid() {
        let engine = initialized_engine();
        let handle = engine.config_create().response;
        assert_eq!(engine.config_close(handle), NO_ERROR);
        assert_ne!(engine.config_close(handle), NO_ERROR);
        assert_eq!(engine.get_last_exception_code(), EX_INVALID_HANDLE);
        engine.clear_last_exception();
        assert_ne!(engine.config_save(handle).return_code, NO_ERROR);
        engine.clear_last_exception();
    }

    #[test]
    fn test_registry_round_trip_and_default() {
        let engine = initialized_engine();
        let definition = r#"{"G2_CONFIG":{"CFG_DSRC":[]}}"#;
        let added = engine.config_mgr_add_config(definition, "first");
        assert_eq!(added.return_code, NO_ERROR);
        let config_id = added.response;

        assert_eq!(engine.config_mgr_get_config(config_id).response, definition);
        assert_eq!(engine.config_mgr_get_default_config_id().response, 0);
        assert_eq!(engine.config_mgr_set_default_config_id(config_id), NO_ERROR);
        assert_eq!(engine.config_mgr_get_default_config_id().response, config_id);

        let listing = engine.config_mgr_get_config_list().response;
        assert!(listing.contains("\"CONFIG_COMMENTS\":\"first\""));
    }

    #[test]
    fn test_registry_rejects_malformed_document() {
        let engine = initialized_engine();
        let before = engine.config_mgr_get_config_list().response;
        let result = engine.config_mgr_add_config("}{", "broken");
        assert_ne!(result.return_code, NO_ERROR);
        assert_eq!(engine.get_last_exception_code(), EX_MALFORMED_DOCUMENT);
        engine.clear_last_exception();
        assert_eq!(engine.config_mgr_get_config_list().response, before);
    }

    #[test]
    fn test_replace_default_is_compare_and_swap() {
        let engine = initialized_engine();
        let definition = r#"{"G2_CONFIG":{"CFG_DSRC":[]}}"#;
        let first = engine.config_mgr_add_config(definition, "a").response;
        let second = engine.config_mgr_add_config(definition, "b").response;
        assert_eq!(engine.config_mgr_set_default_config_id(first), NO_ERROR);

        assert_eq!(
            engine.config_mgr_replace_default_config_id(first, second),
            NO_ERROR
        );
        assert_eq!(engine.config_mgr_get_default_config_id().response, second);

        // Stale "current" loses without mutating state.
        assert_ne!(
            engine.config_mgr_replace_default_config_id(first, second),
            NO_ERROR
        );
        assert_eq!(engine.get_last_exception_code(), EX_REPLACE_CONFLICT);
        engine.clear_last_exception();
        assert_eq!(engine.config_mgr_get_default_config_id().response, second);
    }

    #[test]
    fn test_engine_active_config_follows_init_and_reinit() {
        let engine = initialized_engine();
        let definition = r#"{"G2_CONFIG":{"CFG_DSRC":[]}}"#;
        let first = engine.config_mgr_add_config(definition, "a").response;
        let second = engine.config_mgr_add_config(definition, "b").response;
        assert_eq!(engine.config_mgr_set_default_config_id(first), NO_ERROR);

        // Zero means "use the current default".
        assert_eq!(engine.engine_init("test", SETTINGS, 0, 0), NO_ERROR);
        assert_eq!(engine.engine_get_active_config_id().response, first);

        assert_eq!(engine.engine_reinit(second), NO_ERROR);
        assert_eq!(engine.engine_get_active_config_id().response, second);

        assert_ne!(engine.engine_reinit(9999), NO_ERROR);
        engine.clear_last_exception();
        assert_eq!(engine.engine_get_active_config_id().response, second);
    }
}
