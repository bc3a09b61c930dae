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

//! Error types for the Kindred SDK.
//!
//! Every failing native call is translated into exactly one [`SdkError`]
//! carrying a templated identifier (`KNSDK<component><callsite>`), the raw
//! native exception code, and the native exception reason. Outer layers may
//! add context (the factory wraps initialization failures with the factory
//! method name) but never downgrade or re-kind an error on the way up.

use thiserror::Error;

/// The error taxonomy surfaced to callers.
///
/// Which kind a native failure maps to is decided by the engine-defined
/// code-range table in [`crate::gateway::kind_for_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed caller-supplied identifiers or JSON fragments.
    BadInput,
    /// Unknown or invalid configuration id or configuration document.
    Configuration,
    /// A compare-and-swap of the default configuration id lost the race.
    ReplaceConflict,
    /// Transient native or datastore condition; the caller may retry.
    Retryable,
    /// The native library is unusable (e.g. a failed initialize).
    Unrecoverable,
    /// Catch-all for any other native failure.
    Generic,
}

/// Main error type for Kindred SDK operations.
#[derive(Error, Debug)]
pub enum SdkError {
    /// Malformed caller-supplied input.
    #[error("{id}: bad input ({code}): {reason}")]
    BadInput {
        /// Templated error identifier, `KNSDK<component><callsite>`.
        id: String,
        /// Raw native exception code (0 when raised without a native call).
        code: i64,
        /// Reason sourced from the native exception state.
        reason: String,
    },

    /// Unknown or invalid configuration id or configuration document.
    #[error("{id}: configuration error ({code}): {reason}")]
    Configuration { id: String, code: i64, reason: String },

    /// The default-configuration compare-and-swap lost the race; no state
    /// was changed.
    #[error("{id}: replace conflict ({code}): {reason}")]
    ReplaceConflict { id: String, code: i64, reason: String },

    /// Transient condition; retry policy is the caller's responsibility.
    #[error("{id}: retryable ({code}): {reason}")]
    Retryable { id: String, code: i64, reason: String },

    /// The native library is unusable.
    #[error("{id}: unrecoverable ({code}): {reason}")]
    Unrecoverable { id: String, code: i64, reason: String },

    /// Any other native failure.
    #[error("{id}: native error ({code}): {reason}")]
    Generic { id: String, code: i64, reason: String },

    /// A component's initialization failed inside a factory method. The
    /// wrapped error keeps its original kind.
    #[error("{method} error: {source}")]
    Initialize {
        /// The factory method that was executing, e.g.
        /// `"AbstractFactory::create_engine"`.
        method: String,
        #[source]
        source: Box<SdkError>,
    },
}

impl SdkError {
    /// Build an error from translated native exception state.
    pub fn from_native(kind: ErrorKind, id: String, code: i64, reason: String) -> Self {
        match kind {
            ErrorKind::BadInput => SdkError::BadInput { id, code, reason },
            ErrorKind::Configuration => SdkError::Configuration { id, code, reason },
            ErrorKind::ReplaceConflict => SdkError::ReplaceConflict { id, code, reason },
            ErrorKind::Retryable => SdkError::Retryable { id, code, reason },
            ErrorKind::Unrecoverable => SdkError::Unrecoverable { id, code, reason },
            ErrorKind::Generic => SdkError::Generic { id, code, reason },
        }
    }

    /// A bad-input error raised by the binding layer itself, before any
    /// native call was made (e.g. a closed configuration handle).
    pub fn bad_input(id: impl Into<String>, reason: impl Into<String>) -> Self {
        SdkError::BadInput {
            id: id.into(),
            code: 0,
            reason: reason.into(),
        }
    }

    /// Wrap a component initialization failure with the factory method name.
    pub fn initialize(method: impl Into<String>, source: SdkError) -> Self {
        SdkError::Initialize {
            method: method.into(),
            source: Box::new(source),
        }
    }

    /// The kind of this error. `Initialize` reports the wrapped error's
    /// kind, since wrapping adds context without re-kinding.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SdkError::BadInput { .. } => ErrorKind::BadInput,
            SdkError::Configuration { .. } => ErrorKind::Configuration,
            SdkError::ReplaceConflict { .. } => ErrorKind::ReplaceConflict,
            SdkError::Retryable { .. } => ErrorKind::Retryable,
            SdkError::Unrecoverable { .. } => ErrorKind::Unrecoverable,
            SdkError::Generic { .. } => ErrorKind::Generic,
            SdkError::Initialize { source, .. } => source.kind(),
        }
    }

    /// The raw native exception code, if this error carries one.
    pub fn native_code(&self) -> Option<i64> {
        match self {
            SdkError::BadInput { code, .. }
            | SdkError::Configuration { code, .. }
            | SdkError::ReplaceConflict { code, .. }
            | SdkError::Retryable { code, .. }
            | SdkError::Unrecoverable { code, .. }
            | SdkError::Generic { code, .. } => Some(*code),
            SdkError::Initialize { source, .. } => source.native_code(),
        }
    }
}

/// Result type for Kindred SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_input_display() {
        let err = SdkError::bad_input("KNSDK60014002", "configuration handle is not open");
        assert_eq!(
            err.to_string(),
            "KNSDK60014002: bad input (0): configuration handle is not open"
        );
    }

    #[test]
    fn test_from_native_maps_every_kind() {
        let kinds = [
            ErrorKind::BadInput,
            ErrorKind::Configuration,
            ErrorKind::ReplaceConflict,
            ErrorKind::Retryable,
            ErrorKind::Unrecoverable,
            ErrorKind::Generic,
        ];
        for kind in kinds {
            let err = SdkError::from_native(kind, "KNSDK60024007".to_string(), 7245, "x".to_string());
            assert_eq!(err.kind(), kind);
            assert_eq!(err.native_code(), Some(7245));
        }
    }

    #[test]
    fn test_initialize_wraps_without_rekinding() {
        let inner = SdkError::from_native(
            ErrorKind::Unrecoverable,
            "KNSDK60044003".to_string(),
            9001,
            "engine is not initialized".to_string(),
        );
        let err = SdkError::initialize("AbstractFactory::create_engine", inner);
        assert_eq!(err.kind(), ErrorKind::Unrecoverable);
        assert_eq!(err.native_code(), Some(9001));
        let display = err.to_string();
        assert!(display.starts_with("AbstractFactory::create_engine error:"));
        assert!(display.contains("engine is not initialized"));
    }

    #[test]
    fn test_replace_conflict_pattern_matching() {
        let err = SdkError::from_native(
            ErrorKind::ReplaceConflict,
            "KNSDK60024007".to_string(),
            7245,
            "current default configuration changed".to_string(),
        );
        match err {
            SdkError::ReplaceConflict { code, .. } => assert_eq!(code, 7245),
            _ => panic!("Expected ReplaceConflict variant"),
        }
    }
}
