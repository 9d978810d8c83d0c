//! Error types for the boundary compiler and the dispatch runtime.
//!
//! Build-time failures are recoverable by design: a malformed or
//! unresolvable module contributes no export names and the build continues.
//! Run-time failures are the outcome of a single dispatched call and carry
//! deliberately generic messages.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// BUILD-TIME ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const PARSE_ERROR: &str = "PARSE_ERROR";
pub const UNRESOLVED_REEXPORT: &str = "UNRESOLVED_REEXPORT";
pub const CYCLIC_REEXPORT: &str = "CYCLIC_REEXPORT";
pub const INVALID_RESOURCE_PATH: &str = "INVALID_RESOURCE_PATH";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        PARSE_ERROR => {
            "A module that fails to parse contributes no export names and is passed through unchanged."
        }
        UNRESOLVED_REEXPORT => {
            "An unresolvable re-export target contributes no export names; sibling branches continue."
        }
        CYCLIC_REEXPORT => "Re-export cycles terminate; a revisited module contributes no names.",
        INVALID_RESOURCE_PATH => {
            "Every boundary module carries a canonical file URL identifier or is left untransformed."
        }
        _ => "Unknown error code.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUN-TIME ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolution failures surfaced to the caller of a dispatched call. Messages
/// stay generic: the attempted identifier is never echoed back, so a typo, a
/// stale manifest, and a forgery attempt are indistinguishable from outside.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Module not found")]
    ModuleNotFound,
    #[error("Invalid action")]
    InvalidAction,
}

/// A failure produced by the invoked function itself, either synchronously
/// or from its deferred completion. Captured into the call outcome rather
/// than thrown at the dispatch caller.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{message}")]
pub struct InvokeError {
    pub message: String,
}

impl InvokeError {
    pub fn new(message: impl Into<String>) -> Self {
        InvokeError {
            message: message.into(),
        }
    }
}

/// Message shared by the generated client stub and the origin-side
/// placeholder: both name the export and its owning module.
pub fn client_stub_message(module_id: &str, export_name: &str) -> String {
    if export_name == "default" {
        format!(
            "Attempted to call the default export of {} from the server but it's on the client. \
             It's not possible to invoke a client function from the server, it can only be \
             rendered or passed to client-rendered content.",
            module_id
        )
    } else {
        format!(
            "Attempted to call {}() from the server but {} is on the client. It's not possible \
             to invoke a client function from the server, it can only be rendered or passed to \
             client-rendered content.",
            export_name, export_name
        )
    }
}

/// A client-boundary placeholder was invoked in the origin process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DirectInvocationForbidden {
    pub module_id: String,
    pub export_name: String,
    message: String,
}

impl DirectInvocationForbidden {
    pub fn new(module_id: &str, export_name: &str) -> Self {
        DirectInvocationForbidden {
            message: client_stub_message(module_id, export_name),
            module_id: module_id.to_string(),
            export_name: export_name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_errors_are_generic() {
        assert_eq!(DispatchError::ModuleNotFound.to_string(), "Module not found");
        assert_eq!(DispatchError::InvalidAction.to_string(), "Invalid action");
    }

    #[test]
    fn test_direct_invocation_message_names_export_and_module() {
        let err = DirectInvocationForbidden::new("file:///app/button.js", "Button");
        assert!(err.to_string().contains("Button()"));
        assert!(err.to_string().contains("on the client"));

        let err = DirectInvocationForbidden::new("file:///app/button.js", "default");
        assert!(err.to_string().contains("the default export of file:///app/button.js"));
    }

    #[test]
    fn test_compiler_error_carries_guarantee() {
        let err = CompilerError::new(PARSE_ERROR, "unexpected token", "a.js", 0, 0);
        assert_eq!(err.code, PARSE_ERROR);
        assert!(err.guarantee.contains("contributes no export names"));
    }
}
