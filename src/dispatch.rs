//! Boundary-crossing dispatch.
//!
//! Takes a reference identifier delivered over the network plus the decoded
//! argument list, resolves it through the registry, and invokes it. The
//! capability check is the sole gate between attacker-controlled input and
//! in-process functions; it is unconditional.

use serde_json::Value;

use crate::errors::{DispatchError, InvokeError};
use crate::manifest::split_reference_id;
use crate::registry::{ModuleExport, Registry};

/// Result of one dispatched call. `error` is the side channel carrying an
/// invocation or deferred-completion failure back across the boundary; a
/// completion failure leaves `value` intact.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub value: Option<Value>,
    pub error: Option<InvokeError>,
}

pub fn dispatch(
    registry: &Registry,
    reference_id: &str,
    args: Vec<Value>,
) -> Result<DispatchOutcome, DispatchError> {
    let (module_id, export_name) = split_reference_id(reference_id);

    if registry.manifest_entry(module_id).is_none() {
        return Err(DispatchError::ModuleNotFound);
    }

    // Reject anything that is not a tagged server reference: an absent
    // export, a plain value, or a client placeholder all look the same from
    // here.
    let action = match registry.resolve(module_id, export_name) {
        Some(ModuleExport::Server(reference)) => reference,
        _ => return Err(DispatchError::InvalidAction),
    };

    let invocation = match action.call(args) {
        Ok(invocation) => invocation,
        Err(error) => {
            return Ok(DispatchOutcome {
                value: None,
                error: Some(error),
            })
        }
    };

    let mut outcome = DispatchOutcome {
        value: Some(invocation.value),
        error: None,
    };

    if let Some(completion) = invocation.completion {
        if let Err(error) = completion() {
            log::warn!(
                "deferred completion of {} failed: {}",
                action.reference_id(),
                error
            );
            outcome.error = Some(error);
        }
    }

    Ok(outcome)
}
