//! Usage-contract violations.
//!
//! A presentation component reaching for overlay context while no overlay is
//! mounted is a wiring bug in the host, not bad data, so it halts.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{component} must be used within an active ErrorOverlay")]
pub struct ContractViolation {
    pub component: &'static str,
}

/// Log and panic for `component`.
#[track_caller]
pub fn violation(component: &'static str) -> ! {
    let err = ContractViolation { component };
    log::error!(target: "contract", "{}", err);
    panic!("{err}");
}
