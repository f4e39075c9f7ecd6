// src/cli/handlers/forward.rs

use anyhow::Result;

use crate::core::runner::Invocation;

/// Hands a host-backed command over to the booted host.
pub fn handle(inv: &Invocation<'_>) -> Result<()> {
    log::debug!("Forwarding '{}' to the host.", inv.path);
    inv.hand_to_host()
}
