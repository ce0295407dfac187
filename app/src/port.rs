#![allow(async_fn_in_trait)]

use std::collections::BTreeSet;

use anyhow::Result;

use crate::scene::RelayId;

/// Relays currently known to and switchable by the host system.
pub trait RelayDirectory {
    async fn relay_ids(&self) -> Result<BTreeSet<RelayId>>;
}

/// Applies a single relay state to the hardware.
pub trait RelayController {
    async fn set_relay(&self, relay: &RelayId, on: bool) -> Result<()>;
}
