use std::collections::BTreeSet;

use serde_json::json;

use super::{EntityState, HaHttpClient, StateValue};
use crate::port::{RelayController, RelayDirectory};
use crate::scene::RelayId;

const SWITCH_DOMAIN: &str = "switch.";

/// Breaker switches of the Savant controller as exposed by Home Assistant.
pub struct HaRelays {
    client: HaHttpClient,
    keyword: String,
    dry_run: bool,
}

impl HaRelays {
    pub fn new(client: HaHttpClient, keyword: &str, dry_run: bool) -> Self {
        Self {
            client,
            keyword: keyword.to_lowercase(),
            dry_run,
        }
    }
}

impl RelayDirectory for HaRelays {
    #[tracing::instrument(name = "relay_ids HA", skip(self))]
    async fn relay_ids(&self) -> anyhow::Result<BTreeSet<RelayId>> {
        let states = self.client.get_current_state().await?;
        let relays = breaker_switches(&states, &self.keyword);

        tracing::debug!("{} of {} HA entities are breaker switches", relays.len(), states.len());
        Ok(relays)
    }
}

impl RelayController for HaRelays {
    #[tracing::instrument(name = "set_relay HA", skip(self))]
    async fn set_relay(&self, relay: &RelayId, on: bool) -> anyhow::Result<()> {
        let service = switch_service(on);

        if self.dry_run {
            tracing::info!("Dry run, not calling switch.{} for {}", service, relay);
            return Ok(());
        }

        self.client
            .call_service(
                "switch",
                service,
                json!({
                    "entity_id": vec![relay.as_str()],
                }),
            )
            .await
    }
}

fn switch_service(on: bool) -> &'static str {
    if on { "turn_on" } else { "turn_off" }
}

/// Available switch entities whose id or friendly name contains the keyword.
fn breaker_switches(states: &[EntityState], keyword: &str) -> BTreeSet<RelayId> {
    states
        .iter()
        .filter(|state| state.entity_id.starts_with(SWITCH_DOMAIN))
        .filter(|state| matches!(state.state, StateValue::Available(_)))
        .filter(|state| {
            state.entity_id.to_lowercase().contains(keyword)
                || state
                    .friendly_name()
                    .is_some_and(|name| name.to_lowercase().contains(keyword))
        })
        .map(|state| RelayId::from(state.entity_id.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn keeps_available_breaker_switches_only() {
        let states: Vec<EntityState> = serde_json::from_value(json!([
            {"entity_id": "switch.kitchen_breaker", "state": "on", "attributes": {}},
            {"entity_id": "switch.pool_pump", "state": "off", "attributes": {"friendly_name": "Pool Pump Breaker"}},
            {"entity_id": "switch.garage_breaker", "state": "unavailable", "attributes": {}},
            {"entity_id": "switch.dryer_breaker", "state": "unknown"},
            {"entity_id": "switch.tv", "state": "on", "attributes": {"friendly_name": "TV"}},
            {"entity_id": "sensor.kitchen_breaker_power", "state": "120", "attributes": {}}
        ]))
        .unwrap();

        let relays = breaker_switches(&states, "breaker");

        assert_eq!(
            relays,
            ["switch.kitchen_breaker", "switch.pool_pump"]
                .into_iter()
                .map(RelayId::from)
                .collect()
        );
    }

    #[test]
    fn relay_state_maps_to_switch_service() {
        assert_eq!(switch_service(true), "turn_on");
        assert_eq!(switch_service(false), "turn_off");
    }

    #[tokio::test]
    async fn dry_run_does_not_call_home_assistant() {
        // nothing listens on the discard port, a real call would fail
        let client = HaHttpClient::new("http://127.0.0.1:9", "token", Duration::from_secs(1)).unwrap();
        let relays = HaRelays::new(client, "breaker", true);

        relays
            .set_relay(&RelayId::from("switch.kitchen_breaker"), true)
            .await
            .unwrap();
        relays
            .set_relay(&RelayId::from("switch.kitchen_breaker"), false)
            .await
            .unwrap();
    }

    #[test]
    fn keyword_matching_ignores_case() {
        let states: Vec<EntityState> = serde_json::from_value(json!([
            {"entity_id": "switch.Office_BREAKER", "state": "off"},
        ]))
        .unwrap();

        assert_eq!(breaker_switches(&states, "breaker").len(), 1);
    }
}
