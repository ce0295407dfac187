mod client;
mod relay;

use std::collections::HashMap;
use std::time::Duration;

use client::HaHttpClient;
pub use relay::HaRelays;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Deserialize, Clone)]
pub struct HomeAssistant {
    pub url: String,
    pub token: String,
    #[serde(default = "default_relay_keyword")]
    pub relay_keyword: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_relay_keyword() -> String {
    "breaker".to_owned()
}

fn default_timeout_secs() -> u64 {
    10
}

impl HomeAssistant {
    pub fn new_relays(&self) -> anyhow::Result<HaRelays> {
        let client = HaHttpClient::new(&self.url, &self.token, Duration::from_secs(self.timeout_secs))?;

        if self.dry_run {
            tracing::warn!("Home Assistant relay control in dry-run mode, relay states are only logged");
        }

        Ok(HaRelays::new(client, &self.relay_keyword, self.dry_run))
    }
}

#[derive(Deserialize, Debug)]
pub struct EntityState {
    pub entity_id: String,
    pub state: StateValue,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl EntityState {
    fn friendly_name(&self) -> Option<&str> {
        self.attributes.get("friendly_name").and_then(Value::as_str)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum StateValue {
    Available(String),
    Unavailable,
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.as_str() {
            "unavailable" | "unknown" => Ok(StateValue::Unavailable),
            _ => Ok(StateValue::Available(value)),
        }
    }
}
