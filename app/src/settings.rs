use config::{Config, ConfigError, Environment, File};
use infrastructure::{HttpServerConfig, MonitoringConfig};
use serde::Deserialize;

use crate::adapter::homeassistant::HomeAssistant;
use crate::scene::SceneSettings;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http_server: HttpServerConfig,
    pub monitoring: MonitoringConfig,
    pub homeassistant: HomeAssistant,
    pub scenes: SceneSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config.toml"))
            .add_source(Environment::with_prefix("SAVANT").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    const MINIMAL: &str = r#"
        [http_server]
        port = 8080

        [monitoring]
        service_name = "savant-scenes"
        app_name = "savant"
        logs = { default_level = "info" }
        traces = { default_level = "warn", filters = ["savant_scenes=debug"] }

        [homeassistant]
        url = "http://homeassistant.local:8123"
        token = "secret"

        [scenes]
        storage_path = "/var/lib/savant/scenes.json"
    "#;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(MINIMAL, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.http_server.port, 8080);
        assert_eq!(settings.http_server.bind_address, "0.0.0.0");
        assert_eq!(settings.homeassistant.relay_keyword, "breaker");
        assert!(!settings.homeassistant.dry_run);
        assert!(settings.monitoring.otlp.is_none());
        assert_eq!(
            settings.scenes.storage_path,
            std::path::PathBuf::from("/var/lib/savant/scenes.json")
        );
    }

    #[test]
    fn missing_storage_path_is_rejected() {
        let without_scenes = MINIMAL.replace("[scenes]", "[other]");

        let result = Config::builder()
            .add_source(File::from_str(&without_scenes, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize::<Settings>();

        assert!(result.is_err());
    }
}
