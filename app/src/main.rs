use settings::Settings;

mod adapter;
pub mod port;
mod scene;
mod settings;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");

    settings.monitoring.init().expect("Error initializing monitoring");

    let relays = settings
        .homeassistant
        .new_relays()
        .expect("Error initializing Home Assistant relays");

    tracing::info!("Loading scenes from {}", settings.scenes.storage_path.display());
    let scene_client = settings.scenes.new_client(relays);

    let http_server_exec = {
        let http_scene_client = scene_client.clone();

        async move {
            settings
                .http_server
                .run_server(move || vec![adapter::api::new_routes(http_scene_client.clone())])
                .await
                .expect("HTTP server execution failed");
        }
    };

    tracing::info!("Starting main loop");

    tokio::select!(
        _ = http_server_exec => {},
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        },
    );
}
