use actix_web::web;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::dto::{CreateSceneRequest, SaveScenesRequest, SceneIdRequest, UpdateSceneCall, UpdateSceneRequest};
use super::{ApiError, ApiResponse};
use crate::port::{RelayController, RelayDirectory};
use crate::scene::SceneClient;

/// Named service operation as invoked over the RPC surface, with its payload.
#[derive(Debug)]
pub enum ServiceCall {
    CreateScene(CreateSceneRequest),
    UpdateScene(UpdateSceneCall),
    DeleteScene(SceneIdRequest),
    SaveScenes(SaveScenesRequest),
    GetScenes,
    GetSceneBreakers(SceneIdRequest),
    ActivateScene(SceneIdRequest),
}

impl ServiceCall {
    pub fn parse(service: &str, data: Value) -> Result<Self, ApiError> {
        match service {
            "create_scene" => Ok(ServiceCall::CreateScene(payload(data)?)),
            "update_scene" => Ok(ServiceCall::UpdateScene(payload(data)?)),
            "delete_scene" => Ok(ServiceCall::DeleteScene(payload(data)?)),
            "save_scenes" => Ok(ServiceCall::SaveScenes(payload(data)?)),
            "get_scenes" => Ok(ServiceCall::GetScenes),
            "get_scene_breakers" => Ok(ServiceCall::GetSceneBreakers(payload(data)?)),
            "activate_scene" => Ok(ServiceCall::ActivateScene(payload(data)?)),
            other => Err(ApiError::UnknownService(other.to_owned())),
        }
    }
}

fn payload<T: DeserializeOwned>(data: Value) -> Result<T, ApiError> {
    serde_json::from_value(data).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

pub async fn handle<R>(client: web::Data<SceneClient<R>>, service: web::Path<String>, body: web::Bytes) -> ApiResponse
where
    R: RelayDirectory + RelayController + 'static,
{
    let data = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?
    };

    let call = ServiceCall::parse(&service, data)?;
    tracing::debug!("Dispatching service call {:?}", call);

    dispatch(&client, call).await
}

async fn dispatch<R>(client: &SceneClient<R>, call: ServiceCall) -> ApiResponse
where
    R: RelayDirectory + RelayController,
{
    match call {
        ServiceCall::CreateScene(request) => super::create_scene(client, request).await,
        ServiceCall::UpdateScene(call) => {
            let request = UpdateSceneRequest {
                name: call.name,
                relay_states: call.relay_states,
            };
            super::update_scene(client, call.scene_id, request).await
        }
        ServiceCall::DeleteScene(request) => super::delete_scene(client, request.scene_id).await,
        ServiceCall::SaveScenes(request) => super::save_scenes(client, request).await,
        ServiceCall::GetScenes => super::get_scenes(client),
        ServiceCall::GetSceneBreakers(request) => super::get_scene_breakers(client, request.scene_id).await,
        ServiceCall::ActivateScene(request) => super::activate_scene(client, request.scene_id).await,
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test as actix_test};
    use assert_json_diff::assert_json_eq;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::adapter::api::new_routes;
    use crate::port::fake::FakeRelays;
    use crate::scene::adapter::file::SceneRepository;

    macro_rules! call {
        ($app:expr, $service:expr, $body:expr) => {{
            let req = actix_test::TestRequest::post()
                .uri(&format!("/api/savant_energy/services/{}", $service))
                .set_json($body)
                .to_request();
            let resp = actix_test::call_service(&$app, req).await;
            let status = resp.status();
            let body: Value = actix_test::read_body_json(resp).await;
            (status, body)
        }};
    }

    #[test]
    fn parses_known_services() {
        assert!(matches!(
            ServiceCall::parse("get_scenes", json!({})),
            Ok(ServiceCall::GetScenes)
        ));
        assert!(matches!(
            ServiceCall::parse("delete_scene", json!({"scene_id": "savant_party"})),
            Ok(ServiceCall::DeleteScene(SceneIdRequest { scene_id })) if scene_id.as_str() == "savant_party"
        ));
    }

    #[test]
    fn rejects_unknown_service_and_missing_fields() {
        assert!(matches!(
            ServiceCall::parse("reboot", json!({})),
            Err(ApiError::UnknownService(name)) if name == "reboot"
        ));
        assert!(matches!(
            ServiceCall::parse("get_scene_breakers", json!({})),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[actix_web::test]
    async fn services_cover_scene_lifecycle() {
        let dir = tempdir().unwrap();
        let client = SceneClient::new(
            SceneRepository::new(dir.path().join("scenes.json")),
            FakeRelays::with_live(&["switch.a", "switch.b"]),
        );
        let app = actix_test::init_service(App::new().service(new_routes(client))).await;

        let (status, body) = call!(
            app,
            "create_scene",
            json!({"name": "Party", "relay_states": {"switch.a": true}})
        );
        assert_eq!(status, StatusCode::OK);
        assert_json_eq!(body, json!({"status": "ok", "scene_id": "savant_party"}));

        let (status, _) = call!(
            app,
            "update_scene",
            json!({"scene_id": "savant_party", "relay_states": {"switch.b": true}})
        );
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call!(app, "get_scene_breakers", json!({"scene_id": "savant_party"}));
        assert_json_eq!(
            body,
            json!({"scene_id": "savant_party", "breakers": {"switch.a": true, "switch.b": true}})
        );

        let (_, body) = call!(app, "get_scenes", json!({}));
        assert_json_eq!(body, json!({"scenes": [{"scene_id": "savant_party", "name": "Party"}]}));

        let (status, _) = call!(app, "delete_scene", json!({"scene_id": "savant_party"}));
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call!(app, "get_scene_breakers", json!({"scene_id": "savant_party"}));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
    }

    #[actix_web::test]
    async fn save_scenes_replaces_everything() {
        let dir = tempdir().unwrap();
        let client = SceneClient::new(
            SceneRepository::new(dir.path().join("scenes.json")),
            FakeRelays::default(),
        );
        let app = actix_test::init_service(App::new().service(new_routes(client))).await;

        call!(app, "create_scene", json!({"name": "Old"}));
        let (status, body) = call!(
            app,
            "save_scenes",
            json!({"scenes": [
                {"scene_id": "savant_evening", "name": "Evening", "relay_states": {"r1": true}},
                {"name": "Away"}
            ]})
        );
        assert_eq!(status, StatusCode::OK);
        assert_json_eq!(body, json!({"status": "ok", "count": 2}));

        let (_, body) = call!(app, "get_scenes", json!({}));
        assert_json_eq!(
            body,
            json!({"scenes": [
                {"scene_id": "savant_away", "name": "Away"},
                {"scene_id": "savant_evening", "name": "Evening"}
            ]})
        );
    }

    #[actix_web::test]
    async fn get_scenes_accepts_empty_body() {
        let dir = tempdir().unwrap();
        let client = SceneClient::new(
            SceneRepository::new(dir.path().join("scenes.json")),
            FakeRelays::default(),
        );
        let app = actix_test::init_service(App::new().service(new_routes(client))).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/savant_energy/services/get_scenes")
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_json_eq!(body, json!({"scenes": []}));
    }

    #[actix_web::test]
    async fn unknown_service_gets_error_envelope() {
        let dir = tempdir().unwrap();
        let client = SceneClient::new(
            SceneRepository::new(dir.path().join("scenes.json")),
            FakeRelays::default(),
        );
        let app = actix_test::init_service(App::new().service(new_routes(client))).await;

        let (status, body) = call!(app, "reboot", json!({}));

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "invalid_request");
    }
}
