mod dto;
mod rest;
mod service_call;

use actix_web::{
    HttpResponse, ResponseError,
    http::StatusCode,
    web::{self},
};
use derive_more::derive::{Display, From};

use crate::port::{RelayController, RelayDirectory};
use crate::scene::{SceneClient, SceneError, SceneId};
use dto::*;

pub fn new_routes<R>(client: SceneClient<R>) -> actix_web::Scope
where
    R: RelayDirectory + RelayController + 'static,
{
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::InvalidRequest(err.to_string()).into());

    web::scope("/api/savant_energy")
        .app_data(web::Data::new(client))
        .app_data(json_config)
        .route("/scenes", web::get().to(rest::list_scenes::<R>))
        .route("/scenes", web::post().to(rest::create_scene::<R>))
        .route("/scenes/{scene_id}", web::post().to(rest::update_scene::<R>))
        .route("/scenes/{scene_id}", web::delete().to(rest::delete_scene::<R>))
        .route("/scenes/{scene_id}/activate", web::post().to(rest::activate_scene::<R>))
        .route("/scene_breakers/{scene_id}", web::get().to(rest::get_scene_breakers::<R>))
        .route("/services/{service}", web::post().to(service_call::handle::<R>))
}

pub type ApiResponse = Result<HttpResponse, ApiError>;

#[derive(Debug, Display, From)]
pub enum ApiError {
    #[display("{_0}")]
    #[from]
    Scene(SceneError),

    #[display("Invalid request: {_0}")]
    InvalidRequest(String),

    #[display("Unknown service '{_0}'")]
    UnknownService(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Scene(SceneError::InvalidArgument(_)) => "invalid_argument",
            ApiError::Scene(SceneError::DuplicateName(_)) => "scene_exists",
            ApiError::Scene(SceneError::NotFound(_)) => "scene_not_found",
            ApiError::Scene(SceneError::PartialActivationFailure { .. }) => "activation_failed",
            ApiError::Scene(SceneError::RelayDirectory(_)) => "relays_unavailable",
            ApiError::Scene(SceneError::StorageCorrupt(_) | SceneError::Storage(_)) => "storage_error",
            ApiError::InvalidRequest(_) | ApiError::UnknownService(_) => "invalid_request",
        }
    }

    fn envelope(&self) -> ErrorEnvelope {
        let failed_relays = match self {
            ApiError::Scene(SceneError::PartialActivationFailure { failed, .. }) => {
                failed.iter().map(|f| f.relay_id.clone()).collect()
            }
            _ => vec![],
        };

        ErrorEnvelope {
            status: Status::Error,
            message: self.to_string(),
            error: Some(self.code()),
            failed_relays,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Scene(e) => match e {
                SceneError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                SceneError::DuplicateName(_) => StatusCode::CONFLICT,
                SceneError::NotFound(_) => StatusCode::NOT_FOUND,
                SceneError::PartialActivationFailure { .. } | SceneError::RelayDirectory(_) => StatusCode::BAD_GATEWAY,
                SceneError::StorageCorrupt(_) | SceneError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidRequest(_) | ApiError::UnknownService(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Scene API error: {:?}", self);
        } else {
            tracing::warn!("Scene API request rejected: {}", self);
        }

        if let ApiError::Scene(SceneError::PartialActivationFailure { failed, .. }) = self {
            for failure in failed {
                tracing::warn!("Relay {} failed: {}", failure.relay_id, failure.reason);
            }
        }

        HttpResponse::build(status).json(self.envelope())
    }
}

fn get_scenes<R>(client: &SceneClient<R>) -> ApiResponse {
    Ok(HttpResponse::Ok().json(ScenesResponse {
        scenes: client.list_scenes(),
    }))
}

async fn get_scene_breakers<R>(client: &SceneClient<R>, scene_id: SceneId) -> ApiResponse
where
    R: RelayDirectory + RelayController,
{
    let breakers = client.get_breakers(&scene_id).await?;
    Ok(HttpResponse::Ok().json(SceneBreakersResponse { scene_id, breakers }))
}

async fn create_scene<R>(client: &SceneClient<R>, request: CreateSceneRequest) -> ApiResponse {
    let scene_id = client.create_scene(&request.name, request.relay_states).await?;
    Ok(HttpResponse::Ok().json(SceneOkResponse::new(scene_id)))
}

async fn update_scene<R>(client: &SceneClient<R>, scene_id: SceneId, request: UpdateSceneRequest) -> ApiResponse {
    client
        .update_scene(&scene_id, request.name.as_deref(), request.relay_states)
        .await?;
    Ok(HttpResponse::Ok().json(SceneOkResponse::new(scene_id)))
}

async fn delete_scene<R>(client: &SceneClient<R>, scene_id: SceneId) -> ApiResponse {
    client.delete_scene(&scene_id).await?;
    Ok(HttpResponse::Ok().json(SceneOkResponse::new(scene_id)))
}

async fn save_scenes<R>(client: &SceneClient<R>, request: SaveScenesRequest) -> ApiResponse {
    let drafts = request.scenes.into_iter().map(Into::into).collect();
    let count = client.replace_all(drafts).await?;
    Ok(HttpResponse::Ok().json(CountOkResponse {
        status: Status::Ok,
        count,
    }))
}

async fn activate_scene<R>(client: &SceneClient<R>, scene_id: SceneId) -> ApiResponse
where
    R: RelayDirectory + RelayController,
{
    let applied = client.activate_scene(&scene_id).await?;
    Ok(HttpResponse::Ok().json(SceneOkResponse {
        applied: Some(applied),
        ..SceneOkResponse::new(scene_id)
    }))
}
