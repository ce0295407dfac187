use actix_web::web;

use super::ApiResponse;
use super::dto::{CreateSceneRequest, UpdateSceneRequest};
use crate::port::{RelayController, RelayDirectory};
use crate::scene::{SceneClient, SceneId};

pub async fn list_scenes<R>(client: web::Data<SceneClient<R>>) -> ApiResponse
where
    R: 'static,
{
    super::get_scenes(&client)
}

pub async fn create_scene<R>(
    client: web::Data<SceneClient<R>>,
    request: web::Json<CreateSceneRequest>,
) -> ApiResponse
where
    R: 'static,
{
    super::create_scene(&client, request.into_inner()).await
}

pub async fn update_scene<R>(
    client: web::Data<SceneClient<R>>,
    path: web::Path<SceneId>,
    request: web::Json<UpdateSceneRequest>,
) -> ApiResponse
where
    R: 'static,
{
    super::update_scene(&client, path.into_inner(), request.into_inner()).await
}

pub async fn delete_scene<R>(client: web::Data<SceneClient<R>>, path: web::Path<SceneId>) -> ApiResponse
where
    R: 'static,
{
    super::delete_scene(&client, path.into_inner()).await
}

pub async fn activate_scene<R>(client: web::Data<SceneClient<R>>, path: web::Path<SceneId>) -> ApiResponse
where
    R: RelayDirectory + RelayController + 'static,
{
    super::activate_scene(&client, path.into_inner()).await
}

pub async fn get_scene_breakers<R>(client: web::Data<SceneClient<R>>, path: web::Path<SceneId>) -> ApiResponse
where
    R: RelayDirectory + RelayController + 'static,
{
    super::get_scene_breakers(&client, path.into_inner()).await
}
