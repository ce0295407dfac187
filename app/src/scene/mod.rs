pub mod adapter;
mod domain;
mod service;

use std::path::PathBuf;
use std::sync::Arc;

pub use domain::*;
use serde::Deserialize;

use crate::port::{RelayController, RelayDirectory};
use crate::scene::{adapter::file::SceneRepository, service::SceneService};

#[derive(Debug, Deserialize, Clone)]
pub struct SceneSettings {
    pub storage_path: PathBuf,
}

impl SceneSettings {
    pub fn new_client<R>(&self, relays: R) -> SceneClient<R> {
        SceneClient::new(SceneRepository::new(&self.storage_path), relays)
    }
}

/// Handle to the one scene service instance, shared by all request handlers.
pub struct SceneClient<R> {
    service: Arc<SceneService<R>>,
}

impl<R> Clone for SceneClient<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<R> SceneClient<R> {
    pub fn new(repo: SceneRepository, relays: R) -> Self {
        Self {
            service: Arc::new(SceneService::new(repo, relays)),
        }
    }

    pub fn list_scenes(&self) -> Vec<SceneSummary> {
        self.service.list_scenes()
    }

    pub async fn create_scene(&self, name: &str, relay_states: RelayStates) -> Result<SceneId, SceneError> {
        self.service.create_scene(name, relay_states).await
    }

    pub async fn update_scene(
        &self,
        scene_id: &SceneId,
        name: Option<&str>,
        relay_states: Option<RelayStates>,
    ) -> Result<(), SceneError> {
        self.service.update_scene(scene_id, name, relay_states).await
    }

    pub async fn delete_scene(&self, scene_id: &SceneId) -> Result<(), SceneError> {
        self.service.delete_scene(scene_id).await
    }

    pub async fn replace_all(&self, drafts: Vec<SceneDraft>) -> Result<usize, SceneError> {
        self.service.replace_all(drafts).await
    }
}

impl<R> SceneClient<R>
where
    R: RelayDirectory + RelayController,
{
    pub async fn get_breakers(&self, scene_id: &SceneId) -> Result<RelayStates, SceneError> {
        self.service.get_breakers(scene_id).await
    }

    pub async fn activate_scene(&self, scene_id: &SceneId) -> Result<usize, SceneError> {
        self.service.activate_scene(scene_id).await
    }
}
