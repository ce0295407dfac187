use serde::{Deserialize, Serialize};

use crate::scene::{RelayId, RelayStates, SceneDraft, SceneId, SceneSummary};

#[derive(Debug, Deserialize)]
pub struct CreateSceneRequest {
    pub name: String,
    #[serde(default)]
    pub relay_states: RelayStates,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSceneRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub relay_states: Option<RelayStates>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSceneCall {
    pub scene_id: SceneId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub relay_states: Option<RelayStates>,
}

#[derive(Debug, Deserialize)]
pub struct SceneIdRequest {
    pub scene_id: SceneId,
}

#[derive(Debug, Deserialize)]
pub struct SaveScenesRequest {
    pub scenes: Vec<SceneDraftDto>,
}

#[derive(Debug, Deserialize)]
pub struct SceneDraftDto {
    #[serde(default, alias = "id")]
    pub scene_id: Option<SceneId>,
    pub name: String,
    #[serde(default)]
    pub relay_states: RelayStates,
}

impl From<SceneDraftDto> for SceneDraft {
    fn from(dto: SceneDraftDto) -> Self {
        SceneDraft {
            scene_id: dto.scene_id,
            name: dto.name,
            relay_states: dto.relay_states,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

#[derive(Debug, Serialize)]
pub struct ScenesResponse {
    pub scenes: Vec<SceneSummary>,
}

#[derive(Debug, Serialize)]
pub struct SceneBreakersResponse {
    pub scene_id: SceneId,
    pub breakers: RelayStates,
}

#[derive(Debug, Serialize)]
pub struct SceneOkResponse {
    pub status: Status,
    pub scene_id: SceneId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<usize>,
}

impl SceneOkResponse {
    pub fn new(scene_id: SceneId) -> Self {
        Self {
            status: Status::Ok,
            scene_id,
            applied: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountOkResponse {
    pub status: Status,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_relays: Vec<RelayId>,
}
