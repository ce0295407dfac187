use std::collections::{BTreeMap, BTreeSet};

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

pub const SCENE_ID_PREFIX: &str = "savant_";
const SLUG_SEPARATOR: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_namespaced(&self) -> bool {
        self.0.starts_with(SCENE_ID_PREFIX) && self.0.len() > SCENE_ID_PREFIX.len()
    }

    fn with_suffix(&self, n: usize) -> Self {
        Self(format!("{}{}{}", self.0, SLUG_SEPARATOR, n))
    }
}

impl From<&str> for SceneId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Entity id of a breaker switch, e.g. `switch.kitchen_breaker`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct RelayId(String);

impl RelayId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RelayId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Desired on/off state per relay. Relays not contained are presented as off.
pub type RelayStates = BTreeMap<RelayId, bool>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default)]
    pub relay_states: RelayStates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneSummary {
    pub scene_id: SceneId,
    pub name: String,
}

/// Scene to be written by a bulk overwrite. Without an id, or with an id outside
/// the `savant_` namespace, the id is derived from the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneDraft {
    pub scene_id: Option<SceneId>,
    pub name: String,
    pub relay_states: RelayStates,
}

/// Everything that is persisted: the live scenes and every id that was ever
/// deleted, so that ids are never handed out twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneCatalog {
    #[serde(default)]
    pub scenes: BTreeMap<SceneId, Scene>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub retired_ids: BTreeSet<SceneId>,
}

impl SceneCatalog {
    pub fn summaries(&self) -> Vec<SceneSummary> {
        self.scenes
            .iter()
            .map(|(scene_id, scene)| SceneSummary {
                scene_id: scene_id.clone(),
                name: scene.name.clone(),
            })
            .collect()
    }

    pub fn get(&self, scene_id: &SceneId) -> Result<&Scene, SceneError> {
        self.scenes
            .get(scene_id)
            .ok_or_else(|| SceneError::NotFound(scene_id.clone()))
    }

    fn get_mut(&mut self, scene_id: &SceneId) -> Result<&mut Scene, SceneError> {
        self.scenes
            .get_mut(scene_id)
            .ok_or_else(|| SceneError::NotFound(scene_id.clone()))
    }

    fn ensure_name_available(&self, name: &str, except: Option<&SceneId>) -> Result<(), SceneError> {
        let taken = self
            .scenes
            .iter()
            .filter(|(id, _)| Some(*id) != except)
            .any(|(_, scene)| same_name(&scene.name, name));

        if taken {
            Err(SceneError::DuplicateName(name.to_owned()))
        } else {
            Ok(())
        }
    }

    fn is_used(&self, scene_id: &SceneId) -> bool {
        self.scenes.contains_key(scene_id) || self.retired_ids.contains(scene_id)
    }

    /// The derived id itself, or the first `<id>_<n>` that is not taken.
    fn first_free_id(derived: SceneId, taken: impl Fn(&SceneId) -> bool) -> SceneId {
        if !taken(&derived) {
            return derived;
        }

        let mut n = 2;
        loop {
            let candidate = derived.with_suffix(n);
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn create(&mut self, name: &str, relay_states: RelayStates) -> Result<SceneId, SceneError> {
        let name = normalize_name(name)?;
        self.ensure_name_available(&name, None)?;

        let derived = derive_scene_id(&name)?;
        if self.scenes.contains_key(&derived) {
            return Err(SceneError::DuplicateName(name));
        }

        let scene_id = Self::first_free_id(derived, |id| self.is_used(id));

        self.scenes.insert(scene_id.clone(), Scene { name, relay_states });

        Ok(scene_id)
    }

    pub fn update(
        &mut self,
        scene_id: &SceneId,
        name: Option<&str>,
        relay_states: Option<RelayStates>,
    ) -> Result<(), SceneError> {
        self.get(scene_id)?;

        let name = name.map(normalize_name).transpose()?;
        if let Some(name) = &name {
            self.ensure_name_available(name, Some(scene_id))?;
        }

        let scene = self.get_mut(scene_id)?;

        if let Some(name) = name {
            scene.name = name;
        }

        if let Some(relay_states) = relay_states {
            scene.relay_states.extend(relay_states);
        }

        Ok(())
    }

    pub fn delete(&mut self, scene_id: &SceneId) -> Result<Scene, SceneError> {
        let scene = self
            .scenes
            .remove(scene_id)
            .ok_or_else(|| SceneError::NotFound(scene_id.clone()))?;
        self.retired_ids.insert(scene_id.clone());

        Ok(scene)
    }

    /// Builds the catalog that replaces this one wholesale. Validation covers
    /// every draft before anything is returned.
    pub fn replaced_by(&self, drafts: Vec<SceneDraft>) -> Result<SceneCatalog, SceneError> {
        let mut scenes: BTreeMap<SceneId, Scene> = BTreeMap::new();

        for draft in drafts {
            let name = normalize_name(&draft.name)?;

            if scenes.values().any(|scene| same_name(&scene.name, &name)) {
                return Err(SceneError::DuplicateName(name));
            }

            let scene_id = match draft.scene_id {
                Some(id) if id.is_namespaced() => {
                    if self.retired_ids.contains(&id) {
                        return Err(SceneError::InvalidArgument(format!(
                            "scene id {} was deleted and cannot be reused",
                            id
                        )));
                    }
                    id
                }
                _ => {
                    let derived = derive_scene_id(&name)?;
                    if scenes.contains_key(&derived) {
                        return Err(SceneError::DuplicateName(name));
                    }
                    Self::first_free_id(derived, |id| self.retired_ids.contains(id) || scenes.contains_key(id))
                }
            };

            if scenes.contains_key(&scene_id) {
                return Err(SceneError::DuplicateName(name));
            }

            scenes.insert(
                scene_id,
                Scene {
                    name,
                    relay_states: draft.relay_states,
                },
            );
        }

        let retired_ids = self
            .retired_ids
            .iter()
            .chain(self.scenes.keys())
            .filter(|id| !scenes.contains_key(*id))
            .cloned()
            .collect();

        Ok(SceneCatalog { scenes, retired_ids })
    }
}

/// Stored states overlaid on the live relays. Live relays missing from the scene
/// are off; stored relays that are no longer live are kept.
pub fn merge_with_live_relays(stored: &RelayStates, live: &BTreeSet<RelayId>) -> RelayStates {
    let mut merged = stored.clone();
    for relay in live {
        merged.entry(relay.clone()).or_insert(false);
    }
    merged
}

/// Trimmed name. Names without any letter or digit cannot be turned into an id
/// and are rejected for renames as well.
pub fn normalize_name(name: &str) -> Result<String, SceneError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SceneError::InvalidArgument("scene name must not be empty".to_owned()));
    }
    if !name.chars().any(char::is_alphanumeric) {
        return Err(SceneError::InvalidArgument(format!(
            "scene name '{}' must contain at least one letter or digit",
            name
        )));
    }
    Ok(name.to_owned())
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// `"Movie Night!"` becomes `savant_movie_night`.
pub fn derive_scene_id(name: &str) -> Result<SceneId, SceneError> {
    let mut slug = String::with_capacity(name.len());
    let mut separator_pending = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if separator_pending && !slug.is_empty() {
                slug.push(SLUG_SEPARATOR);
            }
            separator_pending = false;
            slug.extend(c.to_lowercase());
        } else {
            separator_pending = true;
        }
    }

    if slug.is_empty() {
        return Err(SceneError::InvalidArgument(format!(
            "scene name '{}' must contain at least one letter or digit",
            name
        )));
    }

    Ok(SceneId(format!("{}{}", SCENE_ID_PREFIX, slug)))
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("scene name '{0}' already exists")]
    DuplicateName(String),
    #[error("scene {0} not found")]
    NotFound(SceneId),
    #[error("scene storage is unreadable")]
    StorageCorrupt(#[source] anyhow::Error),
    #[error("scene {scene_id} only partially applied, {applied} relay(s) set, {} failed", .failed.len())]
    PartialActivationFailure {
        scene_id: SceneId,
        applied: usize,
        failed: Vec<RelayFailure>,
    },
    #[error("live relay directory unavailable")]
    RelayDirectory(#[source] anyhow::Error),
    #[error("error persisting scenes")]
    Storage(#[source] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct RelayFailure {
    pub relay_id: RelayId,
    pub reason: String,
}
