use std::sync::{Arc, PoisonError, RwLock};

use futures::future::join_all;
use infrastructure::meter;
use tokio::sync::Mutex;

use crate::port::{RelayController, RelayDirectory};
use crate::scene::adapter::file::SceneRepository;
use crate::scene::{
    RelayFailure, RelayStates, SceneCatalog, SceneDraft, SceneError, SceneId, SceneSummary, merge_with_live_relays,
};

pub struct SceneService<R> {
    repo: SceneRepository,
    relays: R,
    current: RwLock<Arc<SceneCatalog>>,
    writer: Mutex<()>,
}

impl<R> SceneService<R> {
    /// Unreadable storage is moved aside and the service starts empty.
    pub fn new(repo: SceneRepository, relays: R) -> Self {
        let catalog = match repo.load() {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("Scene storage {} is unreadable, starting without scenes: {:?}", repo.path().display(), e);
                match repo.quarantine() {
                    Ok(moved) => tracing::warn!("Unreadable scene storage moved to {}", moved.display()),
                    Err(e) => tracing::error!("Error moving unreadable scene storage aside: {:?}", e),
                }
                SceneCatalog::default()
            }
        };

        meter::set("savant_scenes", catalog.scenes.len() as f64, &[]);

        Self {
            repo,
            relays,
            current: RwLock::new(Arc::new(catalog)),
            writer: Mutex::new(()),
        }
    }

    /// Last persisted state.
    fn snapshot(&self) -> Arc<SceneCatalog> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, catalog: SceneCatalog) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(catalog);
    }

    async fn modify<T, F>(&self, operation: &'static str, change: F) -> Result<T, SceneError>
    where
        F: FnOnce(&mut SceneCatalog) -> Result<T, SceneError>,
    {
        let _guard = self.writer.lock().await;

        let current = self.snapshot();
        let mut next = SceneCatalog::clone(&current);
        let result = change(&mut next)?;

        if next == *current {
            tracing::debug!("{} left scenes unchanged, skipping save", operation);
            return Ok(result);
        }

        self.repo.save(&next).map_err(SceneError::Storage)?;

        meter::increment("savant_scene_mutations", &[("operation", operation)]);
        meter::set("savant_scenes", next.scenes.len() as f64, &[]);

        self.publish(next);

        Ok(result)
    }

    pub fn list_scenes(&self) -> Vec<SceneSummary> {
        self.snapshot().summaries()
    }

    #[tracing::instrument(skip(self, relay_states), fields(relays = relay_states.len()))]
    pub async fn create_scene(&self, name: &str, relay_states: RelayStates) -> Result<SceneId, SceneError> {
        let scene_id = self
            .modify("create", |catalog| catalog.create(name, relay_states))
            .await?;

        tracing::info!("Scene {} created", scene_id);
        Ok(scene_id)
    }

    #[tracing::instrument(skip(self, relay_states))]
    pub async fn update_scene(
        &self,
        scene_id: &SceneId,
        name: Option<&str>,
        relay_states: Option<RelayStates>,
    ) -> Result<(), SceneError> {
        self.modify("update", |catalog| catalog.update(scene_id, name, relay_states))
            .await?;

        tracing::info!("Scene {} updated", scene_id);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_scene(&self, scene_id: &SceneId) -> Result<(), SceneError> {
        let removed = self.modify("delete", |catalog| catalog.delete(scene_id)).await?;

        tracing::info!("Scene {} ({}) deleted", scene_id, removed.name);
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(scenes = drafts.len()))]
    pub async fn replace_all(&self, drafts: Vec<SceneDraft>) -> Result<usize, SceneError> {
        let count = drafts.len();

        self.modify("replace", |catalog| {
            *catalog = catalog.replaced_by(drafts)?;
            Ok(())
        })
        .await?;

        tracing::info!("All scenes replaced, {} scenes stored", count);
        Ok(count)
    }
}

impl<R> SceneService<R>
where
    R: RelayDirectory + RelayController,
{
    #[tracing::instrument(skip(self))]
    pub async fn get_breakers(&self, scene_id: &SceneId) -> Result<RelayStates, SceneError> {
        let snapshot = self.snapshot();
        let scene = snapshot.get(scene_id)?;

        let live = self.relays.relay_ids().await.map_err(SceneError::RelayDirectory)?;

        Ok(merge_with_live_relays(&scene.relay_states, &live))
    }

    /// Applies every stored relay state. Relays that fail do not hold back the
    /// others, and applied relays are not rolled back.
    #[tracing::instrument(skip(self))]
    pub async fn activate_scene(&self, scene_id: &SceneId) -> Result<usize, SceneError> {
        let snapshot = self.snapshot();
        let scene = snapshot.get(scene_id)?;

        let results = join_all(scene.relay_states.iter().map(|(relay, on)| async move {
            let res = self.relays.set_relay(relay, *on).await;
            (relay, res)
        }))
        .await;

        let mut applied = 0;
        let mut failed = Vec::new();

        for (relay, res) in results {
            match res {
                Ok(()) => applied += 1,
                Err(e) => {
                    tracing::warn!("Error setting relay {} for scene {}: {:?}", relay, scene_id, e);
                    failed.push(RelayFailure {
                        relay_id: relay.clone(),
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        if failed.is_empty() {
            tracing::info!("Scene {} ({}) activated, {} relays applied", scene_id, scene.name, applied);
            return Ok(applied);
        }

        meter::add(
            "savant_relay_activation_failures",
            failed.len() as u64,
            &[("scene_id", scene_id.as_str())],
        );

        Err(SceneError::PartialActivationFailure {
            scene_id: scene_id.clone(),
            applied,
            failed,
        })
    }
}
