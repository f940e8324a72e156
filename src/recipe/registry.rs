//! Recipe Registry
//!
//! Loads and caches miniaturization recipes from TOML files.
//! Supports hot-reloading during development.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::definition::RawRecipeDefinition;
use super::miniaturization::MiniaturizationRecipe;
use crate::error::RecipeError;

/// Supplies the candidate recipes a field is matched against.
///
/// Candidates are treated as static for the duration of one match pass.
pub trait RecipeSource {
    fn candidates(&self) -> &[Arc<MiniaturizationRecipe>];
}

impl RecipeSource for Vec<Arc<MiniaturizationRecipe>> {
    fn candidates(&self) -> &[Arc<MiniaturizationRecipe>] {
        self
    }
}

impl RecipeSource for [Arc<MiniaturizationRecipe>] {
    fn candidates(&self) -> &[Arc<MiniaturizationRecipe>] {
        self
    }
}

/// Registry for all miniaturization recipes
pub struct RecipeRegistry {
    /// Sorted by id so candidate order is deterministic
    recipes: Vec<Arc<MiniaturizationRecipe>>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self {
            recipes: Vec::new(),
        }
    }

    /// Load all recipe definitions from `data_dir/recipes`
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<usize, RecipeError> {
        let recipes_dir = data_dir.join("recipes");

        if !recipes_dir.exists() {
            warn!("Recipes directory does not exist: {:?}", recipes_dir);
            return Ok(0);
        }

        let entries = std::fs::read_dir(&recipes_dir).map_err(|source| RecipeError::Io {
            path: recipes_dir.clone(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RecipeError::Io {
                path: recipes_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "toml") {
                paths.push(path);
            }
        }
        // Directory order is platform dependent
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let content = std::fs::read_to_string(&path).map_err(|source| RecipeError::Io {
                path: path.clone(),
                source,
            })?;

            // Parse as table of recipes
            let table: HashMap<String, RawRecipeDefinition> =
                toml::from_str(&content).map_err(|source| RecipeError::Parse {
                    path: path.clone(),
                    source,
                })?;

            for (id, raw) in table {
                match raw.into_recipe(&id) {
                    Ok(recipe) => {
                        if self.contains(&id) {
                            warn!("Duplicate recipe ID '{}' in {:?}, overwriting", id, path);
                        }
                        info!(
                            "Loaded recipe: {} - {} layers, {} components -> {} outputs",
                            id,
                            recipe.height(),
                            recipe.component_keys().len(),
                            recipe.outputs().len()
                        );
                        self.insert(recipe);
                        loaded += 1;
                    }
                    Err(e) => {
                        warn!("Skipping invalid recipe '{}' in {:?}: {}", id, path, e);
                    }
                }
            }
        }

        info!("Loaded {} miniaturization recipes", self.recipes.len());

        Ok(loaded)
    }

    /// Add a recipe, replacing any recipe with the same id
    pub fn insert(&mut self, recipe: MiniaturizationRecipe) -> Arc<MiniaturizationRecipe> {
        let recipe = Arc::new(recipe);
        match self
            .recipes
            .binary_search_by(|r| r.id().cmp(recipe.id()))
        {
            Ok(idx) => self.recipes[idx] = recipe.clone(),
            Err(idx) => self.recipes.insert(idx, recipe.clone()),
        }
        recipe
    }

    /// Get a recipe by ID
    pub fn get(&self, id: &str) -> Option<&Arc<MiniaturizationRecipe>> {
        self.recipes
            .binary_search_by(|r| r.id().cmp(id))
            .ok()
            .map(|idx| &self.recipes[idx])
    }

    /// Get all recipe IDs
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.recipes.iter().map(|r| r.id())
    }

    /// Get all recipes, sorted by id
    pub fn all(&self) -> &[Arc<MiniaturizationRecipe>] {
        &self.recipes
    }

    /// Check if a recipe exists
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Get the number of loaded recipes
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Start file watcher for hot-reload.
    /// A fresh registry is built on every change and swapped in only if it loads cleanly.
    /// Returns a channel receiver that signals when reloads occur.
    pub fn start_file_watcher(
        registry: Arc<RwLock<RecipeRegistry>>,
        data_dir: &Path,
    ) -> Result<tokio::sync::mpsc::Receiver<HotReloadEvent>, RecipeError> {
        use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};

        let recipes_dir = data_dir.join("recipes");
        if !recipes_dir.exists() {
            return Err(RecipeError::Watcher(format!(
                "Recipes directory does not exist: {:?}",
                recipes_dir
            )));
        }

        let rt = tokio::runtime::Handle::try_current()
            .map_err(|e| RecipeError::Watcher(format!("No tokio runtime: {}", e)))?;

        let (tx, rx) = tokio::sync::mpsc::channel(32);
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )
        .map_err(|e| RecipeError::Watcher(e.to_string()))?;

        watcher
            .watch(&recipes_dir, RecursiveMode::NonRecursive)
            .map_err(|e| RecipeError::Watcher(e.to_string()))?;

        info!("Recipe hot-reload watcher started for {:?}", recipes_dir);

        // One task applies reloads in order, so an older snapshot never wins
        let (changes_tx, changes_rx) = tokio::sync::mpsc::unbounded_channel();
        rt.spawn(run_reloads(
            registry,
            data_dir.to_path_buf(),
            changes_rx,
            tx,
        ));

        // notify is sync, so events are processed on a dedicated thread
        std::thread::spawn(move || {
            // Keep the watcher alive for the lifetime of the thread
            let _watcher = watcher;

            while let Ok(event) = notify_rx.recv() {
                use notify::EventKind;
                if !matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) {
                    continue;
                }

                let Some(path) = event
                    .paths
                    .iter()
                    .find(|p| p.extension().map_or(false, |ext| ext == "toml"))
                    .cloned()
                else {
                    continue;
                };

                info!("Detected change in {:?}, triggering reload", path);
                if changes_tx.send(path).is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}

impl Default for RecipeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeSource for RecipeRegistry {
    fn candidates(&self) -> &[Arc<MiniaturizationRecipe>] {
        &self.recipes
    }
}

/// Wait after a change before reloading, so a burst of saves reloads once
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Apply queued recipe file changes one at a time.
///
/// Changes that arrive while waiting are folded into the same reload. A fresh
/// registry is swapped in only if it loads cleanly.
async fn run_reloads(
    registry: Arc<RwLock<RecipeRegistry>>,
    data_dir: PathBuf,
    mut changes: tokio::sync::mpsc::UnboundedReceiver<PathBuf>,
    events: tokio::sync::mpsc::Sender<HotReloadEvent>,
) {
    while let Some(mut path) = changes.recv().await {
        tokio::time::sleep(RELOAD_DEBOUNCE).await;
        while let Ok(next) = changes.try_recv() {
            path = next;
        }

        let mut fresh = RecipeRegistry::new();
        let event = match fresh.load_from_directory(&data_dir) {
            Ok(_) => {
                let count = fresh.len();
                *registry.write().await = fresh;
                info!("Hot-reload completed: {} recipes", count);
                HotReloadEvent::Reloaded(path.to_string_lossy().to_string())
            }
            Err(e) => {
                error!("Hot-reload failed, keeping previous recipes: {}", e);
                HotReloadEvent::Error(e.to_string())
            }
        };
        // Nobody listening is fine; reloads still apply
        let _ = events.send(event).await;
    }
}

/// Events from the hot-reload watcher
#[derive(Debug, Clone)]
pub enum HotReloadEvent {
    /// Recipes were reloaded after a change to this file
    Reloaded(String),
    /// An error occurred during reload
    Error(String),
}
