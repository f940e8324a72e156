use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use compact_crafting::recipe::HotReloadEvent;
use compact_crafting::{
    BlockWorld, DimensionId, FieldEvent, FieldHost, RecipeRegistry, ServerConfig,
};

#[tokio::main]
async fn main() {
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    match config
        .log_filter
        .parse::<tracing_subscriber::filter::Directive>()
    {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring invalid log_filter {:?}: {}", config.log_filter, e),
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load recipe registry from TOML files
    let mut registry = RecipeRegistry::new();
    if let Err(e) = registry.load_from_directory(&config.data_dir) {
        error!("Failed to load recipe registry: {}", e);
    }
    let recipes = Arc::new(RwLock::new(registry));

    if config.hot_reload {
        match RecipeRegistry::start_file_watcher(recipes.clone(), &config.data_dir) {
            Ok(mut rx) => {
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        match event {
                            HotReloadEvent::Reloaded(path) => {
                                info!("Recipe hot-reload: {}", path);
                            }
                            HotReloadEvent::Error(e) => {
                                error!("Recipe hot-reload error: {}", e);
                            }
                        }
                    }
                });
                info!("Recipe hot-reload enabled");
            }
            Err(e) => {
                warn!("Failed to start recipe hot-reload: {}", e);
            }
        }
    }

    let world = match &config.world_file {
        Some(path) => match BlockWorld::load_from_file(path) {
            Ok(world) => world,
            Err(e) => {
                error!("Failed to load world: {}", e);
                BlockWorld::new()
            }
        },
        None => BlockWorld::new(),
    };

    // Fields are not persisted; find them again from the projector blocks
    let projectors = world.positions_of(&config.projector_block);

    let host = Arc::new(FieldHost::from_config(recipes, &config));
    let overworld = DimensionId::overworld();
    host.create_dimension(overworld.clone(), world);
    if let Err(e) = host.discover_fields(&overworld, &projectors).await {
        error!("Field discovery failed: {}", e);
    }

    // Spawn field tick loop
    let tick_host = host.clone();
    let tick_interval = config.tick_interval();
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        loop {
            interval.tick().await;
            for (dimension, event) in tick_host.tick().await {
                log_event(&dimension, &event);
            }
        }
    });

    info!(
        "Ticking fields every {:?} (data dir {:?})",
        tick_interval, config.data_dir
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down");
    ticker.abort();
    if let Err(e) = host.destroy_dimension(&overworld).await {
        warn!("Failed to destroy {}: {}", overworld, e);
    }
}

fn log_event(dimension: &DimensionId, event: &FieldEvent) {
    match event {
        FieldEvent::CraftCompleted {
            center,
            recipe_id,
            outputs,
        } => {
            let outputs: Vec<String> = outputs.iter().map(ToString::to_string).collect();
            info!(
                "[{}] Field {} crafted '{}': {}",
                dimension,
                center,
                recipe_id,
                outputs.join(", ")
            );
        }
        _ => info!("[{}] {} at {}", dimension, event.event_type(), event.center()),
    }
}
