mod executor;
mod scatter;
mod timing;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use glam::Vec3;
use placement_assets::{Layer, ResourceStore};
use placement_common::Transform;
use placement_kernel::World;
use placement_tiles::{ManagerConfig, PlacementVolume, TileManager};
use tracing_subscriber::EnvFilter;

use crate::executor::RayonExecutor;
use crate::timing::UpdateTimer;

#[derive(Parser)]
#[command(name = "placement-cli", about = "Drive the placement tile manager headlessly")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Manager configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the in-flight tile ceiling
    #[arg(long, global = true)]
    max_tiles: Option<usize>,

    /// Override the cull distance scale
    #[arg(long, global = true)]
    cull_scale: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective configuration
    Info,
    /// Walk an observer along a row of placement volumes
    Run {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "200")]
        ticks: u64,
        /// Number of placement volumes laid out along +X
        #[arg(long, default_value = "4")]
        volumes: usize,
        /// Observer speed in world units per tick
        #[arg(long, default_value = "2.0")]
        speed: f32,
        /// Reload the resource at this tick (0 disables)
        #[arg(long, default_value = "0")]
        reload_at: u64,
        /// Scatter seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Wall-clock pause per tick, in milliseconds
        #[arg(long, default_value = "1")]
        tick_ms: u64,
    },
    /// Write the effective configuration to a JSON file
    WriteConfig {
        /// Destination path
        path: PathBuf,
    },
}

const RESOURCE_PATH: &str = "demo/meadow.placement";

fn demo_layers() -> anyhow::Result<Vec<Layer>> {
    Ok(vec![
        Layer::new("grass", 4.0, 48.0, "grass_tuft")?
            .with_density(0.5)
            .with_parameter("min_scale", 0.6)
            .with_parameter("max_scale", 1.4),
        Layer::new("rocks", 16.0, 96.0, "rock")?.with_density(0.02),
        Layer::new("trees", 32.0, 160.0, "pine")?
            .with_density(0.004)
            .with_parameter("min_scale", 0.8)
            .with_parameter("max_scale", 1.6),
    ])
}

fn effective_config(cli: &Cli) -> anyhow::Result<ManagerConfig> {
    let mut config = match &cli.config {
        Some(path) => ManagerConfig::load(path)?,
        None => ManagerConfig::default(),
    };
    if let Some(max_tiles) = cli.max_tiles {
        config.max_processing_tiles = max_tiles;
    }
    if let Some(scale) = cli.cull_scale {
        config.cull_distance_scale = scale;
    }
    config.validate()?;
    Ok(config)
}

fn run(
    config: ManagerConfig,
    ticks: u64,
    volumes: usize,
    speed: f32,
    reload_at: u64,
    seed: u64,
    tick_ms: u64,
) -> anyhow::Result<()> {
    let mut store = ResourceStore::new();
    let resource = store.load(RESOURCE_PATH, demo_layers()?);
    let mut manager = TileManager::new(config, RayonExecutor::new(seed))?;
    let mut world = World::new();

    for i in 0..volumes {
        let volume = PlacementVolume::new(
            Some(resource),
            Transform::from_position(Vec3::new(i as f32 * 120.0, 0.0, 0.0)),
        )
        .with_extents(Vec3::new(64.0, 48.0, 6.0));
        manager.add_component(&volume);
    }

    let reporter = manager.reporter();
    let mut timer = UpdateTimer::new(32);
    let mut peak_entities = 0;

    for tick in 0..ticks {
        let observer = Vec3::new(tick as f32 * speed, 0.0, 1.8);
        reporter.report(resource, observer, Vec3::X);

        if reload_at > 0 && tick == reload_at {
            tracing::info!(tick, "reloading resource");
            store.reload(resource, demo_layers()?)?;
        }
        for event in store.drain_events() {
            manager.on_resource_event(&event);
        }

        manager.update(&store);
        manager.place_objects(&mut world);
        world.step();
        manager.check_invariants();

        let stats = manager.stats();
        timer.record(stats.update_time);
        peak_entities = peak_entities.max(world.entity_count());

        if tick % 20 == 0 {
            tracing::info!(
                tick,
                x = observer.x,
                entities = world.entity_count(),
                in_flight = stats.processing_tiles,
                pending = stats.pending_tiles,
                pool = stats.pool_size,
                free = stats.free_slots,
                "placement progress"
            );
        }
        if tick_ms > 0 {
            std::thread::sleep(Duration::from_millis(tick_ms));
        }
    }

    let debug_tiles = manager.debug_tiles().count();
    println!(
        "ticks={ticks} entities={} peak={peak_entities} tiles={debug_tiles} pool={} free={}",
        world.entity_count(),
        manager.pool().len(),
        manager.pool().free_count(),
    );
    println!(
        "update time: avg={:?} max={:?} (last {} ticks)",
        timer.average(),
        timer.max(),
        timer.len()
    );

    manager.shutdown(&mut world);
    println!("after shutdown: entities={}", world.entity_count());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = effective_config(&cli)?;

    match cli.command {
        Commands::Info => {
            println!("placement-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("max_processing_tiles: {}", config.max_processing_tiles);
            println!("cull_distance_scale: {}", config.cull_distance_scale);
            println!("rayon threads: {}", rayon::current_num_threads());
        }
        Commands::Run {
            ticks,
            volumes,
            speed,
            reload_at,
            seed,
            tick_ms,
        } => run(config, ticks, volumes, speed, reload_at, seed, tick_ms)?,
        Commands::WriteConfig { path } => {
            config.save(&path)?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}
