//! YatraNav - waypoint sequencing controller
//!
//! Visits every surveyed target in order, rotating in place at each one.
//! Runs against the in-process simulated middleware.
//!
//! Usage: `yatra-nav [config.toml]` (defaults to `yatra.toml` if present)

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{error, info, warn};
use yatra_nav::sim::{Body, SimActionServer, SimTransforms, SimVelocity, SimWorld};
use yatra_nav::{
    Middleware, NavError, PoseStore, Result, Sequencer, SequencerConfig, SequencerState,
    TargetCatalog, YatraConfig, wait_for_action_server,
};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("yatra_nav=info".parse().unwrap()),
        )
        .init();

    info!("YatraNav v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Fatal: {}", e);
            return Err(e);
        }
    };

    // Fetch all the targets from the parameter namespace
    let catalog = match TargetCatalog::load(
        &config.params,
        &config.catalog.prefix,
        config.catalog.count,
    ) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Fatal: {}", e);
            return Err(e);
        }
    };
    for (i, target) in catalog.iter().enumerate() {
        info!("Target [{}]: ({:.3}, {:.3})", i, target.x, target.y);
    }

    let unreachable = config
        .sim
        .unreachable_targets
        .iter()
        .map(|&i| catalog.current(i).copied())
        .collect::<Result<Vec<_>>>()
        .map_err(|e| NavError::Config(format!("sim.unreachable_targets: {}", e)))?;

    // Shutdown signal shared by the feed thread and the control loop
    let shutdown = Arc::new(AtomicBool::new(false));
    let s = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        s.store(true, Ordering::Relaxed);
    })
    .map_err(|e| NavError::Config(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Simulated middleware
    let [x, y, yaw] = config.sim.start_pose;
    let world = SimWorld::new(Body::new(x, y, yaw));
    let pose_store = Arc::new(PoseStore::new());
    let feed = yatra_nav::sim::spawn_odometry_feed(
        world.clone(),
        Arc::clone(&pose_store),
        config.sim.odom_rate_hz,
        Arc::clone(&shutdown),
    )?;

    let tf = SimTransforms::new(world.clone(), &config.frames.map, &config.frames.parent);
    let mut middleware = Middleware {
        navigation: SimActionServer::new(
            world.clone(),
            Duration::from_secs_f64(config.sim.server_startup_secs),
            config.sim.travel_speed,
        )
        .with_unreachable(unreachable),
        velocity: SimVelocity::new(world),
        broadcaster: tf.clone(),
        transforms: tf,
    };

    info!(
        "Connecting to action server {}",
        config.navigation.action_server
    );
    let result = if wait_for_action_server(
        &mut middleware.navigation,
        config.navigation.server_wait(),
        &shutdown,
    ) {
        let mut sequencer = Sequencer::new(
            catalog,
            Arc::clone(&pose_store),
            SequencerConfig::from(&config),
        );
        sequencer.run(&mut middleware, &shutdown)
    } else {
        Ok(SequencerState::Navigating)
    };

    // Stop the odometry feed
    shutdown.store(true, Ordering::Relaxed);
    if let Err(e) = feed.join() {
        error!("Odometry thread panicked: {:?}", e);
    }

    match result {
        Ok(SequencerState::Complete) => info!("All targets visited"),
        Ok(state) => warn!("Stopped before completion ({:?})", state),
        Err(ref e) => error!("Sequencing stopped: {}", e),
    }

    info!("YatraNav finished");
    result.map(|_| ())
}

/// Config from the first positional argument, else `yatra.toml`, else defaults.
fn load_config() -> Result<YatraConfig> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && !args[1].starts_with("--") {
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        YatraConfig::load(config_path)
    } else if Path::new("yatra.toml").exists() {
        info!("Loading configuration from yatra.toml");
        YatraConfig::load(Path::new("yatra.toml"))
    } else {
        info!("Using default configuration");
        Ok(YatraConfig::default())
    }
}
