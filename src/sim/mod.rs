//! In-process simulated middleware.
//!
//! Lets the sequencer run end to end without an external robot stack:
//!
//! | Component | Simulation Method |
//! |-----------|-------------------|
//! | Action server | Straight-line travel at `travel_speed`, then Succeeded |
//! | Odometry feed | Dedicated thread integrating the commanded twist |
//! | Velocity channel | Writes the commanded twist into the shared world |
//! | Transforms | Broadcast records chained onto the simulated body pose |
//!
//! # Thread Model
//!
//! ```text
//! ┌─────────────────┐  commands   ┌─────────────────┐
//! │ Sequencer loop  │ ──────────▶ │    SimWorld     │
//! │   (main)        │             │ (body + twist)  │
//! └────────▲────────┘             └────────┬────────┘
//!          │ snapshot                      │ integrate @ odom_rate_hz
//!          │                      ┌────────▼────────┐
//!          └──────────────────────│  odometry feed  │
//!               PoseStore         │   (thread)      │
//!                                 └─────────────────┘
//! ```

mod action_server;
mod physics;
mod transforms;

pub use action_server::SimActionServer;
pub use physics::{Body, Route};
pub use transforms::SimTransforms;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{NavError, Result};
use crate::middleware::VelocityPublisher;
use crate::pose_store::SharedPoseStore;
use crate::types::{Odometry, Twist};
use crate::utils::now_us;

/// Mutable state of the simulated robot.
#[derive(Debug)]
pub struct WorldState {
    pub body: Body,
    /// Last commanded velocity
    pub command: Twist,
    /// Translation currently being executed by the action server
    pub route: Option<Route>,
}

/// Shared handle to the simulated robot.
#[derive(Clone, Debug)]
pub struct SimWorld {
    inner: Arc<Mutex<WorldState>>,
}

impl SimWorld {
    pub fn new(start: Body) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WorldState {
                body: start,
                command: Twist::STOP,
                route: None,
            })),
        }
    }

    /// Lock the world state. A poisoned lock is recovered: the state is plain
    /// data and stays consistent.
    pub fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn body(&self) -> Body {
        self.lock().body
    }

    /// Advance the simulation by `dt` at wall-clock time `now`.
    pub fn tick(&self, dt: f64, now: Instant) -> Body {
        let mut world = self.lock();
        let command = world.command;
        world.body.integrate(dt, command);

        if let Some(route) = world.route {
            let (x, y) = route.position_at(now);
            world.body.x = x;
            world.body.y = y;
            if route.is_finished(now) {
                world.route = None;
            }
        }
        world.body
    }
}

/// Velocity channel backed by the simulated world.
#[derive(Clone, Debug)]
pub struct SimVelocity {
    world: SimWorld,
}

impl SimVelocity {
    pub fn new(world: SimWorld) -> Self {
        Self { world }
    }
}

impl VelocityPublisher for SimVelocity {
    fn publish(&mut self, twist: Twist) -> Result<()> {
        tracing::debug!(
            "cmd_vel: linear={:.3}m/s, angular={:.3}rad/s",
            twist.linear,
            twist.angular
        );
        self.world.lock().command = twist;
        Ok(())
    }
}

/// Spawn the odometry feed: integrates the world at `rate_hz` and pushes each
/// sample into `store` until `shutdown` is raised.
pub fn spawn_odometry_feed(
    world: SimWorld,
    store: SharedPoseStore,
    rate_hz: f64,
    shutdown: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let period = Duration::try_from_secs_f64(1.0 / rate_hz)
        .map_err(|e| NavError::Config(format!("odometry rate {} Hz: {}", rate_hz, e)))?;

    let handle = thread::Builder::new()
        .name("odometry".into())
        .spawn(move || {
            tracing::info!("Odometry feed started at {:.0} Hz", rate_hz);
            let mut last = Instant::now();

            while !shutdown.load(Ordering::Relaxed) {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f64();
                last = now;

                let body = world.tick(dt, now);
                store.update(Odometry {
                    timestamp_us: now_us(),
                    pose: body.pose(),
                });

                let elapsed = now.elapsed();
                if elapsed < period {
                    thread::sleep(period - elapsed);
                }
            }

            tracing::info!("Odometry feed exited");
        })?;

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose_store::PoseStore;

    #[test]
    fn test_velocity_publisher_sets_command() {
        let world = SimWorld::new(Body::default());
        let mut velocity = SimVelocity::new(world.clone());

        velocity.publish(Twist::rotation(0.8)).unwrap();
        assert_eq!(world.lock().command, Twist::rotation(0.8));

        velocity.publish(Twist::STOP).unwrap();
        assert_eq!(world.lock().command, Twist::STOP);
    }

    #[test]
    fn test_feed_tracks_rotation() {
        let world = SimWorld::new(Body::default());
        world.lock().command = Twist::rotation(1.0);

        let store = Arc::new(PoseStore::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle =
            spawn_odometry_feed(world.clone(), Arc::clone(&store), 200.0, Arc::clone(&shutdown))
                .unwrap();

        thread::sleep(Duration::from_millis(200));
        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        assert!(store.update_count() > 5);
        let yaw = store.snapshot().pose.orientation.yaw();
        assert!(yaw > 0.05, "robot should have turned CCW, yaw = {}", yaw);
    }

    #[test]
    fn test_feed_rejects_unrepresentable_rate() {
        let world = SimWorld::new(Body::default());
        let store = Arc::new(PoseStore::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let result = spawn_odometry_feed(world, store, 1e-300, shutdown);
        assert!(matches!(result, Err(NavError::Config(_))));
    }
}
