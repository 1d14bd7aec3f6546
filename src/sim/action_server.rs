//! Simulated navigation action server.
//!
//! Goals are executed as straight-line translations at a fixed speed.
//! Goals whose position matches one of the configured unreachable targets
//! are aborted after `abort_after`.

use std::thread;
use std::time::{Duration, Instant};

use super::{Route, SimWorld};
use crate::catalog::Target;
use crate::error::{NavError, Result};
use crate::middleware::NavigationClient;
use crate::types::{GoalStatus, NavigationGoal};

/// Goal currently tracked by the simulated server.
#[derive(Clone, Debug)]
struct TrackedGoal {
    target: Target,
    accepted_at: Instant,
    travel: Duration,
    doomed: bool,
    cancelled: bool,
}

/// `NavigationClient` backed by [`SimWorld`].
pub struct SimActionServer {
    world: SimWorld,
    ready_at: Instant,
    travel_speed: f64,
    abort_after: Duration,
    unreachable: Vec<Target>,
    goal: Option<TrackedGoal>,
}

impl SimActionServer {
    /// `startup_delay`: how long the server stays unavailable.
    /// `travel_speed`: m/s along the straight line to each goal.
    pub fn new(world: SimWorld, startup_delay: Duration, travel_speed: f64) -> Self {
        Self {
            world,
            ready_at: Instant::now() + startup_delay,
            travel_speed,
            abort_after: Duration::from_millis(500),
            unreachable: Vec::new(),
            goal: None,
        }
    }

    /// Goals at these positions are aborted instead of reached.
    pub fn with_unreachable(mut self, targets: Vec<Target>) -> Self {
        self.unreachable = targets;
        self
    }

    pub fn with_abort_after(mut self, abort_after: Duration) -> Self {
        self.abort_after = abort_after;
        self
    }

    fn is_ready(&self) -> bool {
        Instant::now() >= self.ready_at
    }

    fn is_unreachable(&self, target: &Target) -> bool {
        self.unreachable
            .iter()
            .any(|u| u.distance_to(target.x, target.y) < 1e-6)
    }
}

impl NavigationClient for SimActionServer {
    fn wait_for_server(&mut self, timeout: Duration) -> bool {
        let now = Instant::now();
        if now < self.ready_at {
            thread::sleep(timeout.min(self.ready_at - now));
        }
        self.is_ready()
    }

    fn send_goal(&mut self, goal: &NavigationGoal) -> Result<()> {
        if !self.is_ready() {
            return Err(NavError::Dispatch("action server not available".into()));
        }

        let position = goal.target_pose.pose.position;
        let target = Target::new(position.x, position.y);
        let doomed = self.is_unreachable(&target);
        let accepted_at = Instant::now();

        let mut world = self.world.lock();
        let from = (world.body.x, world.body.y);
        let distance = target.distance_to(from.0, from.1);
        let travel = Duration::try_from_secs_f64(distance / self.travel_speed).map_err(|e| {
            NavError::Dispatch(format!(
                "cannot plan {:.2}m at {} m/s: {}",
                distance, self.travel_speed, e
            ))
        })?;

        world.route = if doomed {
            None
        } else {
            Some(Route {
                from,
                to: (target.x, target.y),
                started: accepted_at,
                duration: travel,
            })
        };

        tracing::debug!(
            "Sim server accepted goal ({:.2}, {:.2}), {:.2}m, eta {:.1}s{}",
            target.x,
            target.y,
            distance,
            travel.as_secs_f64(),
            if doomed { " [unreachable]" } else { "" }
        );

        self.goal = Some(TrackedGoal {
            target,
            accepted_at,
            travel,
            doomed,
            cancelled: false,
        });
        Ok(())
    }

    fn state(&self) -> GoalStatus {
        let Some(goal) = &self.goal else {
            return GoalStatus::Lost;
        };
        if goal.cancelled {
            return GoalStatus::Preempted;
        }

        let elapsed = goal.accepted_at.elapsed();
        if goal.doomed {
            return if elapsed >= self.abort_after {
                GoalStatus::Aborted
            } else {
                GoalStatus::Active
            };
        }

        if elapsed >= goal.travel {
            // Route may not have been ticked to completion yet.
            let mut world = self.world.lock();
            world.body.x = goal.target.x;
            world.body.y = goal.target.y;
            world.route = None;
            GoalStatus::Succeeded
        } else {
            GoalStatus::Active
        }
    }

    fn cancel_goal(&mut self) {
        if let Some(goal) = self.goal.as_mut() {
            goal.cancelled = true;
            self.world.lock().route = None;
        }
    }
}
