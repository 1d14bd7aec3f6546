//! In-place rotation performed after each goal is reached.
//!
//! ```text
//! start_rotation ──▶ Rotating ──(signal left band, then re-entered)──▶ Settled
//!                        │
//!                        └──────────────(timeout)─────────────────────▶ Settled
//! ```
//!
//! The tracked signal is the z-component of the odometry orientation
//! quaternion. The rotation starts at the reference heading, so the settle
//! check is only armed once the signal has been seen outside the tolerance
//! band; otherwise the very first sample would end the rotation.
//!
//! Waiting never spins: the pose store is sampled every `poll_interval`
//! and the whole wait is capped by `timeout`.

use std::thread;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::middleware::VelocityPublisher;
use crate::pose_store::PoseStore;
use crate::types::{Odometry, Twist};

/// Configuration for the post-arrival rotation.
#[derive(Clone, Debug)]
pub struct RotationConfig {
    /// Commanded angular velocity (rad/s, CCW positive)
    pub angular_velocity: f64,
    /// Settle band half-width on the orientation z-component
    pub tolerance: f64,
    /// Value of the z-component that counts as settled
    pub reference: f64,
    /// Delay between pose samples
    pub poll_interval: Duration,
    /// Give up after this long and report settled-by-timeout
    pub timeout: Duration,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            angular_velocity: 0.8,
            tolerance: 0.01,
            reference: 0.0,
            poll_interval: Duration::from_millis(10),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Rotation controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationState {
    Rotating,
    Settled,
}

/// How a rotation ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RotationOutcome {
    /// Orientation returned inside the tolerance band
    Settled { elapsed: Duration },
    /// Timeout expired first
    TimedOut { elapsed: Duration },
}

impl RotationOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            RotationOutcome::Settled { elapsed } | RotationOutcome::TimedOut { elapsed } => {
                *elapsed
            }
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, RotationOutcome::TimedOut { .. })
    }
}

/// Rotates the robot in place until the orientation settles or time runs out.
pub struct RotationController {
    config: RotationConfig,
    state: RotationState,
    /// Signal has been observed outside the tolerance band
    armed: bool,
    started_at: Option<Instant>,
}

impl RotationController {
    pub fn new(config: RotationConfig) -> Self {
        Self {
            config,
            state: RotationState::Settled,
            armed: false,
            started_at: None,
        }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    /// Publish the rotation command once and enter `Rotating`.
    pub fn start_rotation<P: VelocityPublisher + ?Sized>(
        &mut self,
        publisher: &mut P,
    ) -> Result<()> {
        tracing::info!(
            "Rotating the robot at {:.2} rad/s",
            self.config.angular_velocity
        );
        publisher.publish(Twist::rotation(self.config.angular_velocity))?;
        self.state = RotationState::Rotating;
        self.armed = false;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    /// Orientation z-component is inside the tolerance band.
    pub fn poll_settled(&self, pose: &Odometry) -> bool {
        (pose.pose.orientation.z - self.config.reference).abs() < self.config.tolerance
    }

    /// Feed one sample; returns true once the rotation has settled.
    fn observe(&mut self, pose: &Odometry) -> bool {
        let within = self.poll_settled(pose);
        if !within && !self.armed {
            tracing::debug!(
                "Rotation underway (orientation.z = {:.4})",
                pose.pose.orientation.z
            );
            self.armed = true;
        }
        self.armed && within
    }

    /// Sample `store` until settled or the timeout expires.
    ///
    /// Must follow [`Self::start_rotation`]; the timeout is measured from the
    /// start command.
    pub fn wait_settled(&mut self, store: &PoseStore) -> RotationOutcome {
        let started = *self.started_at.get_or_insert_with(Instant::now);

        let outcome = loop {
            let sample = store.snapshot();
            let elapsed = started.elapsed();

            if self.observe(&sample) {
                tracing::info!(
                    "Rotation settled after {:.2}s (orientation.z = {:.4})",
                    elapsed.as_secs_f64(),
                    sample.pose.orientation.z
                );
                break RotationOutcome::Settled { elapsed };
            }

            if elapsed >= self.config.timeout {
                tracing::warn!(
                    "Rotation did not settle within {:.1}s (orientation.z = {:.4}), continuing",
                    self.config.timeout.as_secs_f64(),
                    sample.pose.orientation.z
                );
                break RotationOutcome::TimedOut { elapsed };
            }

            let remaining = self.config.timeout - elapsed;
            thread::sleep(self.config.poll_interval.min(remaining));
        };

        self.state = RotationState::Settled;
        self.started_at = None;
        outcome
    }

    /// Command a stop. Called after every wait, including a timed-out one.
    pub fn stop<P: VelocityPublisher + ?Sized>(&mut self, publisher: &mut P) -> Result<()> {
        publisher.publish(Twist::STOP)?;
        tracing::debug!("Rotation stopped");
        Ok(())
    }
}
