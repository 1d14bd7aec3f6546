//! Goal sequencing loop.
//!
//! Drives the robot through the target catalog, one goal at a time:
//!
//! ```text
//!            ┌──────────────── retry (≤ max_goal_retries) ───────────────┐
//!            ▼                                                           │
//!   ┌─────────────────┐   send_once   ┌──────────┐   Aborted/Rejected/…  │
//!   │ no goal pending │ ────────────▶ │ in flight│ ──────────────────────┘
//!   └─────────────────┘               └──────────┘
//!            ▲                             │ Succeeded
//!            │  cursor += 1                ▼
//!            └──────────────── stop ◀─── rotate in place
//!                               │ rejected: hold, retry stop next iteration
//!
//!   cursor == len            ──▶ Complete
//!   retries exhausted, halt  ──▶ Halted
//!   retries exhausted, skip  ──▶ cursor += 1
//! ```
//!
//! Each iteration also broadcasts the sensor frame and looks it up in the
//! map, independently of sequencing state. Iterations are serialized: the
//! rotation wait blocks the loop (but not the odometry feed, which runs on
//! its own thread).

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::catalog::TargetCatalog;
use crate::config::{UnreachablePolicy, YatraConfig};
use crate::dispatcher::{build_goal, send_once};
use crate::error::{NavError, Result};
use crate::middleware::{
    NavigationClient, TransformBroadcaster, TransformBuffer, VelocityPublisher,
};
use crate::pose_store::SharedPoseStore;
use crate::rotation::{RotationConfig, RotationController, RotationOutcome};
use crate::transforms::{self, FrameConfig};
use crate::types::{GoalStatus, Twist};
use crate::utils::now_us;

/// Sequencing parameters.
#[derive(Clone, Debug)]
pub struct SequencerConfig {
    /// Loop period (10 Hz by default)
    pub loop_period: Duration,
    /// Failed attempts tolerated per target before the policy applies
    pub max_goal_retries: u32,
    /// What to do with a target that keeps failing
    pub unreachable_policy: UnreachablePolicy,
    pub frames: FrameConfig,
    pub rotation: RotationConfig,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            loop_period: Duration::from_millis(100),
            max_goal_retries: 3,
            unreachable_policy: UnreachablePolicy::Skip,
            frames: FrameConfig::default(),
            rotation: RotationConfig::default(),
        }
    }
}

impl From<&YatraConfig> for SequencerConfig {
    fn from(config: &YatraConfig) -> Self {
        Self {
            loop_period: config.navigation.loop_period(),
            max_goal_retries: config.navigation.max_goal_retries,
            unreachable_policy: config.navigation.unreachable_policy,
            frames: config.frames.to_frame_config(),
            rotation: config.rotation.to_rotation_config(),
        }
    }
}

/// Overall sequencing state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerState {
    /// Working through the catalog
    Navigating,
    /// Every target visited (or skipped)
    Complete,
    /// Stopped on an unreachable target
    Halted,
}

impl SequencerState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SequencerState::Navigating)
    }
}

/// What a single iteration did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepEvent {
    /// Goal submitted for target `index`
    GoalSent { index: usize },
    /// Outstanding goal still pending/active
    InFlight { index: usize },
    /// Target reached, rotation finished and the robot stopped
    Reached {
        index: usize,
        rotation: Option<RotationOutcome>,
    },
    /// Rotation finished but the stop command was not delivered; retried
    /// next iteration before anything else
    StopPending { index: usize },
    /// Attempt failed; goal will be re-sent next iteration
    Retrying { index: usize, attempt: u32 },
    /// Target given up on, cursor moved on
    Skipped { index: usize },
    /// Target given up on, sequencing stopped
    Halted { index: usize },
    /// Already terminal, nothing done
    Idle,
}

/// Bundle of middleware handles the loop drives.
pub struct Middleware<N, V, B, T> {
    pub navigation: N,
    pub velocity: V,
    pub broadcaster: B,
    pub transforms: T,
}

/// Block until the action server is available, retrying every `timeout`.
///
/// Returns false only when `shutdown` is raised while waiting.
pub fn wait_for_action_server<N: NavigationClient + ?Sized>(
    navigation: &mut N,
    timeout: Duration,
    shutdown: &AtomicBool,
) -> bool {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        if navigation.wait_for_server(timeout) {
            tracing::info!("Navigation action server is up");
            return true;
        }
        tracing::info!("Waiting for the navigation action server to come up");
    }
}

/// Goal sequencing state machine.
pub struct Sequencer {
    config: SequencerConfig,
    catalog: TargetCatalog,
    pose_store: SharedPoseStore,
    rotation: RotationController,
    /// Index of the active target
    cursor: usize,
    /// A goal for `cursor` has been submitted and not yet resolved
    goal_sent: bool,
    /// Failed attempts for the active target
    retries: u32,
    /// Goals submitted since startup
    dispatched: usize,
    /// Rotation whose stop command has not been delivered yet
    pending_stop: Option<PendingStop>,
    state: SequencerState,
}

/// Outcome held back until the robot has been told to stop.
#[derive(Clone, Copy, Debug)]
struct PendingStop {
    rotation: Option<RotationOutcome>,
}

impl Sequencer {
    pub fn new(
        catalog: TargetCatalog,
        pose_store: SharedPoseStore,
        config: SequencerConfig,
    ) -> Self {
        let rotation = RotationController::new(config.rotation.clone());
        Self {
            config,
            catalog,
            pose_store,
            rotation,
            cursor: 0,
            goal_sent: false,
            retries: 0,
            dispatched: 0,
            pending_stop: None,
            state: SequencerState::Navigating,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn goal_sent(&self) -> bool {
        self.goal_sent
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// The last rotation has not been followed by a delivered stop command.
    pub fn stop_pending(&self) -> bool {
        self.pending_stop.is_some()
    }

    pub fn catalog(&self) -> &TargetCatalog {
        &self.catalog
    }

    /// Run one loop iteration.
    pub fn step<N, V, B, T>(&mut self, mw: &mut Middleware<N, V, B, T>) -> Result<StepEvent>
    where
        N: NavigationClient,
        V: VelocityPublisher,
        B: TransformBroadcaster,
        T: TransformBuffer,
    {
        let event = if self.state.is_terminal() {
            StepEvent::Idle
        } else {
            self.sequence(mw)?
        };

        transforms::broadcast(&mut mw.broadcaster, &self.config.frames, now_us());
        transforms::listen(&mw.transforms, &self.config.frames);

        Ok(event)
    }

    fn sequence<N, V, B, T>(&mut self, mw: &mut Middleware<N, V, B, T>) -> Result<StepEvent>
    where
        N: NavigationClient,
        V: VelocityPublisher,
    {
        let index = self.cursor;
        if let Some(pending) = self.pending_stop.take() {
            return Ok(self.finish_rotation(&mut mw.velocity, index, pending.rotation));
        }

        let target = *self.catalog.current(index)?;
        tracing::debug!(
            "Current target [{}] ({:.2}, {:.2})",
            index,
            target.x,
            target.y
        );

        if !self.goal_sent {
            let goal = build_goal(&target, &self.config.frames.map, now_us());
            tracing::info!("Sending goal for target [{}]", index);
            return match send_once(&mut mw.navigation, &goal, self.goal_sent) {
                Ok(sent) => {
                    self.goal_sent = sent;
                    self.dispatched += 1;
                    Ok(StepEvent::GoalSent { index })
                }
                Err(e) => {
                    tracing::warn!("Goal for target [{}] could not be sent: {}", index, e);
                    self.handle_failure(&mut mw.navigation, index)
                }
            };
        }

        let status = mw.navigation.state();
        match status {
            GoalStatus::Succeeded => {
                tracing::info!("Robot reached goal [{}]", index);
                let rotation = match self.rotation.start_rotation(&mut mw.velocity) {
                    Ok(()) => Some(self.rotation.wait_settled(&self.pose_store)),
                    Err(e) => {
                        tracing::error!("Rotation command failed at target [{}]: {}", index, e);
                        None
                    }
                };
                Ok(self.finish_rotation(&mut mw.velocity, index, rotation))
            }
            s if s.is_failure() => {
                tracing::warn!("Goal for target [{}] ended with status {}", index, s);
                self.handle_failure(&mut mw.navigation, index)
            }
            _ => Ok(StepEvent::InFlight { index }),
        }
    }

    /// Stop the robot, then move on. Until the stop is delivered the cursor
    /// stays put and no goal is dispatched.
    fn finish_rotation<V: VelocityPublisher>(
        &mut self,
        velocity: &mut V,
        index: usize,
        rotation: Option<RotationOutcome>,
    ) -> StepEvent {
        if let Err(e) = self.rotation.stop(velocity) {
            tracing::error!(
                "Stop command failed at target [{}]: {}, holding position",
                index,
                e
            );
            self.pending_stop = Some(PendingStop { rotation });
            return StepEvent::StopPending { index };
        }

        self.advance();
        StepEvent::Reached { index, rotation }
    }

    /// Count a failed attempt and apply the retry budget / policy.
    fn handle_failure<N: NavigationClient>(
        &mut self,
        navigation: &mut N,
        index: usize,
    ) -> Result<StepEvent> {
        self.goal_sent = false;
        self.retries += 1;

        if self.retries <= self.config.max_goal_retries {
            tracing::warn!(
                "Retrying target [{}] (retry {}/{})",
                index,
                self.retries,
                self.config.max_goal_retries
            );
            return Ok(StepEvent::Retrying {
                index,
                attempt: self.retries,
            });
        }

        tracing::error!(
            "Target [{}] unreachable after {} attempts",
            index,
            self.retries
        );
        navigation.cancel_goal();

        match self.config.unreachable_policy {
            UnreachablePolicy::Skip => {
                tracing::warn!("Skipping target [{}]", index);
                self.advance();
                Ok(StepEvent::Skipped { index })
            }
            UnreachablePolicy::Halt => {
                self.state = SequencerState::Halted;
                Ok(StepEvent::Halted { index })
            }
        }
    }

    /// Move to the next target, or finish if none remain.
    fn advance(&mut self) {
        self.cursor = TargetCatalog::advance(self.cursor);
        self.goal_sent = false;
        self.retries = 0;

        if self.catalog.is_exhausted(self.cursor) {
            tracing::info!("All {} targets visited", self.catalog.len());
            self.state = SequencerState::Complete;
        } else {
            tracing::info!("Advancing to target [{}]", self.cursor);
        }
    }

    /// Loop at the configured rate until a terminal state or `shutdown`.
    ///
    /// Returns the terminal state reached. A halt on an unreachable target is
    /// reported as [`NavError::UnreachableTarget`].
    pub fn run<N, V, B, T>(
        &mut self,
        mw: &mut Middleware<N, V, B, T>,
        shutdown: &AtomicBool,
    ) -> Result<SequencerState>
    where
        N: NavigationClient,
        V: VelocityPublisher,
        B: TransformBroadcaster,
        T: TransformBuffer,
    {
        tracing::info!(
            "Sequencing {} targets at {:.1} Hz",
            self.catalog.len(),
            1.0 / self.config.loop_period.as_secs_f64()
        );

        loop {
            let loop_start = Instant::now();

            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("Shutdown requested at target [{}]", self.cursor);
                self.shutdown(mw);
                return Ok(self.state);
            }

            self.step(mw)?;

            match self.state {
                SequencerState::Navigating => {}
                SequencerState::Complete => return Ok(self.state),
                SequencerState::Halted => {
                    return Err(NavError::UnreachableTarget {
                        index: self.cursor,
                        attempts: self.retries,
                    });
                }
            }

            // Maintain target loop rate
            let elapsed = loop_start.elapsed();
            if elapsed < self.config.loop_period {
                thread::sleep(self.config.loop_period - elapsed);
            }
        }
    }

    fn shutdown<N, V, B, T>(&mut self, mw: &mut Middleware<N, V, B, T>)
    where
        N: NavigationClient,
        V: VelocityPublisher,
    {
        if self.goal_sent {
            mw.navigation.cancel_goal();
            self.goal_sent = false;
        }
        match mw.velocity.publish(Twist::STOP) {
            Ok(()) => self.pending_stop = None,
            Err(e) => tracing::error!("Failed to send stop command: {}", e),
        }
    }
}
