//! Test doubles for the middleware traits.
//!
//! Each fake records what the sequencer did to it so tests can assert on
//! dispatch counts, published twists and transform traffic.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use yatra_nav::{
    FrameConfig, GoalStatus, Middleware, NavError, NavigationClient, NavigationGoal, PoseStore,
    Result, RotationConfig, SequencerConfig, Target, TargetCatalog, TransformBroadcaster,
    TransformBuffer, TransformStamped, Twist, UnreachablePolicy, VelocityPublisher,
};

/// Navigation client replaying a script of statuses.
///
/// Each `state()` call consumes the next scripted status; once the script is
/// empty the client reports `idle`.
pub struct ScriptedNav {
    pub sent: Vec<NavigationGoal>,
    pub script: RefCell<VecDeque<GoalStatus>>,
    pub idle: GoalStatus,
    pub cancels: usize,
    /// Number of upcoming `send_goal` calls to reject
    pub failing_sends: usize,
    /// `wait_for_server` calls that report unavailable before success
    pub unavailable_polls: Cell<usize>,
    pub server_polls: Cell<usize>,
}

impl Default for ScriptedNav {
    fn default() -> Self {
        Self {
            sent: Vec::new(),
            script: RefCell::new(VecDeque::new()),
            idle: GoalStatus::Active,
            cancels: 0,
            failing_sends: 0,
            unavailable_polls: Cell::new(0),
            server_polls: Cell::new(0),
        }
    }
}

impl ScriptedNav {
    pub fn push(&self, status: GoalStatus) {
        self.script.borrow_mut().push_back(status);
    }
}

impl NavigationClient for ScriptedNav {
    fn wait_for_server(&mut self, _timeout: Duration) -> bool {
        self.server_polls.set(self.server_polls.get() + 1);
        let remaining = self.unavailable_polls.get();
        if remaining > 0 {
            self.unavailable_polls.set(remaining - 1);
            return false;
        }
        true
    }

    fn send_goal(&mut self, goal: &NavigationGoal) -> Result<()> {
        if self.failing_sends > 0 {
            self.failing_sends -= 1;
            return Err(NavError::Dispatch("connection refused".into()));
        }
        self.sent.push(goal.clone());
        Ok(())
    }

    fn state(&self) -> GoalStatus {
        self.script.borrow_mut().pop_front().unwrap_or(self.idle)
    }

    fn cancel_goal(&mut self) {
        self.cancels += 1;
    }
}

#[derive(Default)]
pub struct RecordingVelocity {
    /// Twists that were accepted
    pub twists: Vec<Twist>,
    /// Number of upcoming stop commands to reject
    pub rejected_stops: usize,
}

impl RecordingVelocity {
    /// Number of non-zero commands published
    pub fn rotation_commands(&self) -> usize {
        self.twists.iter().filter(|t| **t != Twist::STOP).count()
    }
}

impl VelocityPublisher for RecordingVelocity {
    fn publish(&mut self, twist: Twist) -> Result<()> {
        if twist == Twist::STOP && self.rejected_stops > 0 {
            self.rejected_stops -= 1;
            return Err(NavError::Publish("cmd_vel publisher closed".into()));
        }
        self.twists.push(twist);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingBroadcaster {
    pub sent: Vec<TransformStamped>,
}

impl TransformBroadcaster for RecordingBroadcaster {
    fn send_transform(&mut self, transform: TransformStamped) {
        self.sent.push(transform);
    }
}

/// Transform buffer that fails the first `failures` lookups.
#[derive(Default)]
pub struct FlakyTransforms {
    pub failures: Cell<usize>,
    pub lookups: Cell<usize>,
}

impl TransformBuffer for FlakyTransforms {
    fn lookup_transform(&self, target: &str, source: &str) -> Result<TransformStamped> {
        self.lookups.set(self.lookups.get() + 1);
        let remaining = self.failures.get();
        if remaining > 0 {
            self.failures.set(remaining - 1);
            return Err(NavError::Transform(format!(
                "\"{}\" passed to lookupTransform argument source_frame does not exist",
                source
            )));
        }
        let mut found = TransformStamped::default();
        found.header.frame_id = target.to_string();
        found.child_frame_id = source.to_string();
        Ok(found)
    }
}

pub type FakeMiddleware =
    Middleware<ScriptedNav, RecordingVelocity, RecordingBroadcaster, FlakyTransforms>;

pub fn fake_middleware() -> FakeMiddleware {
    Middleware {
        navigation: ScriptedNav::default(),
        velocity: RecordingVelocity::default(),
        broadcaster: RecordingBroadcaster::default(),
        transforms: FlakyTransforms::default(),
    }
}

/// Config with millisecond timings so scenarios run quickly.
pub fn fast_config(max_goal_retries: u32, policy: UnreachablePolicy) -> SequencerConfig {
    SequencerConfig {
        loop_period: Duration::from_millis(1),
        max_goal_retries,
        unreachable_policy: policy,
        frames: FrameConfig {
            lookup_failure_pause: Duration::ZERO,
            ..Default::default()
        },
        rotation: RotationConfig {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(20),
            ..Default::default()
        },
    }
}

pub fn catalog(points: &[(f64, f64)]) -> TargetCatalog {
    TargetCatalog::new(points.iter().map(|&(x, y)| Target::new(x, y)).collect()).unwrap()
}

/// Pose store that never moves: rotations end by timeout.
pub fn still_pose_store() -> Arc<PoseStore> {
    Arc::new(PoseStore::new())
}
