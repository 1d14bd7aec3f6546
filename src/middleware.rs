//! Interfaces to the external navigation/transform middleware.
//!
//! The sequencer only ever talks to these traits. `crate::sim` provides an
//! in-process implementation; tests provide scripted fakes.

use std::time::Duration;

use crate::error::Result;
use crate::types::{GoalStatus, NavigationGoal, TransformStamped, Twist};

/// Client side of the navigation action (move_base style).
pub trait NavigationClient {
    /// Block up to `timeout` for the action server to become available.
    fn wait_for_server(&mut self, timeout: Duration) -> bool;

    /// Submit a goal, replacing any goal the client was tracking.
    fn send_goal(&mut self, goal: &NavigationGoal) -> Result<()>;

    /// Status of the most recently submitted goal.
    fn state(&self) -> GoalStatus;

    /// Ask the server to drop the current goal.
    fn cancel_goal(&mut self);
}

/// Velocity command output channel.
pub trait VelocityPublisher {
    fn publish(&mut self, twist: Twist) -> Result<()>;
}

/// Publishes frame-to-frame transforms.
pub trait TransformBroadcaster {
    fn send_transform(&mut self, transform: TransformStamped);
}

/// Resolves the latest transform between two frames.
pub trait TransformBuffer {
    /// Transform that expresses `source` frame poses in `target` frame.
    fn lookup_transform(&self, target: &str, source: &str) -> Result<TransformStamped>;
}
