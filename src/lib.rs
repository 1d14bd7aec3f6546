//! YatraNav - waypoint sequencing controller
//!
//! Drives a mobile robot through a fixed sequence of surveyed targets. At
//! each target the robot rotates in place, then moves on to the next one.
//!
//! ## Architecture
//!
//! - **Target catalog** ([`catalog`]): ordered targets loaded and validated
//!   from the parameter namespace at startup
//! - **Goal dispatcher** ([`dispatcher`]): builds goals, submits each at most once
//! - **Rotation controller** ([`rotation`]): in-place turn with bounded,
//!   sleep-polled settle detection
//! - **Pose store** ([`pose_store`]): latest odometry sample, written by the
//!   feed thread and read by the rotation controller
//! - **Sequencer** ([`sequencer`]): the 10 Hz control loop tying it together
//!
//! Everything outside the core goes through the traits in [`middleware`];
//! [`sim`] provides an in-process implementation.

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod middleware;
pub mod params;
pub mod pose_store;
pub mod rotation;
pub mod sequencer;
pub mod sim;
pub mod transforms;
pub mod types;
pub mod utils;

pub use catalog::{Target, TargetCatalog};
pub use config::{UnreachablePolicy, YatraConfig};
pub use error::{NavError, Result};
pub use middleware::{
    NavigationClient, TransformBroadcaster, TransformBuffer, VelocityPublisher,
};
pub use params::ParameterSource;
pub use pose_store::{PoseStore, SharedPoseStore};
pub use rotation::{RotationConfig, RotationController, RotationOutcome, RotationState};
pub use sequencer::{
    Middleware, Sequencer, SequencerConfig, SequencerState, StepEvent, wait_for_action_server,
};
pub use transforms::FrameConfig;
pub use types::{
    GoalStatus, NavigationGoal, Odometry, Pose, Quaternion, Transform, TransformStamped, Twist,
    Vector3,
};
