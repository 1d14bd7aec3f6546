//! Message types exchanged with the navigation middleware.
//!
//! These mirror the handful of geometry/navigation messages the sequencer
//! touches: stamped poses for goals, odometry samples for the pose store,
//! twists for the rotation command and stamped transforms for the
//! broadcast/lookup pair.

use std::fmt;
use std::ops::{Add, Mul};

/// 3-vector in meters
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

/// Unit quaternion (x, y, z, w)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation of `yaw` radians about the vertical axis.
    pub fn from_yaw(yaw: f64) -> Self {
        let half = yaw / 2.0;
        Self {
            x: 0.0,
            y: 0.0,
            z: half.sin(),
            w: half.cos(),
        }
    }

    /// Heading about the vertical axis, in [-π, π].
    pub fn yaw(&self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(&self, v: Vector3) -> Vector3 {
        // v' = v + 2w(q × v) + 2(q × (q × v))
        let q = Vector3::new(self.x, self.y, self.z);
        let t = q.cross(v).scale(2.0);
        v + t.scale(self.w) + q.cross(t)
    }
}

/// Hamilton product
impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, o: Quaternion) -> Quaternion {
        Quaternion {
            w: self.w * o.w - self.x * o.x - self.y * o.y - self.z * o.z,
            x: self.w * o.x + self.x * o.w + self.y * o.z - self.z * o.y,
            y: self.w * o.y - self.x * o.z + self.y * o.w + self.z * o.x,
            z: self.w * o.z + self.x * o.y - self.y * o.x + self.z * o.w,
        }
    }
}

/// Message header: reference frame and timestamp.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Header {
    pub frame_id: String,
    pub timestamp_us: u64,
}

/// Position + orientation
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub position: Vector3,
    pub orientation: Quaternion,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
}

/// Goal submitted to the navigation action server.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationGoal {
    pub target_pose: PoseStamped,
}

/// Velocity command (linear m/s, angular rad/s about the vertical axis)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Twist {
    pub linear: f64,
    pub angular: f64,
}

impl Twist {
    pub const STOP: Self = Self {
        linear: 0.0,
        angular: 0.0,
    };

    pub fn rotation(angular: f64) -> Self {
        Self {
            linear: 0.0,
            angular,
        }
    }
}

/// Odometry sample as delivered by the pose feed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Odometry {
    pub timestamp_us: u64,
    pub pose: Pose,
}

/// Rigid transform: translation then rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

impl Transform {
    /// Compose `self ∘ other`: express `other`'s child in `self`'s parent frame.
    pub fn then(&self, other: &Transform) -> Transform {
        Transform {
            translation: self.rotation.rotate(other.translation) + self.translation,
            rotation: self.rotation * other.rotation,
        }
    }
}

impl From<Pose> for Transform {
    fn from(pose: Pose) -> Self {
        Self {
            translation: pose.position,
            rotation: pose.orientation,
        }
    }
}

/// Transform from `header.frame_id` to `child_frame_id`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformStamped {
    pub header: Header,
    pub child_frame_id: String,
    pub transform: Transform,
}

/// Navigation action goal status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GoalStatus {
    /// Accepted, not yet processed
    Pending,
    /// Being pursued by the server
    Active,
    /// Cancelled after it started executing
    Preempted,
    /// Reached
    Succeeded,
    /// Server gave up on the goal
    Aborted,
    /// Server refused the goal
    Rejected,
    /// Cancelled before it started executing
    Recalled,
    /// No status available (no goal, or the server lost track of it)
    Lost,
}

impl GoalStatus {
    /// Goal has not reached a terminal status yet.
    pub fn is_in_flight(self) -> bool {
        matches!(self, GoalStatus::Pending | GoalStatus::Active)
    }

    /// Terminal status other than success.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            GoalStatus::Preempted
                | GoalStatus::Aborted
                | GoalStatus::Rejected
                | GoalStatus::Recalled
                | GoalStatus::Lost
        )
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GoalStatus::Pending => "PENDING",
            GoalStatus::Active => "ACTIVE",
            GoalStatus::Preempted => "PREEMPTED",
            GoalStatus::Succeeded => "SUCCEEDED",
            GoalStatus::Aborted => "ABORTED",
            GoalStatus::Rejected => "REJECTED",
            GoalStatus::Recalled => "RECALLED",
            GoalStatus::Lost => "LOST",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_yaw_round_trip() {
        let q = Quaternion::from_yaw(1.2);
        assert_relative_eq!(q.yaw(), 1.2, epsilon = 1e-9);
        assert_relative_eq!(Quaternion::IDENTITY.yaw(), 0.0);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let q = Quaternion::from_yaw(FRAC_PI_2);
        let v = q.rotate(Vector3::new(1.0, 0.0, 0.5));
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(v.z, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_transform_composition() {
        let robot = Transform {
            translation: Vector3::new(2.0, 1.0, 0.0),
            rotation: Quaternion::from_yaw(FRAC_PI_2),
        };
        let sensor = Transform {
            translation: Vector3::new(0.5, 0.5, 0.2),
            rotation: Quaternion::IDENTITY,
        };
        let composed = robot.then(&sensor);

        // Sensor offset rotated 90° CCW: (0.5, 0.5) -> (-0.5, 0.5)
        assert_relative_eq!(composed.translation.x, 1.5, epsilon = 1e-9);
        assert_relative_eq!(composed.translation.y, 1.5, epsilon = 1e-9);
        assert_relative_eq!(composed.translation.z, 0.2, epsilon = 1e-9);
        assert_relative_eq!(composed.rotation.yaw(), FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_status_classification() {
        assert!(GoalStatus::Active.is_in_flight());
        assert!(GoalStatus::Pending.is_in_flight());
        assert!(!GoalStatus::Succeeded.is_in_flight());
        assert!(!GoalStatus::Succeeded.is_failure());
        for status in [
            GoalStatus::Aborted,
            GoalStatus::Rejected,
            GoalStatus::Preempted,
            GoalStatus::Recalled,
            GoalStatus::Lost,
        ] {
            assert!(status.is_failure(), "{} should be a failure", status);
        }
    }
}
