//! Body kinematics for the simulated robot.

use std::time::{Duration, Instant};

use crate::types::{Pose, Quaternion, Twist, Vector3};
use crate::utils::normalize_angle;

/// Planar robot body in the map frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    /// Heading (radians, CCW from +X), kept in [-π, π]
    pub yaw: f64,
}

impl Body {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            yaw: normalize_angle(yaw),
        }
    }

    /// Apply a velocity command for `dt` seconds (unicycle kinematics).
    pub fn integrate(&mut self, dt: f64, twist: Twist) {
        if twist.angular.abs() < 1e-9 {
            self.x += twist.linear * self.yaw.cos() * dt;
            self.y += twist.linear * self.yaw.sin() * dt;
        } else {
            let r = twist.linear / twist.angular;
            let new_yaw = self.yaw + twist.angular * dt;
            self.x += r * (new_yaw.sin() - self.yaw.sin());
            self.y += r * (self.yaw.cos() - new_yaw.cos());
            self.yaw = new_yaw;
        }
        self.yaw = normalize_angle(self.yaw);
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: Vector3::new(self.x, self.y, 0.0),
            orientation: Quaternion::from_yaw(self.yaw),
        }
    }
}

/// Straight-line translation from `from` to `to` over `duration`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Route {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub started: Instant,
    pub duration: Duration,
}

impl Route {
    /// Fraction of the route covered at `now`, clamped to [0, 1].
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let t = now.saturating_duration_since(self.started).as_secs_f64();
        (t / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn position_at(&self, now: Instant) -> (f64, f64) {
        let p = self.progress(now);
        (
            self.from.0 + (self.to.0 - self.from.0) * p,
            self.from.1 + (self.to.1 - self.from.1) * p,
        )
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_straight_motion() {
        let mut body = Body::default();
        body.integrate(2.0, Twist {
            linear: 0.5,
            angular: 0.0,
        });
        assert_relative_eq!(body.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(body.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_full_turn_in_place_returns_to_start_heading() {
        let mut body = Body::default();
        let dt = 0.01;
        let steps = (2.0 * PI / (0.8 * dt)).round() as usize;
        for _ in 0..steps {
            body.integrate(dt, Twist::rotation(0.8));
        }
        assert_relative_eq!(body.x, 0.0, epsilon = 1e-12);
        assert!(body.yaw.abs() < 0.01, "yaw = {}", body.yaw);
        assert!(body.pose().orientation.z.abs() < 0.01);
    }

    #[test]
    fn test_route_interpolation() {
        let started = Instant::now();
        let route = Route {
            from: (0.0, 0.0),
            to: (2.0, 1.0),
            started,
            duration: Duration::from_secs(2),
        };

        let (x, y) = route.position_at(started + Duration::from_secs(1));
        assert_relative_eq!(x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(y, 0.5, epsilon = 1e-9);
        assert!(!route.is_finished(started + Duration::from_secs(1)));
        assert!(route.is_finished(started + Duration::from_secs(3)));
        assert_eq!(route.position_at(started + Duration::from_secs(3)), (2.0, 1.0));
    }
}
