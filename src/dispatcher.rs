//! Goal dispatcher: turns the current target into a navigation goal and
//! submits it at most once.

use crate::catalog::Target;
use crate::error::Result;
use crate::middleware::NavigationClient;
use crate::types::{Header, NavigationGoal, Pose, PoseStamped, Quaternion, Vector3};

/// Build the goal message for `target` in `frame_id`, stamped `timestamp_us`.
///
/// Orientation is always identity: heading at the target is not controlled.
pub fn build_goal(target: &Target, frame_id: &str, timestamp_us: u64) -> NavigationGoal {
    NavigationGoal {
        target_pose: PoseStamped {
            header: Header {
                frame_id: frame_id.to_string(),
                timestamp_us,
            },
            pose: Pose {
                position: Vector3::new(target.x, target.y, 0.0),
                orientation: Quaternion::IDENTITY,
            },
        },
    }
}

/// Submit `goal` unless one is already outstanding.
///
/// Returns the new value of the goal-sent flag. A submission error leaves the
/// flag cleared and is returned to the caller.
pub fn send_once<C: NavigationClient + ?Sized>(
    client: &mut C,
    goal: &NavigationGoal,
    sent: bool,
) -> Result<bool> {
    if sent {
        return Ok(true);
    }

    let position = goal.target_pose.pose.position;
    tracing::debug!(
        "Submitting goal ({:.2}, {:.2}) in frame '{}'",
        position.x,
        position.y,
        goal.target_pose.header.frame_id
    );
    client.send_goal(goal)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NavError;
    use crate::types::GoalStatus;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingClient {
        sent: Vec<NavigationGoal>,
        fail: bool,
    }

    impl NavigationClient for CountingClient {
        fn wait_for_server(&mut self, _timeout: Duration) -> bool {
            true
        }

        fn send_goal(&mut self, goal: &NavigationGoal) -> Result<()> {
            if self.fail {
                return Err(NavError::Dispatch("server rejected goal".into()));
            }
            self.sent.push(goal.clone());
            Ok(())
        }

        fn state(&self) -> GoalStatus {
            GoalStatus::Active
        }

        fn cancel_goal(&mut self) {}
    }

    #[test]
    fn test_build_goal_fields() {
        let goal = build_goal(&Target::new(2.0, 1.5), "map", 42);

        assert_eq!(goal.target_pose.header.frame_id, "map");
        assert_eq!(goal.target_pose.header.timestamp_us, 42);
        assert_eq!(goal.target_pose.pose.position, Vector3::new(2.0, 1.5, 0.0));
        assert_eq!(goal.target_pose.pose.orientation, Quaternion::IDENTITY);
    }

    #[test]
    fn test_send_once_dispatches_exactly_once() {
        let mut client = CountingClient::default();
        let goal = build_goal(&Target::new(1.0, 0.0), "map", 0);

        let sent = send_once(&mut client, &goal, false).unwrap();
        assert!(sent);
        let sent = send_once(&mut client, &goal, sent).unwrap();
        assert!(sent);

        assert_eq!(client.sent.len(), 1);
    }

    #[test]
    fn test_send_failure_propagates() {
        let mut client = CountingClient {
            fail: true,
            ..Default::default()
        };
        let goal = build_goal(&Target::new(1.0, 0.0), "map", 0);

        assert!(matches!(
            send_once(&mut client, &goal, false),
            Err(NavError::Dispatch(_))
        ));
    }
}
