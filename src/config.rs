//! Configuration loading for YatraNav

use crate::error::{NavError, Result};
use crate::rotation::RotationConfig;
use crate::transforms::FrameConfig;
use crate::types::Vector3;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct YatraConfig {
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub rotation: RotationSection,
    #[serde(default)]
    pub frames: FramesSection,
    #[serde(default)]
    pub sim: SimConfig,
    /// Parameter namespace holding the surveyed targets
    #[serde(default)]
    pub params: toml::Table,
}

/// What to do with a target whose retry budget is exhausted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreachablePolicy {
    /// Move on to the next target
    #[default]
    Skip,
    /// Stop the whole sequence
    Halt,
}

/// Navigation loop settings
#[derive(Clone, Debug, Deserialize)]
pub struct NavigationConfig {
    /// Action server name (default: /explorer/move_base)
    #[serde(default = "default_action_server")]
    pub action_server: String,

    /// Per-attempt wait for the action server at startup, seconds (default: 5.0)
    #[serde(default = "default_server_wait_secs")]
    pub server_wait_secs: f64,

    /// Sequencing loop rate in Hz (default: 10.0)
    #[serde(default = "default_loop_rate_hz")]
    pub loop_rate_hz: f64,

    /// Failed attempts tolerated per target (default: 3)
    #[serde(default = "default_max_goal_retries")]
    pub max_goal_retries: u32,

    /// Policy once retries are exhausted (default: skip)
    #[serde(default)]
    pub unreachable_policy: UnreachablePolicy,
}

/// Target catalog naming
#[derive(Clone, Debug, Deserialize)]
pub struct CatalogConfig {
    /// Parameter name prefix; targets are `<prefix>1 ..= <prefix>count`
    #[serde(default = "default_catalog_prefix")]
    pub prefix: String,

    /// Number of targets to load (default: 4)
    #[serde(default = "default_catalog_count")]
    pub count: usize,
}

/// Post-arrival rotation
#[derive(Clone, Debug, Deserialize)]
pub struct RotationSection {
    /// Angular velocity in rad/s (default: 0.8)
    #[serde(default = "default_angular_velocity")]
    pub angular_velocity: f64,

    /// Settle band on orientation z (default: 0.01)
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Orientation z value that counts as settled (default: 0.0)
    #[serde(default)]
    pub reference: f64,

    /// Pose sampling interval in milliseconds (default: 10)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Settle timeout in seconds (default: 15.0)
    #[serde(default = "default_rotation_timeout_secs")]
    pub timeout_secs: f64,
}

/// Frame names and the broadcast sensor offset
#[derive(Clone, Debug, Deserialize)]
pub struct FramesSection {
    #[serde(default = "default_map_frame")]
    pub map: String,

    #[serde(default = "default_parent_frame")]
    pub parent: String,

    #[serde(default = "default_child_frame")]
    pub child: String,

    /// Child translation in parent frame, [x, y, z] meters
    #[serde(default = "default_offset")]
    pub offset: [f64; 3],

    /// Pause after a failed lookup in milliseconds (default: 1000)
    #[serde(default = "default_lookup_failure_pause_ms")]
    pub lookup_failure_pause_ms: u64,
}

/// Simulated middleware parameters
#[derive(Clone, Debug, Deserialize)]
pub struct SimConfig {
    /// Seconds before the simulated action server accepts goals (default: 0.0)
    #[serde(default)]
    pub server_startup_secs: f64,

    /// Straight-line travel speed toward goals in m/s (default: 0.5)
    #[serde(default = "default_travel_speed")]
    pub travel_speed: f64,

    /// Odometry feed rate in Hz (default: 100.0)
    #[serde(default = "default_odom_rate_hz")]
    pub odom_rate_hz: f64,

    /// Initial pose [x, y, yaw]
    #[serde(default)]
    pub start_pose: [f64; 3],

    /// 0-based target indices the simulated server aborts
    #[serde(default)]
    pub unreachable_targets: Vec<usize>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            action_server: default_action_server(),
            server_wait_secs: default_server_wait_secs(),
            loop_rate_hz: default_loop_rate_hz(),
            max_goal_retries: default_max_goal_retries(),
            unreachable_policy: UnreachablePolicy::default(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            prefix: default_catalog_prefix(),
            count: default_catalog_count(),
        }
    }
}

impl Default for RotationSection {
    fn default() -> Self {
        Self {
            angular_velocity: default_angular_velocity(),
            tolerance: default_tolerance(),
            reference: 0.0,
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_rotation_timeout_secs(),
        }
    }
}

impl Default for FramesSection {
    fn default() -> Self {
        Self {
            map: default_map_frame(),
            parent: default_parent_frame(),
            child: default_child_frame(),
            offset: default_offset(),
            lookup_failure_pause_ms: default_lookup_failure_pause_ms(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            server_startup_secs: 0.0,
            travel_speed: default_travel_speed(),
            odom_rate_hz: default_odom_rate_hz(),
            start_pose: [0.0; 3],
            unreachable_targets: Vec::new(),
        }
    }
}

// Default value functions
fn default_action_server() -> String {
    "/explorer/move_base".to_string()
}
fn default_server_wait_secs() -> f64 {
    5.0
}
fn default_loop_rate_hz() -> f64 {
    10.0
}
fn default_max_goal_retries() -> u32 {
    3
}
fn default_catalog_prefix() -> String {
    "aruco_lookup_locations/target_".to_string()
}
fn default_catalog_count() -> usize {
    4
}

// Rotation defaults
fn default_angular_velocity() -> f64 {
    0.8
}
/// sin(yaw/2) band: about ±1.1° around the start heading
fn default_tolerance() -> f64 {
    0.01
}
fn default_poll_interval_ms() -> u64 {
    10
}
/// One full turn at 0.8 rad/s takes ~7.9s
fn default_rotation_timeout_secs() -> f64 {
    15.0
}

// Frame defaults
fn default_map_frame() -> String {
    "map".to_string()
}
fn default_parent_frame() -> String {
    "explorer_tf/camera_rgb_optical_frame".to_string()
}
fn default_child_frame() -> String {
    "my_frame".to_string()
}
fn default_offset() -> [f64; 3] {
    [0.5, 0.5, 0.2]
}
fn default_lookup_failure_pause_ms() -> u64 {
    1000
}

// Simulation defaults
fn default_travel_speed() -> f64 {
    0.5
}
fn default_odom_rate_hz() -> f64 {
    100.0
}

impl YatraConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text and validate it
    pub fn parse(content: &str) -> Result<Self> {
        let config: YatraConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the control loop cannot run with
    pub fn validate(&self) -> Result<()> {
        let nav = &self.navigation;
        check_range("navigation.loop_rate_hz", nav.loop_rate_hz, 0.01, 1000.0)?;
        check_range("navigation.server_wait_secs", nav.server_wait_secs, 0.001, MAX_SECS)?;
        if self.catalog.count == 0 {
            return Err(NavError::Config("catalog.count must be at least 1".into()));
        }

        let rot = &self.rotation;
        check_range("rotation.angular_velocity", rot.angular_velocity, -10.0, 10.0)?;
        check_range("rotation.tolerance", rot.tolerance, 1e-6, 2.0)?;
        check_range("rotation.reference", rot.reference, -1.0, 1.0)?;
        check_range("rotation.timeout_secs", rot.timeout_secs, 0.001, MAX_SECS)?;
        if rot.poll_interval_ms == 0 {
            return Err(NavError::Config(
                "rotation.poll_interval_ms must be at least 1".into(),
            ));
        }

        for (axis, value) in ["x", "y", "z"].iter().zip(self.frames.offset) {
            check_finite(&format!("frames.offset.{}", axis), value)?;
        }

        let sim = &self.sim;
        check_range("sim.server_startup_secs", sim.server_startup_secs, 0.0, MAX_SECS)?;
        check_range("sim.travel_speed", sim.travel_speed, 0.001, 100.0)?;
        check_range("sim.odom_rate_hz", sim.odom_rate_hz, 1.0, 10_000.0)?;
        for (axis, value) in ["x", "y", "yaw"].iter().zip(sim.start_pose) {
            check_finite(&format!("sim.start_pose.{}", axis), value)?;
        }
        Ok(())
    }
}

/// Upper bound for any seconds field (one hour)
const MAX_SECS: f64 = 3600.0;

fn check_finite(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(NavError::Config(format!(
            "{} must be a finite number, got {}",
            field, value
        )));
    }
    Ok(())
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    check_finite(field, value)?;
    if value < min || value > max {
        return Err(NavError::Config(format!(
            "{} must be within [{}, {}], got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

impl NavigationConfig {
    pub fn loop_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.loop_rate_hz)
    }

    pub fn server_wait(&self) -> Duration {
        Duration::from_secs_f64(self.server_wait_secs)
    }
}

impl RotationSection {
    pub fn to_rotation_config(&self) -> RotationConfig {
        RotationConfig {
            angular_velocity: self.angular_velocity,
            tolerance: self.tolerance,
            reference: self.reference,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs_f64(self.timeout_secs),
        }
    }
}

impl FramesSection {
    pub fn to_frame_config(&self) -> FrameConfig {
        let [x, y, z] = self.offset;
        FrameConfig {
            map: self.map.clone(),
            parent: self.parent.clone(),
            child: self.child.clone(),
            offset: Vector3::new(x, y, z),
            lookup_failure_pause: Duration::from_millis(self.lookup_failure_pause_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSource;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = YatraConfig::parse("").unwrap();
        assert_eq!(config.navigation.loop_rate_hz, 10.0);
        assert_eq!(config.navigation.unreachable_policy, UnreachablePolicy::Skip);
        assert_eq!(config.catalog.prefix, "aruco_lookup_locations/target_");
        assert_eq!(config.catalog.count, 4);
        assert_eq!(config.rotation.angular_velocity, 0.8);
        assert_eq!(config.frames.child, "my_frame");
        assert_eq!(config.navigation.loop_period(), Duration::from_millis(100));
    }

    #[test]
    fn test_sections_and_params() {
        let config = YatraConfig::parse(
            r#"
            [navigation]
            max_goal_retries = 1
            unreachable_policy = "halt"

            [rotation]
            timeout_secs = 2.5

            [params.aruco_lookup_locations]
            target_1 = [1.0, 0.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.navigation.max_goal_retries, 1);
        assert_eq!(config.navigation.unreachable_policy, UnreachablePolicy::Halt);
        assert_eq!(
            config.rotation.to_rotation_config().timeout,
            Duration::from_millis(2500)
        );
        assert!(
            ParameterSource::get(&config.params, "aruco_lookup_locations/target_1").is_some()
        );
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let err = YatraConfig::parse(
            r#"
            [navigation]
            unreachable_policy = "panic"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, NavError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for text in [
            "[navigation]\nloop_rate_hz = 0.0",
            "[rotation]\ntolerance = -1.0",
            "[rotation]\npoll_interval_ms = 0",
            "[catalog]\ncount = 0",
            "[navigation]\nserver_wait_secs = inf",
            "[navigation]\nloop_rate_hz = nan",
            "[rotation]\ntimeout_secs = 1e300",
            "[frames]\noffset = [0.5, inf, 0.2]",
            "[sim]\nserver_startup_secs = -1.0",
            "[sim]\ntravel_speed = 1e-300",
            "[sim]\nodom_rate_hz = 1e-300",
        ] {
            assert!(
                matches!(YatraConfig::parse(text), Err(NavError::Config(_))),
                "{} should be rejected",
                text
            );
        }
    }
}
