//! Per-iteration transform broadcast and lookup.
//!
//! Every loop iteration publishes a static sensor-mounted frame and then
//! resolves that frame in the map, logging its position. Lookup failures are
//! logged and swallowed: they never stop the sequencing loop.

use std::thread;
use std::time::Duration;

use crate::middleware::{TransformBroadcaster, TransformBuffer};
use crate::types::{Header, Quaternion, Transform, TransformStamped, Vector3};

/// Frame names and the static offset published each iteration.
#[derive(Clone, Debug)]
pub struct FrameConfig {
    /// Global reference frame (goals and lookups)
    pub map: String,
    /// Sensor frame the offset is attached to
    pub parent: String,
    /// Child frame published by the broadcaster
    pub child: String,
    /// Translation of `child` in `parent` (meters)
    pub offset: Vector3,
    /// Sleep after a failed lookup
    pub lookup_failure_pause: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            map: "map".to_string(),
            parent: "explorer_tf/camera_rgb_optical_frame".to_string(),
            child: "my_frame".to_string(),
            offset: Vector3::new(0.5, 0.5, 0.2),
            lookup_failure_pause: Duration::from_secs(1),
        }
    }
}

/// Static `parent -> child` record, stamped with `timestamp_us`.
pub fn sensor_offset(frames: &FrameConfig, timestamp_us: u64) -> TransformStamped {
    TransformStamped {
        header: Header {
            frame_id: frames.parent.clone(),
            timestamp_us,
        },
        child_frame_id: frames.child.clone(),
        transform: Transform {
            translation: frames.offset,
            rotation: Quaternion::IDENTITY,
        },
    }
}

/// Publish the sensor offset with a fresh timestamp.
pub fn broadcast<B: TransformBroadcaster + ?Sized>(
    broadcaster: &mut B,
    frames: &FrameConfig,
    timestamp_us: u64,
) {
    tracing::debug!("Broadcasting {} -> {}", frames.parent, frames.child);
    broadcaster.send_transform(sensor_offset(frames, timestamp_us));
}

/// Resolve the child frame in the map frame.
///
/// Returns the translation on success. On failure a single warning is logged,
/// the configured pause is taken and `None` is returned.
pub fn listen<T: TransformBuffer + ?Sized>(buffer: &T, frames: &FrameConfig) -> Option<Vector3> {
    match buffer.lookup_transform(&frames.map, &frames.child) {
        Ok(stamped) => {
            let t = stamped.transform.translation;
            tracing::info!(
                "Position in {} frame: [{:.3},{:.3},{:.3}]",
                frames.map,
                t.x,
                t.y,
                t.z
            );
            Some(t)
        }
        Err(e) => {
            tracing::warn!("{}", e);
            if !frames.lookup_failure_pause.is_zero() {
                thread::sleep(frames.lookup_failure_pause);
            }
            None
        }
    }
}
