//! Pose store shared between the odometry feed and the control loop.
//!
//! Holds only the most recent odometry sample. The feed overwrites it at its
//! own rate; readers take a full copy so they never observe a half-written
//! sample.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::types::Odometry;

/// Latest odometry sample, safe to read while the feed writes.
#[derive(Debug, Default)]
pub struct PoseStore {
    latest: RwLock<Odometry>,
    /// Number of samples received since startup
    updates: AtomicU64,
}

/// Handle passed to the feed and to the rotation controller.
pub type SharedPoseStore = Arc<PoseStore>;

impl PoseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `sample`.
    pub fn with_sample(sample: Odometry) -> Self {
        Self {
            latest: RwLock::new(sample),
            updates: AtomicU64::new(0),
        }
    }

    /// Replace the stored sample (called from the odometry feed).
    pub fn update(&self, sample: Odometry) {
        let mut guard = self.latest.write().unwrap_or_else(|e| e.into_inner());
        *guard = sample;
        self.updates.fetch_add(1, Ordering::Release);
    }

    /// Copy of the latest sample.
    pub fn snapshot(&self) -> Odometry {
        *self.latest.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of samples received so far.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Pose, Quaternion, Vector3};
    use std::thread;

    fn sample(z: f64, t: u64) -> Odometry {
        Odometry {
            timestamp_us: t,
            pose: Pose {
                position: Vector3::new(1.0, 2.0, 0.0),
                orientation: Quaternion {
                    x: 0.0,
                    y: 0.0,
                    z,
                    w: (1.0 - z * z).sqrt(),
                },
            },
        }
    }

    #[test]
    fn test_update_overwrites() {
        let store = PoseStore::new();
        assert_eq!(store.update_count(), 0);

        store.update(sample(0.3, 1));
        store.update(sample(0.1, 2));

        let latest = store.snapshot();
        assert_eq!(latest.timestamp_us, 2);
        assert_eq!(latest.pose.orientation.z, 0.1);
        assert_eq!(store.update_count(), 2);
    }

    #[test]
    fn test_concurrent_reads_see_whole_samples() {
        let store: SharedPoseStore = Arc::new(PoseStore::new());
        let writer_store = Arc::clone(&store);

        let writer = thread::spawn(move || {
            for t in 0..2000u64 {
                let z = (t % 100) as f64 / 100.0;
                writer_store.update(sample(z, t));
            }
        });

        for _ in 0..2000 {
            let s = store.snapshot();
            // Each sample is written whole: timestamp and orientation agree.
            let expected_z = (s.timestamp_us % 100) as f64 / 100.0;
            if s.timestamp_us > 0 {
                assert_eq!(s.pose.orientation.z, expected_z);
            }
        }

        writer.join().unwrap();
        assert_eq!(store.update_count(), 2000);
    }
}
