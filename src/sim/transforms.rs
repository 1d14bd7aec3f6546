//! Simulated transform tree.
//!
//! Broadcast records are kept by child frame. The robot-mounted frame
//! (`robot_frame`) is attached to the map through the simulated body pose,
//! so a lookup from the map to any frame chained onto it follows the robot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::SimWorld;
use crate::error::{NavError, Result};
use crate::middleware::{TransformBroadcaster, TransformBuffer};
use crate::types::{Header, Transform, TransformStamped};
use crate::utils::now_us;

/// Guard against cycles in broadcast records.
const MAX_CHAIN_DEPTH: usize = 16;

/// Transform broadcaster + buffer over the simulated world.
#[derive(Clone)]
pub struct SimTransforms {
    world: SimWorld,
    map_frame: String,
    robot_frame: String,
    records: Arc<Mutex<HashMap<String, TransformStamped>>>,
}

impl SimTransforms {
    pub fn new(world: SimWorld, map_frame: &str, robot_frame: &str) -> Self {
        Self {
            world,
            map_frame: map_frame.to_string(),
            robot_frame: robot_frame.to_string(),
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Transform expressing `frame` in the map frame.
    fn map_to(&self, frame: &str) -> Result<(Transform, u64)> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let mut chain = Transform::default();
        let mut stamp = now_us();
        let mut current = frame.to_string();

        for _ in 0..MAX_CHAIN_DEPTH {
            if current == self.map_frame {
                return Ok((chain, stamp));
            }
            if current == self.robot_frame {
                let body = Transform::from(self.world.body().pose());
                return Ok((body.then(&chain), stamp));
            }
            let record = records.get(&current).ok_or_else(|| {
                NavError::Transform(format!(
                    "\"{}\" passed to lookupTransform argument source_frame does not exist",
                    frame
                ))
            })?;
            chain = record.transform.then(&chain);
            stamp = stamp.min(record.header.timestamp_us);
            current = record.header.frame_id.clone();
        }

        Err(NavError::Transform(format!(
            "could not resolve \"{}\" to \"{}\" within {} links",
            frame, self.map_frame, MAX_CHAIN_DEPTH
        )))
    }
}

impl TransformBroadcaster for SimTransforms {
    fn send_transform(&mut self, transform: TransformStamped) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(transform.child_frame_id.clone(), transform);
    }
}

impl TransformBuffer for SimTransforms {
    fn lookup_transform(&self, target: &str, source: &str) -> Result<TransformStamped> {
        if target != self.map_frame {
            return Err(NavError::Transform(format!(
                "lookups are only resolved from \"{}\", got \"{}\"",
                self.map_frame, target
            )));
        }
        let (transform, timestamp_us) = self.map_to(source)?;
        Ok(TransformStamped {
            header: Header {
                frame_id: target.to_string(),
                timestamp_us,
            },
            child_frame_id: source.to_string(),
            transform,
        })
    }
}
