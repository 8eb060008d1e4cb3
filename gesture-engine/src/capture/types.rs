//! Core types for pose capture
//!
//! Defines the fundamental data structures used throughout the capture pipeline.

use crate::time::timebase::Timestamp;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A single tracked controller position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSample {
    /// World-space position
    pub position: Vec3,
    /// When the pose was sampled
    pub t: Timestamp,
}

impl PathSample {
    pub fn new(position: Vec3, t: Timestamp) -> Self {
        Self { position, t }
    }

    /// Convenience constructor from raw coordinates
    pub fn at(x: f32, y: f32, z: f32, t: Timestamp) -> Self {
        Self::new(Vec3::new(x, y, z), t)
    }

    /// Euclidean distance to another sample
    pub fn distance_to(&self, other: &PathSample) -> f32 {
        self.position.distance(other.position)
    }
}

/// Trigger/contact edge reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactEdge {
    /// Trigger pressed or hand made contact
    Engaged,
    /// Trigger released or contact lost
    Released,
}

/// Input delivered from the device side to the engine's owner thread
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// A new controller pose
    Pose(PathSample),
    /// A contact edge
    Contact(ContactEdge),
}

impl InputEvent {
    /// Check if this is a pose update
    pub fn is_pose(&self) -> bool {
        matches!(self, InputEvent::Pose(_))
    }

    /// Timestamp of the pose, if any
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            InputEvent::Pose(sample) => Some(sample.t),
            InputEvent::Contact(_) => None,
        }
    }
}

impl From<PathSample> for InputEvent {
    fn from(sample: PathSample) -> Self {
        InputEvent::Pose(sample)
    }
}

impl From<ContactEdge> for InputEvent {
    fn from(edge: ContactEdge) -> Self {
        InputEvent::Contact(edge)
    }
}
