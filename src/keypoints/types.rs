//! Keypoint types delivered by the external pose detection engine.
//!
//! Coordinates are normalized to the image: `x` grows to the right, `y`
//! grows downwards, both in `[0, 1]`.

use serde::{Deserialize, Serialize};

/// A single tracked body landmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Detection confidence reported by the engine
    #[serde(default = "default_visibility")]
    pub visibility: f64,
}

fn default_visibility() -> f64 {
    1.0
}

impl Keypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }

    /// Component-wise midpoint of two keypoints.
    pub fn midpoint(&self, other: &Keypoint) -> Keypoint {
        Keypoint {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
            visibility: self.visibility.min(other.visibility),
        }
    }
}

/// Engine-defined semantic landmark positions that posture analysis reads.
///
/// Discriminants are the stable indices of the 33-point body topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Landmark {
    Nose = 0,
    LeftEye = 2,
    RightEye = 5,
    LeftEar = 7,
    RightEar = 8,
    LeftShoulder = 11,
    RightShoulder = 12,
}

impl Landmark {
    /// Every landmark that must be present before metrics are computed.
    pub const REQUIRED: [Landmark; 7] = [
        Landmark::Nose,
        Landmark::LeftEye,
        Landmark::RightEye,
        Landmark::LeftEar,
        Landmark::RightEar,
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Landmark::Nose => "nose",
            Landmark::LeftEye => "left_eye",
            Landmark::RightEye => "right_eye",
            Landmark::LeftEar => "left_ear",
            Landmark::RightEar => "right_ear",
            Landmark::LeftShoulder => "left_shoulder",
            Landmark::RightShoulder => "right_shoulder",
        }
    }
}

impl std::fmt::Display for Landmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (#{})", self.name(), self.index())
    }
}

/// One frame's worth of keypoints, ordered by engine index.
///
/// Entries may be `null` on the wire when the engine could not place a
/// landmark; a set shorter than the highest required index is also valid
/// input and simply reports the tail as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeypointSet {
    points: Vec<Option<Keypoint>>,
}

impl KeypointSet {
    pub fn new(points: Vec<Option<Keypoint>>) -> Self {
        Self { points }
    }

    /// Build a set in which every entry is present.
    pub fn from_points(points: Vec<Keypoint>) -> Self {
        Self {
            points: points.into_iter().map(Some).collect(),
        }
    }

    /// Look up a landmark by its semantic position.
    pub fn get(&self, landmark: Landmark) -> Option<&Keypoint> {
        self.points.get(landmark.index()).and_then(|p| p.as_ref())
    }

    /// Place (or replace) a landmark, growing the set as needed.
    pub fn set(&mut self, landmark: Landmark, keypoint: Keypoint) {
        let index = landmark.index();
        if self.points.len() <= index {
            self.points.resize(index + 1, None);
        }
        self.points[index] = Some(keypoint);
    }

    /// Remove a landmark, leaving a hole at its index.
    pub fn clear(&mut self, landmark: Landmark) {
        if let Some(slot) = self.points.get_mut(landmark.index()) {
            *slot = None;
        }
    }

    /// First required landmark that is absent, if any.
    pub fn first_missing(&self) -> Option<Landmark> {
        Landmark::REQUIRED
            .iter()
            .copied()
            .find(|&landmark| self.get(landmark).is_none())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
