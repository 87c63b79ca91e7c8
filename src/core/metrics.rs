//! Geometric posture metrics derived from a single frame of keypoints.
//!
//! Only the head and shoulder landmarks are read. A frame that lacks any of
//! them yields no metrics at all; callers skip it rather than analyse a
//! partial body.

use crate::config::Thresholds;
use crate::keypoints::types::{KeypointSet, Landmark};
use serde::{Deserialize, Serialize};

/// Shoulder angle reported when the shoulders share an x coordinate.
pub const DEGENERATE_SHOULDER_ANGLE_DEG: f64 = 90.0;

/// Forward head ratio reported when the eyes sit level with the shoulders.
pub const DEGENERATE_FORWARD_HEAD_RATIO: f64 = f64::MAX;

/// Measurements for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureMetrics {
    /// Shoulder line tilt from horizontal, in degrees (0..=90)
    pub shoulder_angle_deg: f64,
    /// Horizontal head offset relative to the eye-shoulder height
    pub forward_head_ratio: f64,
    /// How far the ears have sunk towards the shoulders below the expected gap
    pub shoulder_slouch_ratio: f64,
    /// Signed horizontal offset of mid-shoulder from mid-eye
    pub head_forward_distance: f64,
}

/// A required landmark was absent from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingKeypointError {
    pub landmark: Landmark,
}

impl std::fmt::Display for MissingKeypointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Missing required keypoint: {}", self.landmark)
    }
}

impl std::error::Error for MissingKeypointError {}

/// Compute posture metrics from a frame of keypoints.
pub fn extract_metrics(
    keypoints: &KeypointSet,
    thresholds: &Thresholds,
) -> Result<PostureMetrics, MissingKeypointError> {
    let point = |landmark: Landmark| {
        keypoints
            .get(landmark)
            .copied()
            .ok_or(MissingKeypointError { landmark })
    };

    // Nose is not measured but its absence means the head was not tracked.
    point(Landmark::Nose)?;
    let left_eye = point(Landmark::LeftEye)?;
    let right_eye = point(Landmark::RightEye)?;
    let left_ear = point(Landmark::LeftEar)?;
    let right_ear = point(Landmark::RightEar)?;
    let left_shoulder = point(Landmark::LeftShoulder)?;
    let right_shoulder = point(Landmark::RightShoulder)?;

    let shoulder_rise = (left_shoulder.y - right_shoulder.y).abs();
    let shoulder_width = (left_shoulder.x - right_shoulder.x).abs();
    let shoulder_angle_deg = if shoulder_width == 0.0 {
        DEGENERATE_SHOULDER_ANGLE_DEG
    } else {
        (shoulder_rise / shoulder_width).atan().to_degrees()
    };

    let mid_shoulder = left_shoulder.midpoint(&right_shoulder);
    let mid_eye = left_eye.midpoint(&right_eye);
    let mid_ear = left_ear.midpoint(&right_ear);

    // Positive when the head sits left of the shoulders in image space.
    let head_forward_distance = mid_shoulder.x - mid_eye.x;
    let eye_to_shoulder = (mid_shoulder.y - mid_eye.y).abs();
    let forward_head_ratio = if eye_to_shoulder == 0.0 {
        DEGENERATE_FORWARD_HEAD_RATIO
    } else {
        head_forward_distance.abs() / eye_to_shoulder
    };

    let ear_to_shoulder = (mid_shoulder.y - mid_ear.y).abs();
    let shoulder_slouch_ratio = (thresholds.expected_ear_shoulder_ratio - ear_to_shoulder).max(0.0);

    Ok(PostureMetrics {
        shoulder_angle_deg,
        forward_head_ratio,
        shoulder_slouch_ratio,
        head_forward_distance,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::keypoints::types::Keypoint;

    /// Upright pose: level shoulders, head centred, ears well above shoulders.
    pub(crate) fn upright() -> KeypointSet {
        let mut set = KeypointSet::default();
        set.set(Landmark::Nose, Keypoint::new(0.50, 0.30));
        set.set(Landmark::LeftEye, Keypoint::new(0.52, 0.28));
        set.set(Landmark::RightEye, Keypoint::new(0.48, 0.28));
        set.set(Landmark::LeftEar, Keypoint::new(0.56, 0.30));
        set.set(Landmark::RightEar, Keypoint::new(0.44, 0.30));
        set.set(Landmark::LeftShoulder, Keypoint::new(0.65, 0.55));
        set.set(Landmark::RightShoulder, Keypoint::new(0.35, 0.55));
        set
    }

    #[test]
    fn test_upright_metrics() {
        let metrics = extract_metrics(&upright(), &Thresholds::default()).unwrap();

        assert!(metrics.shoulder_angle_deg.abs() < 1e-9);
        assert!(metrics.forward_head_ratio.abs() < 1e-9);
        assert_eq!(metrics.shoulder_slouch_ratio, 0.0);
        assert!(metrics.head_forward_distance.abs() < 1e-9);
    }

    #[test]
    fn test_shoulder_angle() {
        let mut set = upright();
        // Rise of 0.3 over a width of 0.3 is 45 degrees.
        set.set(Landmark::LeftShoulder, Keypoint::new(0.65, 0.70));
        set.set(Landmark::RightShoulder, Keypoint::new(0.35, 0.40));

        let metrics = extract_metrics(&set, &Thresholds::default()).unwrap();
        assert!((metrics.shoulder_angle_deg - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_vertical_shoulders_are_degenerate_maximum() {
        let mut set = upright();
        set.set(Landmark::LeftShoulder, Keypoint::new(0.5, 0.55));
        set.set(Landmark::RightShoulder, Keypoint::new(0.5, 0.55));

        let metrics = extract_metrics(&set, &Thresholds::default()).unwrap();
        assert_eq!(metrics.shoulder_angle_deg, DEGENERATE_SHOULDER_ANGLE_DEG);
    }

    #[test]
    fn test_forward_head_ratio() {
        let mut set = upright();
        // Eyes shifted 0.027 left of mid-shoulder, 0.27 above it.
        set.set(Landmark::LeftEye, Keypoint::new(0.493, 0.28));
        set.set(Landmark::RightEye, Keypoint::new(0.453, 0.28));

        let metrics = extract_metrics(&set, &Thresholds::default()).unwrap();
        assert!((metrics.head_forward_distance - 0.027).abs() < 1e-9);
        assert!((metrics.forward_head_ratio - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_eyes_level_with_shoulders_is_degenerate_maximum() {
        let mut set = upright();
        set.set(Landmark::LeftEye, Keypoint::new(0.52, 0.55));
        set.set(Landmark::RightEye, Keypoint::new(0.48, 0.55));

        let metrics = extract_metrics(&set, &Thresholds::default()).unwrap();
        assert_eq!(metrics.forward_head_ratio, DEGENERATE_FORWARD_HEAD_RATIO);
        assert!(metrics.forward_head_ratio.is_finite());
    }

    #[test]
    fn test_slouch_ratio() {
        let mut set = upright();
        // Ears 0.05 above shoulders against an expected 0.15 gap.
        set.set(Landmark::LeftEar, Keypoint::new(0.56, 0.50));
        set.set(Landmark::RightEar, Keypoint::new(0.44, 0.50));

        let metrics = extract_metrics(&set, &Thresholds::default()).unwrap();
        assert!((metrics.shoulder_slouch_ratio - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_missing_keypoint() {
        let mut set = upright();
        set.clear(Landmark::RightShoulder);

        let err = extract_metrics(&set, &Thresholds::default()).unwrap_err();
        assert_eq!(err.landmark, Landmark::RightShoulder);

        // Indices 0..=7 present: the right ear (8) is the first gap.
        let truncated = KeypointSet::from_points(vec![Keypoint::new(0.5, 0.5); 8]);
        let err = extract_metrics(&truncated, &Thresholds::default()).unwrap_err();
        assert_eq!(err.landmark, Landmark::RightEar);

        let truncated = KeypointSet::from_points(vec![Keypoint::new(0.5, 0.5); 12]);
        let err = extract_metrics(&truncated, &Thresholds::default()).unwrap_err();
        assert_eq!(err.landmark, Landmark::RightShoulder);
    }

    #[test]
    fn test_metrics_bounds_over_grid() {
        let thresholds = Thresholds::default();
        let steps = [0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0];

        for &lx in &steps {
            for &ry in &steps {
                for &ey in &steps {
                    let mut set = upright();
                    set.set(Landmark::LeftShoulder, Keypoint::new(lx, 0.5));
                    set.set(Landmark::RightShoulder, Keypoint::new(0.3, ry));
                    set.set(Landmark::LeftEye, Keypoint::new(0.5, ey));

                    let m = extract_metrics(&set, &thresholds).unwrap();
                    assert!((0.0..=90.0).contains(&m.shoulder_angle_deg));
                    assert!(m.forward_head_ratio >= 0.0);
                    assert!(m.shoulder_slouch_ratio >= 0.0);
                }
            }
        }
    }
}
