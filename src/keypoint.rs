// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose keypoint data model.
//!
//! A [`Pose`] is a named mapping from body-part identifiers (e.g.
//! `right_shoulder`) to detected [`Keypoint`]s for one frame of one video.
//! Poses are produced by an external pose-detection backend and consumed
//! read-only by the measurement engine; a part absent from the map means the
//! detector did not find it in that frame.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Well-known body-part identifiers (COCO keypoint naming).
pub mod parts {
    /// Nose landmark.
    pub const NOSE: &str = "nose";
    /// Left eye landmark.
    pub const LEFT_EYE: &str = "left_eye";
    /// Right eye landmark.
    pub const RIGHT_EYE: &str = "right_eye";
    /// Left ear landmark.
    pub const LEFT_EAR: &str = "left_ear";
    /// Right ear landmark.
    pub const RIGHT_EAR: &str = "right_ear";
    /// Left shoulder landmark.
    pub const LEFT_SHOULDER: &str = "left_shoulder";
    /// Right shoulder landmark.
    pub const RIGHT_SHOULDER: &str = "right_shoulder";
    /// Left elbow landmark.
    pub const LEFT_ELBOW: &str = "left_elbow";
    /// Right elbow landmark.
    pub const RIGHT_ELBOW: &str = "right_elbow";
    /// Left wrist landmark.
    pub const LEFT_WRIST: &str = "left_wrist";
    /// Right wrist landmark.
    pub const RIGHT_WRIST: &str = "right_wrist";
    /// Left hip landmark.
    pub const LEFT_HIP: &str = "left_hip";
    /// Right hip landmark.
    pub const RIGHT_HIP: &str = "right_hip";
    /// Left knee landmark.
    pub const LEFT_KNEE: &str = "left_knee";
    /// Right knee landmark.
    pub const RIGHT_KNEE: &str = "right_knee";
    /// Left ankle landmark.
    pub const LEFT_ANKLE: &str = "left_ankle";
    /// Right ankle landmark.
    pub const RIGHT_ANKLE: &str = "right_ankle";
}

/// A single 2D/3D skeletal landmark with detector confidence.
///
/// Coordinates use the image-space convention: `y` grows downward, so a
/// smaller `y` means higher in the frame. `z` is optional depth when the
/// upstream detector provides it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// X coordinate in image or normalized space.
    pub x: f32,
    /// Y coordinate in image or normalized space.
    pub y: f32,
    /// Optional depth coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
}

impl Keypoint {
    /// Create a new 2D keypoint.
    ///
    /// # Arguments
    ///
    /// * `x` - X coordinate.
    /// * `y` - Y coordinate.
    /// * `confidence` - Detector confidence in [0, 1].
    ///
    /// # Returns
    ///
    /// * A new `Keypoint` with no depth component.
    #[must_use]
    pub const fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self {
            x,
            y,
            z: None,
            confidence,
        }
    }

    /// Attach a depth coordinate.
    ///
    /// # Arguments
    ///
    /// * `z` - Depth coordinate.
    ///
    /// # Returns
    ///
    /// * The modified `Keypoint`.
    #[must_use]
    pub const fn with_z(mut self, z: f32) -> Self {
        self.z = Some(z);
        self
    }

    /// Euclidean distance to another keypoint.
    ///
    /// Uses the depth component only when both points carry one, so a 2D
    /// point never gains phantom depth from its neighbor.
    ///
    /// # Arguments
    ///
    /// * `other` - The other keypoint.
    ///
    /// # Returns
    ///
    /// * Non-negative distance.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        match (self.z, other.z) {
            (Some(z1), Some(z2)) => {
                let dz = z1 - z2;
                dz.mul_add(dz, dx.mul_add(dx, dy * dy)).sqrt()
            }
            _ => dx.mul_add(dx, dy * dy).sqrt(),
        }
    }
}

/// One detected body pose at one frame.
///
/// Immutable once handed to the measurement engine; construction uses the
/// builder-style [`Pose::with_point`] or [`Pose::insert`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Index of the video frame this pose was detected in.
    pub frame_index: usize,
    /// Body-part identifier to detected keypoint. Absent = not detected.
    points: HashMap<String, Keypoint>,
}

impl Pose {
    /// Create an empty pose for the given frame.
    ///
    /// # Arguments
    ///
    /// * `frame_index` - Index of the source video frame.
    ///
    /// # Returns
    ///
    /// * A new `Pose` with no detected points.
    #[must_use]
    pub fn new(frame_index: usize) -> Self {
        Self {
            frame_index,
            points: HashMap::new(),
        }
    }

    /// Add a keypoint, builder style.
    ///
    /// # Arguments
    ///
    /// * `part` - Body-part identifier (see [`parts`]).
    /// * `keypoint` - The detected keypoint.
    ///
    /// # Returns
    ///
    /// * The modified `Pose`.
    #[must_use]
    pub fn with_point(mut self, part: impl Into<String>, keypoint: Keypoint) -> Self {
        self.points.insert(part.into(), keypoint);
        self
    }

    /// Add a keypoint in place.
    pub fn insert(&mut self, part: impl Into<String>, keypoint: Keypoint) {
        self.points.insert(part.into(), keypoint);
    }

    /// Look up a keypoint by body-part identifier.
    ///
    /// # Arguments
    ///
    /// * `part` - Body-part identifier.
    ///
    /// # Returns
    ///
    /// * The keypoint, or `None` when the part was not detected.
    #[must_use]
    pub fn get(&self, part: &str) -> Option<&Keypoint> {
        self.points.get(part)
    }

    /// Check whether a body part was detected.
    #[must_use]
    pub fn contains(&self, part: &str) -> bool {
        self.points.contains_key(part)
    }

    /// Number of detected keypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if no keypoints were detected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Collect the subset of `names` absent from this pose, sorted.
    ///
    /// # Arguments
    ///
    /// * `names` - Body-part identifiers to resolve.
    ///
    /// # Returns
    ///
    /// * Sorted, deduplicated list of undetected part names.
    #[must_use]
    pub fn missing_from<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut missing: Vec<String> = names
            .into_iter()
            .filter(|name| !self.points.contains_key(*name))
            .map(ToString::to_string)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_distance_2d() {
        let a = Keypoint::new(0.0, 0.0, 1.0);
        let b = Keypoint::new(3.0, 4.0, 1.0);
        assert!((a.distance_to(&b) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_keypoint_distance_mixed_dimensionality() {
        // Depth is ignored unless both points carry it
        let a = Keypoint::new(0.0, 0.0, 1.0).with_z(10.0);
        let b = Keypoint::new(3.0, 4.0, 1.0);
        assert!((a.distance_to(&b) - 5.0).abs() < f32::EPSILON);

        let c = Keypoint::new(3.0, 4.0, 1.0).with_z(22.0);
        assert!((a.distance_to(&c) - 13.0).abs() < 1e-4);
    }

    #[test]
    fn test_pose_lookup() {
        let pose = Pose::new(7)
            .with_point(parts::RIGHT_WRIST, Keypoint::new(0.5, 0.2, 0.9))
            .with_point(parts::RIGHT_ELBOW, Keypoint::new(0.4, 0.4, 0.8));

        assert_eq!(pose.frame_index, 7);
        assert_eq!(pose.len(), 2);
        assert!(pose.contains(parts::RIGHT_WRIST));
        assert!(pose.get(parts::LEFT_WRIST).is_none());
    }

    #[test]
    fn test_missing_from_sorted_dedup() {
        let pose = Pose::new(0).with_point(parts::NOSE, Keypoint::new(0.5, 0.1, 0.9));
        let missing = pose.missing_from(
            [
                parts::RIGHT_WRIST,
                parts::NOSE,
                parts::LEFT_ANKLE,
                parts::RIGHT_WRIST,
            ]
            .into_iter(),
        );
        assert_eq!(missing, vec!["left_ankle", "right_wrist"]);
    }

    #[test]
    fn test_pose_serde_round_trip() {
        let pose = Pose::new(3).with_point(parts::NOSE, Keypoint::new(0.1, 0.2, 0.95));
        let json = serde_json::to_string(&pose).unwrap();
        let back: Pose = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pose);
    }
}
