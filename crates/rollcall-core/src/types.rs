use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 2-D landmark coordinate `(x, y)` in pixels.
pub type Point = (f32, f32);

/// Number of landmarks describing one eye.
pub const EYE_POINT_COUNT: usize = 6;

/// Face geometry vector produced by the external encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding {
    values: Vec<f32>,
}

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance to `other`, or `None` when the dimensions differ.
    pub fn distance(&self, other: &Encoding) -> Option<f32> {
        if self.values.len() != other.values.len() {
            return None;
        }
        let sum: f32 = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Some(sum.sqrt())
    }
}

impl From<Vec<f32>> for Encoding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// One enrolled identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub identity: String,
    pub encoding: Encoding,
}

/// Pixel box of one face detected in the reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// A face found in the reference frame together with its encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub encoding: Encoding,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LandmarkError {
    #[error("eye needs {EYE_POINT_COUNT} landmarks, got {0}")]
    InvalidEyePoints(usize),
}

/// The six ordered landmarks of one eye.
///
/// Indices 0 and 3 are the horizontal corners; (1, 5) and (2, 4) are the
/// vertical pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePoints(pub [Point; EYE_POINT_COUNT]);

impl TryFrom<&[Point]> for EyePoints {
    type Error = LandmarkError;

    /// Fails with the offending length when the slice is not exactly six points.
    fn try_from(points: &[Point]) -> Result<Self, Self::Error> {
        let arr: [Point; EYE_POINT_COUNT] = points
            .try_into()
            .map_err(|_| LandmarkError::InvalidEyePoints(points.len()))?;
        Ok(Self(arr))
    }
}

/// Raw eye landmarks for one face in one frame, as reported by the extractor.
///
/// Point counts are not validated here; a malformed eye simply yields no
/// openness sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left_eye: Vec<Point>,
    pub right_eye: Vec<Point>,
}

/// Final verdict for one face of the reference frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub identity: Option<String>,
    pub is_live: bool,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_known_geometry() {
        let a = Encoding::new(vec![0.0, 0.0]);
        let b = Encoding::new(vec![3.0, 4.0]);
        assert!((a.distance(&b).unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_dimension_mismatch() {
        let a = Encoding::new(vec![0.0, 0.0]);
        let b = Encoding::new(vec![0.0, 0.0, 0.0]);
        assert!(a.distance(&b).is_none());
    }

    #[test]
    fn test_eye_points_requires_six() {
        let five = [(0.0, 0.0); 5];
        let err = EyePoints::try_from(&five[..]).unwrap_err();
        assert_eq!(err, LandmarkError::InvalidEyePoints(5));
        assert_eq!(err.to_string(), "eye needs 6 landmarks, got 5");
        let six = [(1.0, 2.0); 6];
        assert!(EyePoints::try_from(&six[..]).is_ok());
    }

    #[test]
    fn test_result_serializes_box_field() {
        let result = RecognitionResult {
            identity: Some("alice".to_string()),
            is_live: true,
            bbox: BoundingBox {
                top: 10,
                right: 90,
                bottom: 110,
                left: 20,
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["box"]["top"], 10);
        assert_eq!(json["identity"], "alice");
        assert_eq!(json["is_live"], true);
    }
}
