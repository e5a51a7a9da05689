//! Recorded extractor output for one frame burst.
//!
//! The face library runs on the capture side; what reaches rollcall is its
//! per-frame output serialised as JSON:
//!
//! ```json
//! {"frames": [
//!   {"faces": [{"box": {"top": 40, "right": 180, "bottom": 160, "left": 60},
//!               "encoding": [0.12, -0.05],
//!               "left_eye": [[0,0],[3,-1.5],[7,-1.5],[10,0],[7,1.5],[3,1.5]],
//!               "right_eye": [[0,0],[3,-1.5],[7,-1.5],[10,0],[7,1.5],[3,1.5]]}]}
//! ]}
//! ```
//!
//! Only the first frame needs `box` and `encoding`. Faces are positional:
//! the i-th face of every frame is the i-th reference face, so a reference
//! face without `box` or `encoding` ends the list of faces tracked.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use rollcall_core::{
    BoundingBox, DetectedFace, Encoding, ExtractError, FaceExtractor, FaceLandmarks, Point,
};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to read capture {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed capture: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Capture {
    pub frames: Vec<FrameObservation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameObservation {
    #[serde(default)]
    pub faces: Vec<FaceObservation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaceObservation {
    #[serde(rename = "box")]
    pub bbox: Option<BoundingBox>,
    pub encoding: Option<Vec<f32>>,
    pub left_eye: Option<Vec<Point>>,
    pub right_eye: Option<Vec<Point>>,
}

impl Capture {
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let json = std::fs::read_to_string(path).map_err(|source| CaptureError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Replays recorded observations through the [`FaceExtractor`] boundary.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordedExtractor;

impl FaceExtractor for RecordedExtractor {
    type Frame = FrameObservation;

    /// Reference faces stop at the first face missing a box or encoding.
    /// Skipping it instead would pair every later face with the landmarks
    /// recorded one slot earlier.
    fn detect(&mut self, frame: &FrameObservation) -> Result<Vec<DetectedFace>, ExtractError> {
        let faces: Vec<DetectedFace> = frame
            .faces
            .iter()
            .map_while(|face| match (face.bbox, &face.encoding) {
                (Some(bbox), Some(values)) => Some(DetectedFace {
                    bbox,
                    encoding: Encoding::new(values.clone()),
                }),
                _ => None,
            })
            .collect();
        if faces.len() < frame.faces.len() {
            tracing::warn!(
                kept = faces.len(),
                recorded = frame.faces.len(),
                "reference face without box or encoding; later faces dropped"
            );
        }
        Ok(faces)
    }

    /// Landmark sets stop at the first face with no eyes recorded, so later
    /// faces are not shifted into the wrong slot.
    fn landmarks(&mut self, frame: &FrameObservation) -> Result<Vec<FaceLandmarks>, ExtractError> {
        Ok(frame
            .faces
            .iter()
            .map_while(|face| match (&face.left_eye, &face.right_eye) {
                (None, None) => None,
                (left, right) => Some(FaceLandmarks {
                    left_eye: left.clone().unwrap_or_default(),
                    right_eye: right.clone().unwrap_or_default(),
                }),
            })
            .collect())
    }
}
