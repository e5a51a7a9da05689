use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::eye::face_openness;
use crate::gallery::{Gallery, GalleryIndex, GallerySource};
use crate::liveness::LivenessTracker;
use crate::types::{DetectedFace, FaceLandmarks, RecognitionResult};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("face extraction failed: {0}")]
    Failed(String),
}

/// Boundary to the face detection / landmark library.
///
/// Both lists are positional: the i-th landmark set of any frame is taken to
/// belong to the i-th face detected in the reference frame. A landmark list
/// shorter than the reference detections means the trailing slots were not
/// observed in that frame.
pub trait FaceExtractor {
    type Frame;

    /// Faces and their encodings, in a stable order.
    fn detect(&mut self, frame: &Self::Frame) -> Result<Vec<DetectedFace>, ExtractError>;

    /// Eye landmarks per face, in the same order as [`detect`](Self::detect).
    fn landmarks(&mut self, frame: &Self::Frame) -> Result<Vec<FaceLandmarks>, ExtractError>;
}

/// Identity and liveness for every face of a frame burst.
///
/// Each call to [`process`](Self::process) loads its own gallery snapshot and
/// owns its own liveness state; nothing carries over between calls.
pub struct SequenceRecognitionPipeline<E, G> {
    extractor: E,
    gallery: G,
    config: PipelineConfig,
}

impl<E: FaceExtractor, G: GallerySource> SequenceRecognitionPipeline<E, G> {
    /// Fails if `config` does not validate.
    pub fn new(extractor: E, gallery: G, config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            extractor,
            gallery,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline over `frames`, the first of which is the reference.
    ///
    /// Returns one result per face of the reference frame, in detection
    /// order. Never fails: unusable input degrades to no identity or not live.
    pub fn process(&mut self, frames: &[E::Frame]) -> Vec<RecognitionResult> {
        let Some(reference) = frames.first() else {
            tracing::debug!("empty frame sequence");
            return Vec::new();
        };

        let faces = match self.extractor.detect(reference) {
            Ok(faces) => faces,
            Err(e) => {
                tracing::warn!(error = %e, "reference frame detection failed");
                return Vec::new();
            }
        };
        if faces.is_empty() {
            tracing::debug!(frames = frames.len(), "no faces in reference frame");
            return Vec::new();
        }

        let gallery = match self.gallery.load() {
            Ok(gallery) => gallery,
            Err(e) => {
                tracing::warn!(error = %e, "gallery load failed; matching against empty gallery");
                Gallery::new()
            }
        };
        let index = GalleryIndex::new(gallery, self.config.match_threshold);

        let mut tracker = LivenessTracker::new(faces.len(), self.config.openness_threshold);
        for (frame_idx, frame) in frames.iter().enumerate() {
            let landmarks = match self.extractor.landmarks(frame) {
                Ok(landmarks) => landmarks,
                Err(e) => {
                    tracing::warn!(frame = frame_idx, error = %e, "landmark extraction failed");
                    continue;
                }
            };
            for (slot, face) in landmarks.iter().enumerate() {
                match face_openness(face) {
                    Some(score) => tracker.record(slot, score),
                    None => tracing::debug!(
                        frame = frame_idx,
                        slot,
                        "degenerate eye landmarks; no sample"
                    ),
                }
            }
        }

        faces
            .into_iter()
            .enumerate()
            .map(|(slot, face)| {
                let matched = index.best_match(&face.encoding);
                let liveness = tracker.assess(slot);
                tracing::info!(
                    slot,
                    identity = ?matched.identity,
                    distance = ?matched.distance,
                    is_live = liveness.is_live,
                    samples = liveness.samples_analysed,
                    "face resolved"
                );
                RecognitionResult {
                    identity: matched.identity,
                    is_live: liveness.is_live,
                    bbox: face.bbox,
                }
            })
            .collect()
    }
}
