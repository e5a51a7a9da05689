//! rollcall-core: identity and liveness over a short burst of frames.
//!
//! The pipeline takes the faces found in the first frame of a burst, matches
//! each one against an enrolled gallery, and watches the eyes of every face
//! across the remaining frames for a blink. Face detection, encoding and
//! landmark regression are delegated to a [`FaceExtractor`]; this crate only
//! consumes their output.

pub mod config;
pub mod eye;
pub mod gallery;
pub mod liveness;
pub mod pipeline;
pub mod types;

pub use config::{ConfigError, PipelineConfig};
pub use eye::{face_openness, openness};
pub use gallery::{
    DistanceSearch, Gallery, GalleryError, GalleryIndex, GallerySource, LinearScan, MatchResult,
};
pub use liveness::{detect_blink, LivenessResult, LivenessTracker};
pub use pipeline::{ExtractError, FaceExtractor, SequenceRecognitionPipeline};
pub use types::{
    BoundingBox, DetectedFace, Encoding, EyePoints, FaceLandmarks, GalleryEntry, LandmarkError,
    Point, RecognitionResult,
};
