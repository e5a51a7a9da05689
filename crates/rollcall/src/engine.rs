use thiserror::Error;

use rollcall_core::{Gallery, PipelineConfig, RecognitionResult, SequenceRecognitionPipeline};

use crate::capture::{Capture, RecordedExtractor};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] rollcall_core::ConfigError),
    #[error("recognition worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Run the recognition pipeline over a recorded burst.
///
/// The pipeline is CPU-bound and synchronous, so it runs on the blocking pool
/// instead of an async worker. The gallery is the snapshot the caller just
/// loaded; the worker owns it and its liveness state for this call only.
pub async fn run_check(
    capture: Capture,
    gallery: Gallery,
    config: PipelineConfig,
) -> Result<Vec<RecognitionResult>, EngineError> {
    let frames = capture.frames;
    tracing::debug!(
        frames = frames.len(),
        enrolled = gallery.len(),
        "check: running pipeline"
    );

    let mut pipeline = SequenceRecognitionPipeline::new(RecordedExtractor, gallery, config)?;

    let results = tokio::task::spawn_blocking(move || pipeline.process(&frames)).await?;

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{Encoding, GalleryEntry};

    const REFERENCE: &str =
        r#""box": {"top": 10, "right": 50, "bottom": 60, "left": 5}, "encoding": [1.0, 2.0],"#;

    /// Six-point eye whose aspect ratio is `score`.
    fn eye(score: f32) -> String {
        let h = score * 5.0;
        format!("[[0,0],[3,{}],[7,{}],[10,0],[7,{}],[3,{}]]", -h, -h, h, h)
    }

    fn alice() -> Gallery {
        std::iter::once(GalleryEntry {
            identity: "alice".to_string(),
            encoding: Encoding::new(vec![1.0, 2.0]),
        })
        .collect()
    }

    fn blink_capture() -> Capture {
        let frames: Vec<String> = [0.30f32, 0.30, 0.10, 0.10, 0.32]
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let eye = eye(*s);
                let reference = if i == 0 { REFERENCE } else { "" };
                format!(r#"{{"faces": [{{{reference} "left_eye": {eye}, "right_eye": {eye}}}]}}"#)
            })
            .collect();
        Capture::from_json(&format!(r#"{{"frames": [{}]}}"#, frames.join(","))).unwrap()
    }

    #[tokio::test]
    async fn test_check_identifies_and_verifies() {
        let results = run_check(blink_capture(), alice(), PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].identity.as_deref(), Some("alice"));
        assert!(results[0].is_live);
        assert_eq!(results[0].bbox.right, 50);
    }

    #[tokio::test]
    async fn test_unencoded_face_does_not_lend_its_blink() {
        // Face 0 blinks but has no encoding; face 1 is alice with open eyes.
        let frames: Vec<String> = [0.30f32, 0.30, 0.10, 0.10, 0.32]
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let blinking = eye(*s);
                let open = eye(0.30);
                let reference = if i == 0 { REFERENCE } else { "" };
                format!(
                    r#"{{"faces": [{{"left_eye": {blinking}, "right_eye": {blinking}}},
                                  {{{reference} "left_eye": {open}, "right_eye": {open}}}]}}"#
                )
            })
            .collect();
        let capture = Capture::from_json(&format!(r#"{{"frames": [{}]}}"#, frames.join(","))).unwrap();

        let results = run_check(capture, alice(), PipelineConfig::default())
            .await
            .unwrap();
        assert!(results.iter().all(|r| !r.is_live));
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_check_rejects_bad_config() {
        let config = PipelineConfig {
            match_threshold: -1.0,
            ..Default::default()
        };
        let err = run_check(Capture::default(), Gallery::new(), config)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[tokio::test]
    async fn test_check_empty_capture() {
        let results = run_check(Capture::default(), Gallery::new(), PipelineConfig::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
