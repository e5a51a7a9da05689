use thiserror::Error;

/// Default Euclidean distance below which a gallery entry counts as a match.
/// Suits 128-d dlib-style encodings.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Default openness score separating an open eye (above) from a closed one.
pub const DEFAULT_OPENNESS_THRESHOLD: f32 = 0.25;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("match threshold must be finite and positive, got {0}")]
    InvalidMatchThreshold(f32),
    #[error("openness threshold must be finite and positive, got {0}")]
    InvalidOpennessThreshold(f32),
}

/// Calibration knobs for the recognition pipeline.
///
/// Both thresholds are tuned per encoder and per camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub match_threshold: f32,
    pub openness_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            openness_threshold: DEFAULT_OPENNESS_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.match_threshold.is_finite() || self.match_threshold <= 0.0 {
            return Err(ConfigError::InvalidMatchThreshold(self.match_threshold));
        }
        if !self.openness_threshold.is_finite() || self.openness_threshold <= 0.0 {
            return Err(ConfigError::InvalidOpennessThreshold(
                self.openness_threshold,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_nan_match_threshold() {
        let config = PipelineConfig {
            match_threshold: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMatchThreshold(_))
        ));
    }

    #[test]
    fn test_rejects_zero_openness_threshold() {
        let config = PipelineConfig {
            openness_threshold: 0.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidOpennessThreshold(0.0))
        );
    }
}
