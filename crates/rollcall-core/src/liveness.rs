//! Active liveness detection via eye blinks.
//!
//! A printed photograph or a frozen frame keeps the same eye openness for the
//! whole burst. A live subject asked to blink produces a clear dip: the score
//! falls from above the openness threshold to at or below it, then climbs back
//! above it. Seeing that full open → closed → open cycle is the liveness proof.
//!
//! # Threat Coverage
//!
//! - **Blocks:** Printed photographs, still images on a screen.
//! - **Does not block:** Video replay of someone blinking, masks with cut-out
//!   eyes.

/// Result of a blink check over one face slot's openness series.
#[derive(Debug, Clone, PartialEq)]
pub struct LivenessResult {
    /// Whether a full blink was observed.
    pub is_live: bool,
    /// Number of openness samples in the series.
    pub samples_analysed: usize,
    /// Index of the first sample at or below the threshold that followed an
    /// open sample.
    pub closed_at: Option<usize>,
    /// Index of the first open sample after `closed_at`.
    pub reopened_at: Option<usize>,
}

/// Scan `series` in order for an open → closed → open cycle.
///
/// "Open" means strictly above `threshold`; "closed" means at or below it. A
/// series that starts closed must open first before its closing counts.
/// Series with fewer than two samples are never live.
pub fn detect_blink(series: &[f32], threshold: f32) -> LivenessResult {
    let closed_at = series
        .windows(2)
        .position(|pair| pair[0] > threshold && pair[1] <= threshold)
        .map(|i| i + 1);

    // Any later closing transition is also after this one, so the first
    // closing is the only one worth checking for a reopen.
    let reopened_at = closed_at.and_then(|c| {
        series[c + 1..]
            .iter()
            .position(|&s| s > threshold)
            .map(|k| c + 1 + k)
    });

    LivenessResult {
        is_live: reopened_at.is_some(),
        samples_analysed: series.len(),
        closed_at,
        reopened_at,
    }
}

/// Per-slot openness series for one pipeline invocation.
///
/// Slots are fixed at construction from the faces of the reference frame.
/// Samples are appended frame by frame; classification happens once, after the
/// whole burst has been recorded.
#[derive(Debug, Clone)]
pub struct LivenessTracker {
    series: Vec<Vec<f32>>,
    threshold: f32,
}

impl LivenessTracker {
    pub fn new(slots: usize, threshold: f32) -> Self {
        Self {
            series: vec![Vec::new(); slots],
            threshold,
        }
    }

    pub fn slots(&self) -> usize {
        self.series.len()
    }

    /// Append a sample to `slot`. Samples for slots beyond the reference
    /// frame's face count are dropped.
    pub fn record(&mut self, slot: usize, score: f32) {
        match self.series.get_mut(slot) {
            Some(series) => series.push(score),
            None => tracing::debug!(
                slot,
                slots = self.series.len(),
                "dropping openness sample for untracked face slot"
            ),
        }
    }

    pub fn series(&self, slot: usize) -> &[f32] {
        self.series.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn assess(&self, slot: usize) -> LivenessResult {
        detect_blink(self.series(slot), self.threshold)
    }

    pub fn is_live(&self, slot: usize) -> bool {
        self.assess(slot).is_live
    }
}
