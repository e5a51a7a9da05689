//! Eye openness from six landmark points.
//!
//! The score is the mean of the two vertical lid distances divided by the
//! corner-to-corner width, so it does not depend on how far the face is from
//! the camera. An open eye sits around 0.3; a closed one drops towards 0.1.

use crate::types::{EyePoints, FaceLandmarks, Point};

fn dist(a: Point, b: Point) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Openness of one eye, or `None` when the points are degenerate.
///
/// Requires exactly six points. A zero horizontal width would divide by zero,
/// so it yields no sample rather than NaN or infinity.
pub fn openness(points: &[Point]) -> Option<f32> {
    let EyePoints(p) = EyePoints::try_from(points).ok()?;

    let horizontal = dist(p[0], p[3]);
    if horizontal <= f32::EPSILON {
        return None;
    }

    let vertical = (dist(p[1], p[5]) + dist(p[2], p[4])) / 2.0;
    let score = vertical / horizontal;
    score.is_finite().then_some(score)
}

/// Openness of a face: the mean of both eyes, or the one usable eye.
pub fn face_openness(landmarks: &FaceLandmarks) -> Option<f32> {
    match (openness(&landmarks.left_eye), openness(&landmarks.right_eye)) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(s), None) | (None, Some(s)) => Some(s),
        (None, None) => None,
    }
}
