//! Enrolled identities and nearest-neighbour matching.
//!
//! Matching is a two-step contract: a [`DistanceSearch`] finds the closest
//! entry, then [`GalleryIndex`] applies the threshold gate. Only the search
//! step needs replacing when galleries grow large enough to want a spatial
//! index; the decision rule stays put.

use thiserror::Error;

use crate::types::{Encoding, GalleryEntry};

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("gallery unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can hand out a point-in-time snapshot of the gallery.
pub trait GallerySource {
    fn load(&self) -> Result<Gallery, GalleryError>;
}

/// Ordered identity → encoding mapping with unique identities.
///
/// Iteration order is insertion order, which is also the tie-break order for
/// equally distant matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. An identity already present keeps its position and takes
    /// the new encoding.
    pub fn insert(&mut self, identity: impl Into<String>, encoding: Encoding) {
        let identity = identity.into();
        match self.entries.iter_mut().find(|e| e.identity == identity) {
            Some(existing) => existing.encoding = encoding,
            None => self.entries.push(GalleryEntry { identity, encoding }),
        }
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<GalleryEntry> for Gallery {
    fn from_iter<I: IntoIterator<Item = GalleryEntry>>(iter: I) -> Self {
        let mut gallery = Gallery::new();
        for entry in iter {
            gallery.insert(entry.identity, entry.encoding);
        }
        gallery
    }
}

/// An in-memory gallery is its own snapshot.
impl GallerySource for Gallery {
    fn load(&self) -> Result<Gallery, GalleryError> {
        Ok(self.clone())
    }
}

/// Closest-entry search over a gallery.
pub trait DistanceSearch {
    /// Index and distance of the entry closest to `query`, or `None` when no
    /// entry is comparable.
    fn nearest(&self, entries: &[GalleryEntry], query: &Encoding) -> Option<(usize, f32)>;
}

/// Exhaustive scan. Adequate for classroom-sized galleries.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScan;

impl DistanceSearch for LinearScan {
    fn nearest(&self, entries: &[GalleryEntry], query: &Encoding) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, entry) in entries.iter().enumerate() {
            let Some(distance) = entry.encoding.distance(query) else {
                tracing::debug!(
                    identity = %entry.identity,
                    expected = query.dim(),
                    got = entry.encoding.dim(),
                    "skipping gallery entry with mismatched dimension"
                );
                continue;
            };
            // Strict comparison keeps the first entry on ties.
            let closer = match best {
                None => true,
                Some((_, d)) => distance < d,
            };
            if closer {
                best = Some((idx, distance));
            }
        }
        best
    }
}

/// Outcome of comparing one encoding against the gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Identity accepted by the threshold gate.
    pub identity: Option<String>,
    /// Distance to the closest entry, accepted or not.
    pub distance: Option<f32>,
}

/// Gallery plus threshold gate.
pub struct GalleryIndex<S = LinearScan> {
    gallery: Gallery,
    threshold: f32,
    search: S,
}

impl GalleryIndex<LinearScan> {
    pub fn new(gallery: Gallery, threshold: f32) -> Self {
        Self::with_search(gallery, threshold, LinearScan)
    }
}

impl<S: DistanceSearch> GalleryIndex<S> {
    pub fn with_search(gallery: Gallery, threshold: f32, search: S) -> Self {
        Self {
            gallery,
            threshold,
            search,
        }
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// Identity of the closest entry if it lies strictly within the threshold.
    pub fn match_identity(&self, encoding: &Encoding) -> Option<&str> {
        let (idx, distance) = self.search.nearest(self.gallery.entries(), encoding)?;
        if distance < self.threshold {
            Some(self.gallery.entries()[idx].identity.as_str())
        } else {
            None
        }
    }

    /// Like [`match_identity`](Self::match_identity) but also reports the
    /// closest distance.
    pub fn best_match(&self, encoding: &Encoding) -> MatchResult {
        match self.search.nearest(self.gallery.entries(), encoding) {
            None => MatchResult {
                identity: None,
                distance: None,
            },
            Some((idx, distance)) => MatchResult {
                identity: (distance < self.threshold)
                    .then(|| self.gallery.entries()[idx].identity.clone()),
                distance: Some(distance),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identity: &str, values: &[f32]) -> GalleryEntry {
        GalleryEntry {
            identity: identity.to_string(),
            encoding: Encoding::new(values.to_vec()),
        }
    }

    fn gallery<const N: usize>(entries: [GalleryEntry; N]) -> Gallery {
        entries.into_iter().collect()
    }

    #[test]
    fn test_empty_gallery_never_matches() {
        let index = GalleryIndex::new(Gallery::new(), 0.6);
        assert_eq!(index.match_identity(&Encoding::new(vec![0.0, 0.0])), None);
        assert_eq!(
            index.best_match(&Encoding::new(vec![0.0])),
            MatchResult {
                identity: None,
                distance: None
            }
        );
    }

    #[test]
    fn test_picks_closest_within_threshold() {
        let index = GalleryIndex::new(
            gallery([entry("alice", &[0.0, 0.0]), entry("bob", &[1.0, 0.0])]),
            0.6,
        );
        let query = Encoding::new(vec![0.9, 0.0]);
        assert_eq!(index.match_identity(&query), Some("bob"));
    }

    #[test]
    fn test_closest_outside_threshold_is_none() {
        let index = GalleryIndex::new(gallery([entry("alice", &[0.0, 0.0])]), 0.6);
        let result = index.best_match(&Encoding::new(vec![0.0, 0.7]));
        assert_eq!(result.identity, None);
        assert!((result.distance.unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_distance_equal_to_threshold_is_rejected() {
        let index = GalleryIndex::new(gallery([entry("alice", &[0.0, 0.0])]), 0.5);
        assert_eq!(index.match_identity(&Encoding::new(vec![0.0, 0.5])), None);
        assert_eq!(
            index.match_identity(&Encoding::new(vec![0.0, 0.499])),
            Some("alice")
        );
    }

    #[test]
    fn test_exact_encoding_matches() {
        let index = GalleryIndex::new(gallery([entry("alice", &[0.3, 0.1, 0.2])]), 0.6);
        let result = index.best_match(&Encoding::new(vec![0.3, 0.1, 0.2]));
        assert_eq!(result.identity.as_deref(), Some("alice"));
        assert_eq!(result.distance, Some(0.0));
    }

    #[test]
    fn test_tie_resolves_to_first_entry() {
        let index = GalleryIndex::new(
            gallery([entry("alice", &[1.0, 0.0]), entry("bob", &[-1.0, 0.0])]),
            2.0,
        );
        assert_eq!(
            index.match_identity(&Encoding::new(vec![0.0, 0.0])),
            Some("alice")
        );
    }

    #[test]
    fn test_mismatched_dimension_is_not_a_candidate() {
        let index = GalleryIndex::new(
            gallery([entry("wide", &[0.0, 0.0, 0.0]), entry("bob", &[0.5, 0.0])]),
            0.6,
        );
        assert_eq!(
            index.match_identity(&Encoding::new(vec![0.0, 0.0])),
            Some("bob")
        );
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut g = gallery([entry("alice", &[0.0]), entry("bob", &[1.0])]);
        g.insert("alice", Encoding::new(vec![5.0]));
        assert_eq!(g.len(), 2);
        assert_eq!(g.entries()[0].identity, "alice");
        assert_eq!(g.entries()[0].encoding.values(), &[5.0]);
    }

    #[test]
    fn test_custom_search_is_used() {
        struct AlwaysLast;
        impl DistanceSearch for AlwaysLast {
            fn nearest(&self, entries: &[GalleryEntry], _: &Encoding) -> Option<(usize, f32)> {
                entries.len().checked_sub(1).map(|i| (i, 0.0))
            }
        }
        let index = GalleryIndex::with_search(
            gallery([entry("alice", &[0.0]), entry("bob", &[9.0])]),
            0.6,
            AlwaysLast,
        );
        assert_eq!(index.match_identity(&Encoding::new(vec![0.0])), Some("bob"));
    }
}
