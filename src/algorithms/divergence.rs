//! Point-by-point comparison of two untimed tracks
//!
//! Vertices are paired by index up to the shorter track's length. A pair
//! diverges when its distance exceeds the threshold. Consecutive pairs with
//! the same flag are folded into segments, which is what a map overlay needs
//! to colour the test track.

use crate::algorithms::geodesy::distance_between;
use crate::core::Coordinate;
use serde::{Deserialize, Serialize};

/// One index-aligned pair of vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDivergence {
    pub index: usize,
    pub base: Coordinate,
    pub test: Coordinate,
    pub distance_m: f64,
    pub diverged: bool,
}

/// Run of consecutive pairs sharing the same divergence flag (indices inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceSegment {
    pub diverged: bool,
    pub start_index: usize,
    pub end_index: usize,
}

impl DivergenceSegment {
    pub fn pair_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackComparison {
    pub threshold_m: f64,
    pub pairs: Vec<PairDivergence>,
    pub segments: Vec<DivergenceSegment>,
    pub diverged_count: usize,
    pub max_distance_m: Option<f64>,
    /// Vertices of the base track beyond the paired range
    pub unpaired_base: usize,
    /// Vertices of the test track beyond the paired range
    pub unpaired_test: usize,
}

impl TrackComparison {
    pub fn is_diverged(&self) -> bool {
        self.diverged_count > 0
    }

    /// Per-pair divergence flags, in index order
    pub fn mask(&self) -> Vec<bool> {
        self.pairs.iter().map(|pair| pair.diverged).collect()
    }

    pub fn diverged_segments(&self) -> impl Iterator<Item = &DivergenceSegment> {
        self.segments.iter().filter(|segment| segment.diverged)
    }
}

/// Compare `test` against `base` with a divergence threshold in meters
pub fn compare_tracks(base: &[Coordinate], test: &[Coordinate], threshold_m: f64) -> TrackComparison {
    let paired = base.len().min(test.len());

    let pairs: Vec<PairDivergence> = base
        .iter()
        .zip(test)
        .enumerate()
        .map(|(index, (b, t))| {
            let distance_m = distance_between(b, t);
            PairDivergence {
                index,
                base: *b,
                test: *t,
                distance_m,
                diverged: distance_m > threshold_m,
            }
        })
        .collect();

    let mut segments: Vec<DivergenceSegment> = Vec::new();
    for pair in &pairs {
        match segments.last_mut() {
            Some(segment) if segment.diverged == pair.diverged => segment.end_index = pair.index,
            _ => segments.push(DivergenceSegment {
                diverged: pair.diverged,
                start_index: pair.index,
                end_index: pair.index,
            }),
        }
    }

    let diverged_count = pairs.iter().filter(|pair| pair.diverged).count();
    let max_distance_m = pairs.iter().map(|pair| pair.distance_m).reduce(f64::max);

    if base.len() != test.len() {
        log::debug!(
            "track lengths differ ({} vs {}); comparing first {} vertices",
            base.len(),
            test.len(),
            paired
        );
    }

    TrackComparison {
        threshold_m,
        pairs,
        segments,
        diverged_count,
        max_distance_m,
        unpaired_base: base.len() - paired,
        unpaired_test: test.len() - paired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geodesy::meters_to_latitude_degrees;
    use crate::core::DEFAULT_COMPARE_RADIUS_M;

    fn path(offsets_m: &[f64]) -> Vec<Coordinate> {
        offsets_m
            .iter()
            .enumerate()
            .map(|(i, offset)| Coordinate::new(37.5 + meters_to_latitude_degrees(*offset), 127.0 + i as f64 * 0.001))
            .collect()
    }

    #[test]
    fn test_identical_tracks_do_not_diverge() {
        let base = path(&[0.0; 5]);

        let result = compare_tracks(&base, &base, DEFAULT_COMPARE_RADIUS_M);

        assert!(!result.is_diverged());
        assert_eq!(result.max_distance_m, Some(0.0));
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].pair_count(), 5);
    }

    #[test]
    fn test_divergent_run_is_segmented() {
        let base = path(&[0.0; 6]);
        let test = path(&[10.0, 20.0, 400.0, 500.0, 30.0, 0.0]);

        let result = compare_tracks(&base, &test, 150.0);

        assert_eq!(result.mask(), vec![false, false, true, true, false, false]);
        assert_eq!(result.diverged_count, 2);
        assert_eq!(
            result.segments,
            vec![
                DivergenceSegment { diverged: false, start_index: 0, end_index: 1 },
                DivergenceSegment { diverged: true, start_index: 2, end_index: 3 },
                DivergenceSegment { diverged: false, start_index: 4, end_index: 5 },
            ]
        );
        assert_eq!(result.diverged_segments().count(), 1);
        assert!((result.max_distance_m.unwrap() - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_distance_itself_is_not_divergent() {
        let base = path(&[0.0]);
        let test = path(&[150.0]);
        let exact = distance_between(&base[0], &test[0]);

        let result = compare_tracks(&base, &test, exact);

        assert!(!result.pairs[0].diverged);
    }

    #[test]
    fn test_unequal_lengths_pair_prefix_only() {
        let base = path(&[0.0; 4]);
        let test = path(&[0.0; 7]);

        let result = compare_tracks(&base, &test, DEFAULT_COMPARE_RADIUS_M);

        assert_eq!(result.pairs.len(), 4);
        assert_eq!(result.unpaired_base, 0);
        assert_eq!(result.unpaired_test, 3);
    }

    #[test]
    fn test_empty_tracks_give_empty_comparison() {
        let result = compare_tracks(&[], &path(&[0.0, 0.0]), DEFAULT_COMPARE_RADIUS_M);

        assert!(result.pairs.is_empty());
        assert!(result.segments.is_empty());
        assert_eq!(result.max_distance_m, None);
        assert_eq!(result.unpaired_test, 2);
    }
}
