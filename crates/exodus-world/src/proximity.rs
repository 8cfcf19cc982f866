//! Proximity scoring against a reference point.
//!
//! Locations closest to the configured reference point score highest:
//! `score = 1 - d / d_max`, where `d` is the planar distance between a
//! location's centroid and the reference point in degrees. Graph inputs
//! normally arrive with scores precomputed; this is the fallback for inputs
//! that ship centroids instead.

use std::collections::BTreeMap;

use exodus_types::LocationId;

/// Planar distance between a `[lat, lon]` centroid and a `(lat, lon)` point.
pub fn planar_distance(centroid: [f64; 2], reference: (f64, f64)) -> f64 {
    let [lat, lon] = centroid;
    let (ref_lat, ref_lon) = reference;
    (lon - ref_lon).hypot(lat - ref_lat)
}

/// Compute proximity scores in `[0, 1]` for every centroid.
///
/// The farthest centroid scores 0. If every centroid sits on the reference
/// point the maximum distance is zero and all scores are 1.
pub fn proximity_scores(
    centroids: &BTreeMap<LocationId, [f64; 2]>,
    reference: (f64, f64),
) -> BTreeMap<LocationId, f64> {
    let distances: BTreeMap<&LocationId, f64> = centroids
        .iter()
        .map(|(id, c)| (id, planar_distance(*c, reference)))
        .collect();

    let max_distance = distances.values().copied().fold(0.0_f64, f64::max);

    distances
        .into_iter()
        .map(|(id, d)| {
            let score = if max_distance > 0.0 {
                (1.0 - d / max_distance).clamp(0.0, 1.0)
            } else {
                1.0
            };
            (id.clone(), score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_scores_highest_farthest_zero() {
        let mut centroids = BTreeMap::new();
        centroids.insert(LocationId::from("near"), [1.0, 0.0]);
        centroids.insert(LocationId::from("mid"), [2.0, 0.0]);
        centroids.insert(LocationId::from("far"), [4.0, 0.0]);

        let scores = proximity_scores(&centroids, (0.0, 0.0));
        let near = scores.get(&LocationId::from("near")).copied().unwrap_or(-1.0);
        let mid = scores.get(&LocationId::from("mid")).copied().unwrap_or(-1.0);
        let far = scores.get(&LocationId::from("far")).copied().unwrap_or(-1.0);

        assert!((near - 0.75).abs() < 1e-12);
        assert!((mid - 0.5).abs() < 1e-12);
        assert!(far.abs() < 1e-12);
    }

    #[test]
    fn coincident_centroids_score_one() {
        let mut centroids = BTreeMap::new();
        centroids.insert(LocationId::from("a"), [3.0, 4.0]);
        let scores = proximity_scores(&centroids, (3.0, 4.0));
        assert_eq!(scores.len(), 1);
        assert!(scores.values().all(|s| (s - 1.0).abs() < 1e-12));
    }

    #[test]
    fn distance_uses_lon_and_lat() {
        let d = planar_distance([3.0, 4.0], (0.0, 0.0));
        assert!((d - 5.0).abs() < 1e-12);
    }
}
