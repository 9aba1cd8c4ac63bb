//! Greedy seed-distance spatial clustering
//!
//! Candidates are visited in order. Each unclaimed candidate seeds a cluster
//! that absorbs every later unclaimed candidate within the merge distance of
//! the seed. Membership is measured from the seed only, so a cluster can hold
//! points further than the merge distance from each other, and the result
//! depends on input order.

use crate::detection::statistics::Candidate;

/// Group candidates into clusters of indices into `candidates`
pub fn cluster_by_seed_distance(candidates: &[Candidate], merge_distance_km: f64) -> Vec<Vec<usize>> {
    let mut claimed = vec![false; candidates.len()];
    let mut clusters = Vec::new();

    for (i, seed) in candidates.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;
        let mut members = vec![i];

        for (j, other) in candidates.iter().enumerate().skip(i + 1) {
            if claimed[j] {
                continue;
            }
            if seed.location.distance_to(&other.location) <= merge_distance_km {
                claimed[j] = true;
                members.push(j);
            }
        }

        clusters.push(members);
    }

    clusters
}
