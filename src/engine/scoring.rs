use std::cmp::Ordering;

use crate::config::AssignmentSettings;
use crate::models::rider::Rider;

#[derive(Debug, Clone)]
pub struct Candidate {
    pub rider: Rider,
    pub distance_km: f64,
    pub batch_preferred: bool,
}

/// Orders the candidate set per policy. Batch-preferred riders (an added
/// stop is cheaper than a new trip) come first, then:
/// proximity+rating = distance buckets with rating tie-break, a single
/// flag = that key alone, neither = longest-idle-first for fairness.
/// Rush orders always use proximity+rating.
pub fn rank_candidates(
    mut candidates: Vec<Candidate>,
    rush: bool,
    settings: &AssignmentSettings,
) -> Vec<Candidate> {
    let proximity = settings.prioritize_proximity || rush;
    let rating = settings.prioritize_rating || rush;
    let bucket_km = settings.distance_bucket_km;

    candidates.sort_by(|a, b| {
        b.batch_preferred
            .cmp(&a.batch_preferred)
            .then_with(|| compare(a, b, proximity, rating, bucket_km))
    });
    candidates
}

fn compare(a: &Candidate, b: &Candidate, proximity: bool, rating: bool, bucket_km: f64) -> Ordering {
    match (proximity, rating) {
        (true, true) => distance_bucket(a.distance_km, bucket_km)
            .cmp(&distance_bucket(b.distance_km, bucket_km))
            .then_with(|| b.rider.rating.total_cmp(&a.rider.rating))
            .then_with(|| a.distance_km.total_cmp(&b.distance_km)),
        (true, false) => a.distance_km.total_cmp(&b.distance_km),
        (false, true) => b.rider.rating.total_cmp(&a.rider.rating),
        (false, false) => a.rider.idle_since.cmp(&b.rider.idle_since),
    }
}

fn distance_bucket(distance_km: f64, bucket_km: f64) -> i64 {
    (distance_km / bucket_km).floor() as i64
}
