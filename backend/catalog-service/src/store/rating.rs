//! Per-laptop rating aggregates.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Running rating summary for one laptop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub count: u32,
    pub sum: f64,
}

impl Rating {
    pub fn average(&self) -> f64 {
        self.sum / f64::from(self.count)
    }
}

/// Concurrent laptop-id to rating aggregate map.
pub trait RatingStore: Send + Sync {
    /// Atomic read-modify-write: record `score` and return the post-update
    /// aggregate. Linearizable per key; concurrent adds never lose updates.
    fn add(&self, laptop_id: &str, score: f64) -> Rating;
}

/// In-memory implementation; `add` is serialized per store instance.
#[derive(Default)]
pub struct InMemoryRatingStore {
    ratings: Mutex<HashMap<String, Rating>>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn add(&self, laptop_id: &str, score: f64) -> Rating {
        let mut ratings = self.ratings.lock();
        let rating = ratings
            .entry(laptop_id.to_owned())
            .and_modify(|r| {
                r.count += 1;
                r.sum += score;
            })
            .or_insert(Rating {
                count: 1,
                sum: score,
            });
        *rating
    }
}
