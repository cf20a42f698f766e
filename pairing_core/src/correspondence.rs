//! Spot correspondences: pairs of spots, one per track, that share a frame
//! and lie closer than a distance threshold.
//!
//! # Scan order
//! For every spot of `track1`, the spots of `track2` are scanned in storage
//! order and the **first** one in the same frame and within the threshold is
//! taken. This is not a nearest-neighbour search: a closer spot later in
//! `track2` is ignored, and two spots of `track1` in the same frame may both
//! map to the same spot of `track2`.

use crate::types::{Spot, Track};
use std::fmt;

/// Two spots from the same frame, one from each track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotPair<'a> {
    pub s1: &'a Spot,
    pub s2: &'a Spot,
}

impl<'a> SpotPair<'a> {
    pub fn new(s1: &'a Spot, s2: &'a Spot) -> Self {
        debug_assert_eq!(s1.frame, s2.frame, "spot pair across frames");
        Self { s1, s2 }
    }

    pub fn frame(&self) -> u32 {
        self.s1.frame
    }

    pub fn distance(&self) -> f64 {
        self.s1.distance_to(self.s2)
    }
}

impl fmt::Display for SpotPair<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.s1.id, self.s2.id)
    }
}

/// Find the frame-matched correspondences between two tracks.
///
/// A pair is recorded when both spots are in the same frame and their squared
/// distance is strictly below `max_distance²`. Pass `f64::INFINITY` to
/// disable the threshold. At most one pair is produced per spot of `track1`.
/// Output is in `track1` scan order.
pub fn find_correspondences<'a>(
    track1: &'a Track,
    track2: &'a Track,
    max_distance: f64,
) -> Vec<SpotPair<'a>> {
    let max_d2 = max_distance * max_distance;
    track1
        .spots
        .iter()
        .filter_map(|s1| {
            track2
                .spots
                .iter()
                .find(|s2| s1.frame == s2.frame && s1.squared_distance_to(s2) < max_d2)
                .map(|s2| SpotPair::new(s1, s2))
        })
        .collect()
}
