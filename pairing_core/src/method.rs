//! Track pairing strategies.
//!
//! # Greedy skeleton shared by every strategy
//! 1. Track ids of `model1` are consumed in ascending order, one at a time.
//! 2. Each is scored against every still-available track of `model2`
//!    (also scanned in ascending id order).
//! 3. The best candidate, if any survives the strategy's rejection rule, is
//!    paired and removed from the pool; otherwise the left track is recorded
//!    unmatched.
//! 4. Tracks of `model2` left in the pool are recorded unmatched.
//!
//! The assignment is local and non-reciprocal, not a global optimum: when
//! several left tracks compete for the same right track, the one with the
//! smallest id wins it. The ascending enumeration order is what makes runs
//! reproducible.
//!
//! Whatever the selection criterion, the evidence stored in each track pair
//! is the set of frame-matched spot correspondences within the max pairing
//! distance.

use crate::{
    correspondence::{find_correspondences, SpotPair},
    error::Result,
    pairing::PairingBuilder,
    types::{Model, Position, Track, TrackId},
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::{debug, warn};

/// Capability shared by all strategies: pair the tracks of two models.
pub trait PairingMethod {
    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// Pair the tracks of `model1` with those of `model2`.
    ///
    /// Returns a builder already holding the pairs, the unmatched tracks and
    /// the units of `model1`; callers may still decorate it before building.
    fn pair<'a>(
        &self,
        model1: &'a Model,
        model2: &'a Model,
        max_pairing_distance: f64,
    ) -> Result<PairingBuilder<'a>>;
}

// ---------------------------------------------------------------------------
// Concensus: most frame-matched spots in common
// ---------------------------------------------------------------------------

/// Pairs each left track with the right track sharing the largest number of
/// spot correspondences. Ties go to the first right track in id order; a
/// best count of zero leaves the left track unmatched.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConcensusPairing;

impl PairingMethod for ConcensusPairing {
    fn name(&self) -> &'static str {
        "Maximize N closest spots"
    }

    fn pair<'a>(
        &self,
        model1: &'a Model,
        model2: &'a Model,
        max_pairing_distance: f64,
    ) -> Result<PairingBuilder<'a>> {
        let mut builder = PairingBuilder::new();
        builder.set_units(model1.space_units.as_str());

        let mut queue: VecDeque<(TrackId, &'a Track)> =
            model1.tracks.iter().map(|(&id, t)| (id, t)).collect();
        let mut pool: BTreeMap<TrackId, &'a Track> =
            model2.tracks.iter().map(|(&id, t)| (id, t)).collect();

        while let Some((id1, track1)) = queue.pop_front() {
            let mut best: Option<(TrackId, Vec<SpotPair<'a>>)> = None;
            for (&id2, &track2) in &pool {
                let commons = find_correspondences(track1, track2, max_pairing_distance);
                let best_count = best.as_ref().map_or(0, |(_, c)| c.len());
                if commons.len() > best_count {
                    best = Some((id2, commons));
                }
            }

            match best {
                Some((id2, commons)) => {
                    pool.remove(&id2);
                    debug!(%id1, %id2, n = commons.len(), "concensus pair");
                    builder.add_pair(id1, id2, commons)?;
                }
                None => {
                    debug!(%id1, "no track with spots in common");
                    builder.add_unmatched_left(id1, &track1.spots)?;
                }
            }
        }

        for (id2, track2) in pool {
            builder.add_unmatched_right(id2, &track2.spots)?;
        }
        Ok(builder)
    }
}

// ---------------------------------------------------------------------------
// Position strategies: nearest representative point, frames ignored
// ---------------------------------------------------------------------------

/// Pairs tracks whose mean spot positions are closest. Useful when track
/// pairs share few time points.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanPositionPairing;

/// Like [`MeanPositionPairing`] with the per-axis median position.
#[derive(Clone, Copy, Debug, Default)]
pub struct MedianPositionPairing;

impl PairingMethod for MeanPositionPairing {
    fn name(&self) -> &'static str {
        "Closest mean position"
    }

    fn pair<'a>(
        &self,
        model1: &'a Model,
        model2: &'a Model,
        max_pairing_distance: f64,
    ) -> Result<PairingBuilder<'a>> {
        pair_by_position(model1, model2, max_pairing_distance, mean_position)
    }
}

impl PairingMethod for MedianPositionPairing {
    fn name(&self) -> &'static str {
        "Closest median position"
    }

    fn pair<'a>(
        &self,
        model1: &'a Model,
        model2: &'a Model,
        max_pairing_distance: f64,
    ) -> Result<PairingBuilder<'a>> {
        pair_by_position(model1, model2, max_pairing_distance, median_position)
    }
}

/// Arithmetic mean of the spot positions. NaN in every axis when empty.
pub fn mean_position(track: &Track) -> Position {
    if track.is_empty() {
        return Position::new(f64::NAN, f64::NAN, f64::NAN);
    }
    let sum = track
        .spots
        .iter()
        .fold(Vector3::zeros(), |acc, s| acc + s.position.coords);
    Position::from(sum / track.len() as f64)
}

/// Per-axis median of the spot positions. NaN in every axis when empty.
pub fn median_position(track: &Track) -> Position {
    if track.is_empty() {
        return Position::new(f64::NAN, f64::NAN, f64::NAN);
    }
    let axis = |i: usize| {
        let mut values: Vec<f64> = track.spots.iter().map(|s| s.position[i]).collect();
        median(&mut values)
    };
    Position::new(axis(0), axis(1), axis(2))
}

/// Median of a non-empty slice; mean of the two middle values for even length.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

fn pair_by_position<'a>(
    model1: &'a Model,
    model2: &'a Model,
    max_pairing_distance: f64,
    position: fn(&Track) -> Position,
) -> Result<PairingBuilder<'a>> {
    let mut builder = PairingBuilder::new();
    builder.set_units(model1.space_units.as_str());

    let mut queue: VecDeque<(TrackId, &'a Track, Position)> = model1
        .tracks
        .iter()
        .map(|(&id, t)| (id, t, position(t)))
        .collect();
    let mut pool: BTreeMap<TrackId, (&'a Track, Position)> = model2
        .tracks
        .iter()
        .map(|(&id, t)| (id, (t, position(t))))
        .collect();

    while let Some((id1, track1, p1)) = queue.pop_front() {
        // NaN distances pass the threshold test but never beat `smallest`,
        // so empty tracks are never selected.
        let mut best: Option<TrackId> = None;
        let mut smallest = f64::INFINITY;
        for (&id2, (_, p2)) in &pool {
            let d = nalgebra::distance(&p1, p2);
            if d > max_pairing_distance {
                continue;
            }
            if d < smallest {
                smallest = d;
                best = Some(id2);
            }
        }

        match best.and_then(|id2| pool.remove(&id2).map(|(t, _)| (id2, t))) {
            Some((id2, track2)) => {
                let commons = find_correspondences(track1, track2, max_pairing_distance);
                if commons.is_empty() {
                    warn!(
                        %id1,
                        %id2,
                        dist = smallest,
                        "nearest track shares no frame within max distance"
                    );
                } else {
                    debug!(%id1, %id2, dist = smallest, n = commons.len(), "position pair");
                }
                builder.add_pair(id1, id2, commons)?;
            }
            None => {
                builder.add_unmatched_left(id1, &track1.spots)?;
            }
        }
    }

    for (id2, (track2, _)) in pool {
        builder.add_unmatched_right(id2, &track2.spots)?;
    }
    Ok(builder)
}

// ---------------------------------------------------------------------------
// Closed set of strategies, selectable from configuration
// ---------------------------------------------------------------------------

/// Which pairing strategy to run.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum PairingMethodKind {
    /// Maximize the number of frame-matched spots in common
    #[default]
    Concensus,
    /// Closest mean track position, frames ignored
    MeanPosition,
    /// Closest median track position, frames ignored
    MedianPosition,
}

impl PairingMethodKind {
    pub const ALL: [PairingMethodKind; 3] = [
        PairingMethodKind::Concensus,
        PairingMethodKind::MeanPosition,
        PairingMethodKind::MedianPosition,
    ];
}

impl PairingMethod for PairingMethodKind {
    fn name(&self) -> &'static str {
        match self {
            PairingMethodKind::Concensus => ConcensusPairing.name(),
            PairingMethodKind::MeanPosition => MeanPositionPairing.name(),
            PairingMethodKind::MedianPosition => MedianPositionPairing.name(),
        }
    }

    fn pair<'a>(
        &self,
        model1: &'a Model,
        model2: &'a Model,
        max_pairing_distance: f64,
    ) -> Result<PairingBuilder<'a>> {
        match self {
            PairingMethodKind::Concensus => {
                ConcensusPairing.pair(model1, model2, max_pairing_distance)
            }
            PairingMethodKind::MeanPosition => {
                MeanPositionPairing.pair(model1, model2, max_pairing_distance)
            }
            PairingMethodKind::MedianPosition => {
                MedianPositionPairing.pair(model1, model2, max_pairing_distance)
            }
        }
    }
}

impl fmt::Display for PairingMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
