//! Pairing results: matched track pairs, unmatched tracks, and metadata.
//!
//! A [`Pairing`] is produced once by a [`PairingBuilder`] and is immutable
//! afterwards. It borrows the spots of the two models it was computed from,
//! so the models cannot change while the result is alive.
//!
//! # Invariants enforced by the builder
//! - each track id appears at most once per side, either in a pair or in the
//!   side's unmatched map;
//! - every track pair carries at least one spot correspondence;
//! - correspondences within a pair are sorted by ascending frame (stable).

use crate::{
    correspondence::SpotPair,
    error::{PairingError, Result},
    types::{Side, Spot, TrackId},
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// TrackPair
// ---------------------------------------------------------------------------

/// Two tracks, one per model, judged to follow the same object.
#[derive(Clone, Debug)]
pub struct TrackPair<'a> {
    pub id1: TrackId,
    pub id2: TrackId,
    paired: Vec<SpotPair<'a>>,
}

impl<'a> TrackPair<'a> {
    fn new(id1: TrackId, id2: TrackId, mut paired: Vec<SpotPair<'a>>) -> Self {
        paired.sort_by_key(SpotPair::frame);
        Self { id1, id2, paired }
    }

    /// Spot correspondences sorted by frame.
    pub fn paired(&self) -> &[SpotPair<'a>] {
        &self.paired
    }

    pub fn len(&self) -> usize {
        self.paired.len()
    }

    /// Always false for a built pair; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.paired.is_empty()
    }

    pub fn mean_distance(&self) -> f64 {
        let sum: f64 = self.paired.iter().map(SpotPair::distance).sum();
        sum / self.paired.len() as f64
    }

    /// Label used in exports, e.g. `"3&12"`.
    pub fn name(&self) -> String {
        format!("{}&{}", self.id1, self.id2)
    }
}

// ---------------------------------------------------------------------------
// Pairing
// ---------------------------------------------------------------------------

/// Summary counts of a pairing run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PairingStats {
    pub n_pairs: usize,
    pub n_unmatched_left: usize,
    pub n_unmatched_right: usize,
    /// Total spot correspondences across all pairs
    pub n_correspondences: usize,
    /// Mean over every correspondence of every pair (`None` without pairs)
    pub mean_distance: Option<f64>,
}

/// Immutable result of pairing two models.
#[derive(Clone, Debug)]
pub struct Pairing<'a> {
    pairs: Vec<TrackPair<'a>>,
    unmatched_left: BTreeMap<TrackId, &'a [Spot]>,
    unmatched_right: BTreeMap<TrackId, &'a [Spot]>,
    units: String,
    source_image_path: Option<String>,
    target_channels: [Option<u32>; 2],
}

impl<'a> Pairing<'a> {
    /// Start an empty builder.
    pub fn builder() -> PairingBuilder<'a> {
        PairingBuilder::new()
    }

    /// Matched track pairs, in the order they were accepted.
    pub fn pairs(&self) -> &[TrackPair<'a>] {
        &self.pairs
    }

    /// Tracks of `model1` without a partner, with their spots.
    pub fn unmatched_left(&self) -> &BTreeMap<TrackId, &'a [Spot]> {
        &self.unmatched_left
    }

    /// Tracks of `model2` without a partner, with their spots.
    pub fn unmatched_right(&self) -> &BTreeMap<TrackId, &'a [Spot]> {
        &self.unmatched_right
    }

    pub fn unmatched(&self, side: Side) -> &BTreeMap<TrackId, &'a [Spot]> {
        match side {
            Side::Left => &self.unmatched_left,
            Side::Right => &self.unmatched_right,
        }
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn source_image_path(&self) -> Option<&str> {
        self.source_image_path.as_deref()
    }

    pub fn target_channel(&self, side: Side) -> Option<u32> {
        self.target_channels[side.index()]
    }

    /// Partner of a track, looked up from either side.
    pub fn partner_of(&self, side: Side, id: TrackId) -> Option<TrackId> {
        self.pairs.iter().find_map(|p| match side {
            Side::Left if p.id1 == id => Some(p.id2),
            Side::Right if p.id2 == id => Some(p.id1),
            _ => None,
        })
    }

    pub fn stats(&self) -> PairingStats {
        let n_correspondences: usize = self.pairs.iter().map(TrackPair::len).sum();
        let mean_distance = (n_correspondences > 0).then(|| {
            let sum: f64 = self
                .pairs
                .iter()
                .flat_map(|p| p.paired.iter())
                .map(SpotPair::distance)
                .sum();
            sum / n_correspondences as f64
        });
        PairingStats {
            n_pairs: self.pairs.len(),
            n_unmatched_left: self.unmatched_left.len(),
            n_unmatched_right: self.unmatched_right.len(),
            n_correspondences,
            mean_distance,
        }
    }
}

impl fmt::Display for Pairing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pairing results")?;
        if let Some(path) = &self.source_image_path {
            write!(f, " for {path}")?;
        }
        if self.pairs.is_empty() {
            write!(f, "\nNo pairs.")?;
        } else {
            write!(f, "\nPairs: ")?;
            for pair in &self.pairs {
                write!(
                    f,
                    "\n - {} & {}, dist = {:.2} {}",
                    pair.id1,
                    pair.id2,
                    pair.mean_distance(),
                    self.units
                )?;
            }
        }
        for (n, unmatched) in [(1, &self.unmatched_left), (2, &self.unmatched_right)] {
            if unmatched.is_empty() {
                write!(f, "\nNo unmatched tracks {n}.")?;
            } else {
                write!(f, "\nUnmatched tracks {n}:")?;
                for id in unmatched.keys() {
                    write!(f, "\n - {id}")?;
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Append-only accumulator for a [`Pairing`].
///
/// Matching strategies return a populated builder; callers may decorate it
/// with the source image path and channels before calling [`build`].
///
/// [`build`]: PairingBuilder::build
#[derive(Clone, Debug, Default)]
pub struct PairingBuilder<'a> {
    pairs: Vec<TrackPair<'a>>,
    unmatched_left: BTreeMap<TrackId, &'a [Spot]>,
    unmatched_right: BTreeMap<TrackId, &'a [Spot]>,
    used: [BTreeSet<TrackId>; 2],
    units: String,
    source_image_path: Option<String>,
    target_channels: [Option<u32>; 2],
}

impl<'a> PairingBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, side: Side, id: TrackId) -> Result<()> {
        if !self.used[side.index()].insert(id) {
            return Err(PairingError::DuplicateTrack { side, id });
        }
        Ok(())
    }

    /// Record a matched pair. The correspondences are sorted by frame.
    pub fn add_pair(
        &mut self,
        id1: TrackId,
        id2: TrackId,
        paired: Vec<SpotPair<'a>>,
    ) -> Result<&mut Self> {
        if paired.is_empty() {
            return Err(PairingError::EmptyCorrespondences { id1, id2 });
        }
        if self.used[Side::Left.index()].contains(&id1) {
            return Err(PairingError::DuplicateTrack { side: Side::Left, id: id1 });
        }
        self.claim(Side::Right, id2)?;
        self.claim(Side::Left, id1)?;
        self.pairs.push(TrackPair::new(id1, id2, paired));
        Ok(self)
    }

    pub fn add_unmatched_left(&mut self, id1: TrackId, spots: &'a [Spot]) -> Result<&mut Self> {
        self.claim(Side::Left, id1)?;
        self.unmatched_left.insert(id1, spots);
        Ok(self)
    }

    pub fn add_unmatched_right(&mut self, id2: TrackId, spots: &'a [Spot]) -> Result<&mut Self> {
        self.claim(Side::Right, id2)?;
        self.unmatched_right.insert(id2, spots);
        Ok(self)
    }

    pub fn set_units(&mut self, units: impl Into<String>) -> &mut Self {
        self.units = units.into();
        self
    }

    pub fn set_source_image_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.source_image_path = Some(path.into());
        self
    }

    pub fn set_target_channel(&mut self, side: Side, channel: u32) -> &mut Self {
        self.target_channels[side.index()] = Some(channel);
        self
    }

    pub fn n_pairs(&self) -> usize {
        self.pairs.len()
    }

    /// Snapshot the accumulated state. The builder stays usable and later
    /// changes to it do not affect the returned pairing.
    pub fn build(&self) -> Pairing<'a> {
        Pairing {
            pairs: self.pairs.clone(),
            unmatched_left: self.unmatched_left.clone(),
            unmatched_right: self.unmatched_right.clone(),
            units: self.units.clone(),
            source_image_path: self.source_image_path.clone(),
            target_channels: self.target_channels,
        }
    }
}
