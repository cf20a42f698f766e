//! Fundamental types used across the entire workspace.

use crate::error::{PairingError, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Positions: always 3D. 2D data carries z = 0.
// ---------------------------------------------------------------------------

/// Spot position in physical units.
pub type Position = Point3<f64>;

// ---------------------------------------------------------------------------
// Identifier types
// ---------------------------------------------------------------------------

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TrackId(pub u64);

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SpotId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SpotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two paired models something belongs to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// First model (`model1`, "tracks 1")
    Left,
    /// Second model (`model2`, "tracks 2")
    Right,
}

impl Side {
    pub(crate) fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Well-known spot feature keys.
pub mod features {
    pub const RADIUS: &str = "RADIUS";
    pub const QUALITY: &str = "QUALITY";
    pub const MEAN_INTENSITY: &str = "MEAN_INTENSITY";
    pub const SNR: &str = "SNR";
    pub const CONTRAST: &str = "CONTRAST";
}

// ---------------------------------------------------------------------------
// Spot
// ---------------------------------------------------------------------------

/// A single detection: one frame, one position, optional scalar features.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    /// Unique spot identifier within its model
    pub id: SpotId,
    /// Frame index (time point) of the detection
    pub frame: u32,
    /// Position in physical units
    pub position: Position,
    /// Named scalar features (radius, intensity, SNR, contrast, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, f64>,
}

impl Spot {
    pub fn new(id: u64, frame: u32, x: f64, y: f64, z: f64) -> Self {
        Self {
            id: SpotId(id),
            frame,
            position: Position::new(x, y, z),
            features: BTreeMap::new(),
        }
    }

    /// Planar detection (z = 0).
    pub fn new_2d(id: u64, frame: u32, x: f64, y: f64) -> Self {
        Self::new(id, frame, x, y, 0.0)
    }

    pub fn with_feature(mut self, key: impl Into<String>, value: f64) -> Self {
        self.features.insert(key.into(), value);
        self
    }

    pub fn feature(&self, key: &str) -> Option<f64> {
        self.features.get(key).copied()
    }

    pub fn squared_distance_to(&self, other: &Spot) -> f64 {
        nalgebra::distance_squared(&self.position, &other.position)
    }

    pub fn distance_to(&self, other: &Spot) -> f64 {
        self.squared_distance_to(other).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// An identified set of spots believed to belong to one moving object.
///
/// Spots are kept in the order they were loaded; that order is the scan
/// order of the correspondence finder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub spots: Vec<Spot>,
}

impl Track {
    pub fn new(id: u64, spots: Vec<Spot>) -> Self {
        Self {
            id: TrackId(id),
            spots,
        }
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    /// First and last frame covered by the track, `None` when empty.
    pub fn frame_span(&self) -> Option<(u32, u32)> {
        let first = self.spots.iter().map(|s| s.frame).min()?;
        let last = self.spots.iter().map(|s| s.frame).max()?;
        Some((first, last))
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// The output of one tracking run: tracks plus acquisition metadata.
///
/// Tracks are keyed by id in a `BTreeMap`, so every enumeration is in
/// ascending id order. The pairing strategies depend on that for
/// reproducible results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Physical unit of positions, e.g. "µm"
    pub space_units: String,
    /// Image the tracks were detected in
    #[serde(default)]
    pub source_image_path: Option<String>,
    /// Channel the detector ran on (1-based)
    #[serde(default)]
    pub detection_channel: Option<u32>,
    pub tracks: BTreeMap<TrackId, Track>,
}

impl Model {
    pub fn new(space_units: impl Into<String>) -> Self {
        Self {
            space_units: space_units.into(),
            ..Self::default()
        }
    }

    pub fn with_source_image_path(mut self, path: impl Into<String>) -> Self {
        self.source_image_path = Some(path.into());
        self
    }

    pub fn with_detection_channel(mut self, channel: u32) -> Self {
        self.detection_channel = Some(channel);
        self
    }

    /// Insert a track, returning the one it replaced if the id was taken.
    pub fn add_track(&mut self, track: Track) -> Option<Track> {
        self.tracks.insert(track.id, track)
    }

    /// Every track must be stored under its own id.
    pub fn check_track_ids(&self) -> Result<()> {
        match self.tracks.iter().find(|(key, t)| **key != t.id) {
            Some((&key, t)) => Err(PairingError::TrackIdMismatch { key, id: t.id }),
            None => Ok(()),
        }
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Track ids in ascending order.
    pub fn track_ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.tracks.keys().copied()
    }

    pub fn n_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn n_spots(&self) -> usize {
        self.tracks.values().map(Track::len).sum()
    }
}
