//! Error type for pairing construction and export.

use crate::types::{Side, TrackId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairingError {
    /// A track pair must carry at least one spot correspondence.
    #[error("track pair {id1}&{id2} has no spot correspondences")]
    EmptyCorrespondences { id1: TrackId, id2: TrackId },

    /// A track id was recorded twice on the same side.
    #[error("track {id} already recorded on the {side} side")]
    DuplicateTrack { side: Side, id: TrackId },

    /// A model track stored under a key other than its own id.
    #[error("track stored under key {key} carries id {id}")]
    TrackIdMismatch { key: TrackId, id: TrackId },

    #[error("max pairing distance must be strictly positive, got {0}")]
    InvalidMaxDistance(f64),

    /// Malformed `HEADER:KEY:SIDE` supplemental column spec.
    #[error("invalid supplemental column '{0}', expected HEADER:FEATURE_KEY:SIDE")]
    InvalidColumn(String),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PairingError>;
