//! `pairing_core` — Track pairing engine.
//!
//! Matches the tracks of two independent tracking runs over the same scene
//! (e.g. two channels of a time-lapse) and records which tracks correspond,
//! which spots co-occur, and which tracks stay unmatched.
//!
//! # Module layout
//! - [`types`]          — Spots, tracks, models, identifiers
//! - [`correspondence`] — Frame-matched spot pairs between two tracks
//! - [`method`]         — Greedy pairing strategies (concensus, mean, median)
//! - [`pairing`]        — Pairing builder and immutable result
//! - [`pipeline`]       — Validated pairing run with metadata decoration
//! - [`histogram`]      — Distance sample, empirical CDF, binned histogram
//! - [`export`]         — CSV rows with supplemental feature columns
//! - [`metrics`]        — Precision / recall against a known truth
//! - [`error`]          — Error type

pub mod correspondence;
pub mod error;
pub mod export;
pub mod histogram;
pub mod method;
pub mod metrics;
pub mod pairing;
pub mod pipeline;
pub mod types;

pub use correspondence::{find_correspondences, SpotPair};
pub use error::{PairingError, Result};
pub use method::{PairingMethod, PairingMethodKind};
pub use pairing::{Pairing, PairingBuilder, PairingStats, TrackPair};
pub use pipeline::{run_pairing, PairingConfig};
pub use types::{Model, Position, Side, Spot, SpotId, Track, TrackId};
