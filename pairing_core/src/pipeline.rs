//! Pairing run orchestrator.
//!
//! # Steps
//! 1. Validate the max pairing distance (strictly positive, not NaN) and
//!    check that every track is stored under its own id
//! 2. Run the configured strategy
//! 3. Decorate the result with the source image of `model1` and the
//!    detection channel of each model
//! 4. Freeze into a [`Pairing`]

use crate::{
    error::{PairingError, Result},
    method::{PairingMethod, PairingMethodKind},
    pairing::Pairing,
    types::{Model, Side},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Configuration of one pairing run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PairingConfig {
    /// Strategy used to select partners
    pub method: PairingMethodKind,
    /// Distance beyond which spots and tracks are not paired (model units)
    pub max_pairing_distance: f64,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            method: PairingMethodKind::Concensus,
            max_pairing_distance: 1.0,
        }
    }
}

impl PairingConfig {
    pub fn validate(&self) -> Result<()> {
        // `!(x > 0)` also rejects NaN.
        if !(self.max_pairing_distance > 0.0) {
            return Err(PairingError::InvalidMaxDistance(self.max_pairing_distance));
        }
        Ok(())
    }
}

/// Pair `model1` with `model2` according to `config`.
pub fn run_pairing<'a>(
    config: &PairingConfig,
    model1: &'a Model,
    model2: &'a Model,
) -> Result<Pairing<'a>> {
    config.validate()?;
    model1.check_track_ids()?;
    model2.check_track_ids()?;
    let start = Instant::now();

    let mut builder = config
        .method
        .pair(model1, model2, config.max_pairing_distance)?;
    if let Some(path) = &model1.source_image_path {
        builder.set_source_image_path(path.as_str());
    }
    if let Some(ch) = model1.detection_channel {
        builder.set_target_channel(Side::Left, ch);
    }
    if let Some(ch) = model2.detection_channel {
        builder.set_target_channel(Side::Right, ch);
    }
    let pairing = builder.build();

    let stats = pairing.stats();
    info!(
        method = %config.method,
        max_dist = config.max_pairing_distance,
        pairs = stats.n_pairs,
        unmatched_1 = stats.n_unmatched_left,
        unmatched_2 = stats.n_unmatched_right,
        elapsed_us = start.elapsed().as_micros() as u64,
        "pairing done"
    );
    Ok(pairing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Spot, Track, TrackId};

    fn models() -> (Model, Model) {
        let mut m1 = Model::new("µm")
            .with_source_image_path("/img/a.tif")
            .with_detection_channel(1);
        m1.add_track(Track::new(1, vec![Spot::new_2d(0, 0, 0.0, 0.0)]));
        let mut m2 = Model::new("µm").with_detection_channel(2);
        m2.add_track(Track::new(5, vec![Spot::new_2d(1, 0, 0.2, 0.0)]));
        (m1, m2)
    }

    #[test]
    fn rejects_non_positive_or_nan_distance() {
        let (m1, m2) = models();
        for d in [0.0, -1.0, f64::NAN] {
            let config = PairingConfig {
                max_pairing_distance: d,
                ..PairingConfig::default()
            };
            assert!(matches!(
                run_pairing(&config, &m1, &m2),
                Err(PairingError::InvalidMaxDistance(_))
            ));
        }
    }

    #[test]
    fn infinite_distance_is_accepted() {
        let (m1, m2) = models();
        let config = PairingConfig {
            max_pairing_distance: f64::INFINITY,
            ..PairingConfig::default()
        };
        assert_eq!(run_pairing(&config, &m1, &m2).unwrap().pairs().len(), 1);
    }

    #[test]
    fn result_carries_model_metadata() {
        let (m1, m2) = models();
        let pairing = run_pairing(&PairingConfig::default(), &m1, &m2).unwrap();
        assert_eq!(pairing.pairs()[0].id2, TrackId(5));
        assert_eq!(pairing.source_image_path(), Some("/img/a.tif"));
        assert_eq!(pairing.target_channel(Side::Left), Some(1));
        assert_eq!(pairing.target_channel(Side::Right), Some(2));
        assert_eq!(pairing.units(), "µm");
    }

    #[test]
    fn rejects_model_with_mismatched_track_key() {
        let (m1, mut m2) = models();
        m2.tracks.insert(TrackId(8), Track::new(9, vec![Spot::new_2d(2, 0, 0.1, 0.0)]));
        assert!(matches!(
            run_pairing(&PairingConfig::default(), &m1, &m2),
            Err(PairingError::TrackIdMismatch { .. })
        ));
    }
}
