//! Detection channel simulator.
//!
//! Turns true trajectories into the spots one tracking run would report:
//! - Uniform localisation noise
//! - Miss probability (1 - P_D) per frame
//! - Constant registration offset between channels
//! - Per-spot radius and intensity features

use pairing_core::types::features;
use pairing_core::{Position, Spot};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Acquisition parameters of one channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelParams {
    /// Channel index (1-based), stored in the model metadata
    pub channel: u32,
    /// Half-width of the uniform localisation noise, per axis
    pub noise: f64,
    /// Probability that a particle is detected in a given frame
    pub p_detection: f64,
    /// Registration offset added to every detection
    pub offset: [f64; 3],
    /// Mean spot intensity
    pub intensity: f64,
    /// Mean spot radius
    pub radius: f64,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            channel: 1,
            noise: 0.05,
            p_detection: 0.95,
            offset: [0.0; 3],
            intensity: 200.0,
            radius: 0.25,
        }
    }
}

/// Generates the spots of one channel.
pub struct ChannelSimulator {
    pub params: ChannelParams,
    rng: ChaCha8Rng,
    next_spot_id: u64,
}

impl ChannelSimulator {
    pub fn new(params: ChannelParams, seed: u64) -> Self {
        Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_spot_id: 0,
        }
    }

    /// Observe a trajectory. Returns the detected spots in frame order; may
    /// be empty when every frame was missed.
    pub fn observe(&mut self, trajectory: &[(u32, Position)], planar: bool) -> Vec<Spot> {
        let p = &self.params;
        let mut spots = Vec::new();
        for &(frame, truth) in trajectory {
            if self.rng.gen::<f64>() > p.p_detection {
                continue;
            }
            let mut noisy = [0.0; 3];
            for (axis, value) in noisy.iter_mut().enumerate() {
                let n = self.rng.gen::<f64>() * p.noise * 2.0 - p.noise;
                *value = truth[axis] + p.offset[axis] + n;
            }
            if planar {
                noisy[2] = truth.z;
            }

            let intensity = p.intensity * (0.75 + 0.5 * self.rng.gen::<f64>());
            let radius = p.radius * (0.9 + 0.2 * self.rng.gen::<f64>());

            let id = self.next_spot_id;
            self.next_spot_id += 1;
            spots.push(
                Spot::new(id, frame, noisy[0], noisy[1], noisy[2])
                    .with_feature(features::MEAN_INTENSITY, intensity)
                    .with_feature(features::RADIUS, radius),
            );
        }
        spots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u32) -> Vec<(u32, Position)> {
        (0..n).map(|f| (f, Position::new(f as f64, 0.0, 0.0))).collect()
    }

    #[test]
    fn perfect_channel_detects_every_frame_within_noise() {
        let params = ChannelParams {
            p_detection: 1.0,
            noise: 0.1,
            offset: [0.5, 0.0, 0.0],
            ..ChannelParams::default()
        };
        let mut sim = ChannelSimulator::new(params, 3);
        let spots = sim.observe(&line(20), true);
        assert_eq!(spots.len(), 20);
        for (s, f) in spots.iter().zip(0..) {
            assert_eq!(s.frame, f);
            assert!((s.position.x - (f as f64 + 0.5)).abs() <= 0.1);
            assert_eq!(s.position.z, 0.0);
            assert!(s.feature(features::MEAN_INTENSITY).is_some());
        }
    }

    #[test]
    fn blind_channel_detects_nothing() {
        let params = ChannelParams {
            p_detection: 0.0,
            ..ChannelParams::default()
        };
        let mut sim = ChannelSimulator::new(params, 3);
        assert!(sim.observe(&line(50), true).is_empty());
    }

    #[test]
    fn spot_ids_are_unique_across_tracks() {
        let params = ChannelParams {
            p_detection: 1.0,
            ..Default::default()
        };
        let mut sim = ChannelSimulator::new(params, 9);
        let a = sim.observe(&line(5), true);
        let b = sim.observe(&line(5), true);
        assert!(a.iter().all(|s| b.iter().all(|t| t.id != s.id)));
    }
}
