//! Scenario definitions.
//!
//! Each scenario is a named configuration of particles and two detection
//! channels. All scenarios are deterministic given the same seed.

use crate::{
    channel::{ChannelParams, ChannelSimulator},
    particle::{MotionSpec, Particle},
};
use nalgebra::Vector3;
use pairing_core::metrics::TruthPair;
use pairing_core::{Model, Position, Track, TrackId};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which pre-defined scenario to load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// 10 well-separated particles, 2D, small channel offset
    Simple,
    /// 60 particles in a small field, frequent near-misses
    Crowded,
    /// 20 particles in a 3D volume
    Volume,
    /// Low detection probability: few frames in common per track pair
    Sparse,
}

/// Everything needed to generate a scene.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub n_particles: usize,
    pub n_frames: u32,
    /// Field extent per axis; z extent 0 means planar
    pub field: [f64; 3],
    /// Random-walk half-step per frame
    pub step: f64,
    /// Shortest particle lifetime in frames
    pub min_lifetime: u32,
    /// Short random tracks added to each channel
    pub n_spurious: usize,
    pub channel1: ChannelParams,
    pub channel2: ChannelParams,
    pub space_units: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            n_particles: 10,
            n_frames: 50,
            field: [50.0, 50.0, 0.0],
            step: 0.05,
            min_lifetime: 20,
            n_spurious: 0,
            channel1: ChannelParams::default(),
            channel2: ChannelParams {
                channel: 2,
                offset: [0.1, -0.05, 0.0],
                ..ChannelParams::default()
            },
            space_units: "µm".to_string(),
        }
    }
}

impl ScenarioConfig {
    pub fn for_kind(kind: ScenarioKind) -> Self {
        let base = Self::default();
        match kind {
            ScenarioKind::Simple => base,
            ScenarioKind::Crowded => Self {
                n_particles: 60,
                field: [20.0, 20.0, 0.0],
                step: 0.1,
                n_spurious: 10,
                ..base
            },
            ScenarioKind::Volume => Self {
                n_particles: 20,
                field: [30.0, 30.0, 8.0],
                channel1: ChannelParams {
                    noise: 0.08,
                    ..base.channel1.clone()
                },
                channel2: ChannelParams {
                    noise: 0.08,
                    offset: [0.1, 0.0, 0.2],
                    ..base.channel2.clone()
                },
                ..base
            },
            ScenarioKind::Sparse => Self {
                n_particles: 15,
                n_spurious: 3,
                channel1: ChannelParams {
                    p_detection: 0.3,
                    ..base.channel1.clone()
                },
                channel2: ChannelParams {
                    p_detection: 0.3,
                    ..base.channel2.clone()
                },
                ..base
            },
        }
    }

    fn planar(&self) -> bool {
        self.field[2] == 0.0
    }
}

/// A generated pair of models with the known track correspondence.
#[derive(Clone, Debug)]
pub struct Scene {
    pub name: String,
    pub seed: u64,
    pub model1: Model,
    pub model2: Model,
    /// Track pairs that observe the same particle
    pub truth: Vec<TruthPair>,
}

impl Scene {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        let name = match kind {
            ScenarioKind::Simple => "simple",
            ScenarioKind::Crowded => "crowded",
            ScenarioKind::Volume => "volume",
            ScenarioKind::Sparse => "sparse",
        };
        Self::generate(name, &ScenarioConfig::for_kind(kind), seed)
    }

    pub fn generate(name: &str, config: &ScenarioConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let planar = config.planar();

        let particles: Vec<Particle> = (0..config.n_particles)
            .map(|i| random_particle(&mut rng, config, i as u64))
            .collect();

        let mut ch1 = ChannelSimulator::new(config.channel1.clone(), seed.wrapping_add(1));
        let mut ch2 = ChannelSimulator::new(config.channel2.clone(), seed.wrapping_add(2));

        let image = format!("{name}.tif");
        let mut model1 = Model::new(config.space_units.as_str())
            .with_source_image_path(image.as_str())
            .with_detection_channel(config.channel1.channel);
        let mut model2 = Model::new(config.space_units.as_str())
            .with_source_image_path(image.as_str())
            .with_detection_channel(config.channel2.channel);

        // Channel 2 numbers its tracks independently of channel 1.
        let n_total = (config.n_particles + config.n_spurious) as u64;
        let mut ids2: Vec<u64> = (0..n_total).collect();
        ids2.shuffle(&mut rng);

        let mut truth = Vec::new();
        for (p, &id2) in particles.iter().zip(&ids2) {
            let trajectory = p.trajectory(&mut rng, planar);
            let spots1 = ch1.observe(&trajectory, planar);
            let spots2 = ch2.observe(&trajectory, planar);
            if spots1.is_empty() || spots2.is_empty() {
                debug!(particle = p.id, "particle missed by one channel");
            } else {
                truth.push(TruthPair {
                    id1: TrackId(p.id),
                    id2: TrackId(id2),
                });
            }
            if !spots1.is_empty() {
                model1.add_track(Track::new(p.id, spots1));
            }
            if !spots2.is_empty() {
                model2.add_track(Track::new(id2, spots2));
            }
        }

        // Spurious tracks: seen by one channel only.
        for k in 0..config.n_spurious {
            let id1 = (config.n_particles + k) as u64;
            let id2 = ids2[config.n_particles + k];
            for (sim, model, id) in [(&mut ch1, &mut model1, id1), (&mut ch2, &mut model2, id2)] {
                let mut p = random_particle(&mut rng, config, id);
                p.disappear_at = (p.appear_at + config.min_lifetime / 4 + 1).min(config.n_frames);
                let spots = sim.observe(&p.trajectory(&mut rng, planar), planar);
                if !spots.is_empty() {
                    model.add_track(Track::new(id, spots));
                }
            }
        }

        debug!(
            scene = name,
            tracks1 = model1.n_tracks(),
            tracks2 = model2.n_tracks(),
            truth = truth.len(),
            "scene generated"
        );
        Self {
            name: name.to_string(),
            seed,
            model1,
            model2,
            truth,
        }
    }
}

fn random_particle<R: Rng>(rng: &mut R, config: &ScenarioConfig, id: u64) -> Particle {
    let start = Position::new(
        rng.gen::<f64>() * config.field[0],
        rng.gen::<f64>() * config.field[1],
        rng.gen::<f64>() * config.field[2],
    );
    let lifetime = config.min_lifetime.min(config.n_frames);
    let appear_at = rng.gen_range(0..=config.n_frames - lifetime);
    let disappear_at = rng.gen_range(appear_at + lifetime..=config.n_frames);

    let motion = match rng.gen_range(0..3) {
        0 => MotionSpec::Diffusive { step: config.step },
        1 => {
            let angle = rng.gen::<f64>() * std::f64::consts::TAU;
            let speed = config.step * 2.0;
            MotionSpec::Directed {
                velocity: Vector3::new(speed * angle.cos(), speed * angle.sin(), 0.0),
                step: config.step,
            }
        }
        _ => MotionSpec::Confined {
            step: config.step * 2.0,
            stiffness: 0.3,
        },
    };

    Particle {
        id,
        start,
        motion,
        appear_at,
        disappear_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_scene() {
        let a = Scene::build(ScenarioKind::Crowded, 11);
        let b = Scene::build(ScenarioKind::Crowded, 11);
        assert_eq!(a.model1, b.model1);
        assert_eq!(a.model2, b.model2);
        assert_eq!(a.truth, b.truth);
    }

    #[test]
    fn truth_refers_to_existing_tracks() {
        for kind in [
            ScenarioKind::Simple,
            ScenarioKind::Crowded,
            ScenarioKind::Volume,
            ScenarioKind::Sparse,
        ] {
            let scene = Scene::build(kind, 5);
            assert!(!scene.truth.is_empty(), "{kind:?}");
            for t in &scene.truth {
                assert!(scene.model1.track(t.id1).is_some());
                assert!(scene.model2.track(t.id2).is_some());
            }
        }
    }

    #[test]
    fn models_carry_channel_metadata() {
        let scene = Scene::build(ScenarioKind::Simple, 1);
        assert_eq!(scene.model1.detection_channel, Some(1));
        assert_eq!(scene.model2.detection_channel, Some(2));
        assert_eq!(scene.model1.source_image_path.as_deref(), Some("simple.tif"));
        assert_eq!(scene.model1.space_units, "µm");
    }

    #[test]
    fn planar_scene_has_flat_spots() {
        let scene = Scene::build(ScenarioKind::Simple, 2);
        assert!(scene
            .model1
            .tracks
            .values()
            .flat_map(|t| &t.spots)
            .all(|s| s.position.z == 0.0));
    }
}
