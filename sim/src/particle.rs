//! Ground-truth particle trajectories.
//!
//! Each particle lives for a frame interval and moves according to a
//! `MotionSpec`. Random components use uniform jitter in `[-step, step]`
//! per axis and per frame.

use nalgebra::Vector3;
use pairing_core::Position;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How a particle moves from one frame to the next.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MotionSpec {
    /// Pure random walk.
    Diffusive { step: f64 },
    /// Constant velocity (units / frame) plus random walk.
    Directed { velocity: Vector3<f64>, step: f64 },
    /// Random walk pulled back toward the start point. `stiffness` in (0, 1].
    Confined { step: f64, stiffness: f64 },
}

/// A simulated object with a true trajectory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Particle {
    /// Unique particle ID
    pub id: u64,
    /// Position at `appear_at`
    pub start: Position,
    pub motion: MotionSpec,
    /// First frame the particle exists in
    pub appear_at: u32,
    /// First frame the particle no longer exists in
    pub disappear_at: u32,
}

fn jitter<R: Rng>(rng: &mut R, step: f64) -> f64 {
    rng.gen::<f64>() * step * 2.0 - step
}

impl Particle {
    pub fn is_active(&self, frame: u32) -> bool {
        frame >= self.appear_at && frame < self.disappear_at
    }

    /// Sample the trajectory: one true position per active frame.
    /// `planar` keeps z at its start value.
    pub fn trajectory<R: Rng>(&self, rng: &mut R, planar: bool) -> Vec<(u32, Position)> {
        let mut pos = self.start;
        let mut out = Vec::with_capacity((self.disappear_at - self.appear_at) as usize);
        for frame in self.appear_at..self.disappear_at {
            out.push((frame, pos));

            let step = match &self.motion {
                MotionSpec::Diffusive { step } => *step,
                MotionSpec::Directed { step, .. } => *step,
                MotionSpec::Confined { step, .. } => *step,
            };
            let mut delta = Vector3::new(jitter(rng, step), jitter(rng, step), jitter(rng, step));
            match &self.motion {
                MotionSpec::Diffusive { .. } => {}
                MotionSpec::Directed { velocity, .. } => delta += velocity,
                MotionSpec::Confined { stiffness, .. } => {
                    delta += (self.start - pos) * *stiffness;
                }
            }
            if planar {
                delta.z = 0.0;
            }
            pos += delta;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn particle(motion: MotionSpec) -> Particle {
        Particle {
            id: 0,
            start: Position::new(10.0, 10.0, 2.0),
            motion,
            appear_at: 3,
            disappear_at: 13,
        }
    }

    #[test]
    fn trajectory_covers_active_frames() {
        let p = particle(MotionSpec::Diffusive { step: 0.1 });
        let traj = p.trajectory(&mut ChaCha8Rng::seed_from_u64(1), true);
        assert_eq!(traj.len(), 10);
        assert_eq!(traj.first().unwrap().0, 3);
        assert_eq!(traj.last().unwrap().0, 12);
        assert!(traj.iter().all(|(_, pos)| pos.z == 2.0));
        assert!(p.is_active(3) && !p.is_active(13));
    }

    #[test]
    fn directed_motion_without_noise_is_linear() {
        let p = particle(MotionSpec::Directed {
            velocity: Vector3::new(1.0, 0.5, 0.0),
            step: 0.0,
        });
        let traj = p.trajectory(&mut ChaCha8Rng::seed_from_u64(1), false);
        let (_, last) = traj.last().unwrap();
        assert_abs_diff_eq!(last.x, 19.0, epsilon = 1e-12);
        assert_abs_diff_eq!(last.y, 14.5, epsilon = 1e-12);
    }

    #[test]
    fn confined_motion_stays_near_start() {
        let p = Particle {
            disappear_at: 1000,
            ..particle(MotionSpec::Confined { step: 0.2, stiffness: 0.5 })
        };
        let traj = p.trajectory(&mut ChaCha8Rng::seed_from_u64(7), true);
        for (_, pos) in traj {
            assert!(nalgebra::distance(&pos, &p.start) < 2.0);
        }
    }

    #[test]
    fn same_seed_same_trajectory() {
        let p = particle(MotionSpec::Diffusive { step: 0.3 });
        let a = p.trajectory(&mut ChaCha8Rng::seed_from_u64(42), false);
        let b = p.trajectory(&mut ChaCha8Rng::seed_from_u64(42), false);
        assert_eq!(a, b);
    }
}
