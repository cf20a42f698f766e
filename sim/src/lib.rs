//! `sim` — Synthetic two-channel scenes and model file I/O.

pub mod channel;
pub mod model_io;
pub mod particle;
pub mod scenarios;

pub use channel::{ChannelParams, ChannelSimulator};
pub use model_io::{load_model, load_truth, save_model, save_scene, save_truth, SceneFiles};
pub use particle::{MotionSpec, Particle};
pub use scenarios::{ScenarioConfig, ScenarioKind, Scene};
