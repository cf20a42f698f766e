//! Model files: serialize/deserialize tracking results as JSON.

use anyhow::Context;
use pairing_core::metrics::TruthPair;
use pairing_core::Model;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::scenarios::Scene;

fn save_json<T: Serialize>(value: &T, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file =
        std::fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let reader = BufReader::new(file);
    let value = serde_json::from_reader(reader)
        .with_context(|| format!("malformed JSON in {}", path.display()))?;
    Ok(value)
}

/// Save a model to a JSON file.
pub fn save_model(model: &Model, path: &Path) -> anyhow::Result<()> {
    save_json(model, path)
}

/// Load a model from a JSON file.
pub fn load_model(path: &Path) -> anyhow::Result<Model> {
    let model: Model = load_json(path)?;
    model
        .check_track_ids()
        .with_context(|| format!("inconsistent track ids in {}", path.display()))?;
    debug!(
        path = %path.display(),
        tracks = model.n_tracks(),
        spots = model.n_spots(),
        "model loaded"
    );
    Ok(model)
}

pub fn save_truth(truth: &[TruthPair], path: &Path) -> anyhow::Result<()> {
    save_json(&truth, path)
}

pub fn load_truth(path: &Path) -> anyhow::Result<Vec<TruthPair>> {
    load_json(path)
}

/// Paths written by [`save_scene`].
#[derive(Clone, Debug)]
pub struct SceneFiles {
    pub model1: PathBuf,
    pub model2: PathBuf,
    pub truth: PathBuf,
}

/// Write `<name>-ch1.json`, `<name>-ch2.json` and `<name>-truth.json` into `dir`.
pub fn save_scene(scene: &Scene, dir: &Path) -> anyhow::Result<SceneFiles> {
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let files = SceneFiles {
        model1: dir.join(format!("{}-ch1.json", scene.name)),
        model2: dir.join(format!("{}-ch2.json", scene.name)),
        truth: dir.join(format!("{}-truth.json", scene.name)),
    };
    save_model(&scene.model1, &files.model1)?;
    save_model(&scene.model2, &files.model2)?;
    save_truth(&scene.truth, &files.truth)?;
    Ok(files)
}
