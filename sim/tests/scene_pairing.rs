//! End-to-end pairing of generated scenes.

use pairing_core::metrics::PairingMetrics;
use pairing_core::{run_pairing, Pairing, PairingConfig, PairingError, PairingMethodKind, Side};
use sim::{ChannelParams, ScenarioConfig, ScenarioKind, Scene};
use std::collections::BTreeSet;

const KINDS: [ScenarioKind; 4] = [
    ScenarioKind::Simple,
    ScenarioKind::Crowded,
    ScenarioKind::Volume,
    ScenarioKind::Sparse,
];

fn check_invariants(scene: &Scene, pairing: &Pairing<'_>, max_distance: f64) {
    let mut left = BTreeSet::new();
    let mut right = BTreeSet::new();
    for tp in pairing.pairs() {
        assert!(left.insert(tp.id1), "track {} paired twice", tp.id1);
        assert!(right.insert(tp.id2), "track {} paired twice", tp.id2);
        assert!(!tp.is_empty());
        for w in tp.paired().windows(2) {
            assert!(w[0].frame() <= w[1].frame());
        }
        for sp in tp.paired() {
            assert_eq!(sp.s1.frame, sp.s2.frame);
            assert!(sp.distance() < max_distance);
        }
    }
    for id in pairing.unmatched_left().keys() {
        assert!(left.insert(*id), "track {id} both paired and unmatched");
    }
    for id in pairing.unmatched_right().keys() {
        assert!(right.insert(*id), "track {id} both paired and unmatched");
    }
    assert_eq!(left, scene.model1.track_ids().collect::<BTreeSet<_>>());
    assert_eq!(right, scene.model2.track_ids().collect::<BTreeSet<_>>());
}

#[test]
fn concensus_partitions_every_scene() {
    let config = PairingConfig::default();
    for kind in KINDS {
        let scene = Scene::build(kind, 21);
        let pairing = run_pairing(&config, &scene.model1, &scene.model2).unwrap();
        check_invariants(&scene, &pairing, config.max_pairing_distance);
        assert_eq!(pairing.target_channel(Side::Left), Some(1));
        assert_eq!(pairing.target_channel(Side::Right), Some(2));
    }
}

#[test]
fn position_methods_partition_or_report_empty_pairs() {
    for method in [PairingMethodKind::MeanPosition, PairingMethodKind::MedianPosition] {
        let config = PairingConfig {
            method,
            max_pairing_distance: 1.0,
        };
        for kind in KINDS {
            let scene = Scene::build(kind, 21);
            match run_pairing(&config, &scene.model1, &scene.model2) {
                Ok(pairing) => check_invariants(&scene, &pairing, 1.0),
                // A nearest-position partner may share no frame with the left track.
                Err(err) => assert!(
                    matches!(err, PairingError::EmptyCorrespondences { .. }),
                    "{method}: {err}"
                ),
            }
        }
    }
}

/// Static particles seen in every frame without noise: each spot sits on its
/// track's mean and median, so any partner within range shares every frame.
fn static_scene(seed: u64) -> Scene {
    let base = ScenarioConfig::default();
    let exact = |channel: ChannelParams| ChannelParams {
        p_detection: 1.0,
        noise: 0.0,
        ..channel
    };
    let config = ScenarioConfig {
        n_particles: 12,
        n_frames: 30,
        min_lifetime: 30,
        step: 0.0,
        n_spurious: 0,
        channel1: exact(base.channel1.clone()),
        channel2: exact(base.channel2.clone()),
        ..base
    };
    Scene::generate("static", &config, seed)
}

#[test]
fn every_method_partitions_static_scene() {
    for method in PairingMethodKind::ALL {
        let config = PairingConfig {
            method,
            max_pairing_distance: 1.0,
        };
        for seed in [3, 21] {
            let scene = static_scene(seed);
            let pairing = run_pairing(&config, &scene.model1, &scene.model2)
                .unwrap_or_else(|err| panic!("{method}, seed {seed}: {err}"));
            check_invariants(&scene, &pairing, 1.0);
            assert!(!pairing.pairs().is_empty(), "{method}, seed {seed}");
        }
    }
}

#[test]
fn concensus_recovers_simple_truth() {
    let config = PairingConfig::default();
    for seed in [1, 2, 3] {
        let scene = Scene::build(ScenarioKind::Simple, seed);
        let pairing = run_pairing(&config, &scene.model1, &scene.model2).unwrap();
        let metrics = PairingMetrics::evaluate(&pairing, &scene.truth);
        assert!(metrics.precision() >= 0.8, "seed {seed}: {metrics:?}");
        assert!(metrics.recall() >= 0.8, "seed {seed}: {metrics:?}");
    }
}

#[test]
fn tight_threshold_keeps_invariants() {
    let scene = Scene::build(ScenarioKind::Crowded, 8);
    let tight = PairingConfig {
        max_pairing_distance: 0.2,
        ..PairingConfig::default()
    };
    let pairing = run_pairing(&tight, &scene.model1, &scene.model2).unwrap();
    check_invariants(&scene, &pairing, 0.2);
}

#[test]
fn pairing_is_reproducible() {
    let scene = Scene::build(ScenarioKind::Crowded, 13);
    let config = PairingConfig::default();
    let a = run_pairing(&config, &scene.model1, &scene.model2).unwrap();
    let b = run_pairing(&config, &scene.model1, &scene.model2).unwrap();
    let ids = |p: &Pairing<'_>| p.pairs().iter().map(|tp| (tp.id1, tp.id2)).collect::<Vec<_>>();
    assert_eq!(ids(&a), ids(&b));
    assert_eq!(a.to_string(), b.to_string());
}

#[test]
fn loaded_models_pair_like_generated_ones() {
    let dir = tempfile::tempdir().unwrap();
    let scene = Scene::build(ScenarioKind::Simple, 4);
    let files = sim::save_scene(&scene, dir.path()).unwrap();
    let m1 = sim::load_model(&files.model1).unwrap();
    let m2 = sim::load_model(&files.model2).unwrap();

    let config = PairingConfig::default();
    let direct = run_pairing(&config, &scene.model1, &scene.model2).unwrap();
    let loaded = run_pairing(&config, &m1, &m2).unwrap();
    assert_eq!(direct.stats().n_pairs, loaded.stats().n_pairs);
    assert_eq!(loaded.source_image_path(), Some("simple.tif"));
}
