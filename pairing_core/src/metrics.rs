//! Pairing quality against a known truth: precision / recall of the
//! accepted track pairs.

use crate::{pairing::Pairing, types::TrackId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A known correspondence between a track of model 1 and one of model 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TruthPair {
    pub id1: TrackId,
    pub id2: TrackId,
}

/// Accumulated metric statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PairingMetrics {
    /// Pairs present in the truth
    pub true_positives: u64,
    /// Pairs not present in the truth
    pub false_positives: u64,
    /// Truth pairs that were not produced
    pub false_negatives: u64,
}

impl PairingMetrics {
    /// Compare the pairs of `pairing` with `truth`.
    pub fn evaluate(pairing: &Pairing<'_>, truth: &[TruthPair]) -> Self {
        let truth: BTreeSet<(TrackId, TrackId)> = truth.iter().map(|t| (t.id1, t.id2)).collect();
        let produced: BTreeSet<(TrackId, TrackId)> =
            pairing.pairs().iter().map(|p| (p.id1, p.id2)).collect();

        let true_positives = produced.intersection(&truth).count() as u64;
        Self {
            true_positives,
            false_positives: produced.len() as u64 - true_positives,
            false_negatives: truth.len() as u64 - true_positives,
        }
    }

    /// Precision = TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denom = (self.true_positives + self.false_positives) as f64;
        if denom == 0.0 { 1.0 } else { self.true_positives as f64 / denom }
    }

    /// Recall = TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denom = (self.true_positives + self.false_negatives) as f64;
        if denom == 0.0 { 1.0 } else { self.true_positives as f64 / denom }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::SpotPair;
    use crate::pairing::PairingBuilder;
    use crate::types::Spot;

    #[test]
    fn counts_hits_misses_and_spurious_pairs() {
        let a = Spot::new_2d(0, 0, 0.0, 0.0);
        let b = Spot::new_2d(1, 0, 0.0, 0.0);
        let mut builder = PairingBuilder::new();
        builder
            .add_pair(TrackId(1), TrackId(1), vec![SpotPair::new(&a, &b)])
            .unwrap()
            .add_pair(TrackId(2), TrackId(3), vec![SpotPair::new(&a, &b)])
            .unwrap();
        let truth = [
            TruthPair { id1: TrackId(1), id2: TrackId(1) },
            TruthPair { id1: TrackId(2), id2: TrackId(2) },
            TruthPair { id1: TrackId(4), id2: TrackId(4) },
        ];
        let m = PairingMetrics::evaluate(&builder.build(), &truth);
        assert_eq!(m.true_positives, 1);
        assert_eq!(m.false_positives, 1);
        assert_eq!(m.false_negatives, 2);
        assert!((m.precision() - 0.5).abs() < 1e-12);
        assert!((m.recall() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_score_perfectly() {
        let m = PairingMetrics::evaluate(&PairingBuilder::new().build(), &[]);
        assert_eq!(m, PairingMetrics::default());
        assert_eq!(m.precision(), 1.0);
        assert_eq!(m.recall(), 1.0);
    }
}
