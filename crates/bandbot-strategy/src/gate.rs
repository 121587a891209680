//! Predictive gate.
//!
//! An optional binary classifier that may veto an entry signal. The
//! orchestration loop reads it through [`ModelSlot`], which the retraining
//! worker republishes into. An empty slot permits every entry.
//!
//! The shipped model is a nearest-centroid classifier over z-scored deltas:
//! small, deterministic and cheap enough to retrain in-process.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bandbot_core::{MarketSnapshot, Side};

use crate::error::{StrategyError, StrategyResult};

/// Number of features.
pub const FEATURES: usize = 6;

/// Every `TEST_STRIDE`-th sample goes to the test split.
const TEST_STRIDE: usize = 5;

/// Cycle deltas: price, trailing average, index, bid size, ask size, 24h volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURES]);

impl FeatureVector {
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        Self([
            snapshot.price.current.to_f64() - snapshot.price.previous.to_f64(),
            snapshot.average.current - snapshot.average.previous,
            snapshot.index.current - snapshot.index.previous,
            snapshot.bid_size.current.to_f64() - snapshot.bid_size.previous.to_f64(),
            snapshot.ask_size.current.to_f64() - snapshot.ask_size.previous.to_f64(),
            snapshot.volume_24h.current.to_f64() - snapshot.volume_24h.previous.to_f64(),
        ])
    }
}

/// One historical open with its eventual outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureVector,
    /// The close that followed was a take-profit.
    pub profitable: bool,
}

/// Veto point over entry signals.
pub trait PredictiveGate: Send + Sync {
    /// Whether opening on `side` is allowed for these features.
    fn permits(&self, side: Side, features: &FeatureVector) -> bool;
}

/// Nearest-centroid classifier on standardized features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidModel {
    mean: [f64; FEATURES],
    std: [f64; FEATURES],
    profit_centroid: [f64; FEATURES],
    loss_centroid: [f64; FEATURES],
}

impl CentroidModel {
    fn standardize(&self, f: &FeatureVector) -> [f64; FEATURES] {
        let mut z = [0.0; FEATURES];
        for i in 0..FEATURES {
            z[i] = (f.0[i] - self.mean[i]) / self.std[i];
        }
        z
    }

    /// True when the features sit closer to the profitable centroid.
    /// Ties resolve to profitable.
    #[must_use]
    pub fn predicts_profit(&self, features: &FeatureVector) -> bool {
        let z = self.standardize(features);
        distance_sq(&z, &self.profit_centroid) <= distance_sq(&z, &self.loss_centroid)
    }
}

impl PredictiveGate for CentroidModel {
    fn permits(&self, _side: Side, features: &FeatureVector) -> bool {
        self.predicts_profit(features)
    }
}

fn distance_sq(a: &[f64; FEATURES], b: &[f64; FEATURES]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Outcome of one training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model: CentroidModel,
    pub train_len: usize,
    pub test_len: usize,
    /// Accuracy of the model on the test split.
    pub accuracy: f64,
    /// Accuracy of always permitting on the same split.
    pub baseline_accuracy: f64,
}

impl TrainingReport {
    /// The model is worth publishing only if it beats always-permit.
    #[must_use]
    pub fn beats_baseline(&self) -> bool {
        self.accuracy > self.baseline_accuracy
    }
}

/// Fit a [`CentroidModel`] with a deterministic train/test split.
pub fn train_centroid_model(
    samples: &[LabeledSample],
    min_samples: usize,
) -> StrategyResult<TrainingReport> {
    let need = min_samples.max(TEST_STRIDE);
    if samples.len() < need {
        return Err(StrategyError::InsufficientData {
            have: samples.len(),
            need,
        });
    }

    let (test, train): (Vec<_>, Vec<_>) = samples
        .iter()
        .enumerate()
        .partition(|(i, _)| i % TEST_STRIDE == TEST_STRIDE - 1);
    let train: Vec<&LabeledSample> = train.into_iter().map(|(_, s)| s).collect();
    let test: Vec<&LabeledSample> = test.into_iter().map(|(_, s)| s).collect();

    let wins = train.iter().filter(|s| s.profitable).count();
    if wins == 0 || wins == train.len() {
        return Err(StrategyError::SingleClass);
    }

    let n = train.len() as f64;
    let mut mean = [0.0; FEATURES];
    for s in &train {
        for i in 0..FEATURES {
            mean[i] += s.features.0[i] / n;
        }
    }
    let mut std = [0.0; FEATURES];
    for s in &train {
        for i in 0..FEATURES {
            std[i] += (s.features.0[i] - mean[i]).powi(2) / n;
        }
    }
    for v in std.iter_mut() {
        *v = v.sqrt();
        // constant feature: leave it centred but unscaled
        if *v < f64::EPSILON {
            *v = 1.0;
        }
    }

    let mut model = CentroidModel {
        mean,
        std,
        profit_centroid: [0.0; FEATURES],
        loss_centroid: [0.0; FEATURES],
    };

    let losses = train.len() - wins;
    for s in &train {
        let z = model.standardize(&s.features);
        let (centroid, count) = if s.profitable {
            (&mut model.profit_centroid, wins)
        } else {
            (&mut model.loss_centroid, losses)
        };
        for i in 0..FEATURES {
            centroid[i] += z[i] / count as f64;
        }
    }

    let correct = test
        .iter()
        .filter(|s| model.predicts_profit(&s.features) == s.profitable)
        .count();
    let positives = test.iter().filter(|s| s.profitable).count();
    let test_len = test.len();
    let accuracy = correct as f64 / test_len as f64;
    let baseline_accuracy = positives as f64 / test_len as f64;

    debug!(
        train_len = train.len(),
        test_len, accuracy, baseline_accuracy, "Centroid model trained"
    );

    Ok(TrainingReport {
        model,
        train_len: train.len(),
        test_len,
        accuracy,
        baseline_accuracy,
    })
}

/// Shared, swappable model holder.
#[derive(Debug, Default)]
pub struct ModelSlot {
    model: RwLock<Option<Arc<CentroidModel>>>,
}

impl ModelSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, model: CentroidModel) {
        *self.model.write() = Some(Arc::new(model));
        info!("Predictive model published");
    }

    pub fn clear(&self) {
        *self.model.write() = None;
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.model.read().is_some()
    }

    pub fn current(&self) -> Option<Arc<CentroidModel>> {
        self.model.read().clone()
    }
}

impl PredictiveGate for ModelSlot {
    fn permits(&self, side: Side, features: &FeatureVector) -> bool {
        match self.current() {
            Some(model) => model.permits(side, features),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, profitable: bool) -> LabeledSample {
        LabeledSample {
            features: FeatureVector([x, x, 0.0, 1.0, -1.0, x * 10.0]),
            profitable,
        }
    }

    /// Profitable opens have positive deltas, losing ones negative.
    fn separable(n: usize) -> Vec<LabeledSample> {
        (0..n)
            .map(|i| {
                let profitable = i % 2 == 0;
                let magnitude = 1.0 + (i % 7) as f64 * 0.1;
                sample(if profitable { magnitude } else { -magnitude }, profitable)
            })
            .collect()
    }

    #[test]
    fn test_empty_slot_permits() {
        let slot = ModelSlot::new();
        assert!(!slot.is_loaded());
        assert!(slot.permits(Side::Long, &FeatureVector::default()));
    }

    #[test]
    fn test_trained_model_separates_classes() {
        let report = train_centroid_model(&separable(50), 10).unwrap();
        assert_eq!(report.train_len + report.test_len, 50);
        assert_eq!(report.test_len, 10);
        assert!((report.accuracy - 1.0).abs() < 1e-12);
        assert!(report.beats_baseline());

        assert!(report.model.predicts_profit(&sample(1.5, true).features));
        assert!(!report.model.predicts_profit(&sample(-1.5, false).features));
    }

    #[test]
    fn test_published_model_can_veto() {
        let report = train_centroid_model(&separable(40), 10).unwrap();
        let slot = ModelSlot::new();
        slot.publish(report.model);

        assert!(slot.is_loaded());
        assert!(!slot.permits(Side::Short, &sample(-2.0, false).features));
        assert!(slot.permits(Side::Long, &sample(2.0, true).features));

        slot.clear();
        assert!(slot.permits(Side::Short, &sample(-2.0, false).features));
    }

    #[test]
    fn test_insufficient_data() {
        let err = train_centroid_model(&separable(8), 20).unwrap_err();
        assert!(matches!(
            err,
            StrategyError::InsufficientData { have: 8, need: 20 }
        ));
    }

    #[test]
    fn test_single_class_rejected() {
        let samples: Vec<_> = (0..20).map(|i| sample(i as f64, true)).collect();
        assert!(matches!(
            train_centroid_model(&samples, 10),
            Err(StrategyError::SingleClass)
        ));
    }
}
