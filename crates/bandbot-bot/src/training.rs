//! Training data for the predictive gate.
//!
//! Each open in the cycle history is labeled by how its position ended: a
//! take-profit makes every open since the previous close profitable, a
//! stop-loss makes them losers. Opens still waiting for a close are dropped.

use bandbot_core::TradeType;
use bandbot_persistence::CycleRecord;
use bandbot_strategy::{FeatureVector, LabeledSample};

/// Label every closed open in `records`, oldest first.
pub fn label_opens(records: &[CycleRecord]) -> Vec<LabeledSample> {
    let mut samples = Vec::new();
    let mut pending: Vec<FeatureVector> = Vec::new();

    for record in records {
        match record.trade_type {
            TradeType::OpenLong | TradeType::OpenShort => {
                pending.push(FeatureVector::from_snapshot(&record.snapshot));
            }
            TradeType::TakeProfitLong | TradeType::TakeProfitShort => {
                samples.extend(pending.drain(..).map(|features| LabeledSample {
                    features,
                    profitable: true,
                }));
            }
            TradeType::StopLoss => {
                samples.extend(pending.drain(..).map(|features| LabeledSample {
                    features,
                    profitable: false,
                }));
            }
            TradeType::None => {}
        }
    }

    samples
}
