use crate::{RiskFinding, SupplierRiskRule};
use riskwatch_common::types::Severity;

pub const SUPPLIER_HIGH_RISK: &str = "SUPPLIER_HIGH_RISK";

/// Fires when the score crosses above `threshold`. A supplier already above
/// the threshold does not fire again.
pub struct ThresholdCrossingRule {
    pub threshold: i32,
}

impl SupplierRiskRule for ThresholdCrossingRule {
    fn id(&self) -> &str {
        "threshold-crossing"
    }

    fn evaluate(&self, current: i32, previous: Option<i32>) -> Option<RiskFinding> {
        let was_below = previous.map_or(true, |p| p <= self.threshold);
        if current > self.threshold && was_below {
            Some(RiskFinding {
                alert_type: SUPPLIER_HIGH_RISK.to_string(),
                severity: Severity::High,
                title: "Supplier Risk Score Exceeded Threshold".to_string(),
                description: format!(
                    "Supplier risk score has increased above the critical threshold of {}",
                    self.threshold
                ),
            })
        } else {
            None
        }
    }
}
