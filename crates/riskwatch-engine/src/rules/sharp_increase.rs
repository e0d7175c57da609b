use crate::{RiskFinding, SupplierRiskRule};
use riskwatch_common::types::Severity;

pub const SUPPLIER_RISK_INCREASE: &str = "SUPPLIER_RISK_INCREASE";

/// Fires when a score above `floor` rose by more than `min_increase` since
/// the previous reading. Needs a previous reading.
pub struct SharpIncreaseRule {
    pub floor: i32,
    pub min_increase: i32,
}

impl SupplierRiskRule for SharpIncreaseRule {
    fn id(&self) -> &str {
        "sharp-increase"
    }

    fn evaluate(&self, current: i32, previous: Option<i32>) -> Option<RiskFinding> {
        let previous = previous?;
        if current > self.floor && current > previous + self.min_increase {
            Some(RiskFinding {
                alert_type: SUPPLIER_RISK_INCREASE.to_string(),
                severity: Severity::Medium,
                title: "Significant Supplier Risk Increase".to_string(),
                description: "Supplier risk score has increased significantly".to_string(),
            })
        } else {
            None
        }
    }
}
