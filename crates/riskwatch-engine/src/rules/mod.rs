pub mod sharp_increase;
pub mod threshold_crossing;

use crate::config::RiskThresholds;
use crate::SupplierRiskRule;

pub use sharp_increase::SharpIncreaseRule;
pub use threshold_crossing::ThresholdCrossingRule;

/// The built-in rule set in evaluation order.
pub fn default_rules(thresholds: &RiskThresholds) -> Vec<Box<dyn SupplierRiskRule>> {
    vec![
        Box::new(ThresholdCrossingRule {
            threshold: thresholds.high_risk,
        }),
        Box::new(SharpIncreaseRule {
            floor: thresholds.increase_floor,
            min_increase: thresholds.increase_delta,
        }),
    ]
}
