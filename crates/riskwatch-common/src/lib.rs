//! Types shared by every riskwatch crate: the [`types::RiskAlert`] record,
//! its severity/status enumerations, user references and id generation.

pub mod id;
pub mod types;
