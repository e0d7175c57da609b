pub mod risk_alert;
