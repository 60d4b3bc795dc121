use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tunables for the anomaly detector, persisted as the `anomaly_config`
/// JSON block. Unknown keys round-trip through `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Relative tolerance applied to the larger of the two amounts when
    /// comparing GL against RL.
    pub amount_tolerance_percentage: f64,
    /// Floor below which amount differences are never reported.
    pub amount_tolerance_absolute: f64,

    /// Severity thresholds keyed on the absolute delta of an alert.
    pub critical_amount_threshold: f64,
    pub high_amount_threshold: f64,
    pub medium_amount_threshold: f64,
    pub low_amount_threshold: f64,

    pub alert_on_missing_transactions: bool,
    pub alert_on_duplicate_transactions: bool,

    /// Host-supplied closed days for the non-business-day rule. Saturdays
    /// and Sundays are always checked; this list adds public holidays.
    pub holidays: Vec<NaiveDate>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            amount_tolerance_percentage: 0.01,
            amount_tolerance_absolute: 1.00,
            critical_amount_threshold: 10_000.0,
            high_amount_threshold: 1_000.0,
            medium_amount_threshold: 100.0,
            low_amount_threshold: 10.0,
            alert_on_missing_transactions: true,
            alert_on_duplicate_transactions: true,
            holidays: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl DetectionConfig {
    /// Tolerance for one GL/RL amount comparison: the larger of the absolute
    /// floor and the percentage of the bigger amount.
    pub fn amount_tolerance(&self, amount_gl: f64, amount_rl: f64) -> f64 {
        let max_amount = amount_gl.abs().max(amount_rl.abs());
        self.amount_tolerance_absolute
            .max(self.amount_tolerance_percentage * max_amount)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.amount_tolerance_percentage, 0.01);
        assert_eq!(config.amount_tolerance_absolute, 1.00);
        assert!(config.alert_on_missing_transactions);
        assert!(config.holidays.is_empty());
    }

    #[test]
    fn test_tolerance_combines_absolute_and_relative() {
        let config = DetectionConfig::default();
        // Small amounts: the absolute floor dominates.
        assert_eq!(config.amount_tolerance(10.0, 12.0), 1.00);
        // Large amounts: the percentage dominates.
        assert_eq!(config.amount_tolerance(100.0, 102.0), 1.02);
    }

    #[test]
    fn test_unknown_keys_round_trip() {
        let raw = json!({
            "amount_tolerance_absolute": 0.5,
            "monitored_bank_accounts": ["512100", "512200"],
        });

        let config: DetectionConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.amount_tolerance_absolute, 0.5);

        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(
            out.get("monitored_bank_accounts"),
            Some(&json!(["512100", "512200"]))
        );
    }

    #[test]
    fn test_holidays_parse_as_iso() {
        let config: DetectionConfig =
            serde_json::from_value(json!({"holidays": ["2024-05-01"]})).unwrap();
        assert!(config.is_holiday(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
        assert!(!config.is_holiday(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()));
    }
}
