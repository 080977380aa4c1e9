use crate::models::FieldKind;
use crate::utils::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MIN_OBSERVATIONS: u32 = 2;
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 30;
pub const DEFAULT_MAX_HOLDER_NAME_LENGTH: usize = 26;

/// Words printed on cards that are never part of the holder's name.
pub const DEFAULT_HOLDER_NAME_BLOCKLIST: &[&str] = &[
    "AMERICAN", "AMEX", "BANK", "BUSINESS", "CARD", "CLASSIC", "CREDIT", "DEBIT", "DISCOVER",
    "ELECTRONIC", "EXPRESS", "FROM", "GOLD", "INTERNATIONAL", "MAESTRO", "MASTERCARD", "MEMBER",
    "MONTH", "ONLY", "PLATINUM", "PREPAID", "RUPAY", "SIGNATURE", "SINCE", "THRU", "TITANIUM",
    "UPTO", "USE", "VALID", "VISA", "WORLD", "YEAR",
];

/// Read-only settings for one scan session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfiguration {
    /// Seconds until the session gives up. `0` disables the deadline.
    pub timeout_seconds: i64,
    /// Threshold used for any field without an entry in `min_observations`.
    pub default_min_observations: u32,
    pub min_observations: BTreeMap<FieldKind, u32>,
    pub enforce_checksum: bool,
    pub debug: bool,
    pub scan_expiry_date: bool,
    pub scan_holder_name: bool,
    /// Fields that must be corroborated before the session may stop early.
    pub required_fields: Vec<FieldKind>,
    /// Overrides the built-in card number shape.
    pub card_number_pattern: Option<String>,
    /// Leading partial results ignored while the camera settles.
    pub initial_frames_to_drop: u32,
    pub allow_past_expiry_dates: bool,
    pub max_holder_name_length: usize,
    pub holder_name_blocklist: Vec<String>,
}

impl Default for ScannerConfiguration {
    fn default() -> Self {
        ScannerConfiguration {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            default_min_observations: DEFAULT_MIN_OBSERVATIONS,
            min_observations: BTreeMap::new(),
            enforce_checksum: true,
            debug: false,
            scan_expiry_date: true,
            scan_holder_name: false,
            required_fields: vec![FieldKind::CardNumber],
            card_number_pattern: None,
            initial_frames_to_drop: 0,
            allow_past_expiry_dates: false,
            max_holder_name_length: DEFAULT_MAX_HOLDER_NAME_LENGTH,
            holder_name_blocklist: DEFAULT_HOLDER_NAME_BLOCKLIST
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

impl ScannerConfiguration {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ScannerConfiguration = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Rejects settings that would otherwise be silently coerced.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds < 0 {
            return Err(ScanError::InvalidConfiguration(format!(
                "timeout_seconds must be >= 0, got {}",
                self.timeout_seconds
            )));
        }

        if self.default_min_observations < 1 {
            return Err(ScanError::InvalidConfiguration(
                "default_min_observations must be >= 1".to_string(),
            ));
        }

        for (kind, threshold) in &self.min_observations {
            if *threshold < 1 {
                return Err(ScanError::InvalidConfiguration(format!(
                    "min_observations for {} must be >= 1",
                    kind
                )));
            }
        }

        if self.required_fields.is_empty() {
            return Err(ScanError::InvalidConfiguration(
                "at least one required field is needed".to_string(),
            ));
        }

        for kind in &self.required_fields {
            if !self.is_enabled(*kind) {
                return Err(ScanError::InvalidConfiguration(format!(
                    "required field {} is not enabled for scanning",
                    kind
                )));
            }
        }

        if self.max_holder_name_length == 0 {
            return Err(ScanError::InvalidConfiguration(
                "max_holder_name_length must be > 0".to_string(),
            ));
        }

        if let Some(pattern) = &self.card_number_pattern {
            regex::Regex::new(pattern)?;
        }

        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_seconds > 0 {
            Some(Duration::from_secs(self.timeout_seconds as u64))
        } else {
            None
        }
    }

    pub fn min_observations_for(&self, kind: FieldKind) -> u32 {
        self.min_observations
            .get(&kind)
            .copied()
            .unwrap_or(self.default_min_observations)
    }

    pub fn is_enabled(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::CardNumber => true,
            FieldKind::ExpiryDate => self.scan_expiry_date,
            FieldKind::HolderName => self.scan_holder_name,
        }
    }

    pub fn enabled_fields(&self) -> Vec<FieldKind> {
        FieldKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScannerConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_observations_for(FieldKind::CardNumber), 2);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.enabled_fields(),
            vec![FieldKind::CardNumber, FieldKind::ExpiryDate]
        );
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = ScannerConfiguration {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_rejects_negative_timeout() {
        let config = ScannerConfiguration {
            timeout_seconds: -1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let mut config = ScannerConfiguration::default();
        config.min_observations.insert(FieldKind::CardNumber, 0);
        assert!(config.validate().is_err());

        let config = ScannerConfiguration {
            default_min_observations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_required_field_that_is_disabled() {
        let config = ScannerConfiguration {
            required_fields: vec![FieldKind::CardNumber, FieldKind::HolderName],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_pattern() {
        let config = ScannerConfiguration {
            card_number_pattern: Some("(\\d{4".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ScanError::InvalidPattern(_))));
    }

    #[test]
    fn test_json_fills_in_defaults() {
        let config = ScannerConfiguration::from_json_str(
            r#"{ "timeout_seconds": 5, "min_observations": { "card_number": 3 }, "debug": true }"#,
        )
        .unwrap();
        assert_eq!(config.timeout_seconds, 5);
        assert!(config.debug);
        assert!(config.enforce_checksum);
        assert_eq!(config.min_observations_for(FieldKind::CardNumber), 3);
        assert_eq!(config.min_observations_for(FieldKind::ExpiryDate), 2);
    }

    #[test]
    fn test_json_negative_threshold_fails() {
        let result =
            ScannerConfiguration::from_json_str(r#"{ "min_observations": { "card_number": -1 } }"#);
        assert!(matches!(result, Err(ScanError::ConfigParse(_))));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "scan_holder_name": true, "required_fields": ["card_number", "holder_name"] }}"#)
            .unwrap();
        let config = ScannerConfiguration::from_json_file(file.path()).unwrap();
        assert!(config.is_enabled(FieldKind::HolderName));
        assert_eq!(config.required_fields.len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ScannerConfiguration::from_json_file("/nonexistent/cardscan.json");
        assert!(matches!(result, Err(ScanError::ConfigIo(_))));
    }
}
