// Per-field extraction from a single frame of OCR output.
// Every filter walks the frame in reading order and returns the first line
// that survives normalization, pattern matching and validation.

use crate::debug_log;
use crate::models::{FieldCandidate, FieldKind, RecognizedText, ScannerConfiguration};
use crate::processing::text_correction::{normalize, normalize_for};
use crate::utils::Result;
use crate::validation::{is_checksum_valid, ExpiryDate, ExpiryValidator};
use chrono::{Local, NaiveDate};
use regex::Regex;
use std::collections::HashSet;

/// 13 to 19 digits, grouped by 4 (or 4-6-5 for fifteen digit cards), with at
/// most one space or dash between groups.
pub const DEFAULT_CARD_NUMBER_PATTERN: &str =
    r"\b(?:\d{4}[ -]?\d{6}[ -]?\d{5}|\d{4}(?:[ -]?\d{4}){2}(?:[ -]?\d{4})?(?:[ -]?\d{1,3})?)\b";

const EXPIRY_DATE_PATTERN: &str = r"\b(0[1-9]|1[0-2]) ?[/-] ?(\d{4}|\d{2})\b";

const CARD_NUMBER_DIGITS: std::ops::RangeInclusive<usize> = 13..=19;

/// Extracts a candidate for one field kind from one frame.
pub trait ScanFilter {
    fn kind(&self) -> FieldKind;
    fn extract(&self, text: &RecognizedText) -> Option<FieldCandidate>;
}

pub struct CardNumberFilter {
    pattern: Regex,
    enforce_checksum: bool,
    debug: bool,
}

impl CardNumberFilter {
    pub fn new(options: &ScannerConfiguration) -> Result<Self> {
        let pattern = options
            .card_number_pattern
            .as_deref()
            .unwrap_or(DEFAULT_CARD_NUMBER_PATTERN);
        Ok(CardNumberFilter {
            pattern: Regex::new(pattern)?,
            enforce_checksum: options.enforce_checksum,
            debug: options.debug,
        })
    }
}

impl ScanFilter for CardNumberFilter {
    fn kind(&self) -> FieldKind {
        FieldKind::CardNumber
    }

    fn extract(&self, text: &RecognizedText) -> Option<FieldCandidate> {
        for (block_index, line_index, line) in text.lines() {
            let sanitized = normalize(line);
            debug_log!(self, "Sanitized card number line: {}", sanitized);

            // Only the leftmost match on a line is considered.
            let Some(found) = self.pattern.find(&sanitized) else {
                continue;
            };

            let card_number = found.as_str().trim();
            let digits: String = card_number.chars().filter(|c| c.is_ascii_digit()).collect();
            if !CARD_NUMBER_DIGITS.contains(&digits.len()) {
                debug_log!(self, "Discarding {} digit match: {}", digits.len(), card_number);
                continue;
            }

            if self.enforce_checksum && !is_checksum_valid(&digits) {
                debug_log!(self, "Luhn check failed for card number ({})", card_number);
                continue;
            }

            debug_log!(self, "Card number: {}", card_number);
            return Some(FieldCandidate {
                kind: FieldKind::CardNumber,
                raw_value: card_number.to_string(),
                normalized_value: digits,
                block_index,
                line_index,
            });
        }

        None
    }
}

pub struct ExpiryDateFilter {
    pattern: Regex,
    allow_past_dates: bool,
    reference_date: NaiveDate,
    debug: bool,
}

impl ExpiryDateFilter {
    pub fn new(options: &ScannerConfiguration) -> Result<Self> {
        Ok(ExpiryDateFilter {
            pattern: Regex::new(EXPIRY_DATE_PATTERN)?,
            allow_past_dates: options.allow_past_expiry_dates,
            reference_date: Local::now().date_naive(),
            debug: options.debug,
        })
    }

    /// Pins "today" for the past-date check.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }
}

impl ScanFilter for ExpiryDateFilter {
    fn kind(&self) -> FieldKind {
        FieldKind::ExpiryDate
    }

    fn extract(&self, text: &RecognizedText) -> Option<FieldCandidate> {
        for (block_index, line_index, line) in text.lines() {
            let sanitized = normalize_for(FieldKind::ExpiryDate, line);

            // Cards often print "valid from" and "valid thru" on one line, so
            // every date on the line gets a chance.
            for captures in self.pattern.captures_iter(&sanitized) {
                let (Some(whole), Some(month), Some(year)) =
                    (captures.get(0), captures.get(1), captures.get(2))
                else {
                    continue;
                };

                let Some(expiry) = ExpiryDate::parse(month.as_str(), year.as_str()) else {
                    continue;
                };

                if !self.allow_past_dates
                    && !ExpiryValidator::is_not_expired(&expiry, self.reference_date)
                {
                    debug_log!(self, "Skipping past expiry date {}", expiry.normalized());
                    continue;
                }

                debug_log!(self, "Expiry date: {}", expiry.normalized());
                return Some(FieldCandidate {
                    kind: FieldKind::ExpiryDate,
                    raw_value: whole.as_str().to_string(),
                    normalized_value: expiry.normalized(),
                    block_index,
                    line_index,
                });
            }
        }

        None
    }
}

pub struct HolderNameFilter {
    max_length: usize,
    blocklist: HashSet<String>,
    debug: bool,
}

impl HolderNameFilter {
    pub fn new(options: &ScannerConfiguration) -> Self {
        HolderNameFilter {
            max_length: options.max_holder_name_length,
            blocklist: options
                .holder_name_blocklist
                .iter()
                .map(|word| word.to_uppercase())
                .collect(),
            debug: options.debug,
        }
    }

    fn is_plausible_name(&self, raw: &str, name: &str) -> bool {
        // Digit-heavy lines (numbers, dates) turn into letters under the name
        // confusion table; reject them on the raw text.
        let letters = raw.chars().filter(|c| c.is_alphabetic()).count();
        let digits = raw.chars().filter(|c| c.is_ascii_digit()).count();
        if letters <= digits * 2 {
            return false;
        }

        if name.chars().count() > self.max_length {
            return false;
        }

        let words: Vec<&str> = name.split(' ').collect();
        if !(2..=4).contains(&words.len()) {
            return false;
        }

        let mut has_full_word = false;
        for word in &words {
            let bare: String = word.chars().filter(|c| c.is_alphabetic()).collect();
            if bare.is_empty() || self.blocklist.contains(&bare) {
                return false;
            }
            if bare.chars().count() >= 2 {
                has_full_word = true;
            }
        }

        has_full_word
    }
}

impl ScanFilter for HolderNameFilter {
    fn kind(&self) -> FieldKind {
        FieldKind::HolderName
    }

    fn extract(&self, text: &RecognizedText) -> Option<FieldCandidate> {
        for (block_index, line_index, line) in text.lines() {
            let name = normalize_for(FieldKind::HolderName, line);
            if !self.is_plausible_name(line, &name) {
                continue;
            }

            debug_log!(self, "Card holder name: {}", name);
            return Some(FieldCandidate {
                kind: FieldKind::HolderName,
                raw_value: line.trim().to_string(),
                normalized_value: name,
                block_index,
                line_index,
            });
        }

        None
    }
}

/// The closed set of filters a scanner can run.
pub enum FieldFilter {
    CardNumber(CardNumberFilter),
    ExpiryDate(ExpiryDateFilter),
    HolderName(HolderNameFilter),
}

impl FieldFilter {
    pub fn for_kind(kind: FieldKind, options: &ScannerConfiguration) -> Result<Self> {
        Ok(match kind {
            FieldKind::CardNumber => FieldFilter::CardNumber(CardNumberFilter::new(options)?),
            FieldKind::ExpiryDate => FieldFilter::ExpiryDate(ExpiryDateFilter::new(options)?),
            FieldKind::HolderName => FieldFilter::HolderName(HolderNameFilter::new(options)),
        })
    }
}

impl ScanFilter for FieldFilter {
    fn kind(&self) -> FieldKind {
        match self {
            FieldFilter::CardNumber(f) => f.kind(),
            FieldFilter::ExpiryDate(f) => f.kind(),
            FieldFilter::HolderName(f) => f.kind(),
        }
    }

    fn extract(&self, text: &RecognizedText) -> Option<FieldCandidate> {
        match self {
            FieldFilter::CardNumber(f) => f.extract(text),
            FieldFilter::ExpiryDate(f) => f.extract(text),
            FieldFilter::HolderName(f) => f.extract(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(blocks: Vec<Vec<&str>>) -> RecognizedText {
        RecognizedText::from_blocks(blocks)
    }

    fn card_filter(enforce_checksum: bool) -> CardNumberFilter {
        CardNumberFilter::new(&ScannerConfiguration {
            enforce_checksum,
            ..Default::default()
        })
        .unwrap()
    }

    fn expiry_filter(allow_past: bool) -> ExpiryDateFilter {
        ExpiryDateFilter::new(&ScannerConfiguration {
            allow_past_expiry_dates: allow_past,
            ..Default::default()
        })
        .unwrap()
        .with_reference_date(NaiveDate::from_ymd_opt(2026, 10, 14).unwrap())
    }

    #[test]
    fn test_card_number_with_provenance() {
        let text = frame(vec![
            vec!["FIRST NATIONAL BANK"],
            vec!["PLATINUM", "4111 1111 1111 1111"],
        ]);
        let candidate = card_filter(true).extract(&text).unwrap();
        assert_eq!(candidate.kind, FieldKind::CardNumber);
        assert_eq!(candidate.raw_value, "4111 1111 1111 1111");
        assert_eq!(candidate.normalized_value, "4111111111111111");
        assert_eq!((candidate.block_index, candidate.line_index), (1, 1));
    }

    #[test]
    fn test_card_number_recovers_confused_characters() {
        let text = frame(vec![vec!["4III-IIIl-llII-IIII"]]);
        let candidate = card_filter(true).extract(&text).unwrap();
        assert_eq!(candidate.normalized_value, "4111111111111111");
    }

    #[test]
    fn test_card_number_contiguous_and_amex_grouping() {
        let filter = card_filter(true);
        let contiguous = filter.extract(&frame(vec![vec!["5555555555554444"]])).unwrap();
        assert_eq!(contiguous.normalized_value, "5555555555554444");

        let amex = filter.extract(&frame(vec![vec!["3782 822463 10005"]])).unwrap();
        assert_eq!(amex.normalized_value, "378282246310005");
    }

    #[test]
    fn test_checksum_failure_continues_to_next_line() {
        let text = frame(vec![vec!["4111 1111 1111 1112"], vec!["5555 5555 5555 4444"]]);
        let candidate = card_filter(true).extract(&text).unwrap();
        assert_eq!(candidate.normalized_value, "5555555555554444");
        assert_eq!(candidate.block_index, 1);
    }

    #[test]
    fn test_checksum_failure_alone_is_no_match() {
        let text = frame(vec![vec!["4111 1111 1111 1112"]]);
        assert!(card_filter(true).extract(&text).is_none());
    }

    #[test]
    fn test_without_checksum_first_match_wins() {
        let text = frame(vec![vec!["4111 1111 1111 1112"], vec!["5555 5555 5555 4444"]]);
        let candidate = card_filter(false).extract(&text).unwrap();
        assert_eq!(candidate.normalized_value, "4111111111111112");
    }

    #[test]
    fn test_trailing_brand_word_does_not_extend_number() {
        for enforce_checksum in [true, false] {
            let filter = card_filter(enforce_checksum);
            let visa = filter.extract(&frame(vec![vec!["4111 1111 1111 1111 VISA"]])).unwrap();
            assert_eq!(visa.normalized_value, "4111111111111111");
            assert_eq!(visa.raw_value, "4111 1111 1111 1111");

            let text = frame(vec![vec!["5555 5555 5555 4444 SIGNATURE"]]);
            let signature = filter.extract(&text).unwrap();
            assert_eq!(signature.normalized_value, "5555555555554444");
        }
    }

    #[test]
    fn test_short_digit_runs_are_ignored() {
        let text = frame(vec![vec!["1234 5678 9012", "CVV 123", "12/30"]]);
        assert!(card_filter(false).extract(&text).is_none());
    }

    #[test]
    fn test_custom_pattern() {
        let filter = CardNumberFilter::new(&ScannerConfiguration {
            card_number_pattern: Some(r"\d{4} \d{4} \d{4} \d{4}".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(filter.extract(&frame(vec![vec!["4111111111111111"]])).is_none());
        assert!(filter.extract(&frame(vec![vec!["4111 1111 1111 1111"]])).is_some());
    }

    #[test]
    fn test_extract_is_deterministic() {
        let text = frame(vec![
            vec!["VISA", "4012 8888 8888 1881", "4111 1111 1111 1111"],
            vec!["VALID THRU 09/29", "JOHN Q PUBLIC"],
        ]);
        let options = ScannerConfiguration {
            scan_holder_name: true,
            ..Default::default()
        };
        for kind in FieldKind::ALL {
            let filter = FieldFilter::for_kind(kind, &options).unwrap();
            let first = filter.extract(&text);
            for _ in 0..5 {
                assert_eq!(filter.extract(&text), first);
            }
        }
    }

    #[test]
    fn test_expiry_date_formats() {
        let filter = expiry_filter(false);
        let candidate = filter.extract(&frame(vec![vec!["VALID THRU O9/2B"]])).unwrap();
        assert_eq!(candidate.normalized_value, "09/28");
        assert_eq!(candidate.raw_value, "09/28");

        let long_year = filter.extract(&frame(vec![vec!["EXP 12/2031"]])).unwrap();
        assert_eq!(long_year.normalized_value, "12/31");
    }

    #[test]
    fn test_expiry_skips_past_dates_on_same_line() {
        let text = frame(vec![vec!["VALID FROM 01/22 THRU 01/29"]]);
        let candidate = expiry_filter(false).extract(&text).unwrap();
        assert_eq!(candidate.normalized_value, "01/29");

        let candidate = expiry_filter(true).extract(&text).unwrap();
        assert_eq!(candidate.normalized_value, "01/22");
    }

    #[test]
    fn test_expiry_current_month_is_accepted() {
        let text = frame(vec![vec!["10/26"]]);
        assert!(expiry_filter(false).extract(&text).is_some());
        let text = frame(vec![vec!["09/26"]]);
        assert!(expiry_filter(false).extract(&text).is_none());
    }

    #[test]
    fn test_expiry_rejects_invalid_month() {
        let text = frame(vec![vec!["13/30", "00/30"]]);
        assert!(expiry_filter(true).extract(&text).is_none());
    }

    #[test]
    fn test_holder_name() {
        let filter = HolderNameFilter::new(&ScannerConfiguration::default());
        let text = frame(vec![
            vec!["WORLD BANK"],
            vec!["4111 1111 1111 1111", "VALID THRU 09/29"],
            vec!["j0hn  sm1th"],
        ]);
        let candidate = filter.extract(&text).unwrap();
        assert_eq!(candidate.normalized_value, "JOHN SMITH");
        assert_eq!(candidate.raw_value, "j0hn  sm1th");
        assert_eq!((candidate.block_index, candidate.line_index), (2, 0));
    }

    #[test]
    fn test_holder_name_length_and_shape() {
        let filter = HolderNameFilter::new(&ScannerConfiguration {
            max_holder_name_length: 12,
            ..Default::default()
        });
        assert!(filter.extract(&frame(vec![vec!["MAXIMILIAN VONHAUSEN"]])).is_none());
        assert!(filter.extract(&frame(vec![vec!["CHASE"]])).is_none());
        assert!(filter.extract(&frame(vec![vec!["A B"]])).is_none());
        assert!(filter.extract(&frame(vec![vec!["J SMITH"]])).is_some());
    }

    #[test]
    fn test_holder_name_custom_blocklist() {
        let filter = HolderNameFilter::new(&ScannerConfiguration {
            holder_name_blocklist: vec!["acme".to_string()],
            ..Default::default()
        });
        assert!(filter.extract(&frame(vec![vec!["ACME REWARDS"]])).is_none());
        assert!(filter.extract(&frame(vec![vec!["VISA GOLD"]])).is_some());
    }
}
