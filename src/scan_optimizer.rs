use crate::debug_log;
use crate::models::{CardDetails, FieldKind, PartialCardDetails, ScannerConfiguration};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerState {
    Collecting,
    /// Every required field has been corroborated. Never left once entered.
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueObservation {
    pub count: u32,
    /// 1-based index of the ingested frame that first produced the value.
    pub first_seen_frame: u64,
}

/// How often each normalized value has been seen for one field kind.
#[derive(Debug, Clone, Default)]
pub struct FieldObservationStats {
    values: HashMap<String, ValueObservation>,
}

impl FieldObservationStats {
    fn record(&mut self, value: &str, frame: u64) {
        self.values
            .entry(value.to_string())
            .and_modify(|observation| observation.count += 1)
            .or_insert(ValueObservation {
                count: 1,
                first_seen_frame: frame,
            });
    }

    pub fn get(&self, value: &str) -> Option<&ValueObservation> {
        self.values.get(value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Highest count wins; ties go to the value seen first. A field yields at
    /// most one value per frame, so `first_seen_frame` is unique per value.
    pub fn best(&self) -> Option<(&str, ValueObservation)> {
        self.values
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.count
                    .cmp(&b.count)
                    .then_with(|| b.first_seen_frame.cmp(&a.first_seen_frame))
            })
            .map(|(value, observation)| (value.as_str(), *observation))
    }

    pub fn max_count(&self) -> u32 {
        self.values.values().map(|o| o.count).max().unwrap_or(0)
    }
}

/// Cross-frame consensus over per-frame partial results.
///
/// A value only counts towards readiness once it has been seen in at least
/// the configured number of frames, so one misread frame can never finish a
/// scan on its own.
pub struct CardDetailsScanOptimizer {
    required_fields: Vec<FieldKind>,
    thresholds: BTreeMap<FieldKind, u32>,
    initial_frames_to_drop: u32,
    stats: BTreeMap<FieldKind, FieldObservationStats>,
    frames_offered: u64,
    frames_ingested: u64,
    state: OptimizerState,
    debug: bool,
}

impl CardDetailsScanOptimizer {
    pub fn new(options: &ScannerConfiguration) -> Self {
        let thresholds = FieldKind::ALL
            .iter()
            .map(|kind| (*kind, options.min_observations_for(*kind)))
            .collect();

        CardDetailsScanOptimizer {
            required_fields: options.required_fields.clone(),
            thresholds,
            initial_frames_to_drop: options.initial_frames_to_drop,
            stats: BTreeMap::new(),
            frames_offered: 0,
            frames_ingested: 0,
            state: OptimizerState::Collecting,
            debug: options.debug,
        }
    }

    pub fn ingest(&mut self, partial: PartialCardDetails) {
        self.frames_offered += 1;
        if self.frames_offered <= u64::from(self.initial_frames_to_drop) {
            debug_log!(
                self,
                "Dropping initial scan {} of {}",
                self.frames_offered,
                self.initial_frames_to_drop
            );
            return;
        }

        self.frames_ingested += 1;
        for candidate in partial.iter() {
            self.stats
                .entry(candidate.kind)
                .or_default()
                .record(&candidate.normalized_value, self.frames_ingested);
        }

        if self.state == OptimizerState::Collecting && self.required_fields_corroborated() {
            debug_log!(self, "Ready after {} frames", self.frames_ingested);
            self.state = OptimizerState::Ready;
        }
    }

    fn required_fields_corroborated(&self) -> bool {
        self.required_fields.iter().all(|kind| {
            let threshold = self.thresholds.get(kind).copied().unwrap_or(1);
            self.stats
                .get(kind)
                .map_or(false, |stats| stats.max_count() >= threshold)
        })
    }

    pub fn is_ready_to_finish_scan(&self) -> bool {
        self.state == OptimizerState::Ready
    }

    pub fn state(&self) -> OptimizerState {
        self.state
    }

    /// Best value per observed field. Usable in any state so a deadline can
    /// still produce a best-effort answer.
    pub fn get_optimal_card_details(&self) -> Option<CardDetails> {
        let mut details = CardDetails::default();
        for (kind, stats) in &self.stats {
            if let Some((value, observation)) = stats.best() {
                details.fields.insert(*kind, value.to_string());
                details.observations.insert(*kind, observation.count);
            }
        }

        if details.is_empty() {
            None
        } else {
            Some(details)
        }
    }

    pub fn stats(&self, kind: FieldKind) -> Option<&FieldObservationStats> {
        self.stats.get(&kind)
    }

    /// Partial results counted so far, excluding dropped initial frames.
    pub fn frames_ingested(&self) -> u64 {
        self.frames_ingested
    }

    pub fn frames_since_first_seen(&self, kind: FieldKind, value: &str) -> Option<u64> {
        self.stats
            .get(&kind)?
            .get(value)
            .map(|observation| self.frames_ingested - observation.first_seen_frame)
    }
}
