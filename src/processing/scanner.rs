use crate::debug_log;
use crate::models::{PartialCardDetails, RecognizedText, ScannerConfiguration};
use crate::processing::extractors::{FieldFilter, ScanFilter};
use crate::utils::Result;

/// Runs every enabled field filter over one frame.
pub struct SingleFrameCardScanner {
    filters: Vec<FieldFilter>,
    debug: bool,
}

impl SingleFrameCardScanner {
    pub fn new(options: &ScannerConfiguration) -> Result<Self> {
        let filters = options
            .enabled_fields()
            .into_iter()
            .map(|kind| FieldFilter::for_kind(kind, options))
            .collect::<Result<Vec<_>>>()?;

        Ok(SingleFrameCardScanner {
            filters,
            debug: options.debug,
        })
    }

    /// Builds a scanner around an explicit filter set.
    pub fn with_filters(filters: Vec<FieldFilter>, debug: bool) -> Self {
        SingleFrameCardScanner { filters, debug }
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    /// Merges whatever the filters found in this frame. `None` when nothing
    /// matched at all.
    pub fn scan_single_frame(&self, text: &RecognizedText) -> Option<PartialCardDetails> {
        if self.debug {
            for block in &text.blocks {
                debug_log!(self, "visionText: {}", block.text());
            }
        }

        let mut details = PartialCardDetails::new();
        for filter in &self.filters {
            if let Some(candidate) = filter.extract(text) {
                details.insert(candidate);
            } else {
                debug_log!(self, "No {} in frame", filter.kind());
            }
        }

        if details.is_empty() {
            return None;
        }

        debug_log!(self, "Card details: {}", details);
        Some(details)
    }
}
