pub mod extractors;
pub mod scanner;
pub mod text_correction;

pub use extractors::{
    CardNumberFilter, ExpiryDateFilter, FieldFilter, HolderNameFilter, ScanFilter,
};
pub use scanner::SingleFrameCardScanner;
pub use text_correction::{normalize, normalize_for};
