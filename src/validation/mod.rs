pub mod expiry;
pub mod luhn;

pub use expiry::{ExpiryDate, ExpiryValidator};
pub use luhn::{is_checksum_valid, luhn_check_digit};
