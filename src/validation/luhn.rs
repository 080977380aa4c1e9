/// Mod-10 (Luhn) check used by every payment card network.
///
/// Fails closed: empty input, any non-digit, or an all-zero string is invalid.
pub fn is_checksum_valid(digits: &str) -> bool {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if digits.bytes().all(|b| b == b'0') {
        return false;
    }
    weighted_sum(digits.bytes().rev(), 1) % 10 == 0
}

/// Digit that, appended to `prefix`, makes it pass [`is_checksum_valid`].
pub fn luhn_check_digit(prefix: &str) -> Option<u8> {
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // The check digit takes index 0, so the prefix starts doubling at index 0 of its own reversal.
    let sum = weighted_sum(prefix.bytes().rev(), 0);
    Some(((10 - sum % 10) % 10) as u8)
}

fn weighted_sum<I: Iterator<Item = u8>>(reversed: I, doubled_parity: usize) -> u32 {
    reversed
        .enumerate()
        .map(|(index, byte)| {
            let digit = u32::from(byte - b'0');
            if index % 2 == doubled_parity {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum()
}
