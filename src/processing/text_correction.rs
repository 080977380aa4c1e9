// OCR confusion correction for card faces.
// Each field kind has its own target alphabet; anything outside it becomes a
// separator so that neighbouring tokens never glue together.

use crate::models::FieldKind;

const CARD_NUMBER_KEPT: &[char] = &['-'];
const EXPIRY_DATE_KEPT: &[char] = &['/', '-'];

/// Canonical card-number form of a raw OCR line.
pub fn normalize(raw: &str) -> String {
    normalize_for(FieldKind::CardNumber, raw)
}

/// Field-aware normalization. Total and side-effect free; idempotent on its
/// own output.
///
/// For the digit fields a confusable letter is only read as a digit inside a
/// token that already holds a real digit, so brand words such as `VISA` next
/// to a number drop out instead of turning into a stray digit group.
pub fn normalize_for(kind: FieldKind, raw: &str) -> String {
    let mut corrected = match kind {
        FieldKind::CardNumber => correct_digits(raw, CARD_NUMBER_KEPT),
        FieldKind::ExpiryDate => correct_digits(raw, EXPIRY_DATE_KEPT),
        FieldKind::HolderName => correct_letters(raw),
    };

    let trimmed_len = corrected.trim_end().len();
    corrected.truncate(trimmed_len);
    corrected
}

fn correct_digits(raw: &str, kept: &[char]) -> String {
    let mut corrected = String::with_capacity(raw.len());
    let mut token = String::new();
    let mut anchored = false;

    for c in raw.chars() {
        if let Some(d) = digit_for(c) {
            anchored |= c.is_ascii_digit();
            token.push(d);
        } else if kept.contains(&c) {
            token.push(c);
        } else {
            flush_token(&mut corrected, &mut token, &mut anchored);
            push_separator(&mut corrected);
        }
    }
    flush_token(&mut corrected, &mut token, &mut anchored);
    corrected
}

// A token with no real digit in it is a word, not a misread number.
fn flush_token(out: &mut String, token: &mut String, anchored: &mut bool) {
    if *anchored {
        out.push_str(token);
    } else if !token.is_empty() {
        push_separator(out);
    }
    token.clear();
    *anchored = false;
}

fn correct_letters(raw: &str) -> String {
    let mut corrected = String::with_capacity(raw.len());
    for c in raw.chars() {
        match letter_for(c) {
            Some(l) => corrected.extend(l.to_uppercase()),
            None if c == '.' || c == '\'' || c == '-' => corrected.push(c),
            None => push_separator(&mut corrected),
        }
    }
    corrected
}

// Letters and symbols commonly misread in place of digits on embossed and
// printed card numbers.
fn digit_for(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        'O' | 'o' | 'D' | 'Q' | 'U' => Some('0'),
        'I' | 'i' | 'l' | 'L' | '|' | '!' | ']' => Some('1'),
        'Z' | 'z' => Some('2'),
        'Y' | '+' => Some('4'),
        'S' | 's' | '$' => Some('5'),
        'b' | 'G' => Some('6'),
        'T' => Some('7'),
        'B' => Some('8'),
        'g' | 'q' => Some('9'),
        _ => None,
    }
}

fn letter_for(c: char) -> Option<char> {
    match c {
        '0' => Some('O'),
        '1' => Some('I'),
        '2' => Some('Z'),
        '5' => Some('S'),
        '6' => Some('G'),
        '8' => Some('B'),
        c if c.is_alphabetic() => Some(c),
        _ => None,
    }
}

// Collapses runs and never leads.
fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}
