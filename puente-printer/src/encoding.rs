//! CP437 encoding utilities for thermal printers
//!
//! ESC/POS printers default to code page PC437, which covers the Spanish
//! letters and punctuation used on tickets (ñ, á, ¡, ¿). This module provides:
//! - Character widths for fixed-width layout
//! - Truncating/padding strings to a column budget
//! - Converting UTF-8 to CP437 while preserving ESC/POS commands

use codepage_437::{CP437_CONTROL, IntoCp437};
use tracing::instrument;

/// ESC t n - select character code table
const SELECT_CODE_PAGE: [u8; 2] = [0x1B, 0x74];
const PAGE_PC437: u8 = 0;
const PAGE_PC858: u8 = 19;
/// `€` in PC858
const EURO_PC858: u8 = 0xD5;

/// Printed width of a string in columns
///
/// CP437 is single-byte, so every character takes one column.
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to at most `max_width` characters
pub fn truncate_chars(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Pad a string to exactly `width` columns
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_chars(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_chars(s, width);
    }
    let spaces = " ".repeat(width - current_width);
    if align_right {
        format!("{}{}", spaces, s)
    } else {
        format!("{}{}", s, spaces)
    }
}

/// Convert mixed UTF-8 content (with ESC/POS commands) to CP437
///
/// ASCII bytes (0x00-0x7F) are kept exactly as is, which protects ESC/POS
/// commands from being corrupted. Only bytes >= 0x80 are treated as UTF-8
/// sequences and converted.
///
/// Also handles:
/// - Re-selecting PC437 after INIT command (ESC @)
/// - Euro symbol (€) via a temporary switch to PC858
/// - Characters outside CP437 are printed as `?`
#[instrument(skip(bytes))]
pub fn convert_to_cp437(bytes: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len());

    result.extend_from_slice(&SELECT_CODE_PAGE);
    result.push(PAGE_PC437);

    let mut buffer = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        // INIT resets the code table, select PC437 again right after it
        if b == 0x1B && i + 1 < bytes.len() && bytes[i + 1] == 0x40 {
            flush_buffer(&mut buffer, &mut result);

            result.push(0x1B);
            result.push(0x40);
            result.extend_from_slice(&SELECT_CODE_PAGE);
            result.push(PAGE_PC437);

            i += 2;
            continue;
        }

        if b < 128 {
            flush_buffer(&mut buffer, &mut result);
            result.push(b);
        } else {
            buffer.push(b);
        }
        i += 1;
    }

    flush_buffer(&mut buffer, &mut result);

    result
}

/// Flush the non-ASCII buffer, converting UTF-8 to CP437
fn flush_buffer(buffer: &mut Vec<u8>, result: &mut Vec<u8>) {
    if buffer.is_empty() {
        return;
    }

    let s = String::from_utf8_lossy(buffer);
    for c in s.chars() {
        if c == '€' {
            // Euro sequence: PC858 -> € -> back to PC437
            result.extend_from_slice(&SELECT_CODE_PAGE);
            result.push(PAGE_PC858);
            result.push(EURO_PC858);
            result.extend_from_slice(&SELECT_CODE_PAGE);
            result.push(PAGE_PC437);
            continue;
        }
        match String::from(c).into_cp437(&CP437_CONTROL) {
            Ok(encoded) => result.extend_from_slice(&encoded),
            Err(_) => result.push(b'?'),
        }
    }
    buffer.clear();
}
