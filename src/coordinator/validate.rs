//! Name validation applied before anything is sent to the host.

use crate::errors::CourierError;

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\', '/'];

const RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reject names the host would refuse or misinterpret as paths.
pub fn validate_name(name: &str) -> Result<(), CourierError> {
    let invalid = |reason: &str| CourierError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(invalid(&format!("contains '{c}'")));
    }
    if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name)) {
        return Err(invalid("reserved device name"));
    }
    if name.len() > 255 {
        return Err(invalid("longer than 255 bytes"));
    }
    Ok(())
}
