//! Name derivation for renamed destinations.
//!
//! Policy:
//! - A renamed file keeps the source's extension unless the new base already carries it.
//! - Numbered alternatives append " (n)" before the extension.
//! - Names are kept within a byte budget by shortening the stem, never the extension.

/// Conservative per-component limit shared by common host filesystems.
pub const MAX_NAME_BYTES: usize = 255;

/// Highest numeric suffix tried before giving up with " (final)".
pub const MAX_SUFFIX_TRIES: u64 = 10_000;

/// Split `name` into stem and extension.
///
/// Examples:
/// - "movie.json" -> ("movie", Some("json"))
/// - ".env" -> (".env", None)
/// - "archive.tar.gz" -> ("archive.tar", Some("gz"))
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(idx) if idx + 1 == name.len() => (name, None),
        Some(idx) => (&name[..idx], Some(&name[idx + 1..])),
    }
}

/// Name for a renamed copy of `source_name`, preserving its extension.
///
/// - ("a.json", "a_copy") -> "a_copy.json"
/// - ("a.json", "a_copy.json") -> "a_copy.json"
/// - ("README", "notes") -> "notes"
pub fn sibling_name(source_name: &str, new_base: &str) -> String {
    let new_base = new_base.trim();
    match split_name(source_name).1 {
        Some(ext) => {
            let (_, new_ext) = split_name(new_base);
            if new_ext.is_some_and(|e| e.eq_ignore_ascii_case(ext)) {
                fit_name(new_base, None, "")
            } else {
                fit_name(new_base, Some(ext), "")
            }
        }
        None => fit_name(new_base, None, ""),
    }
}

/// "stem (n).ext" for `name`.
pub fn numbered_name(name: &str, n: u64) -> String {
    let (stem, ext) = split_name(name);
    fit_name(stem, ext, &format!(" ({n})"))
}

/// Last-resort alternative once the numbered range is exhausted.
pub fn final_name(name: &str) -> String {
    let (stem, ext) = split_name(name);
    fit_name(stem, ext, " (final)")
}

/// Shorten `stem` on a char boundary so `stem + suffix + ["." + ext]` fits the budget.
fn fit_name(stem: &str, ext: Option<&str>, suffix: &str) -> String {
    let overhead = suffix.len() + ext.map(|e| e.len() + 1).unwrap_or(0);
    let budget = MAX_NAME_BYTES.saturating_sub(overhead);

    let mut kept = if stem.len() <= budget {
        stem.to_string()
    } else {
        let mut acc = String::new();
        for ch in stem.chars() {
            if acc.len() + ch.len_utf8() > budget {
                break;
            }
            acc.push(ch);
        }
        acc
    };
    if kept.is_empty() {
        // Pathologically small budget; keep at least one character
        kept.push('f');
    }

    let mut name = kept;
    name.push_str(suffix);
    if let Some(e) = ext {
        name.push('.');
        name.push_str(e);
    }
    name
}
