//! Host path helpers.
//! Paths are opaque host strings; only the last component is ever split off.
//! The separator is inferred from the path itself (`\` if it contains one and no `/`).

fn separator_for(path: &str) -> char {
    if path.contains('\\') && !path.contains('/') {
        '\\'
    } else {
        '/'
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Last component, ignoring trailing separators.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    match trimmed.rfind(is_separator) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Everything before the last component, or `None` for a bare name.
pub fn dirname(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches(is_separator);
    let idx = trimmed.rfind(is_separator)?;
    let parent = &trimmed[..idx];
    if parent.is_empty() {
        // root on Unix-style hosts
        Some(&trimmed[..1])
    } else {
        Some(parent)
    }
}

/// Append `name` to `parent` with the parent's separator.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        return name.to_string();
    }
    if parent.ends_with(is_separator) {
        format!("{parent}{name}")
    } else {
        format!("{parent}{}{name}", separator_for(parent))
    }
}
