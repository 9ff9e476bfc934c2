//! Filename safety for client-supplied names.
//!
//! Every identifier and filename coming off the wire passes through
//! [`sanitize_filename`] before it becomes part of a storage key.

/// Longest name (in bytes) a sanitized component may have
pub const MAX_NAME_BYTES: usize = 255;

/// Name used when nothing usable is left after sanitizing
pub const FALLBACK_NAME: &str = "file";

const RESERVED: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Turn an untrusted name into a single safe key component.
///
/// Deterministic. Drops every directory part (both `/` and `\`), replaces
/// control and reserved characters with `_`, trims trailing dots and
/// spaces, and caps the length while keeping the extension. Never
/// returns an empty string, `.` or `..`.
pub fn sanitize_filename(name: &str) -> String {
    let basename = name
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = basename
        .chars()
        .map(|c| if c.is_control() || RESERVED.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_end_matches(['.', ' ']);

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return FALLBACK_NAME.to_string();
    }

    truncate_keeping_extension(cleaned, MAX_NAME_BYTES)
}

fn truncate_keeping_extension(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }

    let ext = extension(name).map(|e| format!(".{e}")).unwrap_or_default();
    let stem = strip_extension(name);
    let budget = max.saturating_sub(ext.len());

    let mut end = budget.min(stem.len());
    while end > 0 && !stem.is_char_boundary(end) {
        end -= 1;
    }
    if end == 0 {
        return FALLBACK_NAME.to_string() + &ext;
    }
    format!("{}{}", &stem[..end], ext)
}

fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Extension of the last path component, without the dot.
///
/// `None` when the name has no dot, or only a leading one (`.env`).
pub fn extension(name: &str) -> Option<&str> {
    let base = basename(name);
    match base.rfind('.') {
        Some(0) | None => None,
        Some(idx) if idx + 1 == base.len() => None,
        Some(idx) => Some(&base[idx + 1..]),
    }
}

/// Last path component with its extension removed
pub fn strip_extension(name: &str) -> &str {
    let base = basename(name);
    match extension(base) {
        Some(ext) => &base[..base.len() - ext.len() - 1],
        None => base,
    }
}

/// Final name for a caller-pinned filename.
///
/// The pinned name's own extension is replaced with the original file's,
/// so a caller can rename an upload but never change its type.
pub fn pinned_filename(pinned: &str, original: &str) -> String {
    let original = sanitize_filename(original);
    match extension(&original) {
        Some(ext) => sanitize_filename(&format!("{}.{}", strip_extension(pinned.trim()), ext)),
        None => sanitize_filename(pinned),
    }
}
