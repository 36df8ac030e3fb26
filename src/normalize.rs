//! Canonicalization of user-supplied identifiers before they become key
//! fragments. The colon is the store's field separator and must never survive
//! into a key; every function here is total and idempotent.

/// Normalize a login or email for use as a comparison key.
///
/// Lower-cases and strips the colon and all whitespace.
pub fn normalize_login(s: &str) -> String {
    s.chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Alias for [`normalize_login`]; emails are normalized the same way.
pub fn normalize_email(s: &str) -> String {
    normalize_login(s)
}

/// Retain only the RFC-3986 unreserved set `[A-Za-z0-9-_.~]`, case
/// preserved.
pub fn normalize_unreserved(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
        .collect()
}

/// Retain only the RFC-3986 unreserved set `[a-z0-9-_.~]`, case-folded.
///
/// Used for usernames and page names, guaranteeing the result is safe as a
/// key fragment.
pub fn normalize_lower_unreserved(s: &str) -> String {
    s.chars()
        .flat_map(|c| c.to_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.' | '~'))
        .collect()
}

/// Retain ASCII alphanumerics, case preserved.
///
/// User ids are base62-encoded and therefore case-sensitive.
pub fn normalize_user_id(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Strip the colon and all whitespace, case preserved.
pub fn normalize_code(s: &str) -> String {
    s.chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .collect()
}
