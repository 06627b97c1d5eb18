use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref COLOR_RE: Regex = Regex::new(r"^#(?:[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// `#RRGGBB` or `#RRGGBBAA`.
pub(crate) fn is_valid_color(color: &str) -> bool {
    COLOR_RE.is_match(color)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
