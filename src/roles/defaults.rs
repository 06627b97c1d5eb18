/// Canonical badge colors for the standard roles. Assigning one of these roles
/// always stores this color, whatever the client asked for.
pub const DEFAULT_ROLE_COLORS: &[(&str, &str)] = &[
    ("Moderator", "#FF6B6B"),
    ("Owner", "#4ECDC4"),
    ("Helper", "#95E1D3"),
    ("Tester", "#F7DC6F"),
    ("Founder", "#BB8FCE"),
    ("Co-Founder", "#85C1E2"),
    ("Head Developer", "#df4b4bff"),
    ("Investor", "#F8B195"),
];

/// Badge color for roles that carry none of their own.
pub const FALLBACK_ROLE_COLOR: &str = "#4D96FF";

pub fn default_role_color(role: &str) -> Option<&'static str> {
    DEFAULT_ROLE_COLORS
        .iter()
        .find(|(name, _)| *name == role)
        .map(|(_, color)| *color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::is_valid_color;

    #[test]
    fn known_roles_resolve() {
        assert_eq!(default_role_color("Moderator"), Some("#FF6B6B"));
        assert_eq!(default_role_color("Founder"), Some("#BB8FCE"));
        assert_eq!(default_role_color("moderator"), None);
        assert_eq!(default_role_color("Custom"), None);
    }

    #[test]
    fn table_colors_are_well_formed() {
        assert!(DEFAULT_ROLE_COLORS.iter().all(|(_, c)| is_valid_color(c)));
        assert!(is_valid_color(FALLBACK_ROLE_COLOR));
    }
}
