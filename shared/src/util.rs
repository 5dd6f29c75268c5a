//! Small helpers shared by the client crates

/// Country prefix the phone input always starts with
pub const PHONE_PREFIX: &str = "+998 ";

/// Digits allowed after the prefix
pub const PHONE_MAX_DIGITS: usize = 9;

/// Strip everything but ASCII digits
pub fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Normalise raw phone input
///
/// Input that lost the prefix resets to the bare prefix. Otherwise only
/// digits are kept after the prefix, at most [`PHONE_MAX_DIGITS`].
pub fn format_phone_input(raw: &str) -> String {
    let Some(rest) = raw.strip_prefix(PHONE_PREFIX) else {
        return PHONE_PREFIX.to_string();
    };
    let digits: String = rest
        .chars()
        .filter(char::is_ascii_digit)
        .take(PHONE_MAX_DIGITS)
        .collect();
    format!("{}{}", PHONE_PREFIX, digits)
}

/// Whether the input holds more than the bare prefix
pub fn has_phone_number(phone: &str) -> bool {
    let trimmed = phone.trim();
    !trimmed.is_empty() && trimmed != PHONE_PREFIX.trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("+998 (90) 123-45-67"), "998901234567");
        assert_eq!(digits_only("abc"), "");
    }

    #[test]
    fn test_format_phone_input() {
        assert_eq!(format_phone_input(""), "+998 ");
        assert_eq!(format_phone_input("+99"), "+998 ");
        assert_eq!(format_phone_input("998 90"), "+998 ");
        assert_eq!(format_phone_input("+998 90-12a3"), "+998 90123");
        assert_eq!(format_phone_input("+998 9012345678901"), "+998 901234567");
    }

    #[test]
    fn test_has_phone_number() {
        assert!(!has_phone_number("+998 "));
        assert!(!has_phone_number("+998"));
        assert!(!has_phone_number("   "));
        assert!(has_phone_number("+998 9"));
    }
}
