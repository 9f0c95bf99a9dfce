/// Plausibility checks applied to pattern matches before they are accepted.
pub struct FormatValidator;

impl FormatValidator {
    /// Engine displacement in cc. Anything outside [40, 9000] is some other number.
    pub fn displacement_in_range(value: &str) -> bool {
        value
            .trim()
            .parse::<u32>()
            .map(|cc| (40..=9000).contains(&cc))
            .unwrap_or(false)
    }

    /// National ID numbers carry 6 to 10 digits once separators are removed.
    pub fn is_plausible_id_number(value: &str) -> bool {
        let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
        (6..=10).contains(&digits) && value.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_displacement_bounds() {
        assert!(FormatValidator::displacement_in_range("40"));
        assert!(FormatValidator::displacement_in_range("150"));
        assert!(FormatValidator::displacement_in_range("9000"));
        assert!(!FormatValidator::displacement_in_range("39"));
        assert!(!FormatValidator::displacement_in_range("99999"));
        assert!(!FormatValidator::displacement_in_range("1.5"));
    }

    #[test]
    fn test_id_number_plausibility() {
        assert!(FormatValidator::is_plausible_id_number("1234567890"));
        assert!(FormatValidator::is_plausible_id_number("79.845.123"));
        assert!(!FormatValidator::is_plausible_id_number("2015"));
        assert!(!FormatValidator::is_plausible_id_number("12345678901"));
    }
}
