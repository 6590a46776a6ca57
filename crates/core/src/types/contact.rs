//! Brazilian phone number and taxpayer document masks.
//!
//! Profiles store phone numbers and CPF/CNPJ documents already masked, the
//! way users see them on screen. Input that does not have exactly the digit
//! count of a known mask is kept as bare digits.

/// Format a mobile number as `(XX) XXXXX-XXXX`.
///
/// Non-digits are stripped and at most 11 digits are kept.
///
/// ```
/// use garagem_core::format_phone;
///
/// assert_eq!(format_phone("11987654321"), "(11) 98765-4321");
/// assert_eq!(format_phone("1198765"), "1198765");
/// ```
#[must_use]
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).take(11).collect();
    if digits.len() == 11 {
        format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..])
    } else {
        digits
    }
}

/// Format a CPF (`XXX.XXX.XXX-XX`, 11 digits) or CNPJ
/// (`XX.XXX.XXX/XXXX-XX`, 14 digits).
///
/// ```
/// use garagem_core::format_document;
///
/// assert_eq!(format_document("12345678901"), "123.456.789-01");
/// assert_eq!(format_document("12.345.678/0001-95"), "12.345.678/0001-95");
/// ```
#[must_use]
pub fn format_document(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).take(14).collect();
    match digits.len() {
        11 => format!(
            "{}.{}.{}-{}",
            &digits[..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..]
        ),
        14 => format!(
            "{}.{}.{}/{}-{}",
            &digits[..2],
            &digits[2..5],
            &digits[5..8],
            &digits[8..12],
            &digits[12..]
        ),
        _ => digits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_strips_mask_before_formatting() {
        assert_eq!(format_phone("(21) 99876-5432"), "(21) 99876-5432");
    }

    #[test]
    fn test_phone_truncates_extra_digits() {
        assert_eq!(format_phone("119876543219999"), "(11) 98765-4321");
    }

    #[test]
    fn test_document_partial_stays_digits() {
        assert_eq!(format_document("123.456"), "123456");
    }

    #[test]
    fn test_cnpj() {
        assert_eq!(format_document("12345678000195"), "12.345.678/0001-95");
    }
}
