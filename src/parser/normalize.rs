/// Text after the first colon, trimmed. A line without a colon yields "".
pub fn value_after_colon(line: &str) -> &str {
    line.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or("")
}

/// Leading-digits integer parse: skips leading whitespace, accepts an optional
/// sign, stops at the first non-digit. `None` when no digit leads the text;
/// digit runs past the `i64` range saturate.
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = digits[..end].bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if negative { -value } else { value })
}

pub fn strip_thousands(text: &str) -> String {
    text.replace(',', "")
}

/// Presentation form of a stored value: underscores shown as spaces.
pub fn display_text(text: &str) -> String {
    text.replace('_', " ")
}

/// Append `value` unless an identical string is already present.
pub fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_value() {
        assert_eq!(value_after_colon("- Trip started:  2018-01-01 "), "2018-01-01");
        assert_eq!(value_after_colon("- Summary: a: b"), "a: b");
        assert_eq!(value_after_colon("no colon"), "");
    }

    #[test]
    fn leading_int() {
        assert_eq!(parse_leading_int("90"), Some(90));
        assert_eq!(parse_leading_int(" 90 days"), Some(90));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("12,000"), Some(12));
        assert_eq!(parse_leading_int("ninety"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999999 km"), Some(i64::MAX));
        assert_eq!(parse_leading_int("-99999999999999999999999"), Some(-i64::MAX));
    }

    #[test]
    fn thousands() {
        assert_eq!(strip_thousands("12,345.6"), "12345.6");
    }

    #[test]
    fn display() {
        assert_eq!(display_text("Czech_Republic"), "Czech Republic");
    }

    #[test]
    fn unique_push_keeps_first_seen_order() {
        let mut v = Vec::new();
        push_unique(&mut v, "France");
        push_unique(&mut v, "Spain");
        push_unique(&mut v, "France");
        push_unique(&mut v, "France.");
        assert_eq!(v, vec!["France", "Spain", "France."]);
    }
}
