const HEADING_MARKER: &str = "## ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Heading { label: &'a str },
    Text(&'a str),
    Empty,
}

/// Split a document into trimmed, classified lines. Only `## ` opens a
/// section; `###` and deeper stay plain text.
pub fn classify_lines(text: &str) -> Vec<Line<'_>> {
    text.lines().map(classify).collect()
}

fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Empty;
    }
    match line.strip_prefix(HEADING_MARKER) {
        Some(label) => Line::Heading {
            label: label.trim(),
        },
        None => Line::Text(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading() {
        let lines = classify_lines("## Pinned Repositories");
        assert_eq!(
            lines,
            vec![Line::Heading {
                label: "Pinned Repositories"
            }]
        );
    }

    #[test]
    fn deeper_heading_is_text() {
        let lines = classify_lines("### Pinned Repositories");
        assert_eq!(lines, vec![Line::Text("### Pinned Repositories")]);
    }

    #[test]
    fn heading_is_case_sensitive_literal() {
        assert!(matches!(classify_lines("##NoSpace")[0], Line::Text(_)));
        assert!(matches!(classify_lines("  ## Indented")[0], Line::Heading { label: "Indented" }));
    }

    #[test]
    fn trims_and_handles_crlf() {
        let lines = classify_lines("  - Language: Rust  \r\n\r\n1. **x**");
        assert_eq!(
            lines,
            vec![Line::Text("- Language: Rust"), Line::Empty, Line::Text("1. **x**")]
        );
    }

    #[test]
    fn empty_string() {
        assert!(classify_lines("").is_empty());
    }
}
