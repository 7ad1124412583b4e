pub mod projects;
pub mod trip;

use std::sync::LazyLock;

use regex::Regex;

use super::normalize::value_after_colon;

/// How a rule recognizes a line, and which part of the line it hands on.
pub enum Matcher {
    /// Line starts with the literal prefix; hands on the text after the first colon.
    Prefix(&'static str),
    /// Line matches the pattern; hands on capture group 1, trimmed.
    Pattern(&'static LazyLock<Regex>),
    /// Line contains any of the names; hands on the line minus its first two chars.
    AnyOf(&'static [&'static str]),
}

impl Matcher {
    fn capture<'a>(&self, line: &'a str) -> Option<&'a str> {
        match self {
            Matcher::Prefix(prefix) => line.starts_with(prefix).then(|| value_after_colon(line)),
            Matcher::Pattern(re) => re
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim()),
            Matcher::AnyOf(names) => names
                .iter()
                .any(|name| line.contains(name))
                .then(|| {
                    line.char_indices()
                        .nth(2)
                        .map_or("", |(i, _)| &line[i..])
                        .trim()
                }),
        }
    }
}

pub struct Rule<S> {
    pub matcher: Matcher,
    pub apply: fn(&mut S, &str),
}

/// Apply the first rule in `rules` that recognizes `line`. Returns whether any did.
pub fn apply_first<S>(rules: &[Rule<S>], state: &mut S, line: &str) -> bool {
    for rule in rules {
        if let Some(value) = rule.matcher.capture(line) {
            (rule.apply)(state, value);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    static NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#(\d+)").unwrap());

    static RULES: &[Rule<Vec<String>>] = &[
        Rule {
            matcher: Matcher::Prefix("- Key:"),
            apply: |s, v| s.push(format!("key={v}")),
        },
        Rule {
            matcher: Matcher::Pattern(&NUM_RE),
            apply: |s, v| s.push(format!("num={v}")),
        },
        Rule {
            matcher: Matcher::AnyOf(&["Spain", "Key"]),
            apply: |s, v| s.push(format!("any={v}")),
        },
    ];

    #[test]
    fn first_matching_rule_wins() {
        let mut seen = Vec::new();
        assert!(apply_first(RULES, &mut seen, "- Key: value"));
        assert_eq!(seen, vec!["key=value"]);
    }

    #[test]
    fn each_matcher_kind() {
        let mut seen = Vec::new();
        apply_first(RULES, &mut seen, "#42 rest");
        apply_first(RULES, &mut seen, "- Spain ");
        assert_eq!(seen, vec!["num=42", "any=Spain"]);
    }

    #[test]
    fn unmatched_line_is_ignored() {
        let mut seen = Vec::new();
        assert!(!apply_first(RULES, &mut seen, "nothing here"));
        assert!(seen.is_empty());
    }

    #[test]
    fn any_of_on_short_line_hands_on_empty() {
        let mut seen = Vec::new();
        apply_first(RULES, &mut seen, "Ke");
        assert!(seen.is_empty());
        let mut seen = Vec::new();
        apply_first(RULES, &mut seen, "Key");
        assert_eq!(seen, vec!["any=y"]);
    }

    #[test]
    fn any_of_cuts_by_chars_not_bytes() {
        let mut seen = Vec::new();
        apply_first(RULES, &mut seen, "• Spain");
        apply_first(RULES, &mut seen, "–Spain");
        assert_eq!(seen, vec!["any=Spain", "any=pain"]);
    }
}
