use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::core::config::ContentRule;

/// Compiles a `ContentRule` into a matcher.
///
/// A rule written as `/pattern/` is a raw regular expression; anything else
/// is escaped and matched as a literal substring. `ignore_case` applies to
/// both forms.
pub fn compile(rule: &ContentRule) -> Result<Regex> {
    let pattern = match raw_regex(&rule.text) {
        Some(raw) => raw.to_string(),
        None => regex::escape(&rule.text),
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(rule.ignore_case)
        .build()
        .with_context(|| format!("Invalid content pattern {:?}", rule.text))
}

/// Whether `content` satisfies `rule`.
pub fn matches(rule: &ContentRule, content: &str) -> Result<bool> {
    Ok(compile(rule)?.is_match(content))
}

/// Case-insensitive literal search.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> Result<bool> {
    matches(&ContentRule::literal(needle).ignoring_case(), haystack)
}

fn raw_regex(text: &str) -> Option<&str> {
    if text.len() >= 2 && text.starts_with('/') && text.ends_with('/') {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_rules_escape_metacharacters() {
        let rule = ContentRule::literal("nix-blazar.cachix.org");
        assert!(matches(&rule, "substituters = [ \"https://nix-blazar.cachix.org\" ]").unwrap());
        assert!(!matches(&rule, "nix-blazarXcachixXorg").unwrap());
    }

    #[test]
    fn slash_wrapped_rules_are_regexes() {
        let rule = ContentRule::literal(r"/cache-push-(packages|system)/");
        assert!(matches(&rule, "cache-push-system:").unwrap());
        assert!(!matches(&rule, "cache-push-all:").unwrap());
    }

    #[test]
    fn case_folding_is_opt_in() {
        let strict = ContentRule::literal("cachix");
        assert!(!matches(&strict, "CACHIX only").unwrap());
        assert!(matches(&strict.clone().ignoring_case(), "CACHIX only").unwrap());
    }

    #[test]
    fn deprecation_notice_is_found_in_any_case() {
        assert!(contains_ignore_case("This command is DEPRECATED, use jj-status", "deprecated").unwrap());
        assert!(!contains_ignore_case("use jj-status", "deprecated").unwrap());
    }

    #[test]
    fn invalid_regex_is_reported() {
        assert!(compile(&ContentRule::literal("/(unclosed/")).is_err());
    }
}
