use std::fmt;

use regex::Regex;
use tracing::warn;

use super::Instance;
use crate::config::Config;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PatternKind {
    IncludeName,
    ExcludeTagKey,
    ExcludeTagValue,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::IncludeName => f.write_str("include name"),
            PatternKind::ExcludeTagKey => f.write_str("exclude tag key"),
            PatternKind::ExcludeTagValue => f.write_str("exclude tag value"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid {kind} pattern {pattern:?}, {source}")]
pub struct PatternError {
    pub kind: PatternKind,
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// A user supplied regex. One that failed to compile is kept and never matches.
#[derive(Clone, Debug)]
struct Pattern {
    text: String,
    regex: Option<Regex>,
}

impl Pattern {
    fn is_match(&self, haystack: &str) -> bool {
        self.regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(haystack))
    }
}

/// Why an instance was admitted or rejected, the pattern that decided it
/// is carried for logging.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Decision<'a> {
    Admit,
    NameNotIncluded,
    ExcludedByTagKey { pattern: &'a str, key: &'a str },
    ExcludedByTagValue { pattern: &'a str, value: &'a str },
}

impl Decision<'_> {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit)
    }
}

/// Compiled include and exclude patterns, built once per run.
#[derive(Debug)]
pub struct ScopeRule {
    include_names: Vec<Pattern>,
    exclude_tag_keys: Vec<Pattern>,
    exclude_tag_values: Vec<Pattern>,
    errors: Vec<PatternError>,
}

impl ScopeRule {
    pub fn new<S: AsRef<str>>(
        include_names: &[S],
        exclude_tag_keys: &[S],
        exclude_tag_values: &[S],
    ) -> Self {
        let mut errors = Vec::new();
        let mut compile = |kind: PatternKind, patterns: &[S]| {
            patterns
                .iter()
                .map(|pattern| {
                    let text = pattern.as_ref().to_string();
                    let regex = match Regex::new(&text) {
                        Ok(regex) => Some(regex),
                        Err(source) => {
                            let err = PatternError {
                                kind,
                                pattern: text.clone(),
                                source,
                            };
                            warn!(message = "pattern will never match", %err);
                            errors.push(err);
                            None
                        }
                    };

                    Pattern { text, regex }
                })
                .collect::<Vec<_>>()
        };

        let include_names = compile(PatternKind::IncludeName, include_names);
        let exclude_tag_keys = compile(PatternKind::ExcludeTagKey, exclude_tag_keys);
        let exclude_tag_values = compile(PatternKind::ExcludeTagValue, exclude_tag_values);

        ScopeRule {
            include_names,
            exclude_tag_keys,
            exclude_tag_values,
            errors,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        ScopeRule::new(
            &config.include_names,
            &config.exclude_tag_keys,
            &config.exclude_tag_values,
        )
    }

    /// Patterns that failed to compile.
    pub fn errors(&self) -> &[PatternError] {
        &self.errors
    }

    pub fn admit(&self, instance: &Instance) -> bool {
        self.evaluate(instance).is_admitted()
    }

    pub fn evaluate<'a>(&'a self, instance: &'a Instance) -> Decision<'a> {
        // an invalid include pattern still counts, so a rule made of invalid
        // include patterns admits nothing
        if !self.include_names.is_empty()
            && !self
                .include_names
                .iter()
                .any(|pattern| pattern.is_match(&instance.name))
        {
            return Decision::NameNotIncluded;
        }

        for pattern in &self.exclude_tag_keys {
            if let Some(key) = instance.tags.keys().find(|key| pattern.is_match(key)) {
                return Decision::ExcludedByTagKey {
                    pattern: &pattern.text,
                    key,
                };
            }
        }

        for pattern in &self.exclude_tag_values {
            if let Some(value) = instance.tags.values().find(|value| pattern.is_match(value)) {
                return Decision::ExcludedByTagValue {
                    pattern: &pattern.text,
                    value,
                };
            }
        }

        Decision::Admit
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    const NONE: &[&str] = &[];

    fn instance(name: &str, tags: &[(&str, &str)]) -> Instance {
        Instance {
            id: format!("i-{name}"),
            name: name.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            network: "vpc-1".to_string(),
        }
    }

    #[test]
    fn empty_rule_admits_everything() {
        let rule = ScopeRule::new(NONE, NONE, NONE);

        for name in ["web01", "db01", "", "anything at all"] {
            assert!(rule.admit(&instance(name, &[("env", "prod")])), "{name}");
        }
    }

    #[test]
    fn include_names_are_or_combined() {
        let rule = ScopeRule::new(&["^web", "^db"], NONE, NONE);

        assert!(rule.admit(&instance("web01", &[])));
        assert!(rule.admit(&instance("db01", &[])));
        assert_eq!(
            rule.evaluate(&instance("cache01", &[])),
            Decision::NameNotIncluded
        );
    }

    #[test]
    fn include_is_unanchored() {
        let rule = ScopeRule::new(&["web"], NONE, NONE);

        assert!(rule.admit(&instance("prod-web-01", &[])));
    }

    #[test]
    fn exclude_tag_key() {
        let rule = ScopeRule::new(NONE, &["acs:autoscaling.*"], NONE);

        let scaled = instance(
            "web01",
            &[("acs:autoscaling:scalingGroupId", "asg-1"), ("env", "prod")],
        );
        assert_eq!(
            rule.evaluate(&scaled),
            Decision::ExcludedByTagKey {
                pattern: "acs:autoscaling.*",
                key: "acs:autoscaling:scalingGroupId"
            }
        );

        assert!(rule.admit(&instance("web02", &[("env", "prod")])));
    }

    #[test]
    fn exclude_tag_key_wins_over_include() {
        let rule = ScopeRule::new(&["db.*"], &["env"], NONE);

        assert!(!rule.admit(&instance("db01", &[("env", "prod")])));
    }

    #[test]
    fn exclude_tag_value() {
        let rule = ScopeRule::new(NONE, NONE, &["autoScale"]);

        let scaled = instance("web01", &[("source", "autoScale")]);
        assert_eq!(
            rule.evaluate(&scaled),
            Decision::ExcludedByTagValue {
                pattern: "autoScale",
                value: "autoScale"
            }
        );

        assert!(rule.admit(&instance("web02", &[("source", "manual")])));
    }

    #[test]
    fn tag_key_checked_before_value() {
        let rule = ScopeRule::new(NONE, &["^env$"], &["prod"]);

        assert!(matches!(
            rule.evaluate(&instance("web01", &[("env", "prod")])),
            Decision::ExcludedByTagKey { .. }
        ));
    }

    #[test]
    fn value_patterns_do_not_match_keys() {
        let rule = ScopeRule::new(NONE, NONE, &["^env$"]);

        assert!(rule.admit(&instance("web01", &[("env", "prod")])));
    }

    #[test]
    fn invalid_include_fails_closed() {
        let rule = ScopeRule::new(&["web("], NONE, NONE);

        assert_eq!(rule.errors().len(), 1);
        assert_eq!(rule.errors()[0].kind, PatternKind::IncludeName);
        assert!(!rule.admit(&instance("web(", &[])));
        assert!(!rule.admit(&instance("web01", &[])));
    }

    #[test]
    fn invalid_include_next_to_valid_one() {
        let rule = ScopeRule::new(&["web(", "^db"], NONE, NONE);

        assert!(rule.admit(&instance("db01", &[])));
        assert!(!rule.admit(&instance("web01", &[])));
    }

    #[test]
    fn invalid_exclude_fails_open() {
        let rule = ScopeRule::new(NONE, &["env["], &["prod("]);

        assert_eq!(rule.errors().len(), 2);
        assert!(rule.admit(&instance("web01", &[("env[", "prod(")])));
    }
}
