//! # CORS Policy Transcoder
//!
//! Maps between the declared, unordered rule collection and the wire rules.
//!
//! Empty string sets are dropped on the way back (`flatten`) rather than
//! reported as empty, so a rule that never declared a field does not show a
//! spurious difference. The flip side: a rule that explicitly declares an
//! empty set reads back without that field.

use crate::provider::WireCorsRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One declared CORS rule
///
/// `None` and an empty set both go out as an empty list; only `None` comes back.
/// See [`CorsRuleConfig::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorsRuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_headers: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_methods: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_headers: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<i64>,
}

/// Declared rules to wire rules, one per input rule
pub fn expand_cors_policy<'a>(
    rules: impl IntoIterator<Item = &'a CorsRuleConfig>,
) -> Vec<WireCorsRule> {
    rules
        .into_iter()
        .map(|rule| WireCorsRule {
            allowed_headers: expand_string_set(rule.allowed_headers.as_ref()),
            allowed_methods: expand_string_set(rule.allowed_methods.as_ref()),
            allowed_origins: expand_string_set(rule.allowed_origins.as_ref()),
            expose_headers: expand_string_set(rule.expose_headers.as_ref()),
            max_age_seconds: rule.max_age_seconds,
        })
        .collect()
}

/// Wire rules back to the declared form, omitting empty fields
#[must_use]
pub fn flatten_cors_policy(rules: &[WireCorsRule]) -> BTreeSet<CorsRuleConfig> {
    rules
        .iter()
        .map(|rule| CorsRuleConfig {
            allowed_headers: flatten_string_list(&rule.allowed_headers),
            allowed_methods: flatten_string_list(&rule.allowed_methods),
            allowed_origins: flatten_string_list(&rule.allowed_origins),
            expose_headers: flatten_string_list(&rule.expose_headers),
            max_age_seconds: rule.max_age_seconds,
        })
        .collect()
}

/// Rules as they will read back: empty sets and a zero max age become unset
///
/// Compare normalized policies so declarations that only differ in how they
/// spell "nothing" do not produce a change.
#[must_use]
pub fn normalize_cors_policy(rules: &BTreeSet<CorsRuleConfig>) -> BTreeSet<CorsRuleConfig> {
    rules.iter().map(CorsRuleConfig::normalized).collect()
}

impl CorsRuleConfig {
    /// This rule with empty sets and a zero max age cleared
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            allowed_headers: non_empty(self.allowed_headers.as_ref()),
            allowed_methods: non_empty(self.allowed_methods.as_ref()),
            allowed_origins: non_empty(self.allowed_origins.as_ref()),
            expose_headers: non_empty(self.expose_headers.as_ref()),
            max_age_seconds: self.max_age_seconds.filter(|v| *v != 0),
        }
    }
}

fn non_empty(set: Option<&BTreeSet<String>>) -> Option<BTreeSet<String>> {
    set.filter(|s| !s.is_empty()).cloned()
}

fn expand_string_set(set: Option<&BTreeSet<String>>) -> Vec<String> {
    set.map(|s| s.iter().cloned().collect()).unwrap_or_default()
}

fn flatten_string_list(list: &[String]) -> Option<BTreeSet<String>> {
    if list.is_empty() {
        None
    } else {
        Some(list.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> Option<BTreeSet<String>> {
        Some(values.iter().map(ToString::to_string).collect())
    }

    fn full_rule(origin: &str) -> CorsRuleConfig {
        CorsRuleConfig {
            allowed_headers: set(&["*"]),
            allowed_methods: set(&["GET", "HEAD"]),
            allowed_origins: set(&[origin]),
            expose_headers: set(&["x-amz-request-id"]),
            max_age_seconds: Some(3000),
        }
    }

    #[test]
    fn test_round_trip_with_all_fields_set() {
        let rules: BTreeSet<_> = [full_rule("https://a.example"), full_rule("https://b.example")]
            .into_iter()
            .collect();

        let wire = expand_cors_policy(&rules);
        assert_eq!(wire.len(), 2);
        assert_eq!(flatten_cors_policy(&wire), rules);
    }

    #[test]
    fn test_round_trip_ignores_wire_order() {
        let rules: BTreeSet<_> = [full_rule("https://a.example"), full_rule("https://b.example")]
            .into_iter()
            .collect();

        let mut wire = expand_cors_policy(&rules);
        wire.reverse();
        assert_eq!(flatten_cors_policy(&wire), rules);
    }

    #[test]
    fn test_empty_allowed_headers_is_omitted() {
        let rule = CorsRuleConfig {
            allowed_headers: Some(BTreeSet::new()),
            ..full_rule("https://a.example")
        };

        let wire = expand_cors_policy([&rule]);
        assert!(wire[0].allowed_headers.is_empty());

        let flattened = flatten_cors_policy(&wire);
        let back = flattened.iter().next().unwrap();
        assert!(back.allowed_headers.is_none());
        assert_eq!(back.allowed_methods, rule.allowed_methods);

        let json = serde_json::to_value(back).unwrap();
        assert!(json.get("allowed_headers").is_none());
        assert!(json.get("allowed_methods").is_some());
    }

    #[test]
    fn test_undeclared_fields_go_out_empty() {
        let rule = CorsRuleConfig {
            allowed_origins: set(&["*"]),
            ..CorsRuleConfig::default()
        };

        let wire = expand_cors_policy([&rule]);
        assert_eq!(
            wire,
            vec![WireCorsRule {
                allowed_origins: vec!["*".to_string()],
                ..WireCorsRule::default()
            }]
        );
        assert_eq!(flatten_cors_policy(&wire).into_iter().next(), Some(rule));
    }

    #[test]
    fn test_normalize_clears_empty_sets_and_zero_max_age() {
        let declared = CorsRuleConfig {
            allowed_headers: Some(BTreeSet::new()),
            expose_headers: Some(BTreeSet::new()),
            max_age_seconds: Some(0),
            ..full_rule("https://a.example")
        };
        let read_back = CorsRuleConfig {
            allowed_headers: None,
            expose_headers: None,
            max_age_seconds: None,
            ..full_rule("https://a.example")
        };

        assert_ne!(declared, read_back);
        assert_eq!(declared.normalized(), read_back);

        let policy: BTreeSet<_> = [declared].into_iter().collect();
        let flattened = flatten_cors_policy(&expand_cors_policy(&policy));
        assert_eq!(
            normalize_cors_policy(&policy),
            normalize_cors_policy(&flattened)
        );
    }

    #[test]
    fn test_duplicate_wire_rules_collapse() {
        let wire = expand_cors_policy([&full_rule("*"), &full_rule("*")]);
        assert_eq!(wire.len(), 2);
        assert_eq!(flatten_cors_policy(&wire).len(), 1);
    }
}
