//! Config-driven record filters

use std::sync::Arc;

use contracts::{FilterRule, MessageFilter, RawRecord};
use serde_json::Value;

use crate::normalizer::UnionTag;

/// Filter built from `[[pipeline.filters]]` rules
///
/// A record is kept when every rule matches. Field paths are dotted
/// (`address.city`) and see through union branch wrappers.
#[derive(Debug, Clone)]
pub struct RuleFilter {
    rules: Vec<FilterRule>,
}

impl RuleFilter {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    /// Build a shareable filter, `None` when there are no rules
    pub fn from_rules(rules: &[FilterRule]) -> Option<Arc<dyn MessageFilter>> {
        if rules.is_empty() {
            None
        } else {
            Some(Arc::new(Self::new(rules.to_vec())))
        }
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    fn matches(rule: &FilterRule, record: &RawRecord) -> bool {
        match rule {
            FilterRule::KeyPrefix { prefix } => record.key_str().starts_with(prefix.as_str()),
            FilterRule::KeyIn { keys } => {
                let key = record.key_str();
                keys.iter().any(|k| k == key.as_ref())
            }
            FilterRule::FieldEquals { field, value } => {
                lookup(&record.value, field).is_some_and(|found| found == value)
            }
            FilterRule::FieldPresent { field } => {
                lookup(&record.value, field).is_some_and(|found| !found.is_null())
            }
        }
    }
}

impl MessageFilter for RuleFilter {
    fn keep(&self, record: &RawRecord) -> bool {
        self.rules.iter().all(|rule| Self::matches(rule, record))
    }
}

/// Resolve a dotted path, unwrapping branch wrappers along the way
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(see_through(value), |current, segment| {
            current.get(segment).map(see_through)
        })
}

fn see_through(mut value: &Value) -> &Value {
    while let Value::Object(map) = value {
        match map.iter().next() {
            Some((key, inner)) if map.len() == 1 && UnionTag::from_key(key).is_some() => {
                value = inner;
            }
            _ => break,
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(key: &str, value: Value) -> RawRecord {
        RawRecord::new(key.to_string(), value)
    }

    #[test]
    fn key_rules() {
        let filter = RuleFilter::new(vec![FilterRule::KeyPrefix {
            prefix: "NO-".into(),
        }]);
        assert!(filter.keep(&record("NO-42", json!({}))));
        assert!(!filter.keep(&record("SE-42", json!({}))));

        let filter = RuleFilter::new(vec![FilterRule::KeyIn {
            keys: vec!["1".into(), "2".into()],
        }]);
        assert!(filter.keep(&record("2", json!({}))));
        assert!(!filter.keep(&record("3", json!({}))));
    }

    #[test]
    fn field_equals_sees_through_branches() {
        let filter = RuleFilter::new(vec![FilterRule::FieldEquals {
            field: "status.code".into(),
            value: json!("OPEN"),
        }]);
        assert!(filter.keep(&record(
            "1",
            json!({"status": {"code": {"string": "OPEN"}}})
        )));
        assert!(filter.keep(&record("1", json!({"status": {"code": "OPEN"}}))));
        assert!(!filter.keep(&record(
            "1",
            json!({"status": {"code": {"string": "CLOSED"}}})
        )));
        assert!(!filter.keep(&record("1", json!({"other": 1}))));
    }

    #[test]
    fn field_present_rejects_null_and_missing() {
        let filter = RuleFilter::new(vec![FilterRule::FieldPresent {
            field: "email".into(),
        }]);
        assert!(filter.keep(&record("1", json!({"email": {"string": "a@b.no"}}))));
        assert!(!filter.keep(&record("1", json!({"email": null}))));
        assert!(!filter.keep(&record("1", json!({"name": "x"}))));
        assert!(!filter.keep(&record("1", json!("bare"))));
    }

    #[test]
    fn all_rules_must_match() {
        let filter = RuleFilter::new(vec![
            FilterRule::KeyPrefix {
                prefix: "NO-".into(),
            },
            FilterRule::FieldPresent {
                field: "email".into(),
            },
        ]);
        assert!(filter.keep(&record("NO-1", json!({"email": "a@b.no"}))));
        assert!(!filter.keep(&record("NO-1", json!({}))));
        assert!(!filter.keep(&record("SE-1", json!({"email": "a@b.no"}))));
    }

    #[test]
    fn empty_rule_list_means_no_filter() {
        assert!(RuleFilter::from_rules(&[]).is_none());
        assert!(RuleFilter::from_rules(&[FilterRule::FieldPresent {
            field: "a".into()
        }])
        .is_some());
    }

    #[test]
    fn closures_are_filters() {
        let only_even = |r: &RawRecord| r.key_str().parse::<u32>().is_ok_and(|k| k % 2 == 0);
        assert!(only_even.keep(&record("4", json!({}))));
        assert!(!only_even.keep(&record("5", json!({}))));
    }
}
