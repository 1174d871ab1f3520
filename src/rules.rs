use regex::Regex;

use crate::mapping::RowFields;

/// One `templates` entry: when `pattern` matches the row's `match_field`,
/// every non-empty override is written into the row.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub pattern: Regex,
    pub match_field: String,
    pub tx_type: Option<String>,
    pub contact: Option<String>,
    pub category: Option<String>,
    pub project: Option<String>,
}

impl ClassificationRule {
    fn matches(&self, row: &RowFields) -> bool {
        row.get(&self.match_field)
            .is_some_and(|value| self.pattern.is_match(value))
    }

    fn overrides(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("type", self.tx_type.as_deref()),
            ("contact", self.contact.as_deref()),
            ("category", self.category.as_deref()),
            ("project", self.project.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ClassificationRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Apply every rule in declaration order. Each rule sees the row as
    /// classified by the rules before it, and the last match wins per key.
    pub fn classify(&self, row: &RowFields) -> RowFields {
        self.rules.iter().fold(row.clone(), |mut acc, rule| {
            if rule.matches(&acc) {
                for (key, value) in rule.overrides() {
                    acc.insert(key.to_string(), value.to_string());
                }
            }
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str) -> ClassificationRule {
        ClassificationRule {
            pattern: Regex::new(pattern).unwrap(),
            match_field: "description".to_string(),
            tx_type: None,
            contact: None,
            category: None,
            project: None,
        }
    }

    fn row(pairs: &[(&str, &str)]) -> RowFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_all_matching_rules_apply() {
        let rules = RuleSet::new(vec![
            ClassificationRule {
                tx_type: Some("C".into()),
                ..rule("PAYROLL")
            },
            ClassificationRule {
                category: Some("Salary".into()),
                ..rule("PAY")
            },
        ]);
        let out = rules.classify(&row(&[("description", "PAYROLL DEPOSIT")]));
        assert_eq!(out["type"], "C");
        assert_eq!(out["category"], "Salary");
    }

    #[test]
    fn test_last_match_wins() {
        let rules = RuleSet::new(vec![
            ClassificationRule {
                contact: Some("Hydro One".into()),
                ..rule("HYDRO")
            },
            ClassificationRule {
                contact: Some("Toronto Hydro".into()),
                ..rule("TORONTO")
            },
        ]);
        let out = rules.classify(&row(&[("description", "TORONTO HYDRO BILL")]));
        assert_eq!(out["contact"], "Toronto Hydro");
    }

    #[test]
    fn test_empty_override_keeps_column_value() {
        let rules = RuleSet::new(vec![ClassificationRule {
            category: Some("Groceries".into()),
            ..rule("LOBLAWS")
        }]);
        let out = rules.classify(&row(&[
            ("description", "LOBLAWS #123"),
            ("contact", "Loblaws"),
        ]));
        assert_eq!(out["contact"], "Loblaws");
        assert_eq!(out["category"], "Groceries");
    }

    #[test]
    fn test_absent_match_field_skips_rule() {
        let rules = RuleSet::new(vec![ClassificationRule {
            match_field: "memo".into(),
            category: Some("Misc".into()),
            ..rule(".*")
        }]);
        let out = rules.classify(&row(&[("description", "anything")]));
        assert!(!out.contains_key("category"));
    }

    #[test]
    fn test_later_rule_sees_earlier_override() {
        let rules = RuleSet::new(vec![
            ClassificationRule {
                category: Some("Utilities".into()),
                ..rule("HYDRO")
            },
            ClassificationRule {
                match_field: "category".into(),
                project: Some("House".into()),
                ..rule("^Utilities$")
            },
        ]);
        let out = rules.classify(&row(&[("description", "HYDRO")]));
        assert_eq!(out["project"], "House");
    }

    #[test]
    fn test_input_row_untouched() {
        let rules = RuleSet::new(vec![ClassificationRule {
            tx_type: Some("C".into()),
            ..rule("DEPOSIT")
        }]);
        let input = row(&[("description", "DEPOSIT")]);
        let out = rules.classify(&input);
        assert!(!input.contains_key("type"));
        assert_eq!(out["type"], "C");
    }
}
